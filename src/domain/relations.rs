//! Ownership between records and what happens to children when a parent goes away.
//!
//! Two kinds exist: strong ownership ([`OnDelete::Cascade`]) removes the
//! children with the parent, a weak reference ([`OnDelete::SetNull`]) keeps the
//! children and clears the column pointing at the parent. The table below is
//! the single source the storage schema and deletion routines agree on.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Session,
    Group,
    Post,
    Comment,
    Follow,
}

impl Entity {
    pub fn table(self) -> &'static str {
        match self {
            Entity::User => "users",
            Entity::Session => "sessions",
            Entity::Group => "groups",
            Entity::Post => "posts",
            Entity::Comment => "comments",
            Entity::Follow => "follows",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Entity::User => "user",
            Entity::Session => "session",
            Entity::Group => "group",
            Entity::Post => "post",
            Entity::Comment => "comment",
            Entity::Follow => "follow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

/// `child.column` references `parent.id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub parent: Entity,
    pub child: Entity,
    pub column: &'static str,
    pub on_delete: OnDelete,
}

pub const RELATIONS: &[Relation] = &[
    Relation {
        parent: Entity::User,
        child: Entity::Post,
        column: "author_id",
        on_delete: OnDelete::Cascade,
    },
    Relation {
        parent: Entity::User,
        child: Entity::Comment,
        column: "author_id",
        on_delete: OnDelete::Cascade,
    },
    Relation {
        parent: Entity::User,
        child: Entity::Follow,
        column: "user_id",
        on_delete: OnDelete::Cascade,
    },
    Relation {
        parent: Entity::User,
        child: Entity::Follow,
        column: "author_id",
        on_delete: OnDelete::Cascade,
    },
    Relation {
        parent: Entity::User,
        child: Entity::Session,
        column: "user_id",
        on_delete: OnDelete::Cascade,
    },
    Relation {
        parent: Entity::Post,
        child: Entity::Comment,
        column: "post_id",
        on_delete: OnDelete::Cascade,
    },
    Relation {
        parent: Entity::Group,
        child: Entity::Post,
        column: "group_id",
        on_delete: OnDelete::SetNull,
    },
];

pub fn relations_from(parent: Entity) -> impl Iterator<Item = &'static Relation> {
    RELATIONS.iter().filter(move |relation| relation.parent == parent)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionAction {
    Delete,
    Nullify { column: &'static str },
}

/// One statement of a deletion plan.
///
/// `path` lists the relations walked from the root record down to `entity`;
/// an empty path addresses the root record itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionStep {
    pub entity: Entity,
    pub action: DeletionAction,
    pub path: Vec<Relation>,
}

/// Ordered steps that remove `root` and honour every relation below it.
///
/// Children come before their parents and the root record is always last.
pub fn deletion_plan(root: Entity) -> Vec<DeletionStep> {
    let mut steps = Vec::new();
    collect_steps(root, &mut Vec::new(), &mut steps);
    steps
}

fn collect_steps(entity: Entity, path: &mut Vec<Relation>, steps: &mut Vec<DeletionStep>) {
    for relation in relations_from(entity) {
        path.push(*relation);
        match relation.on_delete {
            OnDelete::Cascade => collect_steps(relation.child, path, steps),
            OnDelete::SetNull => steps.push(DeletionStep {
                entity: relation.child,
                action: DeletionAction::Nullify {
                    column: relation.column,
                },
                path: path.clone(),
            }),
        }
        path.pop();
    }

    steps.push(DeletionStep {
        entity,
        action: DeletionAction::Delete,
        path: path.clone(),
    });
}
