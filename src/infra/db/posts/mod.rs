mod read;
mod types;
mod write;

use sqlx::{Postgres, QueryBuilder};

use crate::application::repos::PostQueryFilter;

use super::PostgresRepositories;

const POST_ENTRY_SELECT: &str = "SELECT p.id, p.text, p.author_id, p.group_id, p.image, p.created_at, \
     u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, g.title AS group_title, g.slug AS group_slug \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id \
     WHERE 1=1 ";

impl PostgresRepositories {
    fn apply_post_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostQueryFilter) {
        if let Some(group_id) = filter.group_id {
            qb.push(" AND p.group_id = ");
            qb.push_bind(group_id);
        }

        if let Some(author_id) = filter.author_id {
            qb.push(" AND p.author_id = ");
            qb.push_bind(author_id);
        }

        if let Some(user_id) = filter.followed_by {
            qb.push(" AND p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ");
            qb.push_bind(user_id);
            qb.push(")");
        }

        if let Some(search) = filter.search.as_ref() {
            qb.push(" AND p.text ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(search)));
        }
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
