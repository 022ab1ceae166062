//! Record removal driven by the relation table.
//!
//! Each step of [`deletion_plan`] becomes one statement bound to the root id,
//! and every statement runs inside the same transaction.

use async_trait::async_trait;
use tracing::debug;

use crate::application::repos::{RecordsRepo, RepoError};
use crate::domain::relations::{DeletionAction, DeletionStep, Entity, Relation, deletion_plan};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl RecordsRepo for PostgresRepositories {
    async fn delete_record(&self, entity: Entity, id: i64) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let exists_sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
            entity.table()
        );
        let exists: bool = sqlx::query_scalar(&exists_sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if !exists {
            return Err(RepoError::NotFound);
        }

        for step in deletion_plan(entity) {
            let sql = render_step(&step);
            let result = sqlx::query(&sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            debug!(
                target = "yatube::db::records",
                root = entity.as_str(),
                table = step.entity.table(),
                rows = result.rows_affected(),
                "deletion step applied"
            );
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}

/// SQL for one plan step; the root id is always `$1`.
fn render_step(step: &DeletionStep) -> String {
    let predicate = path_predicate(&step.path);
    let table = step.entity.table();
    match &step.action {
        DeletionAction::Delete => format!("DELETE FROM {table} WHERE {predicate}"),
        DeletionAction::Nullify { column } => {
            format!("UPDATE {table} SET {column} = NULL WHERE {predicate}")
        }
    }
}

fn path_predicate(path: &[Relation]) -> String {
    let Some((last, parents)) = path.split_last() else {
        return "id = $1".to_string();
    };
    if parents.is_empty() {
        return format!("{} = $1", last.column);
    }
    format!(
        "{} IN (SELECT id FROM {} WHERE {})",
        last.column,
        last.parent.table(),
        path_predicate(parents)
    )
}
