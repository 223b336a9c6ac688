//! Postgres [`UserStore`] backed by a `sqlx` connection pool.
//!
//! Queries are checked at runtime rather than with `sqlx::query!`, so building
//! the crate never needs a live database. Column lists are assembled only from
//! [`Field::as_str`], never from client input.

use super::{StoreError, StoreResult, UserStore, resolve_fields, resolve_writable};
use crate::server::{config::DatabaseConfig, service::page::PageWindow};
use anyhow::Context;
use profile_core::types::{Field, FieldMask, User, UserId};
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Builds the pool. With `ping_on_start` a first connection is opened
    /// eagerly so an unreachable database fails startup instead of the first
    /// request.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.idle_connections)
            .max_lifetime(config.conn_max_lifetime);

        let pool = if config.ping_on_start {
            options
                .connect(&config.url)
                .await
                .context("cannot open connection to database")?
        } else {
            options
                .connect_lazy(&config.url)
                .context("invalid database connection string")?
        };

        tracing::info!(
            max_connections = config.max_connections,
            idle_connections = config.idle_connections,
            ping_on_start = config.ping_on_start,
            "Database pool ready"
        );
        Ok(Self { pool })
    }
}

fn column_list(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn user_from_row(row: &PgRow, fields: &[Field]) -> StoreResult<User> {
    let mut user = User::default();
    for field in fields {
        match field {
            Field::Id => user.id = row.try_get(field.as_str())?,
            Field::Name => user.name = row.try_get(field.as_str())?,
            Field::Email => user.email = row.try_get(field.as_str())?,
        }
    }
    Ok(user)
}

/// `UPDATE` statement for the given columns; `$1` is always the id.
fn update_statement(fields: &[Field]) -> String {
    let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, field)| format!("{} = ${}", field.as_str(), i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    format!("UPDATE users SET {assignments} WHERE id = $1")
}

impl UserStore for PgStore {
    async fn insert(&self, user: &User) -> StoreResult<UserId> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id",
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_by_id(&self, id: UserId, projection: &FieldMask) -> StoreResult<User> {
        let fields = resolve_fields(projection)?;
        let sql = format!("SELECT {} FROM users WHERE id = $1", column_list(&fields));
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        user_from_row(&row, &fields)
    }

    async fn find_all(&self, window: PageWindow, projection: &FieldMask) -> StoreResult<Vec<User>> {
        let fields = resolve_fields(projection)?;
        let sql = format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            column_list(&fields)
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(window.limit))
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| user_from_row(row, &fields)).collect()
    }

    async fn count(&self) -> StoreResult<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn update(&self, user: &User, whitelist: &FieldMask) -> StoreResult<u64> {
        let fields = resolve_writable(whitelist)?;
        if fields.is_empty() {
            return Ok(0);
        }
        let sql = update_statement(&fields);
        let mut query = sqlx::query(&sql).bind(user.id);
        for field in &fields {
            query = match field {
                Field::Name => query.bind(&user.name),
                Field::Email => query.bind(&user.email),
                Field::Id => return Err(StoreError::ReadOnlyField(Field::Id)),
            };
        }
        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    async fn delete(&self, id: UserId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_statement_numbers_parameters_after_the_id() {
        assert_eq!(
            update_statement(&[Field::Name, Field::Email]),
            "UPDATE users SET name = $2, email = $3 WHERE id = $1"
        );
        assert_eq!(
            update_statement(&[Field::Email]),
            "UPDATE users SET email = $2 WHERE id = $1"
        );
    }

    #[test]
    fn column_lists_follow_field_order() {
        assert_eq!(column_list(&Field::ALL), "id, name, email");
        assert_eq!(column_list(&[Field::Email, Field::Name]), "email, name");
    }
}
