//! Storage adapters for the `users` table.
//!
//! The resource service only ever talks to a [`UserStore`]. Two adapters
//! implement it:
//!
//! - [`postgres::PgStore`] - the production adapter, backed by a pooled
//!   `sqlx` connection.
//! - [`memory::MemoryStore`] - a process-local map with identical semantics,
//!   used by tests and by `--store memory`.
//!
//! Both resolve field-mask paths through [`resolve_fields`], so an unknown
//! path fails the same way regardless of the backend.

pub mod memory;
pub mod postgres;

use crate::server::service::page::PageWindow;
use core::future::Future;
use profile_core::types::{Field, FieldMask, User, UserId};

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row matched the addressed id.
    #[error("row not found")]
    NotFound,

    /// A mask path does not name a column of `users`.
    #[error("unknown field path `{0}`")]
    UnknownField(String),

    /// The column cannot be written through an update whitelist.
    #[error("field `{0}` is read-only")]
    ReadOnlyField(Field),

    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

/// Narrow repository over the single `users` table.
///
/// Implementations are shared by every in-flight request and must be safe for
/// concurrent use without external locking.
pub trait UserStore: Send + Sync + 'static {
    /// Inserts `user`, ignoring its `id`, and returns the assigned id.
    fn insert(&self, user: &User) -> impl Future<Output = StoreResult<UserId>> + Send;

    /// Fetches one row. An empty `projection` selects every column; columns
    /// outside a non-empty projection are left at their default.
    fn find_by_id(
        &self,
        id: UserId,
        projection: &FieldMask,
    ) -> impl Future<Output = StoreResult<User>> + Send;

    /// Fetches one window of the collection, ordered by id.
    fn find_all(
        &self,
        window: PageWindow,
        projection: &FieldMask,
    ) -> impl Future<Output = StoreResult<Vec<User>>> + Send;

    /// Counts every row of the collection.
    fn count(&self) -> impl Future<Output = StoreResult<i64>> + Send;

    /// Writes the whitelisted columns of `user` to the row with `user.id` and
    /// returns the number of affected rows.
    fn update(
        &self,
        user: &User,
        whitelist: &FieldMask,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Deletes the row with `id` and returns the number of affected rows.
    fn delete(&self, id: UserId) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Releases the underlying resources. Called once, after every transport
    /// has drained.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Maps mask paths onto columns. An empty mask selects every column.
pub fn resolve_fields(mask: &FieldMask) -> StoreResult<Vec<Field>> {
    if mask.is_empty() {
        return Ok(Field::ALL.to_vec());
    }
    mask.paths()
        .iter()
        .map(|path| Field::from_path(path).ok_or_else(|| StoreError::UnknownField(path.clone())))
        .collect()
}

/// Like [`resolve_fields`], but for update whitelists: `id` is rejected and an
/// empty mask selects nothing.
pub fn resolve_writable(mask: &FieldMask) -> StoreResult<Vec<Field>> {
    let mut fields = Vec::with_capacity(mask.len());
    for path in mask.paths() {
        match Field::from_path(path) {
            Some(Field::Id) => return Err(StoreError::ReadOnlyField(Field::Id)),
            Some(field) => fields.push(field),
            None => return Err(StoreError::UnknownField(path.clone())),
        }
    }
    Ok(fields)
}

/// Copies the listed columns of `source` into a fresh [`User`].
pub fn project(source: &User, fields: &[Field]) -> User {
    let mut user = User::default();
    for field in fields {
        match field {
            Field::Id => user.id = source.id,
            Field::Name => user.name.clone_from(&source.name),
            Field::Email => user.email.clone_from(&source.email),
        }
    }
    user
}
