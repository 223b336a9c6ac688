//! The resource service: Create, Read, List, Update and Delete over a
//! [`UserStore`].
//!
//! Every storage outcome is classified into the [`Error`] taxonomy; nothing is
//! retried or swallowed at this layer.
//!
//! Update and Delete fetch the row before mutating it. The fetch decides
//! `NotFound` deterministically and gives Update the base state the masked
//! fields are merged onto. The mutation must then affect exactly one row:
//! zero means the row vanished in between (reported as `NotFound`), more than
//! one is a broken key invariant (reported as an internal error).

use crate::server::{
    service::page::{Page, PageWindow},
    store::{StoreError, UserStore},
};
use profile_core::{
    Error, Result,
    types::{Field, FieldMask, User, UserId},
};
use std::sync::Arc;

pub struct ProfileService<S> {
    store: Arc<S>,
}

impl<S> Clone for ProfileService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn storage(op: &'static str) -> impl FnOnce(StoreError) -> Error {
    move |err| Error::Storage {
        op,
        cause: err.to_string(),
    }
}

fn lookup(op: &'static str, id: UserId) -> impl FnOnce(StoreError) -> Error {
    move |err| match err {
        StoreError::NotFound => Error::NotFound { id },
        other => storage(op)(other),
    }
}

fn expect_single_row(op: &'static str, id: UserId, rows: u64) -> Result<()> {
    match rows {
        1 => Ok(()),
        0 => Err(Error::NotFound { id }),
        rows => Err(Error::RowCount { op, rows }),
    }
}

impl<S: UserStore> ProfileService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Stores a new user and returns the id assigned by the store. Any id on
    /// `user` is ignored.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, user: User) -> Result<UserId> {
        let user = User { id: 0, ..user };
        let id = self.store.insert(&user).await.map_err(storage("insert"))?;
        tracing::debug!(id, "User created");
        Ok(id)
    }

    #[tracing::instrument(skip(self, projection))]
    pub async fn read(&self, id: UserId, projection: FieldMask) -> Result<User> {
        self.store
            .find_by_id(id, &projection)
            .await
            .map_err(lookup("find", id))
    }

    /// Returns one normalized window plus the total size of the collection.
    ///
    /// The window fetch and the count are two independent queries; a write
    /// landing between them can make `total` disagree with the window by that
    /// write.
    #[tracing::instrument(skip(self, projection))]
    pub async fn list(&self, limit: u32, offset: i64, projection: FieldMask) -> Result<Page> {
        let window = PageWindow::normalize(limit, offset)?;

        let (users, total) = tokio::join!(
            self.store.find_all(window, &projection),
            self.store.count(),
        );

        Ok(Page {
            users: users.map_err(storage("find_all"))?,
            window,
            total: total.map_err(storage("count"))?,
        })
    }

    /// Applies the fields named by `whitelist` from `patch` to the user with
    /// `id`. The whitelist must already be resolved (non-empty, no `id`).
    #[tracing::instrument(skip(self, patch, whitelist), fields(paths = ?whitelist.paths()))]
    pub async fn update(&self, id: UserId, patch: User, whitelist: FieldMask) -> Result<()> {
        if whitelist.is_empty() {
            return Err(Error::invalid_argument("field mask must not be empty"));
        }

        let mut current = self
            .store
            .find_by_id(id, &FieldMask::default())
            .await
            .map_err(lookup("find", id))?;

        if whitelist.contains(Field::Name) {
            current.name = patch.name;
        }
        if whitelist.contains(Field::Email) {
            current.email = patch.email;
        }

        let rows = self
            .store
            .update(&current, &whitelist)
            .await
            .map_err(storage("update"))?;
        expect_single_row("update", id, rows).inspect_err(|err| {
            tracing::warn!(id, rows, "Update affected an unexpected number of rows: {err}");
        })
    }

    /// Full replacement is deliberately unsupported.
    pub async fn replace(&self, _id: UserId, _user: User) -> Result<()> {
        Err(Error::Unimplemented { method: "Replace" })
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> Result<()> {
        self.store
            .find_by_id(id, &FieldMask::new([Field::Id.as_str()]))
            .await
            .map_err(lookup("find", id))?;

        let rows = self.store.delete(id).await.map_err(storage("delete"))?;
        expect_single_row("delete", id, rows).inspect_err(|err| {
            tracing::warn!(id, rows, "Delete affected an unexpected number of rows: {err}");
        })
    }
}
