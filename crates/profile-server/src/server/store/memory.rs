//! In-process [`UserStore`].
//!
//! Rows live in a `BTreeMap` behind a single `parking_lot::Mutex`, which gives
//! the same id ordering the Postgres adapter gets from `ORDER BY id`. Ids are
//! assigned from 1 and never reused, like a `BIGSERIAL` column.

use super::{StoreError, StoreResult, UserStore, project, resolve_fields, resolve_writable};
use crate::server::service::page::PageWindow;
use parking_lot::Mutex;
use profile_core::types::{Field, FieldMask, User, UserId};
use std::collections::BTreeMap;

#[derive(Debug)]
struct Rows {
    next_id: UserId,
    users: BTreeMap<UserId, User>,
}

#[derive(Debug)]
pub struct MemoryStore {
    rows: Mutex<Rows>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Rows {
                next_id: 1,
                users: BTreeMap::new(),
            }),
        }
    }

    /// Number of stored rows, without going through the async interface.
    pub fn len(&self) -> usize {
        self.rows.lock().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a full copy of the row with `id`, if any.
    pub fn get(&self, id: UserId) -> Option<User> {
        self.rows.lock().users.get(&id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for MemoryStore {
    async fn insert(&self, user: &User) -> StoreResult<UserId> {
        let mut rows = self.rows.lock();
        let id = rows.next_id;
        rows.next_id += 1;
        rows.users.insert(
            id,
            User {
                id,
                name: user.name.clone(),
                email: user.email.clone(),
            },
        );
        Ok(id)
    }

    async fn find_by_id(&self, id: UserId, projection: &FieldMask) -> StoreResult<User> {
        let fields = resolve_fields(projection)?;
        let rows = self.rows.lock();
        rows.users
            .get(&id)
            .map(|user| project(user, &fields))
            .ok_or(StoreError::NotFound)
    }

    async fn find_all(&self, window: PageWindow, projection: &FieldMask) -> StoreResult<Vec<User>> {
        let fields = resolve_fields(projection)?;
        let skip = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let rows = self.rows.lock();
        Ok(rows
            .users
            .values()
            .skip(skip)
            .take(window.limit as usize)
            .map(|user| project(user, &fields))
            .collect())
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.rows.lock().users.len() as i64)
    }

    async fn update(&self, user: &User, whitelist: &FieldMask) -> StoreResult<u64> {
        let fields = resolve_writable(whitelist)?;
        let mut rows = self.rows.lock();
        let Some(row) = rows.users.get_mut(&user.id) else {
            return Ok(0);
        };
        for field in fields {
            match field {
                Field::Name => row.name.clone_from(&user.name),
                Field::Email => row.email.clone_from(&user.email),
                Field::Id => return Err(StoreError::ReadOnlyField(Field::Id)),
            }
        }
        Ok(1)
    }

    async fn delete(&self, id: UserId) -> StoreResult<u64> {
        Ok(u64::from(self.rows.lock().users.remove(&id).is_some()))
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(limit: u32, offset: i64) -> PageWindow {
        PageWindow { limit, offset }
    }

    #[tokio::test]
    async fn assigns_increasing_ids_and_ignores_client_ids() {
        let store = MemoryStore::new();
        let mut user = User::new("a", "a@example.com");
        user.id = 42;

        assert_eq!(store.insert(&user).await.unwrap(), 1);
        assert_eq!(store.insert(&user).await.unwrap(), 2);
        assert!(store.get(42).is_none());
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let id = store.insert(&User::new("a", "a@example.com")).await.unwrap();
        assert_eq!(store.delete(id).await.unwrap(), 1);
        assert_eq!(store.delete(id).await.unwrap(), 0);
        assert_eq!(store.insert(&User::new("b", "b@example.com")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn windows_follow_id_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert(&User::new(format!("u{i}"), format!("u{i}@example.com")))
                .await
                .unwrap();
        }

        let page = store
            .find_all(window(2, 1), &FieldMask::new(["name"]))
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["u1", "u2"]);
        assert!(page.iter().all(|u| u.email.is_empty() && u.id == 0));

        assert!(store.find_all(window(10, 50), &FieldMask::default()).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn update_writes_only_whitelisted_columns() {
        let store = MemoryStore::new();
        let id = store.insert(&User::new("a", "a@example.com")).await.unwrap();

        let patch = User {
            id,
            name: "b".into(),
            email: "b@example.com".into(),
        };
        assert_eq!(store.update(&patch, &FieldMask::new(["email"])).await.unwrap(), 1);
        assert_eq!(store.get(id).unwrap(), User {
            id,
            name: "a".into(),
            email: "b@example.com".into(),
        });

        let missing = User { id: 99, ..patch };
        assert_eq!(store.update(&missing, &FieldMask::new(["name"])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_paths_fail() {
        let store = MemoryStore::new();
        let id = store.insert(&User::new("a", "a@example.com")).await.unwrap();
        assert!(matches!(
            store.find_by_id(id, &FieldMask::new(["age"])).await,
            Err(StoreError::UnknownField(_))
        ));
        assert!(matches!(
            store.find_by_id(id + 1, &FieldMask::default()).await,
            Err(StoreError::NotFound)
        ));
    }
}
