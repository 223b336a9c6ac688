//! # Profile Domain Types
//!
//! The single managed resource ([`User`]), the field-path vocabulary used by
//! partial reads and updates ([`Field`], [`FieldMask`]) and the pagination
//! bounds every List call is normalized against.
//!
//! Conversions to and from the generated protobuf messages live here so both
//! transports translate wire shapes the same way.

use crate::proto;
use core::fmt;

/// Server-assigned primary key of a [`User`].
pub type UserId = i64;

/// Window size used when a List request asks for a limit of `0`.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest window a single List call may return.
pub const MAX_LIMIT: u32 = 1000;

/// The managed resource.
///
/// `id` is `0` until the store assigns one on insert and never changes
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A persisted attribute of [`User`] that a mask may address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Email,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Id, Field::Name, Field::Email];

    /// Column name, which is also the field-mask path.
    pub const fn as_str(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Email => "email",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == path)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of field paths, as supplied by the client.
///
/// Paths are kept verbatim: checking them against the schema is left to the
/// storage adapter. Duplicates are dropped, first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    paths: Vec<String>,
}

impl FieldMask {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mask = Self::default();
        for path in paths {
            let path = path.into();
            if !mask.paths.contains(&path) {
                mask.paths.push(path);
            }
        }
        mask
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn contains(&self, field: Field) -> bool {
        self.paths.iter().any(|p| p == field.as_str())
    }
}

impl From<proto::User> for User {
    fn from(user: proto::User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

impl From<User> for proto::User {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

impl From<prost_types::FieldMask> for FieldMask {
    fn from(mask: prost_types::FieldMask) -> Self {
        Self::new(mask.paths)
    }
}

impl From<FieldMask> for prost_types::FieldMask {
    fn from(mask: FieldMask) -> Self {
        Self { paths: mask.paths }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_drops_duplicates_and_keeps_order() {
        let mask = FieldMask::new(["email", "name", "email"]);
        assert_eq!(mask.paths(), ["email", "name"]);
        assert!(mask.contains(Field::Name));
        assert!(!mask.contains(Field::Id));
    }

    #[test]
    fn field_paths_round_trip_through_names() {
        for field in Field::ALL {
            assert_eq!(Field::from_path(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_path("password"), None);
    }
}
