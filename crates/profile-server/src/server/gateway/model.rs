//! JSON request and response bodies of the gateway.
//!
//! Absent fields decode to their defaults and every field is emitted on the
//! way out, so an empty list is `[]` rather than missing.

use crate::server::service::page::Page;
use profile_core::types::{FieldMask, User, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserBody {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<UserBody> for User {
    fn from(body: UserBody) -> Self {
        Self {
            id: body.id,
            name: body.name,
            email: body.email,
        }
    }
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

fn split_paths(raw: &str) -> FieldMask {
    FieldMask::new(
        raw.split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty()),
    )
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub user: Option<UserBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadQuery {
    /// Comma-separated field paths.
    pub fields: Option<String>,
}

impl ReadQuery {
    pub fn field_mask(&self) -> Option<FieldMask> {
        self.fields.as_deref().map(split_paths)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<i64>,
    /// Comma-separated field paths.
    pub fields: Option<String>,
}

impl ListQuery {
    pub fn field_mask(&self) -> Option<FieldMask> {
        self.fields.as_deref().map(split_paths)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub user: Option<UserBody>,
    #[serde(default, alias = "fieldMask", alias = "field_mask")]
    pub fields: Vec<String>,
}

impl UpdateBody {
    pub fn field_mask(&self) -> FieldMask {
        FieldMask::new(self.fields.iter().map(String::as_str))
    }
}

#[derive(Debug, Serialize)]
pub struct CreateReply {
    pub id: UserId,
}

#[derive(Debug, Serialize)]
pub struct ReadReply {
    pub user: UserBody,
}

#[derive(Debug, Serialize)]
pub struct ListReply {
    pub users: Vec<UserBody>,
    pub limit: u32,
    pub offset: i64,
    pub total: i64,
}

impl From<Page> for ListReply {
    fn from(page: Page) -> Self {
        Self {
            users: page.users.into_iter().map(Into::into).collect(),
            limit: page.window.limit,
            offset: page.window.offset,
            total: page.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_paths_are_split_and_trimmed() {
        let query = ReadQuery {
            fields: Some("name, email,,".into()),
        };
        assert_eq!(query.field_mask().unwrap().paths(), ["name", "email"]);
        assert!(ReadQuery::default().field_mask().is_none());
    }

    #[test]
    fn update_body_accepts_mask_aliases() {
        let body: UpdateBody =
            serde_json::from_str(r#"{"user":{"name":"x"},"fieldMask":["name"]}"#).unwrap();
        assert_eq!(body.field_mask().paths(), ["name"]);
        assert_eq!(body.user.unwrap().email, "");

        let body: UpdateBody = serde_json::from_str(r#"{"user":{}}"#).unwrap();
        assert!(body.field_mask().is_empty());
    }

    #[test]
    fn empty_reply_serializes_as_object() {
        assert_eq!(serde_json::to_string(&Empty {}).unwrap(), "{}");
    }
}
