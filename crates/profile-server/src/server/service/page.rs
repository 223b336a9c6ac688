//! Pagination policy for List.
//!
//! Normalization is a pure function of the request: a limit of `0` selects
//! [`DEFAULT_LIMIT`], anything above [`MAX_LIMIT`] is clamped, and the offset
//! passes through untouched unless it is negative.

use profile_core::{
    Error, Result,
    types::{DEFAULT_LIMIT, MAX_LIMIT, User},
};

/// The effective `(limit, offset)` pair a List call is executed with.
///
/// `limit` is always within `1..=MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: u32,
    pub offset: i64,
}

impl PageWindow {
    pub fn normalize(requested_limit: u32, requested_offset: i64) -> Result<Self> {
        if requested_offset < 0 {
            return Err(Error::invalid_argument(format!(
                "offset must not be negative, got {requested_offset}"
            )));
        }

        let limit = match requested_limit {
            0 => DEFAULT_LIMIT,
            n => n.min(MAX_LIMIT),
        };

        Ok(Self {
            limit,
            offset: requested_offset,
        })
    }
}

/// One window of the collection plus the size of the whole collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub users: Vec<User>,
    pub window: PageWindow,
    pub total: i64,
}
