//! Field mask resolution.
//!
//! Paths are not checked against the schema here; an unknown path is left for
//! the storage adapter to reject, which surfaces as an internal error.

use profile_core::{
    Error, Result,
    types::{Field, FieldMask},
};

/// Resolves the whitelist of an Update. The mask must name at least one path
/// and must not name `id`.
pub fn update_whitelist(mask: Option<FieldMask>) -> Result<FieldMask> {
    let mask = mask.unwrap_or_default();
    if mask.is_empty() {
        return Err(Error::invalid_argument("field mask must not be empty"));
    }
    if mask.contains(Field::Id) {
        return Err(Error::invalid_argument("field `id` is immutable"));
    }
    Ok(mask)
}

/// Resolves a read projection. An absent or empty mask selects every field.
pub fn projection(mask: Option<FieldMask>) -> FieldMask {
    mask.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_requires_paths() {
        assert!(matches!(
            update_whitelist(None),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            update_whitelist(Some(FieldMask::default())),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn update_rejects_id() {
        assert!(update_whitelist(Some(FieldMask::new(["name", "id"]))).is_err());
    }

    #[test]
    fn paths_pass_through_unchecked() {
        let mask = FieldMask::new(["name", "nickname"]);
        assert_eq!(update_whitelist(Some(mask.clone())).unwrap(), mask);
        assert_eq!(projection(Some(mask.clone())), mask);
        assert!(projection(None).is_empty());
    }
}
