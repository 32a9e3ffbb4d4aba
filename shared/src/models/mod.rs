//! Domain models
//!
//! Entities mirror the database rows (`FromRow` behind the `db` feature);
//! `*Create` / `*Update` structs are the validated request payloads.

pub mod dining_table;
pub mod menu;
pub mod order;
pub mod restaurant;
pub mod user;

pub use dining_table::*;
pub use menu::*;
pub use order::*;
pub use restaurant::*;
pub use user::*;

use validator::ValidationError;

/// Rejects values that are empty after trimming
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Lowercase ASCII letters, digits and single inner dashes
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let well_formed = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if well_formed {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug");
        err.message = Some("must contain lowercase letters, digits and dashes".into());
        Err(err)
    }
}
