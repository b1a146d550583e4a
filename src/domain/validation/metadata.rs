use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AppError;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_TAG_COUNT: usize = 10;
pub const MAX_TAG_LENGTH: usize = 50;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9 _-]+$").expect("tag pattern"));
static OWNER_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("owner id pattern"));

/// Field checks for client-supplied metadata. Each is independent and
/// order-free; the upload path runs all of them and surfaces the first
/// failure rather than an aggregate report.
pub fn validate_title(title: Option<&str>) -> Result<(), AppError> {
    let Some(title) = title else { return Ok(()) };
    if title.is_empty() {
        return Ok(());
    }
    if title.trim().is_empty() {
        return Err(AppError::Validation("Title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::Validation(format!(
            "Title must be less than {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), AppError> {
    let Some(description) = description else { return Ok(()) };
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::Validation(format!(
            "Description must be less than {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_tags(tags: Option<&[String]>) -> Result<(), AppError> {
    let Some(tags) = tags else { return Ok(()) };

    if tags.len() > MAX_TAG_COUNT {
        return Err(AppError::Validation(format!(
            "Maximum {MAX_TAG_COUNT} tags allowed"
        )));
    }

    for tag in tags {
        if tag.trim().is_empty() {
            return Err(AppError::Validation("Tags cannot be empty".to_string()));
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(AppError::Validation(format!(
                "Each tag must be less than {MAX_TAG_LENGTH} characters"
            )));
        }
        if !TAG_PATTERN.is_match(tag) {
            return Err(AppError::Validation(
                "Tags can only contain letters, numbers, spaces, hyphens, and underscores"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

pub fn validate_owner_id(owner_id: &str) -> Result<(), AppError> {
    if owner_id.trim().is_empty() {
        return Err(AppError::Validation("Owner ID is required".to_string()));
    }
    if !OWNER_ID_PATTERN.is_match(owner_id) {
        return Err(AppError::Validation(
            "Owner ID can only contain letters, numbers, hyphens, and underscores".to_string(),
        ));
    }
    Ok(())
}
