use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};

/// How imported questions are applied to an exam's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    Append,
    Replace,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Append => "append",
            ImportMode::Replace => "replace",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "append" => Ok(ImportMode::Append),
            "replace" => Ok(ImportMode::Replace),
            _ => Err(Error::BadRequest(
                "mode must be either append or replace".to_string(),
            )),
        }
    }
}

/// What to do with rows the duplicate analysis flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHandling {
    Skip,
    Allow,
}

impl DuplicateHandling {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateHandling::Skip => "skip",
            DuplicateHandling::Allow => "allow",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "skip" => Ok(DuplicateHandling::Skip),
            "allow" => Ok(DuplicateHandling::Allow),
            _ => Err(Error::BadRequest(
                "duplicateHandling must be either skip or allow".to_string(),
            )),
        }
    }
}

/// Immutable audit record written once per successful file-based import.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadHistory {
    pub id: Uuid,
    pub uploader_id: Uuid,
    pub exam_id: Uuid,
    pub file_name: String,
    pub mode: String,
    pub duplicate_handling: String,
    pub total_rows: i32,
    pub imported_count: i32,
    pub skipped_duplicate_count: i32,
    pub duplicate_within_file_count: i32,
    pub duplicate_existing_count: i32,
    pub preview_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_mode_defaults_to_append() {
        assert_eq!(ImportMode::parse("").unwrap(), ImportMode::Append);
        assert_eq!(ImportMode::parse(" REPLACE ").unwrap(), ImportMode::Replace);
        assert!(ImportMode::parse("merge").is_err());
    }

    #[test]
    fn duplicate_handling_defaults_to_skip() {
        assert_eq!(
            DuplicateHandling::parse("").unwrap(),
            DuplicateHandling::Skip
        );
        assert_eq!(
            DuplicateHandling::parse("Allow").unwrap(),
            DuplicateHandling::Allow
        );
        assert!(DuplicateHandling::parse("keep").is_err());
    }
}
