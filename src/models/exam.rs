use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::question::Question;

/// Fixed preparation tracks an exam can belong to.
pub const EXAM_CATEGORIES: [&str; 5] = ["BCS", "Primary", "NTRCA", "Bank", "Others"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub total_marks: i32,
    pub duration_minutes: i32,
    pub exam_date: DateTime<Utc>,
    pub is_featured: bool,
    pub enrolled_students: i32,
    pub questions: JsonValue,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exam {
    pub fn parsed_questions(&self) -> Vec<Question> {
        serde_json::from_value(self.questions.clone()).unwrap_or_default()
    }

    pub fn question_count(&self) -> usize {
        self.questions.as_array().map(|a| a.len()).unwrap_or(0)
    }
}

/// Visibility scope for soft-deleted records. Every exam/user query takes one
/// of these and binds it as an optional flag, so the filtering stays explicit
/// instead of hiding behind query hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Deleted,
    All,
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Active
    }
}

impl RecordStatus {
    /// `None` means no filter (all records); `Some(flag)` binds against the
    /// `is_deleted` column.
    pub fn as_deleted_flag(&self) -> Option<bool> {
        match self {
            RecordStatus::Active => Some(false),
            RecordStatus::Deleted => Some(true),
            RecordStatus::All => None,
        }
    }

    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "active" => Ok(RecordStatus::Active),
            "deleted" => Ok(RecordStatus::Deleted),
            "all" => Ok(RecordStatus::All),
            _ => Err(crate::error::Error::BadRequest(
                "recordStatus must be one of: active, deleted, all".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_status_parses_known_values() {
        assert_eq!(RecordStatus::parse("active").unwrap(), RecordStatus::Active);
        assert_eq!(RecordStatus::parse("").unwrap(), RecordStatus::Active);
        assert_eq!(
            RecordStatus::parse(" Deleted ").unwrap(),
            RecordStatus::Deleted
        );
        assert_eq!(RecordStatus::parse("ALL").unwrap(), RecordStatus::All);
        assert!(RecordStatus::parse("archived").is_err());
    }

    #[test]
    fn record_status_maps_to_deleted_flag() {
        assert_eq!(RecordStatus::Active.as_deleted_flag(), Some(false));
        assert_eq!(RecordStatus::Deleted.as_deleted_flag(), Some(true));
        assert_eq!(RecordStatus::All.as_deleted_flag(), None);
    }
}
