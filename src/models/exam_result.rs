use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

pub const RESULT_STATUS_IN_PROGRESS: &str = "in_progress";
pub const RESULT_STATUS_SUBMITTED: &str = "submitted";

/// One user's attempt at one exam. Created `in_progress` by start, moved to
/// `submitted` exactly once by grading; never reopened.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamResult {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: JsonValue,
    pub total_questions: i32,
    pub attempted_questions: i32,
    pub correct_answers: i32,
    pub score: rust_decimal::Decimal,
    pub percentage: rust_decimal::Decimal,
    pub time_taken_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExamResult {
    pub fn parsed_answers(&self) -> Vec<AnswerRecord> {
        serde_json::from_value(self.answers.clone()).unwrap_or_default()
    }
}

/// A graded answer as stored in the result's JSONB `answers` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: Uuid,
    pub selected_option_index: i32,
    pub is_correct: bool,
}
