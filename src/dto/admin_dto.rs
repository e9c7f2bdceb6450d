use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::models::upload_history::{DuplicateHandling, ImportMode};
use crate::services::duplicate_service::DuplicateRow;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamPayload {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub category: String,
    pub total_marks: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub exam_date: DateTime<Utc>,
    pub is_featured: Option<bool>,
    pub questions: Option<Vec<JsonValue>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamPayload {
    pub title: Option<String>,
    pub category: Option<String>,
    pub total_marks: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub exam_date: Option<DateTime<Utc>>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportPayload {
    pub exam_id: Uuid,
    pub mode: Option<String>,
    #[validate(length(min = 1, message = "questions must be a non-empty array"))]
    pub questions: Vec<JsonValue>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CommitUploadPayload {
    pub preview_id: String,
    pub duplicate_handling: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
    pub exam_targets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamListQuery {
    pub category: Option<String>,
    pub record_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub record_status: Option<String>,
    pub role: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub exam_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLimits {
    pub max_file_size_bytes: usize,
    pub max_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewCounts {
    pub total_rows: usize,
    pub importable_count: usize,
    pub duplicate_rows: usize,
    pub duplicate_within_file_count: usize,
    pub duplicate_existing_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleQuestion {
    pub row_number: usize,
    pub question_text: String,
    pub option_count: usize,
    pub correct_option_index: i32,
}

/// Payload returned by the preview phase for the admin to review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub preview_id: String,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub file_name: String,
    pub mode: ImportMode,
    pub expires_at: DateTime<Utc>,
    pub limits: PreviewLimits,
    pub counts: PreviewCounts,
    pub duplicate_rows: Vec<DuplicateRow>,
    pub sample_questions: Vec<SampleQuestion>,
}

/// Outcome of a committed or direct file import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub file_name: String,
    pub mode: ImportMode,
    pub duplicate_handling: DuplicateHandling,
    pub imported_count: usize,
    pub total_rows: usize,
    pub skipped_duplicate_count: usize,
    pub duplicate_within_file_count: usize,
    pub duplicate_existing_count: usize,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHistoryEntry {
    pub id: Uuid,
    pub file_name: String,
    pub mode: String,
    pub duplicate_handling: String,
    pub total_rows: i32,
    pub imported_count: i32,
    pub skipped_duplicate_count: i32,
    pub duplicate_within_file_count: i32,
    pub duplicate_existing_count: i32,
    pub uploaded_at: DateTime<Utc>,
    pub uploader: Option<UploaderRef>,
    pub exam: Option<ExamRef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedHistory {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub history: Vec<UploadHistoryEntry>,
}
