use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::dto::admin_dto::{
    ExamRef, ImportOutcome, PaginatedHistory, PreviewCounts, PreviewLimits, PreviewResponse,
    SampleQuestion, UploadHistoryEntry, UploaderRef,
};
use crate::error::{Error, Result};
use crate::models::exam::Exam;
use crate::models::question::{NewQuestion, Question};
use crate::models::upload_history::{DuplicateHandling, ImportMode};
use crate::services::duplicate_service::{self, DuplicateSummary};
use crate::services::preview_store::{PreviewRequest, PreviewStore, UploadPreview};
use crate::services::question_parser;

pub const MAX_UPLOAD_FILE_SIZE_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_UPLOAD_ROW_COUNT: usize = 1000;
pub const PREVIEW_SAMPLE_SIZE: usize = 5;
pub const DUPLICATE_ROWS_RESPONSE_LIMIT: usize = 50;

/// An uploaded question file as it came off the multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Question-bank import pipeline: parse, normalize, analyze duplicates,
/// preview, commit. History rows are written once per applied import.
#[derive(Clone)]
pub struct ImportService {
    pool: PgPool,
    preview_store: Arc<dyn PreviewStore>,
}

struct UploadContext {
    exam: Exam,
    questions: Vec<NewQuestion>,
    duplicates: DuplicateSummary,
}

impl ImportService {
    pub fn new(pool: PgPool, preview_store: Arc<dyn PreviewStore>) -> Self {
        Self {
            pool,
            preview_store,
        }
    }

    /// Parses the file and stages the batch for review. Nothing touches the
    /// exam until the preview is committed.
    pub async fn preview_upload(
        &self,
        admin_id: Uuid,
        exam_id: Uuid,
        mode: ImportMode,
        file: &UploadedFile,
    ) -> Result<PreviewResponse> {
        let context = self.load_context(exam_id, mode, file).await?;

        let preview = self.preview_store.create(PreviewRequest {
            admin_id,
            exam_id,
            exam_title: context.exam.title.clone(),
            file_name: file.file_name.clone(),
            mode,
            questions: context.questions,
            duplicates: context.duplicates,
        });

        Ok(build_preview_response(&preview))
    }

    /// Applies a staged preview. The preview is consumed whether or not the
    /// admin changed the duplicate handling, so a second commit of the same
    /// id fails as not-found.
    pub async fn commit_upload(
        &self,
        admin_id: Uuid,
        preview_id: &str,
        duplicate_handling: DuplicateHandling,
    ) -> Result<ImportOutcome> {
        let preview = self.preview_store.get(preview_id, admin_id)?;

        let selected = select_import_questions(
            &preview.questions,
            &preview.duplicates,
            duplicate_handling,
        );
        let total_rows = preview.questions.len();
        let imported = self
            .apply_questions(preview.exam_id, preview.mode, &selected)
            .await?;

        self.record_history(
            admin_id,
            preview.exam_id,
            &preview.file_name,
            preview.mode,
            duplicate_handling,
            total_rows,
            selected.len(),
            &preview.duplicates,
            Some(&preview.preview_id),
        )
        .await?;
        self.preview_store.delete(&preview.preview_id);

        info!(
            exam_id = %preview.exam_id,
            imported = selected.len(),
            total_rows,
            mode = preview.mode.as_str(),
            "preview import committed"
        );

        Ok(ImportOutcome {
            file_name: preview.file_name,
            mode: preview.mode,
            duplicate_handling,
            imported_count: selected.len(),
            total_rows,
            skipped_duplicate_count: total_rows.saturating_sub(selected.len()),
            duplicate_within_file_count: preview.duplicates.duplicate_within_file_count,
            duplicate_existing_count: preview.duplicates.duplicate_existing_count,
            total_questions: imported.question_count(),
        })
    }

    /// Single-shot import without the preview step. Same pipeline, applied
    /// immediately with the given duplicate handling.
    pub async fn direct_upload(
        &self,
        admin_id: Uuid,
        exam_id: Uuid,
        mode: ImportMode,
        duplicate_handling: DuplicateHandling,
        file: &UploadedFile,
    ) -> Result<ImportOutcome> {
        let context = self.load_context(exam_id, mode, file).await?;

        let selected =
            select_import_questions(&context.questions, &context.duplicates, duplicate_handling);
        let total_rows = context.questions.len();
        let imported = self.apply_questions(exam_id, mode, &selected).await?;

        self.record_history(
            admin_id,
            exam_id,
            &file.file_name,
            mode,
            duplicate_handling,
            total_rows,
            selected.len(),
            &context.duplicates,
            None,
        )
        .await?;

        info!(
            exam_id = %exam_id,
            imported = selected.len(),
            total_rows,
            mode = mode.as_str(),
            "question file imported"
        );

        Ok(ImportOutcome {
            file_name: file.file_name.clone(),
            mode,
            duplicate_handling,
            imported_count: selected.len(),
            total_rows,
            skipped_duplicate_count: total_rows.saturating_sub(selected.len()),
            duplicate_within_file_count: context.duplicates.duplicate_within_file_count,
            duplicate_existing_count: context.duplicates.duplicate_existing_count,
            total_questions: imported.question_count(),
        })
    }

    /// JSON-body import: already-structured rows, normalized and applied
    /// with no duplicate analysis and no history row.
    pub async fn bulk_import(
        &self,
        exam_id: Uuid,
        mode: ImportMode,
        raw_questions: &[JsonValue],
    ) -> Result<usize> {
        let questions = question_parser::normalize_questions(raw_questions)?;
        enforce_row_limit(questions.len())?;

        let imported = self.apply_questions(exam_id, mode, &questions).await?;
        Ok(imported.question_count())
    }

    /// Paginated upload history, newest first, with uploader and exam refs
    /// joined in. Archived exams still show up here.
    pub async fn list_history(
        &self,
        page: i64,
        limit: i64,
        exam_id: Option<Uuid>,
    ) -> Result<PaginatedHistory> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM upload_history WHERE ($1::uuid IS NULL OR exam_id = $1)",
        )
        .bind(exam_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, HistoryJoinRow>(
            r#"
            SELECT h.id, h.file_name, h.mode, h.duplicate_handling,
                   h.total_rows, h.imported_count, h.skipped_duplicate_count,
                   h.duplicate_within_file_count, h.duplicate_existing_count,
                   h.created_at,
                   u.id AS uploader_id, u.name AS uploader_name, u.email AS uploader_email,
                   e.id AS history_exam_id, e.title AS exam_title
            FROM upload_history h
            LEFT JOIN users u ON u.id = h.uploader_id
            LEFT JOIN exams e ON e.id = h.exam_id
            WHERE ($1::uuid IS NULL OR h.exam_id = $1)
            ORDER BY h.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(exam_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let history = rows.into_iter().map(UploadHistoryEntry::from).collect();
        Ok(PaginatedHistory {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
            history,
        })
    }

    /// Shared front half of every file-based import: size check, parse,
    /// normalize, row limit, exam lookup, duplicate analysis.
    async fn load_context(
        &self,
        exam_id: Uuid,
        mode: ImportMode,
        file: &UploadedFile,
    ) -> Result<UploadContext> {
        if file.bytes.len() > MAX_UPLOAD_FILE_SIZE_BYTES {
            return Err(Error::LimitExceeded(
                "File size exceeds limit. Maximum allowed is 2MB".to_string(),
            ));
        }

        let raw = question_parser::parse_question_file(
            &file.file_name,
            file.content_type.as_deref().unwrap_or_default(),
            &file.bytes,
        )?;
        let questions = question_parser::normalize_questions(&raw)?;
        enforce_row_limit(questions.len())?;

        let exam = self.fetch_active_exam(exam_id).await?;
        let existing = exam.parsed_questions();
        let duplicates = duplicate_service::analyze_duplicates(&questions, &existing, mode);

        Ok(UploadContext {
            exam,
            questions,
            duplicates,
        })
    }

    /// Applies the batch to the exam's JSONB question list in one statement,
    /// so concurrent imports serialize at the row. Re-checks the exam still
    /// exists and is active; a commit can land after the exam was archived.
    async fn apply_questions(
        &self,
        exam_id: Uuid,
        mode: ImportMode,
        selected: &[NewQuestion],
    ) -> Result<Exam> {
        let questions: Vec<Question> = selected
            .iter()
            .cloned()
            .map(NewQuestion::into_question)
            .collect();
        let questions_json = serde_json::to_value(&questions)?;

        let query = match mode {
            ImportMode::Replace => {
                r#"
                UPDATE exams
                SET questions = $2, updated_at = NOW()
                WHERE id = $1 AND is_deleted = FALSE
                RETURNING *
                "#
            }
            ImportMode::Append => {
                r#"
                UPDATE exams
                SET questions = questions || $2::jsonb, updated_at = NOW()
                WHERE id = $1 AND is_deleted = FALSE
                RETURNING *
                "#
            }
        };

        sqlx::query_as::<_, Exam>(query)
            .bind(exam_id)
            .bind(&questions_json)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_history(
        &self,
        uploader_id: Uuid,
        exam_id: Uuid,
        file_name: &str,
        mode: ImportMode,
        duplicate_handling: DuplicateHandling,
        total_rows: usize,
        imported_count: usize,
        duplicates: &DuplicateSummary,
        preview_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO upload_history
                (uploader_id, exam_id, file_name, mode, duplicate_handling,
                 total_rows, imported_count, skipped_duplicate_count,
                 duplicate_within_file_count, duplicate_existing_count, preview_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(uploader_id)
        .bind(exam_id)
        .bind(file_name)
        .bind(mode.as_str())
        .bind(duplicate_handling.as_str())
        .bind(total_rows as i32)
        .bind(imported_count as i32)
        .bind(total_rows.saturating_sub(imported_count) as i32)
        .bind(duplicates.duplicate_within_file_count as i32)
        .bind(duplicates.duplicate_existing_count as i32)
        .bind(preview_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_active_exam(&self, exam_id: Uuid) -> Result<Exam> {
        sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1 AND is_deleted = FALSE")
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }
}

pub fn enforce_row_limit(row_count: usize) -> Result<()> {
    if row_count > MAX_UPLOAD_ROW_COUNT {
        return Err(Error::LimitExceeded(format!(
            "Upload row limit exceeded. Maximum {MAX_UPLOAD_ROW_COUNT} rows are allowed per import"
        )));
    }
    Ok(())
}

/// Filters the staged batch per the chosen duplicate handling. `skip` drops
/// every flagged row; `allow` imports the whole batch.
pub fn select_import_questions(
    questions: &[NewQuestion],
    duplicates: &DuplicateSummary,
    handling: DuplicateHandling,
) -> Vec<NewQuestion> {
    match handling {
        DuplicateHandling::Allow => questions.to_vec(),
        DuplicateHandling::Skip => questions
            .iter()
            .enumerate()
            .filter(|(i, _)| !duplicates.duplicate_indexes.contains(i))
            .map(|(_, q)| q.clone())
            .collect(),
    }
}

fn build_preview_response(preview: &UploadPreview) -> PreviewResponse {
    let total_rows = preview.questions.len();
    let duplicate_row_count = preview.duplicates.duplicate_rows.len();
    let importable_count = total_rows - preview.duplicates.duplicate_indexes.len();

    let duplicate_rows = preview
        .duplicates
        .duplicate_rows
        .iter()
        .take(DUPLICATE_ROWS_RESPONSE_LIMIT)
        .cloned()
        .collect();

    let sample_questions = preview
        .questions
        .iter()
        .take(PREVIEW_SAMPLE_SIZE)
        .enumerate()
        .map(|(i, q)| SampleQuestion {
            row_number: i + 1,
            question_text: q.question_text.clone(),
            option_count: q.options.len(),
            correct_option_index: q.correct_option_index,
        })
        .collect();

    PreviewResponse {
        preview_id: preview.preview_id.clone(),
        exam_id: preview.exam_id,
        exam_title: preview.exam_title.clone(),
        file_name: preview.file_name.clone(),
        mode: preview.mode,
        expires_at: preview.expires_at,
        limits: PreviewLimits {
            max_file_size_bytes: MAX_UPLOAD_FILE_SIZE_BYTES,
            max_rows: MAX_UPLOAD_ROW_COUNT,
        },
        counts: PreviewCounts {
            total_rows,
            importable_count,
            duplicate_rows: duplicate_row_count,
            duplicate_within_file_count: preview.duplicates.duplicate_within_file_count,
            duplicate_existing_count: preview.duplicates.duplicate_existing_count,
        },
        duplicate_rows,
        sample_questions,
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryJoinRow {
    id: Uuid,
    file_name: String,
    mode: String,
    duplicate_handling: String,
    total_rows: i32,
    imported_count: i32,
    skipped_duplicate_count: i32,
    duplicate_within_file_count: i32,
    duplicate_existing_count: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    uploader_id: Option<Uuid>,
    uploader_name: Option<String>,
    uploader_email: Option<String>,
    history_exam_id: Option<Uuid>,
    exam_title: Option<String>,
}

impl From<HistoryJoinRow> for UploadHistoryEntry {
    fn from(row: HistoryJoinRow) -> Self {
        let uploader = match (row.uploader_id, row.uploader_name, row.uploader_email) {
            (Some(id), Some(name), Some(email)) => Some(UploaderRef { id, name, email }),
            _ => None,
        };
        let exam = match (row.history_exam_id, row.exam_title) {
            (Some(id), Some(title)) => Some(ExamRef { id, title }),
            _ => None,
        };
        UploadHistoryEntry {
            id: row.id,
            file_name: row.file_name,
            mode: row.mode,
            duplicate_handling: row.duplicate_handling,
            total_rows: row.total_rows,
            imported_count: row.imported_count,
            skipped_duplicate_count: row.skipped_duplicate_count,
            duplicate_within_file_count: row.duplicate_within_file_count,
            duplicate_existing_count: row.duplicate_existing_count,
            uploaded_at: row.created_at,
            uploader,
            exam,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::duplicate_service::analyze_duplicates;

    fn batch(texts: &[&str]) -> Vec<NewQuestion> {
        texts
            .iter()
            .map(|t| NewQuestion {
                question_text: t.to_string(),
                options: vec!["A".into(), "B".into()],
                correct_option_index: 0,
                explanation: String::new(),
            })
            .collect()
    }

    #[test]
    fn row_limit_is_inclusive() {
        assert!(enforce_row_limit(MAX_UPLOAD_ROW_COUNT).is_ok());
        let err = enforce_row_limit(MAX_UPLOAD_ROW_COUNT + 1).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn skip_drops_every_flagged_row() {
        let questions = batch(&["What is Rust?", "what is   rust?", "Unique question"]);
        let duplicates = analyze_duplicates(&questions, &[], ImportMode::Append);

        let selected =
            select_import_questions(&questions, &duplicates, DuplicateHandling::Skip);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].question_text, "What is Rust?");
        assert_eq!(selected[1].question_text, "Unique question");
    }

    #[test]
    fn allow_keeps_the_whole_batch() {
        let questions = batch(&["Q1", "q1", "Q2"]);
        let duplicates = analyze_duplicates(&questions, &[], ImportMode::Append);

        let selected =
            select_import_questions(&questions, &duplicates, DuplicateHandling::Allow);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn preview_response_caps_samples_and_duplicate_rows() {
        let texts: Vec<String> = (0..8).map(|i| format!("Question {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let questions = batch(&refs);
        let duplicates = analyze_duplicates(&questions, &[], ImportMode::Append);

        let preview = UploadPreview {
            preview_id: "abc123".to_string(),
            admin_id: Uuid::new_v4(),
            exam_id: Uuid::new_v4(),
            exam_title: "Mock Exam".to_string(),
            file_name: "questions.json".to_string(),
            mode: ImportMode::Append,
            questions,
            duplicates,
            created_at: chrono::Utc::now(),
            expires_at: chrono::Utc::now() + chrono::Duration::minutes(15),
        };

        let response = build_preview_response(&preview);
        assert_eq!(response.counts.total_rows, 8);
        assert_eq!(response.counts.importable_count, 8);
        assert_eq!(response.sample_questions.len(), PREVIEW_SAMPLE_SIZE);
        assert_eq!(response.sample_questions[0].row_number, 1);
        assert!(response.duplicate_rows.is_empty());
        assert_eq!(response.limits.max_rows, MAX_UPLOAD_ROW_COUNT);
    }
}
