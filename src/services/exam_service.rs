use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::admin_dto::{CreateExamPayload, UpdateExamPayload};
use crate::error::{Error, Result};
use crate::models::exam::{Exam, RecordStatus, EXAM_CATEGORIES};
use crate::models::question::Question;
use crate::services::question_parser;

/// Exam catalogue management: CRUD, featured listing, soft delete/restore.
#[derive(Clone)]
pub struct ExamService {
    pool: PgPool,
}

impl ExamService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_exam(&self, payload: &CreateExamPayload) -> Result<Exam> {
        let category = validate_category(&payload.category)?;

        let questions: Vec<Question> = match &payload.questions {
            Some(raw) if !raw.is_empty() => question_parser::normalize_questions(raw)?
                .into_iter()
                .map(|q| q.into_question())
                .collect(),
            _ => Vec::new(),
        };
        let questions_json = serde_json::to_value(&questions)?;

        let exam = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (title, category, total_marks, duration_minutes,
                               exam_date, is_featured, questions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(payload.title.trim())
        .bind(category)
        .bind(payload.total_marks.unwrap_or(100))
        .bind(payload.duration_minutes.unwrap_or(60))
        .bind(payload.exam_date)
        .bind(payload.is_featured.unwrap_or(false))
        .bind(&questions_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(exam)
    }

    pub async fn list_exams(
        &self,
        category: Option<&str>,
        record_status: RecordStatus,
    ) -> Result<Vec<Exam>> {
        let category = match category {
            Some(raw) if !raw.trim().is_empty() => Some(validate_category(raw)?.to_string()),
            _ => None,
        };

        let exams = sqlx::query_as::<_, Exam>(
            r#"
            SELECT * FROM exams
            WHERE ($1::bool IS NULL OR is_deleted = $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY exam_date DESC
            "#,
        )
        .bind(record_status.as_deleted_flag())
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(exams)
    }

    pub async fn featured_exams(&self) -> Result<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>(
            r#"
            SELECT * FROM exams
            WHERE is_deleted = FALSE AND is_featured = TRUE
            ORDER BY exam_date ASC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(exams)
    }

    pub async fn get_exam(&self, exam_id: Uuid) -> Result<Exam> {
        sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1 AND is_deleted = FALSE")
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    pub async fn update_exam(&self, exam_id: Uuid, payload: &UpdateExamPayload) -> Result<Exam> {
        let category = match &payload.category {
            Some(raw) => Some(validate_category(raw)?.to_string()),
            None => None,
        };

        sqlx::query_as::<_, Exam>(
            r#"
            UPDATE exams
            SET title = COALESCE($2, title),
                category = COALESCE($3, category),
                total_marks = COALESCE($4, total_marks),
                duration_minutes = COALESCE($5, duration_minutes),
                exam_date = COALESCE($6, exam_date),
                is_featured = COALESCE($7, is_featured),
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .bind(payload.title.as_deref().map(str::trim))
        .bind(category)
        .bind(payload.total_marks)
        .bind(payload.duration_minutes)
        .bind(payload.exam_date)
        .bind(payload.is_featured)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    /// Archives the exam. Results and upload history keep pointing at it;
    /// only catalogue reads stop seeing it.
    pub async fn soft_delete_exam(&self, exam_id: Uuid, deleted_by: Uuid) -> Result<Exam> {
        sqlx::query_as::<_, Exam>(
            r#"
            UPDATE exams
            SET is_deleted = TRUE, deleted_at = NOW(), deleted_by = $2, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .bind(deleted_by)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    pub async fn restore_exam(&self, exam_id: Uuid) -> Result<Exam> {
        sqlx::query_as::<_, Exam>(
            r#"
            UPDATE exams
            SET is_deleted = FALSE, deleted_at = NULL, deleted_by = NULL, updated_at = NOW()
            WHERE id = $1 AND is_deleted = TRUE
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Archived exam not found".to_string()))
    }
}

fn validate_category(raw: &str) -> Result<&'static str> {
    let trimmed = raw.trim();
    EXAM_CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(trimmed))
        .copied()
        .ok_or_else(|| {
            Error::BadRequest(format!(
                "category must be one of: {}",
                EXAM_CATEGORIES.join(", ")
            ))
        })
}
