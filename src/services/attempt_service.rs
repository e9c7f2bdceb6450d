use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::dto::exam_dto::{
    AnswerDetail, AnswerSubmission, LeaderboardEntry, ResultDetails, ResultSummary,
    StartExamResponse, SubmitExamResponse,
};
use crate::error::{Error, Result};
use crate::models::exam::Exam;
use crate::models::exam_result::{ExamResult, RESULT_STATUS_IN_PROGRESS, RESULT_STATUS_SUBMITTED};
use crate::services::grading_service;

/// Exam attempt lifecycle: start, submit-once grading, and result reads.
#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct ResultWithExamRow {
    id: Uuid,
    exam_id: Uuid,
    status: String,
    answers: serde_json::Value,
    total_questions: i32,
    attempted_questions: i32,
    correct_answers: i32,
    score: Decimal,
    percentage: Decimal,
    time_taken_seconds: i32,
    submitted_at: Option<DateTime<Utc>>,
    exam_title: Option<String>,
    exam_category: Option<String>,
}

#[derive(Debug, FromRow)]
struct LeaderboardRow {
    user_id: Uuid,
    user_name: Option<String>,
    score: Decimal,
    percentage: Decimal,
    time_taken_seconds: i32,
    submitted_at: Option<DateTime<Utc>>,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts an attempt, or resumes the caller's open one. Starting is
    /// idempotent: while an `in_progress` attempt exists for this user and
    /// exam, repeated starts return it untouched and the original
    /// `started_at` keeps counting.
    pub async fn start_attempt(&self, user_id: Uuid, exam_id: Uuid) -> Result<StartExamResponse> {
        let exam = self.fetch_active_exam(exam_id).await?;

        let existing = sqlx::query_as::<_, ExamResult>(
            r#"
            SELECT * FROM exam_results
            WHERE exam_id = $1 AND user_id = $2 AND status = $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(exam_id)
        .bind(user_id)
        .bind(RESULT_STATUS_IN_PROGRESS)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(result) = existing {
            return Ok(Self::start_response(&exam, &result, true));
        }

        let result = sqlx::query_as::<_, ExamResult>(
            r#"
            INSERT INTO exam_results (exam_id, user_id, status, total_questions)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .bind(user_id)
        .bind(RESULT_STATUS_IN_PROGRESS)
        .bind(exam.question_count() as i32)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("UPDATE exams SET enrolled_students = enrolled_students + 1 WHERE id = $1")
            .bind(exam_id)
            .execute(&self.pool)
            .await?;

        info!(user_id = %user_id, exam_id = %exam_id, "exam attempt started");
        Ok(Self::start_response(&exam, &result, false))
    }

    /// Grades and closes the caller's open attempt. The status-guarded
    /// UPDATE makes the transition race-safe: only one submit can move an
    /// attempt out of `in_progress`.
    pub async fn submit_attempt(
        &self,
        user_id: Uuid,
        exam_id: Uuid,
        answers: &[AnswerSubmission],
    ) -> Result<SubmitExamResponse> {
        let exam = self.fetch_active_exam(exam_id).await?;

        let attempt = sqlx::query_as::<_, ExamResult>(
            r#"
            SELECT * FROM exam_results
            WHERE exam_id = $1 AND user_id = $2 AND status = $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(exam_id)
        .bind(user_id)
        .bind(RESULT_STATUS_IN_PROGRESS)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            Error::BadRequest("No active exam session found. Start the exam first.".to_string())
        })?;

        let questions = exam.parsed_questions();
        let graded = grading_service::grade_answers(&questions, answers);
        let total_questions = questions.len() as i32;
        let percentage =
            grading_service::compute_percentage(graded.correct_answers, total_questions);
        let score = grading_service::compute_score(percentage, exam.total_marks);

        let submitted_at = Utc::now();
        let time_taken_seconds = (submitted_at - attempt.started_at).num_seconds().max(0) as i32;
        let answers_json = serde_json::to_value(&graded.answers)?;

        let result = sqlx::query_as::<_, ExamResult>(
            r#"
            UPDATE exam_results
            SET status = $2,
                submitted_at = $3,
                answers = $4,
                total_questions = $5,
                attempted_questions = $6,
                correct_answers = $7,
                score = $8,
                percentage = $9,
                time_taken_seconds = $10,
                updated_at = NOW()
            WHERE id = $1 AND status = $11
            RETURNING *
            "#,
        )
        .bind(attempt.id)
        .bind(RESULT_STATUS_SUBMITTED)
        .bind(submitted_at)
        .bind(&answers_json)
        .bind(total_questions)
        .bind(graded.attempted_questions)
        .bind(graded.correct_answers)
        .bind(score)
        .bind(percentage)
        .bind(time_taken_seconds)
        .bind(RESULT_STATUS_IN_PROGRESS)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            Error::BadRequest("No active exam session found. Start the exam first.".to_string())
        })?;

        info!(
            user_id = %user_id,
            exam_id = %exam_id,
            correct = result.correct_answers,
            total = result.total_questions,
            "exam attempt submitted"
        );

        Ok(SubmitExamResponse {
            result_id: result.id,
            exam_id: result.exam_id,
            status: result.status,
            total_questions: result.total_questions,
            attempted_questions: result.attempted_questions,
            correct_answers: result.correct_answers,
            score: result.score,
            percentage: result.percentage,
            time_taken_seconds: result.time_taken_seconds,
            submitted_at: result.submitted_at,
        })
    }

    /// The caller's submitted results, newest first. Exam metadata comes via
    /// a LEFT JOIN so results survive the exam being archived.
    pub async fn my_results(&self, user_id: Uuid) -> Result<Vec<ResultSummary>> {
        let rows = sqlx::query_as::<_, ResultWithExamRow>(
            r#"
            SELECT r.id, r.exam_id, r.status, r.answers,
                   r.total_questions, r.attempted_questions, r.correct_answers,
                   r.score, r.percentage, r.time_taken_seconds, r.submitted_at,
                   e.title AS exam_title, e.category AS exam_category
            FROM exam_results r
            LEFT JOIN exams e ON e.id = r.exam_id AND e.is_deleted = FALSE
            WHERE r.user_id = $1 AND r.status = $2
            ORDER BY r.submitted_at DESC
            "#,
        )
        .bind(user_id)
        .bind(RESULT_STATUS_SUBMITTED)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::summary_from_row).collect())
    }

    /// One submitted result with per-answer breakdown. Only the owner can
    /// read it.
    pub async fn result_details(&self, user_id: Uuid, result_id: Uuid) -> Result<ResultDetails> {
        let row = sqlx::query_as::<_, ResultWithExamRow>(
            r#"
            SELECT r.id, r.exam_id, r.status, r.answers,
                   r.total_questions, r.attempted_questions, r.correct_answers,
                   r.score, r.percentage, r.time_taken_seconds, r.submitted_at,
                   e.title AS exam_title, e.category AS exam_category
            FROM exam_results r
            LEFT JOIN exams e ON e.id = r.exam_id AND e.is_deleted = FALSE
            WHERE r.id = $1 AND r.user_id = $2 AND r.status = $3
            "#,
        )
        .bind(result_id)
        .bind(user_id)
        .bind(RESULT_STATUS_SUBMITTED)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Result not found".to_string()))?;

        let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
            .bind(row.exam_id)
            .fetch_optional(&self.pool)
            .await?;
        let questions = exam.as_ref().map(Exam::parsed_questions).unwrap_or_default();

        let records: Vec<crate::models::exam_result::AnswerRecord> =
            serde_json::from_value(row.answers.clone()).unwrap_or_default();

        let answers = records
            .into_iter()
            .map(|record| {
                let question = questions.iter().find(|q| q.id == record.question_id);
                AnswerDetail {
                    question_id: record.question_id,
                    question_text: question.map(|q| q.question_text.clone()),
                    options: question.map(|q| q.options.clone()),
                    correct_option_index: question.map(|q| q.correct_option_index),
                    explanation: question.map(|q| q.explanation.clone()),
                    selected_option_index: record.selected_option_index,
                    is_correct: record.is_correct,
                }
            })
            .collect();

        Ok(ResultDetails {
            summary: Self::summary_from_row(&row),
            answers,
        })
    }

    /// Top 50 submitted attempts for an exam: highest score first, ties
    /// broken by faster time, then earlier submission.
    pub async fn exam_leaderboard(&self, exam_id: Uuid) -> Result<Vec<LeaderboardEntry>> {
        self.fetch_active_exam(exam_id).await?;

        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT r.user_id, u.name AS user_name,
                   r.score, r.percentage, r.time_taken_seconds, r.submitted_at
            FROM exam_results r
            LEFT JOIN users u ON u.id = r.user_id AND u.is_deleted = FALSE
            WHERE r.exam_id = $1 AND r.status = $2
            ORDER BY r.score DESC, r.time_taken_seconds ASC, r.submitted_at ASC
            LIMIT 50
            "#,
        )
        .bind(exam_id)
        .bind(RESULT_STATUS_SUBMITTED)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardEntry {
                rank: i + 1,
                user_id: row.user_id,
                user_name: row.user_name,
                score: row.score,
                percentage: row.percentage,
                time_taken_seconds: row.time_taken_seconds,
                submitted_at: row.submitted_at,
            })
            .collect())
    }

    async fn fetch_active_exam(&self, exam_id: Uuid) -> Result<Exam> {
        sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1 AND is_deleted = FALSE")
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    fn start_response(exam: &Exam, result: &ExamResult, resumed: bool) -> StartExamResponse {
        StartExamResponse {
            result_id: result.id,
            exam_id: exam.id,
            status: result.status.clone(),
            started_at: result.started_at,
            duration_minutes: exam.duration_minutes,
            resumed,
        }
    }

    fn summary_from_row(row: &ResultWithExamRow) -> ResultSummary {
        ResultSummary {
            result_id: row.id,
            exam_id: row.exam_id,
            exam_title: row.exam_title.clone(),
            exam_category: row.exam_category.clone(),
            status: row.status.clone(),
            score: row.score,
            percentage: row.percentage,
            correct_answers: row.correct_answers,
            total_questions: row.total_questions,
            time_taken_seconds: row.time_taken_seconds,
            submitted_at: row.submitted_at,
        }
    }
}
