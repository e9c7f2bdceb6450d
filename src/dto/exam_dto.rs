use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::exam::Exam;
use crate::models::question::Question;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: Uuid,
    pub selected_option_index: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub answers: Vec<AnswerSubmission>,
}

/// Question as shown to a student taking an exam. The correct index and
/// explanation stay server-side until the attempt is graded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text.clone(),
            options: question.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub total_marks: i32,
    pub duration_minutes: i32,
    pub exam_date: DateTime<Utc>,
    pub is_featured: bool,
    pub enrolled_students: i32,
    pub question_count: usize,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Exam> for ExamSummary {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title.clone(),
            category: exam.category.clone(),
            total_marks: exam.total_marks,
            duration_minutes: exam.duration_minutes,
            exam_date: exam.exam_date,
            is_featured: exam.is_featured,
            enrolled_students: exam.enrolled_students,
            question_count: exam.question_count(),
            is_deleted: exam.is_deleted,
            created_at: exam.created_at,
            updated_at: exam.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDetails {
    #[serde(flatten)]
    pub summary: ExamSummary,
    pub questions: Vec<QuestionView>,
}

impl From<&Exam> for ExamDetails {
    fn from(exam: &Exam) -> Self {
        let questions = exam.parsed_questions();
        Self {
            summary: ExamSummary::from(exam),
            questions: questions.iter().map(QuestionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExamResponse {
    pub result_id: Uuid,
    pub exam_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub resumed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamResponse {
    pub result_id: Uuid,
    pub exam_id: Uuid,
    pub status: String,
    pub total_questions: i32,
    pub attempted_questions: i32,
    pub correct_answers: i32,
    pub score: Decimal,
    pub percentage: Decimal,
    pub time_taken_seconds: i32,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub result_id: Uuid,
    pub exam_id: Uuid,
    pub exam_title: Option<String>,
    pub exam_category: Option<String>,
    pub status: String,
    pub score: Decimal,
    pub percentage: Decimal,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub time_taken_seconds: i32,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question_id: Uuid,
    pub question_text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_option_index: Option<i32>,
    pub explanation: Option<String>,
    pub selected_option_index: i32,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDetails {
    #[serde(flatten)]
    pub summary: ResultSummary,
    pub answers: Vec<AnswerDetail>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub score: Decimal,
    pub percentage: Decimal,
    pub time_taken_seconds: i32,
    pub submitted_at: Option<DateTime<Utc>>,
}
