use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::exam_dto::{ExamDetails, ExamSummary, SubmitExamRequest},
    error::Result,
    middleware::auth::Claims,
    models::exam::RecordStatus,
    AppState,
};

#[axum::debug_handler]
pub async fn list_exams(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let exams = state
        .exam_service
        .list_exams(None, RecordStatus::Active)
        .await?;
    let summaries: Vec<ExamSummary> = exams.iter().map(ExamSummary::from).collect();
    Ok(Json(summaries))
}

#[axum::debug_handler]
pub async fn featured_exams(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let exams = state.exam_service.featured_exams().await?;
    let summaries: Vec<ExamSummary> = exams.iter().map(ExamSummary::from).collect();
    Ok(Json(summaries))
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let exam = state.exam_service.get_exam(id).await?;
    Ok(Json(ExamDetails::from(&exam)))
}

#[utoipa::path(
    post,
    path = "/api/exams/{id}/start",
    params(("id" = Uuid, Path, description = "Exam ID")),
    responses(
        (status = 200, description = "Open attempt resumed", body = Json<serde_json::Value>),
        (status = 201, description = "Attempt started", body = Json<serde_json::Value>),
        (status = 404, description = "Exam not found")
    )
)]
#[axum::debug_handler]
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let response = state
        .attempt_service
        .start_attempt(claims.user_id()?, id)
        .await?;

    let (status, message) = if response.resumed {
        (StatusCode::OK, "Exam already started")
    } else {
        (StatusCode::CREATED, "Exam started successfully")
    };

    Ok((
        status,
        Json(json!({
            "message": message,
            "attempt": response,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/exams/{id}/submit",
    params(("id" = Uuid, Path, description = "Exam ID")),
    request_body = SubmitExamRequest,
    responses(
        (status = 200, description = "Attempt graded", body = Json<serde_json::Value>),
        (status = 400, description = "No open attempt to submit"),
        (status = 404, description = "Exam not found")
    )
)]
#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse> {
    let response = state
        .attempt_service
        .submit_attempt(claims.user_id()?, id, &payload.answers)
        .await?;

    Ok(Json(json!({
        "message": "Exam submitted successfully",
        "result": response,
    })))
}

#[axum::debug_handler]
pub async fn my_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let results = state.attempt_service.my_results(claims.user_id()?).await?;
    Ok(Json(results))
}

#[axum::debug_handler]
pub async fn result_details(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let details = state
        .attempt_service
        .result_details(claims.user_id()?, id)
        .await?;
    Ok(Json(details))
}

#[axum::debug_handler]
pub async fn exam_leaderboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let entries = state.attempt_service.exam_leaderboard(id).await?;
    Ok(Json(entries))
}
