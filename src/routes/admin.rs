use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::admin_dto::{
        BulkImportPayload, CommitUploadPayload, CreateExamPayload, ExamListQuery,
        HistoryListQuery, UpdateExamPayload, UpdateUserPayload, UserListQuery,
    },
    dto::exam_dto::ExamSummary,
    error::{Error, Result},
    middleware::auth::Claims,
    models::exam::RecordStatus,
    models::upload_history::{DuplicateHandling, ImportMode},
    services::import_service::UploadedFile,
    AppState,
};

/// Fields read off the question-upload multipart form.
struct UploadForm {
    exam_id: Option<String>,
    mode: Option<String>,
    duplicate_handling: Option<String>,
    file: Option<UploadedFile>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm {
        exam_id: None,
        mode: None,
        duplicate_handling: None,
        file: None,
    };

    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "examId" => form.exam_id = Some(field.text().await?),
            "mode" => form.mode = Some(field.text().await?),
            "duplicateHandling" => form.duplicate_handling = Some(field.text().await?),
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

fn parse_exam_id(raw: Option<&str>) -> Result<Uuid> {
    raw.and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| Error::BadRequest("Valid examId is required".to_string()))
}

fn require_file(file: Option<UploadedFile>) -> Result<UploadedFile> {
    file.ok_or_else(|| Error::BadRequest("Question file is required (field: file)".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/admin/questions/preview",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Preview staged", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid file or payload"),
        (status = 413, description = "File or row limit exceeded")
    )
)]
#[axum::debug_handler]
pub async fn preview_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_upload_form(multipart).await?;
    let exam_id = parse_exam_id(form.exam_id.as_deref())?;
    let mode = ImportMode::parse(form.mode.as_deref().unwrap_or_default())?;
    let file = require_file(form.file)?;

    let preview = state
        .import_service
        .preview_upload(claims.user_id()?, exam_id, mode, &file)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Preview generated. Review duplicates before final import",
            "preview": preview,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/questions/commit",
    request_body = CommitUploadPayload,
    responses(
        (status = 201, description = "Preview committed", body = Json<serde_json::Value>),
        (status = 403, description = "Preview belongs to another admin"),
        (status = 404, description = "Preview missing or expired")
    )
)]
#[axum::debug_handler]
pub async fn commit_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CommitUploadPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    if payload.preview_id.trim().is_empty() {
        return Err(Error::BadRequest("previewId is required".to_string()));
    }
    let handling =
        DuplicateHandling::parse(payload.duplicate_handling.as_deref().unwrap_or_default())?;

    let outcome = state
        .import_service
        .commit_upload(claims.user_id()?, payload.preview_id.trim(), handling)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Preview import committed successfully",
            "result": outcome,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/questions/upload",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File imported", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid file or payload"),
        (status = 413, description = "File or row limit exceeded")
    )
)]
#[axum::debug_handler]
pub async fn upload_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_upload_form(multipart).await?;
    let exam_id = parse_exam_id(form.exam_id.as_deref())?;
    let mode = ImportMode::parse(form.mode.as_deref().unwrap_or_default())?;
    let handling =
        DuplicateHandling::parse(form.duplicate_handling.as_deref().unwrap_or_default())?;
    let file = require_file(form.file)?;

    let outcome = state
        .import_service
        .direct_upload(claims.user_id()?, exam_id, mode, handling, &file)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!(
                "File imported successfully ({}/{} questions, mode: {})",
                outcome.imported_count,
                outcome.total_rows,
                outcome.mode.as_str()
            ),
            "result": outcome,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/questions/bulk",
    request_body = BulkImportPayload,
    responses(
        (status = 201, description = "Questions imported", body = Json<serde_json::Value>),
        (status = 404, description = "Exam not found"),
        (status = 413, description = "Row limit exceeded")
    )
)]
#[axum::debug_handler]
pub async fn bulk_import_questions(
    State(state): State<AppState>,
    Json(payload): Json<BulkImportPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let mode = ImportMode::parse(payload.mode.as_deref().unwrap_or_default())?;

    let total_questions = state
        .import_service
        .bulk_import(payload.exam_id, mode, &payload.questions)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Questions imported successfully",
            "totalQuestions": total_questions,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/uploads/history",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page"),
        ("examId" = Option<Uuid>, Query, description = "Filter by exam")
    ),
    responses(
        (status = 200, description = "Upload history page", body = Json<serde_json::Value>)
    )
)]
#[axum::debug_handler]
pub async fn upload_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryListQuery>,
) -> Result<impl IntoResponse> {
    let page = state
        .import_service
        .list_history(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(20),
            query.exam_id,
        )
        .await?;
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Json(payload): Json<CreateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state.exam_service.create_exam(&payload).await?;
    Ok((StatusCode::CREATED, Json(ExamSummary::from(&exam))))
}

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Query(query): Query<ExamListQuery>,
) -> Result<impl IntoResponse> {
    let record_status = match query.record_status.as_deref() {
        Some(raw) => RecordStatus::parse(raw)?,
        None => RecordStatus::Active,
    };
    let exams = state
        .exam_service
        .list_exams(query.category.as_deref(), record_status)
        .await?;
    let summaries: Vec<ExamSummary> = exams.iter().map(ExamSummary::from).collect();
    Ok(Json(summaries))
}

#[axum::debug_handler]
pub async fn update_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state.exam_service.update_exam(id, &payload).await?;
    Ok(Json(ExamSummary::from(&exam)))
}

#[axum::debug_handler]
pub async fn archive_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let exam = state
        .exam_service
        .soft_delete_exam(id, claims.user_id()?)
        .await?;
    Ok(Json(json!({
        "message": "Exam archived successfully",
        "exam": ExamSummary::from(&exam),
    })))
}

#[axum::debug_handler]
pub async fn restore_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let exam = state.exam_service.restore_exam(id).await?;
    Ok(Json(json!({
        "message": "Exam restored successfully",
        "exam": ExamSummary::from(&exam),
    })))
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    let record_status = match query.record_status.as_deref() {
        Some(raw) => RecordStatus::parse(raw)?,
        None => RecordStatus::Active,
    };
    let page = state
        .user_service
        .list_users(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(20),
            record_status,
            query.role.as_deref(),
            query.search.as_deref(),
        )
        .await?;
    Ok(Json(json!({
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "users": page.users,
    })))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.update_user(id, &payload).await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn archive_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.soft_delete_user(id, claims.user_id()?).await?;
    Ok(Json(json!({
        "message": "User archived successfully",
        "user": user,
    })))
}

#[axum::debug_handler]
pub async fn restore_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.restore_user(id).await?;
    Ok(Json(json!({
        "message": "User restored successfully",
        "user": user,
    })))
}
