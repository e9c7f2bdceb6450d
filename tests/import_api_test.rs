use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "----examprep-test-boundary";

fn multipart_upload(exam_id: Uuid, mode: &str, file_name: &str, content: &str) -> String {
    format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"examId\"\r\n\r\n{exam_id}\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"mode\"\r\n\r\n{mode}\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/json\r\n\r\n{content}\r\n\
         --{b}--\r\n",
        b = BOUNDARY,
    )
}

fn multipart_request(uri: &str, auth: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("authorization", auth)
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 4 * 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn import_api_end_to_end() {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("skipping import_api_end_to_end: DATABASE_URL not set");
        return;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("ADMIN_RPS", "100");
    env::set_var("PUBLIC_RPS", "100");

    examprep_backend::config::init_config().expect("init config");

    let pool = examprep_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let admin_id = Uuid::parse_str("7f3c2a9e-4b1d-4e0f-9c6a-1d2e3f4a5b6c").unwrap();
    sqlx::query(
        r#"INSERT INTO users (id, name, email, role)
           VALUES ($1, $2, $3, $4)
           ON CONFLICT (id) DO NOTHING"#,
    )
    .bind(admin_id)
    .bind("Import Test Admin")
    .bind(format!("import_admin_{admin_id}@example.com"))
    .bind("admin")
    .execute(&pool)
    .await
    .expect("seed admin");

    let existing_question = json!([{
        "id": Uuid::new_v4(),
        "questionText": "What is the capital of France?",
        "options": ["Paris", "London", "Berlin", "Madrid"],
        "correctOptionIndex": 0,
        "explanation": ""
    }]);
    let exam_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO exams (title, category, total_marks, duration_minutes, exam_date, questions)
           VALUES ($1, $2, $3, $4, NOW(), $5)
           RETURNING id"#,
    )
    .bind(format!("Import Test Exam {}", Uuid::new_v4()))
    .bind("BCS")
    .bind(100)
    .bind(60)
    .bind(&existing_question)
    .fetch_one(&pool)
    .await
    .expect("seed exam");

    let app_state = examprep_backend::AppState::new(pool.clone());
    let app = Router::new()
        .route(
            "/api/admin/questions/preview",
            post(examprep_backend::routes::admin::preview_questions),
        )
        .route(
            "/api/admin/questions/commit",
            post(examprep_backend::routes::admin::commit_questions),
        )
        .route(
            "/api/admin/questions/upload",
            post(examprep_backend::routes::admin::upload_questions),
        )
        .route(
            "/api/admin/questions/bulk",
            post(examprep_backend::routes::admin::bulk_import_questions),
        )
        .route(
            "/api/admin/uploads/history",
            get(examprep_backend::routes::admin::upload_history),
        )
        .layer(axum::middleware::from_fn(
            examprep_backend::middleware::auth::require_admin,
        ))
        .with_state(app_state);

    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        role: Option<String>,
    }
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    let token = encode(
        &Header::default(),
        &Claims {
            sub: admin_id.to_string(),
            exp,
            role: Some("admin".into()),
        },
        &EncodingKey::from_secret(
            examprep_backend::config::get_config().jwt_secret.as_bytes(),
        ),
    )
    .expect("sign token");
    let auth = format!("Bearer {}", token);

    // One row matching the seeded question, one unique row, and a repeat of
    // the unique row.
    let upload = json!([
        {
            "questionText": "  what is the   capital of FRANCE? ",
            "options": ["Paris", "London", "Berlin", "Madrid"],
            "correctOptionIndex": 0
        },
        {
            "questionText": "Which planet is known as the Red Planet?",
            "options": "Mars|Venus|Jupiter",
            "correctOptionIndex": "0"
        },
        {
            "questionText": "Which planet is known as the red planet?",
            "options": ["Mars", "Venus", "Jupiter"],
            "correctOptionIndex": 0
        }
    ])
    .to_string();

    let resp = app
        .clone()
        .oneshot(multipart_request(
            "/api/admin/questions/preview",
            &auth,
            multipart_upload(exam_id, "append", "questions.json", &upload),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    let preview = &body["preview"];
    assert_eq!(preview["counts"]["totalRows"], 3);
    assert_eq!(preview["counts"]["importableCount"], 1);
    assert_eq!(preview["counts"]["duplicateWithinFileCount"], 1);
    assert_eq!(preview["counts"]["duplicateExistingCount"], 1);
    let preview_id = preview["previewId"].as_str().unwrap().to_string();

    // Commit with skip: only the first occurrence of the repeated row lands.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/questions/commit")
                .header("content-type", "application/json")
                .header("authorization", auth.clone())
                .body(Body::from(
                    json!({"previewId": preview_id, "duplicateHandling": "skip"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["result"]["importedCount"], 1);
    assert_eq!(body["result"]["skippedDuplicateCount"], 2);
    assert_eq!(body["result"]["totalQuestions"], 2);

    // Committing the same preview again must fail: it was consumed.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/questions/commit")
                .header("content-type", "application/json")
                .header("authorization", auth.clone())
                .body(Body::from(
                    json!({"previewId": preview_id, "duplicateHandling": "skip"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Same file, allow: everything imports, duplicates included.
    let resp = app
        .clone()
        .oneshot(multipart_request(
            "/api/admin/questions/preview",
            &auth,
            multipart_upload(exam_id, "append", "questions.json", &upload),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    let preview_id = body["preview"]["previewId"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/questions/commit")
                .header("content-type", "application/json")
                .header("authorization", auth.clone())
                .body(Body::from(
                    json!({"previewId": preview_id, "duplicateHandling": "allow"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["result"]["importedCount"], 3);
    assert_eq!(body["result"]["skippedDuplicateCount"], 0);
    assert_eq!(body["result"]["totalQuestions"], 5);

    // Direct upload in replace mode resets the collection.
    let resp = app
        .clone()
        .oneshot(multipart_request(
            "/api/admin/questions/upload",
            &auth,
            multipart_upload(exam_id, "replace", "fresh.json", &upload),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["result"]["importedCount"], 2);
    assert_eq!(body["result"]["totalQuestions"], 2);

    // History reflects the three file imports, newest first.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/admin/uploads/history?examId={exam_id}"))
                .header("authorization", auth.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["total"], 3);
    let newest = &body["history"][0];
    assert_eq!(newest["fileName"], "fresh.json");
    assert_eq!(newest["mode"], "replace");
    assert_eq!(newest["uploader"]["id"], json!(admin_id));

    // Row limit is enforced on the normalized batch.
    let oversized: Vec<JsonValue> = (0..1001)
        .map(|i| {
            json!({
                "questionText": format!("Generated question {i}"),
                "options": ["A", "B"],
                "correctOptionIndex": 0
            })
        })
        .collect();
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/questions/bulk")
                .header("content-type", "application/json")
                .header("authorization", auth.clone())
                .body(Body::from(
                    json!({"examId": exam_id, "mode": "append", "questions": oversized})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Bulk JSON import bypasses duplicate analysis entirely.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/questions/bulk")
                .header("content-type", "application/json")
                .header("authorization", auth)
                .body(Body::from(
                    json!({
                        "examId": exam_id,
                        "mode": "append",
                        "questions": [{
                            "questionText": "Which planet is known as the Red Planet?",
                            "options": ["Mars", "Venus"],
                            "correctOptionIndex": 0
                        }]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["totalQuestions"], 3);
}
