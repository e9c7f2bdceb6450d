pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sqlx::PgPool;

use crate::services::{
    attempt_service::AttemptService, exam_service::ExamService, import_service::ImportService,
    preview_store::{InMemoryPreviewStore, PreviewStore}, user_service::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub exam_service: ExamService,
    pub import_service: ImportService,
    pub attempt_service: AttemptService,
    pub user_service: UserService,
    pub preview_store: Arc<dyn PreviewStore>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self::with_preview_store(pool, Arc::new(InMemoryPreviewStore::new()))
    }

    pub fn with_preview_store(pool: PgPool, preview_store: Arc<dyn PreviewStore>) -> Self {
        let exam_service = ExamService::new(pool.clone());
        let import_service = ImportService::new(pool.clone(), preview_store.clone());
        let attempt_service = AttemptService::new(pool.clone());
        let user_service = UserService::new(pool.clone());

        Self {
            pool,
            exam_service,
            import_service,
            attempt_service,
            user_service,
            preview_store,
        }
    }
}
