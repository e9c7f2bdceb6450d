pub mod attempt_service;
pub mod duplicate_service;
pub mod exam_service;
pub mod grading_service;
pub mod import_service;
pub mod preview_store;
pub mod question_parser;
pub mod user_service;
