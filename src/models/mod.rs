pub mod exam;
pub mod exam_result;
pub mod question;
pub mod upload_history;
pub mod user;
