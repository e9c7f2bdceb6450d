use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A multiple-choice question as stored inside an exam's JSONB `questions`
/// column. Field names stay camelCase on the wire so the stored shape matches
/// the upload file schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_option_index: i32,
    #[serde(default)]
    pub explanation: String,
}

/// A validated question that has not yet been assigned an id or written to
/// an exam. Produced by the normalizer, consumed by the import pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_option_index: i32,
    #[serde(default)]
    pub explanation: String,
}

impl NewQuestion {
    pub fn into_question(self) -> Question {
        Question {
            id: Uuid::new_v4(),
            question_text: self.question_text,
            options: self.options,
            correct_option_index: self.correct_option_index,
            explanation: self.explanation,
        }
    }
}
