use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::question::{NewQuestion, Question};
use crate::models::upload_history::ImportMode;

pub const REASON_WITHIN_FILE: &str = "within-file";
pub const REASON_EXISTING_EXAM: &str = "existing-exam";

/// Comparison key for duplicate detection: lowercased question text with
/// internal whitespace runs collapsed to single spaces and ends trimmed.
pub fn question_text_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One flagged row in the preview payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRow {
    pub row_number: usize,
    pub question_text: String,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_row_number: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateSummary {
    pub duplicate_indexes: HashSet<usize>,
    /// Sorted by row number.
    pub duplicate_rows: Vec<DuplicateRow>,
    pub duplicate_within_file_count: usize,
    pub duplicate_existing_count: usize,
}

/// Classifies each row of a normalized batch as unique or duplicate, in a
/// single left-to-right pass. Existing exam questions are only consulted in
/// append mode; replace mode discards them anyway. A row can carry both
/// reasons. Blank keys are never flagged.
pub fn analyze_duplicates(
    batch: &[NewQuestion],
    existing: &[Question],
    mode: ImportMode,
) -> DuplicateSummary {
    let existing_keys: HashSet<String> = match mode {
        ImportMode::Append => existing
            .iter()
            .map(|q| question_text_key(&q.question_text))
            .filter(|key| !key.is_empty())
            .collect(),
        ImportMode::Replace => HashSet::new(),
    };

    let mut seen_in_batch: HashMap<String, usize> = HashMap::new();
    let mut duplicate_indexes = HashSet::new();
    let mut row_map: BTreeMap<usize, DuplicateRow> = BTreeMap::new();
    let mut within_file_count = 0;
    let mut existing_count = 0;

    let mut mark = |row_map: &mut BTreeMap<usize, DuplicateRow>,
                    duplicate_indexes: &mut HashSet<usize>,
                    index: usize,
                    reason: &str,
                    first_row_number: Option<usize>| {
        duplicate_indexes.insert(index);
        let entry = row_map.entry(index).or_insert_with(|| DuplicateRow {
            row_number: index + 1,
            question_text: batch[index].question_text.clone(),
            reasons: Vec::new(),
            first_row_number: None,
        });
        if !entry.reasons.iter().any(|r| r == reason) {
            entry.reasons.push(reason.to_string());
        }
        if entry.first_row_number.is_none() {
            entry.first_row_number = first_row_number;
        }
    };

    for (index, question) in batch.iter().enumerate() {
        let key = question_text_key(&question.question_text);
        if key.is_empty() {
            continue;
        }

        if let Some(&first_index) = seen_in_batch.get(&key) {
            within_file_count += 1;
            mark(
                &mut row_map,
                &mut duplicate_indexes,
                index,
                REASON_WITHIN_FILE,
                Some(first_index + 1),
            );
        } else {
            seen_in_batch.insert(key.clone(), index);
        }

        if existing_keys.contains(&key) {
            existing_count += 1;
            mark(
                &mut row_map,
                &mut duplicate_indexes,
                index,
                REASON_EXISTING_EXAM,
                None,
            );
        }
    }

    DuplicateSummary {
        duplicate_indexes,
        duplicate_rows: row_map.into_values().collect(),
        duplicate_within_file_count: within_file_count,
        duplicate_existing_count: existing_count,
    }
}
