use serde_json::{json, Value as JsonValue};

use crate::error::{Error, Result};
use crate::models::question::NewQuestion;

/// Parses an uploaded question file into raw, un-normalized question records.
/// Format is decided by filename extension or MIME substring, JSON first,
/// then CSV; anything else is rejected.
pub fn parse_question_file(
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<Vec<JsonValue>> {
    let filename = file_name.to_lowercase();
    let mime = content_type.to_lowercase();
    let text = String::from_utf8_lossy(bytes);

    if text.trim().is_empty() {
        return Err(Error::BadRequest("Uploaded file is empty".to_string()));
    }

    let is_json = filename.ends_with(".json")
        || mime.contains("application/json")
        || mime.contains("text/json");
    let is_csv = filename.ends_with(".csv") || mime.contains("text/csv");

    if is_json {
        let parsed: JsonValue = serde_json::from_str(&text)
            .map_err(|_| Error::BadRequest("Invalid JSON file".to_string()))?;
        let raw = match parsed {
            JsonValue::Array(items) => items,
            JsonValue::Object(mut map) => match map.remove("questions") {
                Some(JsonValue::Array(items)) => items,
                _ => {
                    return Err(Error::BadRequest(
                        "Question list must be a non-empty array".to_string(),
                    ))
                }
            },
            _ => {
                return Err(Error::BadRequest(
                    "Question list must be a non-empty array".to_string(),
                ))
            }
        };
        return Ok(raw);
    }

    if is_csv {
        return parse_csv_questions(&text);
    }

    Err(Error::BadRequest(
        "Unsupported file format. Upload .json or .csv".to_string(),
    ))
}

/// Splits one CSV line on commas, honoring double-quoted fields and
/// doubled-quote escapes inside them.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut token = String::new();
    let mut in_quotes = false;

    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            if in_quotes && chars.get(i + 1) == Some(&'"') {
                token.push('"');
                i += 2;
                continue;
            }
            in_quotes = !in_quotes;
            i += 1;
            continue;
        }

        if c == ',' && !in_quotes {
            values.push(token.trim().to_string());
            token.clear();
            i += 1;
            continue;
        }

        token.push(c);
        i += 1;
    }

    values.push(token.trim().to_string());
    values
}

fn parse_csv_questions(text: &str) -> Result<Vec<JsonValue>> {
    let normalized = text.replace('\r', "");
    let lines: Vec<&str> = normalized
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(Error::BadRequest(
            "CSV must include a header row and at least one data row".to_string(),
        ));
    }

    let headers: Vec<String> = parse_csv_line(lines[0])
        .into_iter()
        .map(|h| h.to_lowercase())
        .collect();
    let question_text_idx = headers.iter().position(|h| h == "questiontext");
    let options_idx = headers.iter().position(|h| h == "options");
    let correct_idx = headers.iter().position(|h| h == "correctoptionindex");
    let explanation_idx = headers.iter().position(|h| h == "explanation");

    let (Some(question_text_idx), Some(options_idx), Some(correct_idx)) =
        (question_text_idx, options_idx, correct_idx)
    else {
        return Err(Error::BadRequest(
            "CSV header must include questionText, options, and correctOptionIndex columns"
                .to_string(),
        ));
    };

    let mut questions = Vec::new();
    for line in &lines[1..] {
        let columns = parse_csv_line(line);
        if columns.iter().all(|column| column.is_empty()) {
            continue;
        }

        let column = |idx: usize| columns.get(idx).cloned().unwrap_or_default();
        let options: Vec<String> = column(options_idx)
            .split('|')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        questions.push(json!({
            "questionText": column(question_text_idx),
            "options": options,
            "correctOptionIndex": column(correct_idx),
            "explanation": explanation_idx.map(column).unwrap_or_default(),
        }));
    }

    Ok(questions)
}

/// Validates and normalizes raw question records into the canonical shape.
/// Error messages carry the 1-based row number for user-facing diagnostics.
pub fn normalize_questions(raw: &[JsonValue]) -> Result<Vec<NewQuestion>> {
    if raw.is_empty() {
        return Err(Error::BadRequest(
            "Question list must be a non-empty array".to_string(),
        ));
    }

    raw.iter()
        .enumerate()
        .map(|(index, record)| normalize_question(record, index + 1))
        .collect()
}

fn normalize_question(record: &JsonValue, serial: usize) -> Result<NewQuestion> {
    let question_text = value_to_string(record.get("questionText")).trim().to_string();
    if question_text.is_empty() {
        return Err(Error::BadRequest(format!(
            "Question {}: questionText is required",
            serial
        )));
    }

    let options: Vec<String> = match record.get("options") {
        Some(JsonValue::Array(items)) => items.iter().map(|item| value_to_string(Some(item))).collect(),
        other => value_to_string(other)
            .split(['|', ';'])
            .map(str::to_string)
            .collect(),
    };
    let options: Vec<String> = options
        .iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if options.len() < 2 {
        return Err(Error::BadRequest(format!(
            "Question {}: at least two options are required",
            serial
        )));
    }

    let correct_option_index = parse_correct_index(record.get("correctOptionIndex"));
    let valid = correct_option_index
        .map(|idx| idx >= 0 && (idx as usize) < options.len())
        .unwrap_or(false);
    if !valid {
        return Err(Error::BadRequest(format!(
            "Question {}: correctOptionIndex must be between 0 and {}",
            serial,
            options.len() - 1
        )));
    }

    let explanation = value_to_string(record.get("explanation")).trim().to_string();

    Ok(NewQuestion {
        question_text,
        options,
        correct_option_index: correct_option_index.unwrap_or_default(),
        explanation,
    })
}

fn parse_correct_index(value: Option<&JsonValue>) -> Option<i32> {
    match value {
        Some(JsonValue::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(JsonValue::String(s)) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn value_to_string(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_and_normalize(file_name: &str, mime: &str, body: &str) -> Result<Vec<NewQuestion>> {
        let raw = parse_question_file(file_name, mime, body.as_bytes())?;
        normalize_questions(&raw)
    }

    #[test]
    fn parses_json_array() {
        let body = r#"[
            {"questionText": "Capital of Bangladesh?", "options": ["Dhaka", "Chittagong"], "correctOptionIndex": 0},
            {"questionText": "2 + 2?", "options": "3|4;5", "correctOptionIndex": "1", "explanation": "basic math"}
        ]"#;
        let questions = parse_and_normalize("bank.json", "application/json", body).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question_text, "Capital of Bangladesh?");
        assert_eq!(questions[1].options, vec!["3", "4", "5"]);
        assert_eq!(questions[1].correct_option_index, 1);
        assert_eq!(questions[1].explanation, "basic math");
    }

    #[test]
    fn parses_json_object_with_questions_property() {
        let body = r#"{"questions": [{"questionText": "Q", "options": ["a", "b"], "correctOptionIndex": 1}]}"#;
        let questions = parse_and_normalize("set.json", "", body).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_option_index, 1);
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_question_file("bad.json", "application/json", b"{not json").unwrap_err();
        assert!(err.to_string().contains("Invalid JSON file"));
    }

    #[test]
    fn rejects_json_without_question_array() {
        let err = parse_and_normalize("bad.json", "", r#"{"items": []}"#).unwrap_err();
        assert!(err.to_string().contains("non-empty array"));
    }

    #[test]
    fn parses_csv_with_quoted_commas_and_escaped_quotes() {
        let body = "questionText,options,correctOptionIndex,explanation\r\n\
\"Which city, by population, is largest?\",Dhaka|Tokyo,1,\"He said \"\"largest\"\" city\"\n\
Plain question,a|b,0,\n";
        let questions = parse_and_normalize("cities.csv", "text/csv", body).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(
            questions[0].question_text,
            "Which city, by population, is largest?"
        );
        assert_eq!(questions[0].explanation, "He said \"largest\" city");
        assert_eq!(questions[1].options, vec!["a", "b"]);
    }

    #[test]
    fn csv_headers_are_case_insensitive() {
        let body = "QUESTIONTEXT,Options,CorrectOptionIndex\nQ one,a|b,0\n";
        let questions = parse_and_normalize("q.csv", "", body).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn csv_skips_all_blank_rows() {
        let body = "questionText,options,correctOptionIndex\nQ,a|b,0\n,,\n";
        let questions = parse_and_normalize("q.csv", "", body).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn csv_missing_required_header_fails() {
        let body = "questionText,correctOptionIndex\nQ,0\n";
        let err = parse_and_normalize("q.csv", "", body).unwrap_err();
        assert!(err.to_string().contains("CSV header must include"));
    }

    #[test]
    fn csv_without_data_rows_fails() {
        let body = "questionText,options,correctOptionIndex\n";
        let err = parse_question_file("q.csv", "", body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("header row and at least one data row"));
    }

    #[test]
    fn empty_file_fails() {
        let err = parse_question_file("q.csv", "text/csv", b"   \n  ").unwrap_err();
        assert!(err.to_string().contains("Uploaded file is empty"));
    }

    #[test]
    fn unsupported_format_fails() {
        let err = parse_question_file("questions.xlsx", "application/vnd.ms-excel", b"data")
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn json_detection_wins_over_csv_mime() {
        // Extension says JSON; the payload is JSON even though the MIME hints CSV.
        let body = r#"[{"questionText": "Q", "options": ["a", "b"], "correctOptionIndex": 0}]"#;
        let questions = parse_and_normalize("q.json", "text/csv", body).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn blank_question_text_reports_row_number() {
        let raw = vec![
            json!({"questionText": "ok", "options": ["a", "b"], "correctOptionIndex": 0}),
            json!({"questionText": "   ", "options": ["a", "b"], "correctOptionIndex": 0}),
        ];
        let err = normalize_questions(&raw).unwrap_err();
        assert!(err.to_string().contains("Question 2: questionText is required"));
    }

    #[test]
    fn too_few_options_reports_row_number() {
        let raw = vec![json!({"questionText": "Q", "options": ["only |  "], "correctOptionIndex": 0})];
        let err = normalize_questions(&raw).unwrap_err();
        assert!(err
            .to_string()
            .contains("Question 1: at least two options are required"));
    }

    #[test]
    fn out_of_range_correct_index_fails() {
        for bad in [json!(2), json!(-1), json!("x"), JsonValue::Null] {
            let raw = vec![json!({"questionText": "Q", "options": ["a", "b"], "correctOptionIndex": bad})];
            let err = normalize_questions(&raw).unwrap_err();
            assert!(err
                .to_string()
                .contains("Question 1: correctOptionIndex must be between 0 and 1"));
        }
    }

    #[test]
    fn normalized_questions_always_satisfy_invariants() {
        let body = "questionText,options,correctOptionIndex,explanation\n\
Q one, a | b | c ,2,why\nQ two,x|y,0,\n";
        let questions = parse_and_normalize("q.csv", "", body).unwrap();
        for q in &questions {
            assert!(q.options.len() >= 2);
            assert!(q.correct_option_index >= 0);
            assert!((q.correct_option_index as usize) < q.options.len());
            assert_eq!(q.question_text, q.question_text.trim());
        }
        assert_eq!(questions[0].options, vec!["a", "b", "c"]);
    }
}
