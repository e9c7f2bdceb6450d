use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::dto::exam_dto::AnswerSubmission;
use crate::models::exam_result::AnswerRecord;
use crate::models::question::Question;

/// Result of grading one attempt against the exam's question list.
#[derive(Debug, Clone, Default)]
pub struct GradedAttempt {
    pub answers: Vec<AnswerRecord>,
    pub attempted_questions: i32,
    pub correct_answers: i32,
}

/// Grades submitted answers against the exam's questions. Answers whose
/// question id does not exist on the exam are dropped; grading is keyed by
/// question id, not by position.
pub fn grade_answers(questions: &[Question], answers: &[AnswerSubmission]) -> GradedAttempt {
    let by_id: HashMap<_, _> = questions.iter().map(|q| (q.id, q)).collect();

    let mut graded = GradedAttempt::default();
    for answer in answers {
        let Some(question) = by_id.get(&answer.question_id) else {
            continue;
        };
        let is_correct = answer.selected_option_index == question.correct_option_index;
        graded.answers.push(AnswerRecord {
            question_id: answer.question_id,
            selected_option_index: answer.selected_option_index,
            is_correct,
        });
        graded.attempted_questions += 1;
        if is_correct {
            graded.correct_answers += 1;
        }
    }
    graded
}

/// Percentage of correct answers over the full question count, rounded to
/// two decimal places. An exam with no questions grades to zero.
pub fn compute_percentage(correct_answers: i32, total_questions: i32) -> Decimal {
    if total_questions <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(correct_answers) * Decimal::from(100) / Decimal::from(total_questions))
        .round_dp(2)
}

/// Score scaled to the exam's total marks, rounded to two decimal places.
pub fn compute_score(percentage: Decimal, total_marks: i32) -> Decimal {
    (percentage / Decimal::from(100) * Decimal::from(total_marks)).round_dp(2)
}
