//! Quiz evaluator and transient quiz attempts.
//!
//! Scoring is a pure function of the question set and the selections. A
//! [`QuizAttempt`] walks one question at a time: select, confirm, advance.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::{Quiz, QuizQuestion};

/// Default share of correct answers required to pass.
pub const DEFAULT_PASS_RATIO: f64 = 0.8;

/// Pass threshold: `ceil(question_count * ratio)`.
///
/// The ratio is rounded to basis points first so that `0.8` is exact and
/// `ceil(5 * 0.8)` is 4 rather than 5 from float error.
pub fn pass_threshold(question_count: usize, ratio: f64) -> usize {
    let basis_points = (ratio.clamp(0.0, 1.0) * 10_000.0).round() as usize;
    (question_count * basis_points).div_ceil(10_000)
}

/// Outcome of scoring a complete attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
    pub threshold: usize,
    pub passed: bool,
}

/// Score a question set against per-question selections.
///
/// Missing or out-of-range selections count as wrong.
pub fn evaluate(questions: &[QuizQuestion], selections: &[Option<usize>], ratio: f64) -> QuizResult {
    let score = questions
        .iter()
        .zip(selections.iter().chain(std::iter::repeat(&None)))
        .filter(|(q, sel)| **sel == Some(q.correct_answer))
        .count();
    let threshold = pass_threshold(questions.len(), ratio);
    QuizResult {
        score,
        total: questions.len(),
        threshold,
        passed: score >= threshold,
    }
}

/// Check a quiz for load-time errors.
pub fn validate_quiz(quiz: &Quiz) -> EngineResult<()> {
    if quiz.questions.is_empty() {
        return Err(EngineError::Configuration(format!(
            "quiz '{}' has no questions",
            quiz.title
        )));
    }
    for (i, q) in quiz.questions.iter().enumerate() {
        if q.question.trim().is_empty() {
            return Err(EngineError::Configuration(format!(
                "quiz '{}' question {i} has an empty prompt",
                quiz.title
            )));
        }
        if q.options.len() < 2 {
            return Err(EngineError::Configuration(format!(
                "quiz '{}' question {i} needs at least 2 options, has {}",
                quiz.title,
                q.options.len()
            )));
        }
        if q.correct_answer >= q.options.len() {
            return Err(EngineError::Configuration(format!(
                "quiz '{}' question {i} correct answer {} is out of range (0..{})",
                quiz.title,
                q.correct_answer,
                q.options.len()
            )));
        }
    }
    Ok(())
}

/// Feedback after confirming an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerFeedback {
    pub question_index: usize,
    pub correct: bool,
    pub correct_answer: usize,
    pub score: usize,
}

/// What `advance` led to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum QuizStep {
    /// Moved to the next question.
    Next { question_index: usize },
    /// The last question was answered; the attempt is over.
    Finished(QuizResult),
}

/// One in-progress run through a quiz. Never persisted.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    quiz: Quiz,
    pass_ratio: f64,
    current_index: usize,
    score: usize,
    selected: Vec<Option<usize>>,
    answered: Vec<bool>,
}

impl QuizAttempt {
    /// Start an attempt. The quiz must pass [`validate_quiz`].
    pub fn start(quiz: Quiz, pass_ratio: f64) -> EngineResult<Self> {
        validate_quiz(&quiz)?;
        let n = quiz.questions.len();
        Ok(Self {
            quiz,
            pass_ratio,
            current_index: 0,
            score: 0,
            selected: vec![None; n],
            answered: vec![false; n],
        })
    }

    pub fn title(&self) -> &str {
        &self.quiz.title
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &QuizQuestion {
        &self.quiz.questions[self.current_index]
    }

    pub fn question_count(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn selected(&self, question_index: usize) -> Option<usize> {
        self.selected.get(question_index).copied().flatten()
    }

    pub fn is_answered(&self, question_index: usize) -> bool {
        self.answered.get(question_index).copied().unwrap_or(false)
    }

    /// Choose an option for the current question. Changing the choice is
    /// allowed until the answer is confirmed.
    pub fn select(&mut self, question_index: usize, option: usize) -> EngineResult<()> {
        if question_index != self.current_index {
            return Err(EngineError::InvalidQuizAction(format!(
                "question {question_index} is not the current question ({})",
                self.current_index
            )));
        }
        if self.answered[question_index] {
            return Err(EngineError::InvalidQuizAction(format!(
                "question {question_index} is already answered"
            )));
        }
        let options = self.quiz.questions[question_index].options.len();
        if option >= options {
            return Err(EngineError::InvalidQuizAction(format!(
                "option {option} is out of range (0..{options})"
            )));
        }
        self.selected[question_index] = Some(option);
        Ok(())
    }

    /// Lock in the current selection.
    pub fn confirm(&mut self) -> EngineResult<AnswerFeedback> {
        let idx = self.current_index;
        if self.answered[idx] {
            return Err(EngineError::InvalidQuizAction(format!(
                "question {idx} is already answered"
            )));
        }
        let Some(choice) = self.selected[idx] else {
            return Err(EngineError::NoSelection {
                question_index: idx,
            });
        };
        let correct_answer = self.quiz.questions[idx].correct_answer;
        let correct = choice == correct_answer;
        self.answered[idx] = true;
        if correct {
            self.score += 1;
        }
        Ok(AnswerFeedback {
            question_index: idx,
            correct,
            correct_answer,
            score: self.score,
        })
    }

    /// Move past the answered current question.
    pub fn advance(&mut self) -> EngineResult<QuizStep> {
        let idx = self.current_index;
        if !self.answered[idx] {
            return Err(EngineError::InvalidQuizAction(format!(
                "question {idx} must be answered before advancing"
            )));
        }
        if idx + 1 < self.quiz.questions.len() {
            self.current_index += 1;
            return Ok(QuizStep::Next {
                question_index: self.current_index,
            });
        }
        Ok(QuizStep::Finished(self.result()))
    }

    /// Score of the attempt so far, against the full question count.
    pub fn result(&self) -> QuizResult {
        evaluate(&self.quiz.questions, &self.answered_selections(), self.pass_ratio)
    }

    fn answered_selections(&self) -> Vec<Option<usize>> {
        self.selected
            .iter()
            .zip(&self.answered)
            .map(|(sel, done)| if *done { *sel } else { None })
            .collect()
    }

    /// Discard all progress and start again from the first question.
    pub fn reset(&mut self) {
        let n = self.quiz.questions.len();
        self.current_index = 0;
        self.score = 0;
        self.selected = vec![None; n];
        self.answered = vec![false; n];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: usize) -> QuizQuestion {
        QuizQuestion {
            question: "Which cue starts the sprint?".into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: correct,
        }
    }

    fn quiz(n: usize) -> Quiz {
        Quiz {
            title: "Sprint Basics".into(),
            questions: (0..n).map(|i| question(i % 3)).collect(),
        }
    }

    #[test]
    fn threshold_is_eighty_percent_rounded_up() {
        assert_eq!(pass_threshold(5, 0.8), 4);
        assert_eq!(pass_threshold(10, 0.8), 8);
        assert_eq!(pass_threshold(3, 0.8), 3);
        assert_eq!(pass_threshold(4, 0.8), 4);
        assert_eq!(pass_threshold(6, 0.8), 5);
        assert_eq!(pass_threshold(0, 0.8), 0);
        assert_eq!(pass_threshold(7, 0.5), 4);
    }

    #[test]
    fn score_counts_matching_selections() {
        let q = quiz(5);
        let all_right: Vec<_> = q.questions.iter().map(|q| Some(q.correct_answer)).collect();
        for wrong in 0..=5 {
            let mut sel = all_right.clone();
            for s in sel.iter_mut().take(wrong) {
                *s = s.map(|c| (c + 1) % 3);
            }
            let result = evaluate(&q.questions, &sel, DEFAULT_PASS_RATIO);
            assert_eq!(result.score, 5 - wrong);
            assert_eq!(result.passed, result.score >= 4);
        }
    }

    #[test]
    fn missing_selections_count_as_wrong() {
        let q = quiz(4);
        let result = evaluate(&q.questions, &[Some(0)], DEFAULT_PASS_RATIO);
        assert_eq!(result.score, 1);
        assert!(!result.passed);
    }

    #[test]
    fn out_of_range_answer_fails_at_load() {
        let mut q = quiz(2);
        q.questions[1].correct_answer = 3;
        let err = QuizAttempt::start(q, DEFAULT_PASS_RATIO).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn single_option_question_is_rejected() {
        let mut q = quiz(1);
        q.questions[0].options.truncate(1);
        q.questions[0].correct_answer = 0;
        assert!(validate_quiz(&q).is_err());
    }

    #[test]
    fn empty_quiz_is_rejected() {
        assert!(validate_quiz(&quiz(0)).is_err());
    }

    #[test]
    fn confirm_without_selection_is_rejected() {
        let mut attempt = QuizAttempt::start(quiz(2), DEFAULT_PASS_RATIO).unwrap();
        let err = attempt.confirm().unwrap_err();
        assert!(matches!(err, EngineError::NoSelection { question_index: 0 }));
        assert!(!attempt.is_answered(0));
    }

    #[test]
    fn full_walkthrough_passes() {
        let mut attempt = QuizAttempt::start(quiz(5), DEFAULT_PASS_RATIO).unwrap();
        let mut last = None;
        for i in 0..5 {
            let answer = if i == 0 { 2 } else { i % 3 };
            attempt.select(i, answer).unwrap();
            let fb = attempt.confirm().unwrap();
            assert_eq!(fb.correct, i != 0);
            last = Some(attempt.advance().unwrap());
        }
        match last.unwrap() {
            QuizStep::Finished(result) => {
                assert_eq!(result.score, 4);
                assert_eq!(result.threshold, 4);
                assert!(result.passed);
            }
            other => panic!("expected finish, got {other:?}"),
        }
    }

    #[test]
    fn advance_requires_answer() {
        let mut attempt = QuizAttempt::start(quiz(2), DEFAULT_PASS_RATIO).unwrap();
        assert!(matches!(
            attempt.advance(),
            Err(EngineError::InvalidQuizAction(_))
        ));
    }

    #[test]
    fn selection_is_locked_after_confirm() {
        let mut attempt = QuizAttempt::start(quiz(2), DEFAULT_PASS_RATIO).unwrap();
        attempt.select(0, 1).unwrap();
        attempt.select(0, 0).unwrap();
        attempt.confirm().unwrap();
        assert!(attempt.select(0, 2).is_err());
        assert!(attempt.select(1, 0).is_err(), "question 1 is not current yet");
        assert!(attempt.select(0, 9).is_err());
        assert_eq!(attempt.selected(0), Some(0));
    }

    #[test]
    fn reset_discards_progress() {
        let mut attempt = QuizAttempt::start(quiz(3), DEFAULT_PASS_RATIO).unwrap();
        attempt.select(0, 0).unwrap();
        attempt.confirm().unwrap();
        attempt.advance().unwrap();
        attempt.reset();
        assert_eq!(attempt.current_index(), 0);
        assert_eq!(attempt.score(), 0);
        assert!(!attempt.is_answered(0));
        assert_eq!(attempt.selected(0), None);
    }
}
