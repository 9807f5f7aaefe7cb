//! Quiz taking: answer scoring and the linear runner behind attempt
//! submission. One question at a time, selection, correction reveal, score.

use crate::model::QuizQuestion;

/// Score submitted answer indexes against the question list. Unanswered
/// questions and out-of-range choices count as wrong.
pub fn score_answers(questions: &[QuizQuestion], answers: &[Option<usize>]) -> (u32, u32) {
    let total = questions.len() as u32;
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| {
            answers
                .get(*i)
                .copied()
                .flatten()
                .is_some_and(|choice| choice < q.choices.len() && choice == q.correct_index)
        })
        .count() as u32;
    (correct, total)
}

/// One pass through a question list.
///
/// The flow is strictly linear: select a choice, reveal the correction,
/// advance. Selection is locked once revealed; advancing without a reveal
/// is refused.
pub struct QuizRunner<'a> {
    questions: &'a [QuizQuestion],
    current: usize,
    selected: Option<usize>,
    revealed: bool,
    correct: u32,
}

impl<'a> QuizRunner<'a> {
    pub fn new(questions: &'a [QuizQuestion]) -> Self {
        Self {
            questions,
            current: 0,
            selected: None,
            revealed: false,
            correct: 0,
        }
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    /// Select a choice for the current question. Refused after the reveal
    /// and for out-of-range indexes.
    pub fn select(&mut self, choice: usize) -> bool {
        if self.revealed {
            return false;
        }
        match self.current_question() {
            Some(q) if choice < q.choices.len() => {
                self.selected = Some(choice);
                true
            }
            _ => false,
        }
    }

    /// Reveal the correction for the current question. Returns whether the
    /// selection was correct, or `None` when nothing is selected yet.
    pub fn reveal(&mut self) -> Option<bool> {
        if self.revealed || self.is_finished() {
            return None;
        }
        let selected = self.selected?;
        let question = self.current_question()?;
        let is_correct = selected == question.correct_index;
        if is_correct {
            self.correct += 1;
        }
        self.revealed = true;
        Some(is_correct)
    }

    /// Move to the next question. Only allowed after the reveal.
    pub fn advance(&mut self) -> bool {
        if !self.revealed || self.is_finished() {
            return false;
        }
        self.current += 1;
        self.selected = None;
        self.revealed = false;
        true
    }

    /// (correct, total) so far.
    pub fn score(&self) -> (u32, u32) {
        (self.correct, self.questions.len() as u32)
    }
}
