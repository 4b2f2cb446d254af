//! How each question kind is presented and answered.
//!
//! Everything here is a pure function of a question and its captured
//! answer; views draw whatever [`question_view`] returns.

use crate::models::{Answer, Question, QuestionKind};

/// Letter used for the `index`-th option: A, B, C, ...
pub fn choice_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// One selectable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRow {
    /// Label prefix, e.g. `A.` for lettered options. Empty for true/false.
    pub marker: String,
    pub text: String,
    pub selected: bool,
}

/// Presentation of a question given its current answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionView {
    /// Lettered options, one selectable.
    Choices { prompt: String, rows: Vec<ChoiceRow> },
    /// Exactly two rows: True then False.
    TrueFalse { prompt: String, rows: [ChoiceRow; 2] },
    /// Free text input with its current contents.
    FreeText { prompt: String, text: String },
    /// A kind this client does not know how to present.
    Unsupported { prompt: String, kind: String },
}

impl QuestionView {
    pub fn prompt(&self) -> &str {
        match self {
            Self::Choices { prompt, .. }
            | Self::TrueFalse { prompt, .. }
            | Self::FreeText { prompt, .. }
            | Self::Unsupported { prompt, .. } => prompt,
        }
    }
}

/// Build the view for `question` with its captured `answer`, if any.
pub fn question_view(question: &Question, answer: Option<&Answer>) -> QuestionView {
    let prompt = question.prompt.clone();
    match &question.kind {
        QuestionKind::MultipleChoice => {
            let chosen = answer.and_then(Answer::as_text);
            let rows = question
                .options
                .iter()
                .enumerate()
                .map(|(i, option)| ChoiceRow {
                    marker: format!("{}.", choice_letter(i)),
                    text: option.clone(),
                    selected: chosen == Some(option.as_str()),
                })
                .collect();
            QuestionView::Choices { prompt, rows }
        }
        QuestionKind::TrueFalse => {
            let chosen = answer.and_then(Answer::as_bool);
            let row = |value: bool| ChoiceRow {
                marker: String::new(),
                text: Answer::Bool(value).to_string(),
                selected: chosen == Some(value),
            };
            QuestionView::TrueFalse {
                prompt,
                rows: [row(true), row(false)],
            }
        }
        QuestionKind::ShortAnswer => QuestionView::FreeText {
            prompt,
            text: answer.and_then(Answer::as_text).unwrap_or_default().to_string(),
        },
        QuestionKind::Unknown(kind) => QuestionView::Unsupported {
            prompt,
            kind: kind.clone(),
        },
    }
}

/// Number of selectable rows the question offers.
pub fn choice_count(question: &Question) -> usize {
    match question.kind {
        QuestionKind::MultipleChoice => question.options.len(),
        QuestionKind::TrueFalse => 2,
        QuestionKind::ShortAnswer | QuestionKind::Unknown(_) => 0,
    }
}

/// The answer produced by selecting row `index`, if that row exists.
pub fn choice_answer(question: &Question, index: usize) -> Option<Answer> {
    match question.kind {
        QuestionKind::MultipleChoice => question.options.get(index).cloned().map(Answer::Text),
        QuestionKind::TrueFalse => match index {
            0 => Some(Answer::Bool(true)),
            1 => Some(Answer::Bool(false)),
            _ => None,
        },
        QuestionKind::ShortAnswer | QuestionKind::Unknown(_) => None,
    }
}

/// Row index matching a letter key (`a`/`A` → 0) for lettered questions,
/// or `t`/`f` for true/false.
pub fn choice_for_key(question: &Question, key: char) -> Option<usize> {
    match question.kind {
        QuestionKind::MultipleChoice => {
            let upper = key.to_ascii_uppercase();
            let index = (upper as usize).checked_sub('A' as usize)?;
            (upper.is_ascii_uppercase() && index < question.options.len()).then_some(index)
        }
        QuestionKind::TrueFalse => match key.to_ascii_lowercase() {
            't' => Some(0),
            'f' => Some(1),
            _ => None,
        },
        QuestionKind::ShortAnswer | QuestionKind::Unknown(_) => None,
    }
}
