//! Prompts for the learning pass over pending items.
//!
//! Each pending item is shown once, either as a multiple-choice question
//! (pick the meaning of the headword) or as a fill-in question (type the
//! headword from its meaning and a masked hint). Either way, answering
//! completes the pass.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::LexicalPayload;

/// Multiple choice needs the target plus this many other items to draw from.
pub const MIN_ITEMS_FOR_CHOICE: usize = 4;

/// Maximum number of wrong meanings offered next to the right one.
pub const MAX_DISTRACTORS: usize = 3;

/// One option of a multiple-choice prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptKind {
    /// Pick the meaning of `payload.word` among shuffled choices.
    MultipleChoice { choices: Vec<Choice> },
    /// Type `payload.word` given its meaning and a masked hint.
    FillIn { hint: String },
}

/// A learner's response to a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Zero-based index into the prompt's choices.
    Choice(usize),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub payload: LexicalPayload,
    pub kind: PromptKind,
}

impl Prompt {
    /// Build a prompt for `target`.
    ///
    /// `pool` is every item of the learning pass, the target included; other
    /// items' meanings serve as distractors. Multiple choice is picked at
    /// random once the pool holds at least [`MIN_ITEMS_FOR_CHOICE`] items,
    /// otherwise the prompt is always fill-in.
    pub fn build<R: Rng + ?Sized>(
        target: &LexicalPayload,
        pool: &[&LexicalPayload],
        rng: &mut R,
    ) -> Self {
        let others: Vec<&LexicalPayload> = pool
            .iter()
            .copied()
            .filter(|p| *p != target)
            .collect();

        let kind = if pool.len() >= MIN_ITEMS_FOR_CHOICE && !others.is_empty() && rng.random_bool(0.5)
        {
            let mut choices = vec![Choice {
                text: target.meaning.clone(),
                correct: true,
            }];
            choices.extend(
                others
                    .choose_multiple(rng, MAX_DISTRACTORS)
                    .map(|p| Choice {
                        text: p.meaning.clone(),
                        correct: false,
                    }),
            );
            choices.shuffle(rng);
            PromptKind::MultipleChoice { choices }
        } else {
            return Prompt::fill_in(target);
        };

        Prompt {
            payload: target.clone(),
            kind,
        }
    }

    /// A fill-in prompt for `target`, no randomness involved.
    pub fn fill_in(target: &LexicalPayload) -> Self {
        Prompt {
            payload: target.clone(),
            kind: PromptKind::FillIn {
                hint: mask_word(&target.word),
            },
        }
    }

    /// Whether `answer` is right. Answers of the wrong shape are wrong.
    pub fn check(&self, answer: &Answer) -> bool {
        match (&self.kind, answer) {
            (PromptKind::MultipleChoice { choices }, Answer::Choice(i)) => {
                choices.get(*i).is_some_and(|c| c.correct)
            }
            (PromptKind::FillIn { .. }, Answer::Text(text)) => {
                check_fill_in(&self.payload.word, text)
            }
            _ => false,
        }
    }

    /// The text that answers this prompt correctly.
    pub fn solution(&self) -> &str {
        match self.kind {
            PromptKind::MultipleChoice { .. } => &self.payload.meaning,
            PromptKind::FillIn { .. } => &self.payload.word,
        }
    }
}

/// Hide most letters of `word`.
///
/// The first and last letters stay visible, as does every third letter
/// starting at index 2. Words of one or two letters show only the first.
///
/// ```
/// use lexis_core::prompt::mask_word;
/// assert_eq!(mask_word("elephant"), "e_e__a_t");
/// assert_eq!(mask_word("go"), "g_");
/// ```
pub fn mask_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let len = chars.len();
    match len {
        0 => String::new(),
        1 | 2 => {
            let mut masked = String::with_capacity(len);
            masked.push(chars[0]);
            masked.extend(std::iter::repeat_n('_', len - 1));
            masked
        }
        _ => chars
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let visible = i == 0 || i == len - 1 || (i >= 2 && (i - 2) % 3 == 0);
                if visible {
                    c
                } else {
                    '_'
                }
            })
            .collect(),
    }
}

/// Fill-in answers ignore surrounding whitespace and case.
pub fn check_fill_in(expected: &str, given: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}
