use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const WHEEL_OF_CUTE: [&str; 6] = [
    "Back hug",
    "Movie night",
    "You pick dessert",
    "I cook",
    "One long phone call",
    "You get a surprise",
];

pub fn spin_wheel<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    WHEEL_OF_CUTE.choose(rng).copied().unwrap_or(WHEEL_OF_CUTE[0])
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("'{0}' is not one of the options")]
    UnknownOption(String),
}

/// A single multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default = "default_question")]
    pub question: String,
    #[serde(default = "default_options")]
    pub options: Vec<String>,
    #[serde(default = "default_answer")]
    pub answer: String,
}

impl Default for Quiz {
    fn default() -> Self {
        Self {
            question: default_question(),
            options: default_options(),
            answer: default_answer(),
        }
    }
}

fn default_question() -> String {
    "What is my favorite snack?".to_string()
}

fn default_options() -> Vec<String> {
    ["Chips", "Chocolate", "Fruit", "Samosa"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_answer() -> String {
    "Chocolate".to_string()
}

fn same_choice(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl Quiz {
    /// Whether `choice` is the right answer; `choice` must name an option
    pub fn check(&self, choice: &str) -> Result<bool, QuizError> {
        if !self.options.iter().any(|o| same_choice(o, choice)) {
            return Err(QuizError::UnknownOption(choice.to_string()));
        }
        Ok(same_choice(&self.answer, choice))
    }
}
