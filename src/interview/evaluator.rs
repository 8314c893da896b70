//! Heuristic scoring of candidate answers.
//!
//! Every dimension is a plain keyword or length statistic over the candidate's
//! turns, so a score can always be explained by pointing at the transcript.

use crate::models::chat::Message;
use crate::models::interview::ScoreSet;

pub const TECHNICAL_TERMS: [&str; 14] = [
    "api",
    "function",
    "class",
    "database",
    "algorithm",
    "framework",
    "architecture",
    "deployment",
    "testing",
    "debug",
    "optimize",
    "scalable",
    "concurrent",
    "async",
];

pub const PROBLEM_SOLVING_TERMS: [&str; 8] = [
    "because",
    "therefore",
    "however",
    "solution",
    "approach",
    "method",
    "strategy",
    "implement",
];

pub const EXPERIENCE_TERMS: [&str; 8] = [
    "project",
    "worked",
    "implemented",
    "developed",
    "team",
    "company",
    "production",
    "deployed",
];

/// Technical terms a turn needs on average for full `technical_depth`.
const TERMS_PER_FULL_TURN: f64 = 3.0;
/// Average words per turn for full `communication`.
const WORDS_PER_FULL_TURN: f64 = 50.0;

/// Number of distinct `terms` occurring in `text` (already lower-cased).
fn count_terms(text: &str, terms: &[&str]) -> usize {
    terms
        .iter()
        .filter(|term| text.contains(*term))
        .count()
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

/// Scores the candidate-authored turns of `messages`. Interviewer turns are
/// ignored; with no candidate turns every dimension is zero.
pub fn evaluate(messages: &[Message]) -> ScoreSet {
    let answers: Vec<String> = messages
        .iter()
        .filter(|m| m.is_candidate())
        .map(|m| m.content.to_lowercase())
        .collect();

    if answers.is_empty() {
        return ScoreSet::zero();
    }

    let turns = answers.len() as f64;
    let mut technical_terms = 0usize;
    let mut total_words = 0usize;
    let mut reasoned_turns = 0usize;
    let mut experienced_turns = 0usize;

    for answer in &answers {
        technical_terms += count_terms(answer, &TECHNICAL_TERMS);
        total_words += answer.split_whitespace().count();
        if contains_any(answer, &PROBLEM_SOLVING_TERMS) {
            reasoned_turns += 1;
        }
        if contains_any(answer, &EXPERIENCE_TERMS) {
            experienced_turns += 1;
        }
    }

    ScoreSet::new(
        (technical_terms as f64) / (turns * TERMS_PER_FULL_TURN),
        (total_words as f64) / turns / WORDS_PER_FULL_TURN,
        (reasoned_turns as f64) / turns,
        (experienced_turns as f64) / turns
    )
}
