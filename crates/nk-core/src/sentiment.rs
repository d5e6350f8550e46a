//! Reaction content classification.
//!
//! Only a small explicit vocabulary is recognized; everything else is
//! neutral, which the scorer counts as positive at an attenuated weight.

/// Sentiment of a reaction's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

const POSITIVE: &[&str] = &["+", "👍", "❤️", "🔥", "💯", "⚡", "🤙"];
const NEGATIVE: &[&str] = &["-", "👎"];

/// Classify reaction content into exactly one sentiment.
pub fn classify(content: &str) -> Sentiment {
    if NEGATIVE.contains(&content) {
        Sentiment::Negative
    } else if POSITIVE.contains(&content) {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}
