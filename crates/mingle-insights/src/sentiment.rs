//! Word-polarity sentiment scoring against the AFINN-165 lexicon (integer
//! weights from -5 to 5) with single-token negation.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use mingle_types::api::ScoredComment;

/// Strings this short (after trimming) carry no usable signal.
pub const MIN_SCORABLE_LEN: usize = 3;

/// AFINN-165 word list, one `word<TAB>weight` pair per line.
const AFINN_165: &str = include_str!("../data/afinn-165.tsv");

static LEXICON: LazyLock<HashMap<&'static str, i32>> = LazyLock::new(|| parse_lexicon(AFINN_165));

/// Lines that do not split into a word and an integer weight are skipped.
fn parse_lexicon(raw: &str) -> HashMap<&str, i32> {
    raw.lines()
        .filter_map(|line| {
            let (word, weight) = line.split_once('\t')?;
            Some((word.trim(), weight.trim().parse().ok()?))
        })
        .collect()
}

static NEGATORS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "cant", "can't", "dont", "don't", "doesnt", "doesn't", "not", "non", "wont",
        "won't", "isnt", "isn't",
    ]
    .into_iter()
    .collect()
});

const PUNCTUATION: &[char] = &[
    '.', ',', '/', '#', '!', '?', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '_', '`',
    '"', '~', '(', ')',
];

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace(PUNCTUATION, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Sum of word polarities. A token directly after a negator counts with the
/// opposite sign.
pub fn score(text: &str) -> i32 {
    let tokens = tokenize(text);
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let weight = LEXICON.get(token.as_str()).copied().unwrap_or(0);
            if i > 0 && NEGATORS.contains(tokens[i - 1].as_str()) { -weight } else { weight }
        })
        .sum()
}

pub fn is_scorable(text: &str) -> bool {
    text.trim().chars().count() >= MIN_SCORABLE_LEN
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vibe {
    Electric,
    Positive,
    Neutral,
    Cold,
}

impl Vibe {
    pub fn for_score(avg: f64) -> Self {
        if avg >= 2.0 {
            Vibe::Electric
        } else if avg >= 0.5 {
            Vibe::Positive
        } else if avg >= -0.5 {
            Vibe::Neutral
        } else {
            Vibe::Cold
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Vibe::Electric => "Electric",
            Vibe::Positive => "Positive",
            Vibe::Neutral => "Neutral",
            Vibe::Cold => "Cold",
        }
    }
}

/// Where a piece of event text came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextSource {
    Feedback { rating: i64 },
    NetworkingNote,
}

impl TextSource {
    pub fn label(&self) -> String {
        match self {
            TextSource::Feedback { rating } => format!("Feedback (Rated {}/5)", rating),
            TextSource::NetworkingNote => "Networking Note".to_string(),
        }
    }
}

/// Score every scorable text independently, keeping its source label.
pub fn score_texts(texts: &[(String, TextSource)]) -> Vec<ScoredComment> {
    texts
        .iter()
        .filter(|(text, _)| is_scorable(text))
        .map(|(text, source)| ScoredComment {
            text: text.clone(),
            score: score(text),
            source: source.label(),
        })
        .collect()
}

/// Mean polarity over the scored items; 0 when nothing was scorable.
pub fn vibe_score(scored: &[ScoredComment]) -> f64 {
    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().map(|c| c.score as f64).sum::<f64>() / scored.len() as f64
}
