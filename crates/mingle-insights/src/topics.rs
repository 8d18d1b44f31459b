use std::collections::HashMap;

use mingle_types::api::Topic;

pub const MAX_TOPICS: usize = 10;

const STOP_WORDS: &[&str] = &[
    "the", "and", "is", "to", "in", "at", "of", "for", "with", "a", "i", "very", "good", "nice",
    "was", "this", "that", "via", "scanned", "from",
];

fn is_numeric(word: &str) -> bool {
    word.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Most frequent meaningful words across all notes.
pub fn top_topics<S: AsRef<str>>(notes: &[S], limit: usize) -> Vec<Topic> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<Topic> = Vec::new();

    for note in notes {
        let lowered = note.as_ref().to_lowercase();
        let words = lowered
            .split(|c: char| c.is_whitespace() || c == ',' || c == '.')
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w) && !is_numeric(w));

        for word in words {
            match index.get(word) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(word.to_string(), counts.len());
                    counts.push(Topic { text: word.to_string(), count: 1 });
                }
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_filters() {
        let notes = ["Talked about Rust and wasm", "rust, hiring. 2024 roadmap", "the rust meetup"];
        let topics = top_topics(&notes, MAX_TOPICS);
        assert_eq!(topics[0], Topic { text: "rust".to_string(), count: 3 });
        assert!(topics.iter().all(|t| t.text != "the" && t.text != "2024" && t.text != "and"));
        assert!(topics.iter().any(|t| t.text == "wasm"));
    }

    #[test]
    fn test_limit() {
        let notes = ["alpha bravo charlie delta"];
        assert_eq!(top_topics(&notes, 2).len(), 2);
    }
}
