use std::collections::HashSet;

/// Points per shared skill and per shared interest.
pub const SKILL_WEIGHT: u32 = 10;
pub const INTEREST_WEIGHT: u32 = 5;

/// How many suggestions an attendee sees.
pub const MAX_MATCHES: usize = 3;

/// Lowercased, trimmed tag sets used for overlap scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagProfile {
    pub skills: Vec<String>,
    pub interests: Vec<String>,
}

impl TagProfile {
    pub fn new<S: AsRef<str>>(skills: &[S], interests: &[S]) -> Self {
        Self {
            skills: clean_tags(skills),
            interests: clean_tags(interests),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    pub score: u32,
    /// Shared skills first, then shared interests, in the requester's order.
    pub common_tags: Vec<String>,
}

/// Split a comma-joined tag string the way profile forms submit them.
pub fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase, trim and dedupe, keeping first-seen order.
fn clean_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

pub fn score(me: &TagProfile, them: &TagProfile) -> MatchScore {
    let common_skills: Vec<&String> = me.skills.iter().filter(|s| them.skills.contains(*s)).collect();
    let common_interests: Vec<&String> =
        me.interests.iter().filter(|i| them.interests.contains(*i)).collect();

    let score = SKILL_WEIGHT * common_skills.len() as u32 + INTEREST_WEIGHT * common_interests.len() as u32;

    MatchScore {
        score,
        common_tags: common_skills
            .into_iter()
            .chain(common_interests)
            .cloned()
            .collect(),
    }
}

/// Drop zero scores, sort by score descending (stable), keep the best
/// `MAX_MATCHES`.
pub fn top_matches<T>(scored: Vec<(T, MatchScore)>) -> Vec<(T, MatchScore)> {
    let mut kept: Vec<(T, MatchScore)> = scored.into_iter().filter(|(_, m)| m.score > 0).collect();
    kept.sort_by(|a, b| b.1.score.cmp(&a.1.score));
    kept.truncate(MAX_MATCHES);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_skill_scores_ten() {
        let me = TagProfile::new(&["rust", "go"], &[]);
        let them = TagProfile::new(&["Rust", "python"], &["hiking"]);
        let m = score(&me, &them);
        assert_eq!(m.score, 10);
        assert_eq!(m.common_tags, vec!["rust"]);
    }

    #[test]
    fn test_skills_before_interests() {
        let me = TagProfile::new(&["ml", "sql"], &["chess", "music"]);
        let them = TagProfile::new(&["sql", "ml"], &["music"]);
        let m = score(&me, &them);
        assert_eq!(m.score, 25);
        assert_eq!(m.common_tags, vec!["ml", "sql", "music"]);
    }

    #[test]
    fn test_repeated_tags_count_once() {
        let me = TagProfile::new(&["Rust", "rust", " RUST "], &["chess", "Chess"]);
        assert_eq!(me.skills, vec!["rust"]);
        let them = TagProfile::new(&["rust"], &["chess"]);
        let m = score(&me, &them);
        assert_eq!(m.score, 15);
        assert_eq!(m.common_tags, vec!["rust", "chess"]);
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags(" Rust, Go ,, "), vec!["Rust", "Go"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_top_matches() {
        let m = |score| MatchScore { score, common_tags: vec![] };
        let ranked = top_matches(vec![
            ("a", m(5)),
            ("b", m(0)),
            ("c", m(20)),
            ("d", m(10)),
            ("e", m(10)),
        ]);
        let names: Vec<&str> = ranked.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["c", "d", "e"]);
    }
}
