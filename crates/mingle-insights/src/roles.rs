use std::collections::HashMap;

use mingle_types::api::RoleCount;

/// Keyword buckets in priority order. The first bucket with any keyword
/// contained in the lowercased label wins.
const BUCKETS: &[(&str, &[&str])] = &[
    ("STUDENT", &["student", "undergrad", "intern"]),
    ("TECH & ENG", &["engineer", "developer", "dev", "stack"]),
    ("LEADERSHIP", &["manager", "director", "head", "lead", "vp"]),
    ("FOUNDER", &["founder", "owner", "partner"]),
    ("CREATIVE", &["design", "creative", "artist"]),
    ("MARKETING", &["marketing", "marketer", "social"]),
    ("SALES", &["sales", "bd", "business dev"]),
];

/// Map a free-text position onto the fixed taxonomy. Unmatched labels are
/// kept verbatim, upper-cased, as their own bucket.
pub fn normalize_role(label: &str) -> String {
    let lowered = label.trim().to_lowercase();
    let lowered = if lowered.is_empty() { "unknown".to_string() } else { lowered };

    BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(bucket, _)| bucket.to_string())
        .unwrap_or_else(|| lowered.to_uppercase())
}

/// Group raw `(position, count)` rows into buckets, summing counts, sorted
/// by count descending. Ties keep the order in which buckets first appeared.
pub fn normalize_roles(raw: &[RoleCount]) -> Vec<RoleCount> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<RoleCount> = Vec::new();

    for row in raw {
        let bucket = normalize_role(&row.position);
        match index.get(&bucket) {
            Some(&i) => grouped[i].count += row.count,
            None => {
                index.insert(bucket.clone(), grouped.len());
                grouped.push(RoleCount { position: bucket, count: row.count });
            }
        }
    }

    grouped.sort_by(|a, b| b.count.cmp(&a.count));
    grouped
}
