use mingle_types::api::{RoleCount, RoleMatrix};

pub const COMPACT_SIZE: usize = 5;
pub const EXPANDED_SIZE: usize = 15;

const SELF_PAIR_BONUS: f64 = 1.5;

/// Predicted connection volume between role buckets, derived only from the
/// marginal counts: `floor(max(0, a * b / 10))`, times 1.5 on the diagonal.
/// This is a cheap affinity proxy; it never looks at observed connections.
///
/// `roles` is expected to be sorted already (see `roles::normalize_roles`);
/// the first `size` buckets are used.
pub fn connectivity_matrix(roles: &[RoleCount], size: usize) -> RoleMatrix {
    let top = &roles[..roles.len().min(size)];

    let cells = top
        .iter()
        .enumerate()
        .map(|(i, row)| {
            top.iter()
                .enumerate()
                .map(|(j, col)| predicted_volume(row.count, col.count, i == j))
                .collect()
        })
        .collect();

    RoleMatrix {
        labels: top.iter().map(|r| r.position.clone()).collect(),
        cells,
    }
}

fn predicted_volume(a: i64, b: i64, same_bucket: bool) -> i64 {
    let mut base = (a as f64 * b as f64) / 10.0;
    if same_bucket {
        base *= SELF_PAIR_BONUS;
    }
    base.max(0.0).floor() as i64
}
