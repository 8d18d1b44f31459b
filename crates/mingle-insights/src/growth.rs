/// Round half toward positive infinity, the way dashboard percentages have
/// always been displayed (so -2.5 becomes -2, not -3).
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Percent change of the recent window against the previous one. A window
/// growing from nothing counts as 100%.
pub fn percent_change(recent: i64, previous: i64) -> i64 {
    if previous > 0 {
        round_half_up((recent - previous) as f64 / previous as f64 * 100.0)
    } else if recent > 0 {
        100
    } else {
        0
    }
}

/// Share of users ranked strictly below `rank`, as a whole percentage.
pub fn percentile(rank: i64, total_users: i64) -> i64 {
    if total_users > 1 {
        round_half_up((total_users - rank) as f64 / total_users as f64 * 100.0)
    } else {
        100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(12, 10), 20);
        assert_eq!(percent_change(5, 10), -50);
        assert_eq!(percent_change(3, 0), 100);
        assert_eq!(percent_change(0, 0), 0);
        assert_eq!(percent_change(39, 40), -2); // -2.5 rounds up
    }

    #[test]
    fn test_percentile() {
        assert_eq!(percentile(1, 1), 100);
        assert_eq!(percentile(1, 4), 75);
        assert_eq!(percentile(4, 4), 0);
    }
}
