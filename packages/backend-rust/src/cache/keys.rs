/// `day` is the learner's local day index; counters roll over with it.
pub fn user_stats_key(user_id: &str, day: i64) -> String {
    format!("user:{}:stats:{}", user_id, day)
}

pub fn today_stats_key(user_id: &str, day: i64) -> String {
    format!("user:{}:stats:today:{}", user_id, day)
}

pub fn levels_key(user_id: &str) -> String {
    format!("user:{}:levels", user_id)
}

/// Every cached aggregate that a review on `day` makes stale
pub fn review_invalidated_keys(user_id: &str, day: i64) -> [String; 3] {
    [
        user_stats_key(user_id, day),
        today_stats_key(user_id, day),
        levels_key(user_id),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_scoped_per_user() {
        assert_eq!(user_stats_key("u1", 20_000), "user:u1:stats:20000");
        assert_ne!(today_stats_key("u1", 7), today_stats_key("u2", 7));
        assert!(review_invalidated_keys("u1", 7)
            .iter()
            .all(|key| key.starts_with("user:u1:")));
    }

    #[test]
    fn test_daily_keys_roll_over_at_midnight() {
        assert_ne!(today_stats_key("u1", 20_000), today_stats_key("u1", 20_001));
        assert_ne!(user_stats_key("u1", 20_000), user_stats_key("u1", 20_001));
        assert!(review_invalidated_keys("u1", 20_001).contains(&today_stats_key("u1", 20_001)));
    }
}
