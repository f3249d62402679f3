//! Experience and level progression
//!
//! Level is a step function of cumulative experience:
//! - `xp_required_for_level_up(level) = 1000 + (level - 1) * 500 + floor(level / 5) * 250`
//! - level 1 -> 2 needs 1000 XP, 2 -> 3 needs 1500 XP

use serde::{Deserialize, Serialize};

/// XP needed to go from `level` to `level + 1`
pub fn xp_required_for_level_up(level: u32) -> u64 {
    let level = u64::from(level.max(1));
    1000 + (level - 1) * 500 + (level / 5) * 250
}

/// Total XP needed to reach `level` from level 1, saturating at `u64::MAX`
pub fn cumulative_xp_for_level(level: u32) -> u64 {
    u64::try_from(cumulative_wide(level)).unwrap_or(u64::MAX)
}

// Closed form of the requirement sum over levels 1..level; cannot overflow u128
fn cumulative_wide(level: u32) -> u128 {
    let n = u128::from(level.max(1) - 1);
    let (q, r) = (n / 5, n % 5);
    let per_fifth = 5 * q * q.saturating_sub(1) / 2 + q * (r + 1);
    1000 * n + 500 * n * n.saturating_sub(1) / 2 + 250 * per_fifth
}

/// Highest level whose cumulative requirement does not exceed `xp`, capped at `max_level`
pub fn level_from_total_xp(xp: u64, max_level: u32) -> u32 {
    let xp = u128::from(xp);
    let (mut low, mut high) = (1, max_level.max(1));
    while low < high {
        let mid = low + (high - low).div_ceil(2);
        if cumulative_wide(mid) <= xp {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}

/// Monotonic experience counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    total: u64,
}

impl Experience {
    pub fn new(total: u64) -> Self {
        Experience { total }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Add experience, returning the number of levels gained
    pub fn add(&mut self, amount: u64, max_level: u32) -> u32 {
        let before = self.level(max_level);
        self.total = self.total.saturating_add(amount);
        self.level(max_level) - before
    }

    pub fn level(&self, max_level: u32) -> u32 {
        level_from_total_xp(self.total, max_level)
    }

    /// XP still needed for the next level (0 at the cap)
    pub fn to_next_level(&self, max_level: u32) -> u64 {
        let level = self.level(max_level);
        if level >= max_level {
            return 0;
        }
        cumulative_xp_for_level(level + 1).saturating_sub(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_requirement_table() {
        assert_eq!(xp_required_for_level_up(1), 1000);
        assert_eq!(xp_required_for_level_up(2), 1500);
        assert_eq!(xp_required_for_level_up(3), 2000);
        assert_eq!(xp_required_for_level_up(5), 3250);
        assert_eq!(xp_required_for_level_up(10), 6000);
    }

    #[test]
    fn test_cumulative() {
        assert_eq!(cumulative_xp_for_level(1), 0);
        assert_eq!(cumulative_xp_for_level(2), 1000);
        assert_eq!(cumulative_xp_for_level(3), 2500);
        assert_eq!(cumulative_xp_for_level(4), 4500);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_from_total_xp(0, 200), 1);
        assert_eq!(level_from_total_xp(999, 200), 1);
        assert_eq!(level_from_total_xp(1000, 200), 2);
        assert_eq!(level_from_total_xp(2499, 200), 2);
        assert_eq!(level_from_total_xp(2500, 200), 3);
    }

    #[test]
    fn test_level_capped() {
        assert_eq!(level_from_total_xp(u64::MAX, 50), 50);
    }

    #[test]
    fn test_closed_form_matches_step_sum() {
        let mut total = 0u64;
        for level in 1..500 {
            assert_eq!(cumulative_xp_for_level(level), total, "level {}", level);
            total += xp_required_for_level_up(level);
        }
    }

    #[test]
    fn test_huge_level_cap_does_not_overflow() {
        assert_eq!(cumulative_xp_for_level(u32::MAX), u64::MAX);
        let level = level_from_total_xp(u64::MAX, u32::MAX);
        assert!(level > 1 && level < u32::MAX);
        assert!(cumulative_xp_for_level(level) < u64::MAX);
        assert_eq!(cumulative_xp_for_level(level + 1), u64::MAX);

        let mut xp = Experience::new(u64::MAX - 10);
        xp.add(u64::MAX, u32::MAX);
        assert_eq!(xp.total(), u64::MAX);
        assert_eq!(xp.level(u32::MAX), level);
    }

    #[test]
    fn test_experience_add_reports_levels() {
        let mut xp = Experience::default();
        assert_eq!(xp.add(999, 200), 0);
        assert_eq!(xp.add(1, 200), 1);
        assert_eq!(xp.add(4000, 200), 2);
        assert_eq!(xp.level(200), 4);
        assert_eq!(xp.to_next_level(200), cumulative_xp_for_level(5) - 5000);
    }

    proptest! {
        #[test]
        fn prop_level_round_trip(level in 1u32..200) {
            prop_assert_eq!(level_from_total_xp(cumulative_xp_for_level(level), 200), level);
        }

        #[test]
        fn prop_one_short_is_previous_level(level in 2u32..200) {
            prop_assert_eq!(level_from_total_xp(cumulative_xp_for_level(level) - 1, 200), level - 1);
        }
    }
}
