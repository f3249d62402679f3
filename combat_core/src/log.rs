//! Battle feed - human-readable lines for the player

use std::collections::VecDeque;

/// Bounded feed of battle lines; the oldest lines are dropped past capacity
#[derive(Debug, Clone)]
pub struct BattleLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl BattleLog {
    pub fn new(capacity: usize) -> Self {
        BattleLog {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "battle_feed", "{}", line);
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|s| s.as_str())
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(|s| s.as_str())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_oldest_past_capacity() {
        let mut log = BattleLog::new(2);
        log.push("one");
        log.push("two");
        log.push("three");

        assert_eq!(log.len(), 2);
        assert_eq!(log.lines().collect::<Vec<_>>(), vec!["two", "three"]);
        assert_eq!(log.last(), Some("three"));
    }
}
