//! Synthetic alias minting

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// First counter value. User aliases are assumed never to carry a
/// negative numeric suffix, so minted names cannot clash with them.
pub const ALIAS_COUNTER_START: i64 = -1;

/// Default prefix of minted aliases
pub const DEFAULT_ALIAS_PREFIX: &str = "alias";

/// Decreasing counter shared by every builder forked from one factory
/// call, so names stay unique across alternative plan branches.
#[derive(Debug, Clone)]
pub struct AliasGenerator {
    counter: Arc<AtomicI64>,
}

impl AliasGenerator {
    pub fn new() -> Self {
        Self::starting_at(ALIAS_COUNTER_START)
    }

    pub fn starting_at(start: i64) -> Self {
        Self {
            counter: Arc::new(AtomicI64::new(start)),
        }
    }

    /// Value the next candidate will use
    pub fn peek(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// `prefix` + counter, re-rolled while `taken` reports a clash.
    pub fn next(&self, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.counter.fetch_sub(1, Ordering::SeqCst);
            let candidate = format!("{}{}", prefix, id);
            if !taken(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for AliasGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_decreases() {
        let aliases = AliasGenerator::new();
        assert_eq!(aliases.next("alias", |_| false), "alias-1");
        assert_eq!(aliases.next("alias", |_| false), "alias-2");
        assert_eq!(aliases.next("sum", |_| false), "sum-3");
        assert_eq!(aliases.peek(), -4);
    }

    #[test]
    fn test_rerolls_on_collision() {
        let aliases = AliasGenerator::new();
        let name = aliases.next("alias", |c| c == "alias-1" || c == "alias-2");
        assert_eq!(name, "alias-3");
    }

    #[test]
    fn test_clones_share_counter() {
        let a = AliasGenerator::new();
        let b = a.clone();
        assert_eq!(a.next("x", |_| false), "x-1");
        assert_eq!(b.next("x", |_| false), "x-2");
    }

    #[test]
    fn test_deterministic_from_same_start() {
        let taken = |c: &str| c.ends_with("-2");
        let first: Vec<String> = {
            let g = AliasGenerator::starting_at(-1);
            (0..3).map(|_| g.next("a", taken)).collect()
        };
        let second: Vec<String> = {
            let g = AliasGenerator::starting_at(-1);
            (0..3).map(|_| g.next("a", taken)).collect()
        };
        assert_eq!(first, second);
        assert_eq!(first, vec!["a-1", "a-3", "a-4"]);
    }
}
