//! Bounded, insertion-ordered shortlist of restaurants to decide between.

use wte_api_types::{Restaurant, RestaurantKey};

pub const DEFAULT_MAX_CANDIDATES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: RestaurantKey,
    pub name: String,
}

impl From<&Restaurant> for Candidate {
    fn from(restaurant: &Restaurant) -> Self {
        Self {
            key: restaurant.key(),
            name: restaurant.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    limit: usize,
}

impl Default for CandidateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_CANDIDATES)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: Vec::with_capacity(limit),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    pub fn contains(&self, key: &RestaurantKey) -> bool {
        self.items.iter().any(|c| &c.key == key)
    }

    /// Returns `false` without touching the set when it is already full.
    /// Adding a member again is accepted and changes nothing.
    pub fn add(&mut self, candidate: Candidate) -> bool {
        if self.contains(&candidate.key) {
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.items.push(candidate);
        true
    }

    pub fn remove(&mut self, key: &RestaurantKey) {
        self.items.retain(|c| &c.key != key);
    }

    /// Flips membership and reports whether the key is now in the set.
    pub fn toggle(&mut self, candidate: Candidate) -> bool {
        if self.contains(&candidate.key) {
            self.remove(&candidate.key);
            false
        } else {
            self.add(candidate)
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter()
    }

    /// Snapshot in insertion order, as handed to the decision engine.
    pub fn to_vec(&self) -> Vec<Candidate> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: &str) -> Candidate {
        Candidate {
            key: RestaurantKey(id.to_owned()),
            name: id.to_uppercase(),
        }
    }

    #[test]
    fn ninth_add_is_rejected() {
        let mut set = CandidateSet::new();
        for i in 0..8 {
            assert!(set.add(c(&format!("r{i}"))));
        }
        assert!(!set.add(c("r8")));
        assert_eq!(set.len(), 8);
        assert!(!set.contains(&RestaurantKey("r8".into())));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut set = CandidateSet::new();
        for id in ["z", "a", "m"] {
            set.add(c(id));
        }
        set.remove(&RestaurantKey("a".into()));
        set.add(c("b"));
        let keys: Vec<_> = set.iter().map(|c| c.key.0.as_str()).collect();
        assert_eq!(keys, vec!["z", "m", "b"]);
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let mut set = CandidateSet::new();
        set.add(c("a"));
        for id in ["a", "b"] {
            let before = set.contains(&RestaurantKey(id.into()));
            set.toggle(c(id));
            set.toggle(c(id));
            assert_eq!(set.contains(&RestaurantKey(id.into())), before);
        }
    }

    #[test]
    fn toggle_on_full_set_reports_rejection() {
        let mut set = CandidateSet::with_limit(2);
        set.add(c("a"));
        set.add(c("b"));
        assert!(!set.toggle(c("c")));
        assert_eq!(set.len(), 2);
        assert!(!set.toggle(c("a")));
        assert!(set.toggle(c("c")));
    }

    #[test]
    fn removing_absent_key_is_a_noop() {
        let mut set = CandidateSet::new();
        set.add(c("a"));
        set.remove(&RestaurantKey("zzz".into()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicate_add_does_not_grow() {
        let mut set = CandidateSet::new();
        assert!(set.add(c("a")));
        assert!(set.add(c("a")));
        assert_eq!(set.len(), 1);
    }
}
