//! Exact-key candidate lookup.

use std::collections::BTreeMap;

use crate::keys::Keyed;

/// Outcome of looking a match key up among candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Exactly one candidate shares the key.
    Unique(String),
    Missing,
    /// More than one candidate shares the key; never auto-mapped.
    Ambiguous(usize),
}

impl MatchOutcome {
    /// The candidate key to auto-map to, if any.
    pub fn into_candidate(self) -> Option<String> {
        match self {
            MatchOutcome::Unique(key) => Some(key),
            MatchOutcome::Missing | MatchOutcome::Ambiguous(_) => None,
        }
    }

    fn from_keys(keys: Vec<&str>) -> Self {
        match keys.as_slice() {
            [] => MatchOutcome::Missing,
            [only] => MatchOutcome::Unique((*only).to_string()),
            many => MatchOutcome::Ambiguous(many.len()),
        }
    }
}

/// Candidate keys grouped by match key.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    by_match_key: BTreeMap<String, Vec<String>>,
}

impl CandidateIndex {
    pub fn from_keyed<T>(keyed: &[Keyed<'_, T>]) -> Self {
        let mut index = Self::default();
        for entry in keyed {
            index.insert(entry.match_key.clone(), entry.key.clone());
        }
        index
    }

    pub fn insert(&mut self, match_key: String, candidate_key: String) {
        self.by_match_key
            .entry(match_key)
            .or_default()
            .push(candidate_key);
    }

    /// Candidate keys sharing `match_key`, in insertion order.
    pub fn keys_for(&self, match_key: &str) -> &[String] {
        self.by_match_key
            .get(match_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn lookup(&self, match_key: &str) -> MatchOutcome {
        MatchOutcome::from_keys(self.keys_for(match_key).iter().map(String::as_str).collect())
    }

    /// Looks `match_key` up across several indexes as one universe.
    pub fn lookup_many(indexes: &[&CandidateIndex], match_key: &str) -> MatchOutcome {
        MatchOutcome::from_keys(
            indexes
                .iter()
                .flat_map(|index| index.keys_for(match_key))
                .map(String::as_str)
                .collect(),
        )
    }
}
