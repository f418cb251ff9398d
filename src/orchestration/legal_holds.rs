use dashmap::DashMap;

use crate::models::{DataCategory, LegalHold};

/// Active legal holds keyed by (subject, category)
#[derive(Debug, Default)]
pub struct LegalHoldRegistry {
    holds: DashMap<(String, DataCategory), LegalHold>,
}

impl LegalHoldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place or replace a hold; returns the hold it replaced
    pub fn place(&self, hold: LegalHold) -> Option<LegalHold> {
        self.holds
            .insert((hold.subject_id.clone(), hold.category), hold)
    }

    pub fn release(&self, subject_id: &str, category: DataCategory) -> Option<LegalHold> {
        self.holds
            .remove(&(subject_id.to_string(), category))
            .map(|(_, hold)| hold)
    }

    pub fn is_held(&self, subject_id: &str, category: DataCategory) -> bool {
        self.holds.contains_key(&(subject_id.to_string(), category))
    }

    pub fn holds_for(&self, subject_id: &str) -> Vec<LegalHold> {
        let mut holds: Vec<LegalHold> = self
            .holds
            .iter()
            .filter(|entry| entry.key().0 == subject_id)
            .map(|entry| entry.value().clone())
            .collect();
        holds.sort_by_key(|hold| hold.placed_at);
        holds
    }

    pub fn len(&self) -> usize {
        self.holds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holds.is_empty()
    }
}
