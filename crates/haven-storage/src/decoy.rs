//! Decoy facade shown after a decoy PIN
//!
//! Looks like the real evidence list (same summary type, plausible
//! entries) but is built entirely in memory. It holds no store handles, so
//! nothing reachable from it can read a credential or a real record.

use crate::{EvidenceKind, EvidenceSummary};
use once_cell::sync::Lazy;

struct DecoyEntry {
    kind: EvidenceKind,
    title: &'static str,
    body: &'static str,
    days_ago: i64,
}

static DECOY_ENTRIES: Lazy<Vec<DecoyEntry>> = Lazy::new(|| {
    vec![
        DecoyEntry {
            kind: EvidenceKind::Note,
            title: "Groceries",
            body: "milk, eggs, rice, tomatoes, bread",
            days_ago: 1,
        },
        DecoyEntry {
            kind: EvidenceKind::Note,
            title: "Dentist",
            body: "Thursday 3:30, bring insurance card",
            days_ago: 4,
        },
        DecoyEntry {
            kind: EvidenceKind::Note,
            title: "Birthday ideas",
            body: "scarf, cookbook, concert tickets",
            days_ago: 12,
        },
    ]
});

const MS_PER_DAY: i64 = 86_400_000;

/// Harmless stand-in for the evidence vault
pub struct DecoyFacade {
    created_at: i64,
}

impl DecoyFacade {
    /// Build the facade, dating entries relative to now
    pub fn new() -> Self {
        Self::at(chrono::Utc::now().timestamp_millis())
    }

    /// Build the facade, dating entries relative to `now_ms`
    pub fn at(now_ms: i64) -> Self {
        Self { created_at: now_ms }
    }

    fn id(index: usize) -> String {
        // Stable, UUID-shaped ids so the listing matches the real one.
        format!("00000000-0000-4000-8000-{:012x}", index + 1)
    }

    /// Entries in the same shape and order as the real listing
    pub fn list_records(&self) -> Vec<EvidenceSummary> {
        DECOY_ENTRIES
            .iter()
            .enumerate()
            .map(|(index, entry)| EvidenceSummary {
                id: Self::id(index),
                kind: entry.kind,
                created_at: self.created_at - entry.days_ago * MS_PER_DAY,
                title: Some(entry.title.to_string()),
                geo_tag: None,
                duration_secs: None,
            })
            .collect()
    }

    /// Content of a decoy entry
    pub fn reveal_record(&self, id: &str) -> Option<&'static str> {
        DECOY_ENTRIES
            .iter()
            .enumerate()
            .find(|(index, _)| Self::id(*index) == id)
            .map(|(_, entry)| entry.body)
    }
}

impl Default for DecoyFacade {
    fn default() -> Self {
        Self::new()
    }
}
