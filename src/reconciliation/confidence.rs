//! Confidence tiers for suggested matches

use serde::{Deserialize, Serialize};
use std::fmt;

use super::candidates::{MatchKind, SuggestedMatch};

const EXPENSE_HIGH_MAX_GAP: i64 = 2;
const EXPENSE_MEDIUM_MAX_GAP: i64 = 5;
const INVOICE_HIGH_MAX_GAP: i64 = 7;
const INVOICE_MEDIUM_MAX_GAP: i64 = 14;

/// Coarse quality label for a suggestion; ordered `Low < Medium < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Classify a match from the rule that fired and the day gap
    ///
    /// Only an exact expense amount can reach `High`; a VAT-inclusive match
    /// tops out at `Medium`.
    pub fn classify(kind: MatchKind, day_gap: i64) -> Self {
        match kind {
            MatchKind::ExactAmount if day_gap <= EXPENSE_HIGH_MAX_GAP => Confidence::High,
            MatchKind::ExactAmount | MatchKind::VatUplift if day_gap <= EXPENSE_MEDIUM_MAX_GAP => {
                Confidence::Medium
            }
            MatchKind::ExactAmount | MatchKind::VatUplift => Confidence::Low,
            MatchKind::InvoiceTotal if day_gap <= INVOICE_HIGH_MAX_GAP => Confidence::High,
            MatchKind::InvoiceTotal if day_gap <= INVOICE_MEDIUM_MAX_GAP => Confidence::Medium,
            MatchKind::InvoiceTotal => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Score a single suggestion
pub fn score_confidence(suggestion: &SuggestedMatch) -> Confidence {
    Confidence::classify(suggestion.kind, suggestion.day_gap)
}

/// A suggestion together with its confidence tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub suggestion: SuggestedMatch,
    pub confidence: Confidence,
}

/// Score every suggestion and order them high confidence first
///
/// The sort is stable, so suggestions within a tier keep generation order.
pub fn score_all(suggestions: Vec<SuggestedMatch>) -> Vec<ScoredMatch> {
    let mut scored: Vec<ScoredMatch> = suggestions
        .into_iter()
        .map(|suggestion| ScoredMatch {
            confidence: score_confidence(&suggestion),
            suggestion,
        })
        .collect();
    scored.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    scored
}
