//! Matcher and ledger configuration

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::tax::VatRate;
use crate::types::{ReconciliationError, ReconciliationResult};

/// How the candidate generator picks among several qualifying records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First qualifying record in input order
    #[default]
    FirstEncountered,
    /// Closest date, then closest amount, then lowest id
    ClosestDate,
}

impl FromStr for TieBreak {
    type Err = ReconciliationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_encountered" => Ok(TieBreak::FirstEncountered),
            "closest" | "closest_date" => Ok(TieBreak::ClosestDate),
            other => Err(ReconciliationError::Config(format!(
                "Unknown tie-break strategy: '{}'",
                other
            ))),
        }
    }
}

/// Tunables for candidate generation and multi-select commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Two amounts agree when they differ by strictly less than this
    pub amount_tolerance: BigDecimal,
    /// Maximum day distance between an outflow and an expense
    pub expense_window_days: i64,
    /// Maximum day distance between an inflow and a paid invoice
    pub invoice_window_days: i64,
    /// Rate used for the VAT-inclusive expense match
    pub vat_rate: VatRate,
    pub tie_break: TieBreak,
    /// Refuse multi-select commits whose selected total differs from the
    /// transaction amount
    pub require_exact_match: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: BigDecimal::from(1) / BigDecimal::from(100),
            expense_window_days: 7,
            invoice_window_days: 30,
            vat_rate: VatRate::standard(),
            tie_break: TieBreak::default(),
            require_exact_match: false,
        }
    }
}

impl ReconciliationConfig {
    /// Load configuration from `RECONCILE_*` environment variables, falling
    /// back to defaults for anything unset
    pub fn from_env() -> ReconciliationResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ReconciliationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            amount_tolerance: parse_or(
                &lookup,
                "RECONCILE_AMOUNT_TOLERANCE",
                defaults.amount_tolerance,
            )?,
            expense_window_days: parse_or(
                &lookup,
                "RECONCILE_EXPENSE_WINDOW_DAYS",
                defaults.expense_window_days,
            )?,
            invoice_window_days: parse_or(
                &lookup,
                "RECONCILE_INVOICE_WINDOW_DAYS",
                defaults.invoice_window_days,
            )?,
            vat_rate: match lookup("RECONCILE_VAT_RATE") {
                Some(value) => value.parse()?,
                None => defaults.vat_rate,
            },
            tie_break: match lookup("RECONCILE_TIE_BREAK") {
                Some(value) => value.parse()?,
                None => defaults.tie_break,
            },
            require_exact_match: parse_or(
                &lookup,
                "RECONCILE_REQUIRE_EXACT_MATCH",
                defaults.require_exact_match,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the matcher cannot work with
    pub fn validate(&self) -> ReconciliationResult<()> {
        if self.amount_tolerance <= BigDecimal::from(0) {
            return Err(ReconciliationError::Config(
                "Amount tolerance must be positive".to_string(),
            ));
        }

        if self.expense_window_days < 0 || self.invoice_window_days < 0 {
            return Err(ReconciliationError::Config(
                "Matching windows cannot be negative".to_string(),
            ));
        }

        self.vat_rate.validate()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> ReconciliationResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ReconciliationError::Config(format!("Invalid value for {}: '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReconciliationConfig::default();
        assert_eq!(config.amount_tolerance, BigDecimal::from_str("0.01").unwrap());
        assert_eq!(config.expense_window_days, 7);
        assert_eq!(config.invoice_window_days, 30);
        assert_eq!(config.vat_rate, VatRate::standard());
        assert_eq!(config.tie_break, TieBreak::FirstEncountered);
        assert!(!config.require_exact_match);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ReconciliationConfig::from_lookup(lookup_from(&[
            ("RECONCILE_VAT_RATE", "5"),
            ("RECONCILE_TIE_BREAK", "closest"),
            ("RECONCILE_REQUIRE_EXACT_MATCH", "true"),
            ("RECONCILE_EXPENSE_WINDOW_DAYS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.vat_rate.percentage(), &BigDecimal::from(5));
        assert_eq!(config.tie_break, TieBreak::ClosestDate);
        assert!(config.require_exact_match);
        assert_eq!(config.expense_window_days, 10);
        assert_eq!(config.invoice_window_days, 30);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = ReconciliationConfig::from_lookup(lookup_from(&[(
            "RECONCILE_INVOICE_WINDOW_DAYS",
            "thirty",
        )]))
        .unwrap_err();
        assert!(matches!(err, ReconciliationError::Config(_)));

        let err = ReconciliationConfig::from_lookup(lookup_from(&[(
            "RECONCILE_EXPENSE_WINDOW_DAYS",
            "-1",
        )]))
        .unwrap_err();
        assert!(matches!(err, ReconciliationError::Config(_)));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ReconciliationConfig = serde_json::from_str(
            r#"{ "vat_rate": "15", "require_exact_match": true, "tie_break": "closest_date" }"#,
        )
        .unwrap();
        assert_eq!(config.vat_rate.percentage(), &BigDecimal::from(15));
        assert!(config.require_exact_match);
        assert_eq!(config.tie_break, TieBreak::ClosestDate);
        assert_eq!(config.expense_window_days, 7);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_vat() {
        let err = serde_json::from_str::<ReconciliationConfig>(r#"{ "vat_rate": "150" }"#)
            .unwrap_err();
        assert!(err.to_string().contains("VAT rate"));
    }

    #[test]
    fn test_zero_tolerance_is_invalid() {
        let config: ReconciliationConfig =
            serde_json::from_str(r#"{ "amount_tolerance": "0" }"#).unwrap();
        assert!(matches!(config.validate(), Err(ReconciliationError::Config(_))));
    }
}
