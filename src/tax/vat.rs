//! VAT rate used to recognise bank payments of VAT-inclusive bills
//!
//! Expenses are often entered net of VAT while the bank shows the gross
//! payment. The matcher therefore also compares a transaction against the
//! expense amount uplifted by the business's VAT rate.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{ReconciliationError, ReconciliationResult};

/// VAT rate as a percentage (e.g. 20 for 20%)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BigDecimal", into = "BigDecimal")]
pub struct VatRate {
    percentage: BigDecimal,
}

impl VatRate {
    /// Create a VAT rate from a percentage
    pub fn new(percentage: BigDecimal) -> ReconciliationResult<Self> {
        let rate = Self { percentage };
        rate.validate()?;
        Ok(rate)
    }

    /// The UK standard rate, 20%
    pub fn standard() -> Self {
        Self {
            percentage: BigDecimal::from(20),
        }
    }

    pub fn percentage(&self) -> &BigDecimal {
        &self.percentage
    }

    /// Validate that the rate is a percentage between 0 and 100
    pub fn validate(&self) -> ReconciliationResult<()> {
        if self.percentage < BigDecimal::from(0) || self.percentage > BigDecimal::from(100) {
            return Err(ReconciliationError::Config(format!(
                "VAT rate must be between 0 and 100 percent, got {}",
                self.percentage
            )));
        }
        Ok(())
    }

    /// Factor that turns a net amount into a gross amount (1.2 at 20%)
    pub fn multiplier(&self) -> BigDecimal {
        BigDecimal::from(1) + &self.percentage / BigDecimal::from(100)
    }

    /// Gross amount for a net amount
    pub fn uplift(&self, net_amount: &BigDecimal) -> BigDecimal {
        net_amount * self.multiplier()
    }

}

impl TryFrom<BigDecimal> for VatRate {
    type Error = ReconciliationError;

    fn try_from(percentage: BigDecimal) -> Result<Self, Self::Error> {
        Self::new(percentage)
    }
}

impl From<VatRate> for BigDecimal {
    fn from(rate: VatRate) -> Self {
        rate.percentage
    }
}

impl Default for VatRate {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for VatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.percentage.with_scale(0);
        if whole == self.percentage {
            write!(f, "{}%", whole)
        } else {
            write!(f, "{}%", self.percentage)
        }
    }
}

impl FromStr for VatRate {
    type Err = ReconciliationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let percentage = BigDecimal::from_str(s.trim().trim_end_matches('%')).map_err(|_| {
            ReconciliationError::Config(format!("Invalid VAT rate: '{}'", s))
        })?;
        Self::new(percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rate_multiplier() {
        let rate = VatRate::standard();
        assert_eq!(rate.multiplier(), BigDecimal::from_str("1.2").unwrap());
        assert_eq!(
            rate.uplift(&BigDecimal::from(100)),
            BigDecimal::from(120)
        );
        assert_eq!(rate.to_string(), "20%");
    }

    #[test]
    fn test_uplift_keeps_pence() {
        let rate = VatRate::standard();
        let net = BigDecimal::from_str("37.50").unwrap();
        assert_eq!(rate.uplift(&net), BigDecimal::from_str("45.00").unwrap());
    }

    #[test]
    fn test_parse_rate() {
        let rate: VatRate = "5%".parse().unwrap();
        assert_eq!(rate.percentage(), &BigDecimal::from(5));
        assert_eq!(rate.multiplier(), BigDecimal::from_str("1.05").unwrap());

        assert!("abc".parse::<VatRate>().is_err());
        assert!("150".parse::<VatRate>().is_err());
        assert!(VatRate::new(BigDecimal::from(-1)).is_err());
    }

    #[test]
    fn test_deserialize_validates_range() {
        let rate: VatRate = serde_json::from_str(r#""17.5""#).unwrap();
        assert_eq!(rate.percentage(), &BigDecimal::from_str("17.5").unwrap());
        assert_eq!(serde_json::to_string(&rate).unwrap(), r#""17.5""#);

        assert!(serde_json::from_str::<VatRate>(r#""150""#).is_err());
        assert!(serde_json::from_str::<VatRate>(r#""-5""#).is_err());
    }

    #[test]
    fn test_zero_rate_is_identity() {
        let rate = VatRate::new(BigDecimal::from(0)).unwrap();
        let amount = BigDecimal::from_str("99.99").unwrap();
        assert_eq!(rate.uplift(&amount), amount);
    }
}
