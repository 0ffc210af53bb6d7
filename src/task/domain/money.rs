//! Currency amounts and the platform commission split.
//!
//! Amounts are integers in the currency's minor unit so that commission
//! arithmetic never drifts.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper-case currency or token ticker such as `USD` or `USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    const MIN_LEN: usize = 2;
    const MAX_LEN: usize = 10;

    /// Creates a normalized currency code.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidCurrency`] unless the value is 2 to 10
    /// ASCII alphanumeric characters.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_uppercase();
        let is_valid = (Self::MIN_LEN..=Self::MAX_LEN).contains(&normalized.len())
            && normalized.chars().all(|c| c.is_ascii_alphanumeric());
        if !is_valid {
            return Err(TaskDomainError::InvalidCurrency(raw));
        }
        Ok(Self(normalized))
    }

    /// Returns the code as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount expressed in minor units of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor_units: u64,
    currency: CurrencyCode,
}

impl Money {
    /// Creates an amount.
    #[must_use]
    pub const fn new(minor_units: u64, currency: CurrencyCode) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor_units(&self) -> u64 {
        self.minor_units
    }

    /// Returns the currency.
    #[must_use]
    pub const fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Returns `true` when the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.minor_units == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.minor_units, self.currency)
    }
}

/// Platform commission rate in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionPercent(u8);

impl CommissionPercent {
    /// The platform rate applied to every task.
    pub const STANDARD: Self = Self(5);

    /// Creates a commission rate.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidCommissionPercent`] when the value
    /// exceeds 100.
    pub const fn new(percent: u8) -> Result<Self, TaskDomainError> {
        if percent > 100 {
            return Err(TaskDomainError::InvalidCommissionPercent(percent));
        }
        Ok(Self(percent))
    }

    /// Returns the rate in whole percent.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Splits a gross amount into platform commission and worker net.
    ///
    /// The commission is `floor(gross * percent / 100)`, so
    /// `commission + net == gross` always holds.
    #[must_use]
    pub fn split(self, gross: &Money) -> CommissionSplit {
        let scaled = u128::from(gross.minor_units()) * u128::from(self.0);
        let commission_units =
            u64::try_from(scaled.div_euclid(100)).unwrap_or(gross.minor_units());
        let net_units = gross.minor_units().saturating_sub(commission_units);
        CommissionSplit {
            gross: gross.clone(),
            commission: Money::new(commission_units, gross.currency().clone()),
            net: Money::new(net_units, gross.currency().clone()),
        }
    }
}

impl Default for CommissionPercent {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for CommissionPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Result of applying a commission rate to a gross amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    gross: Money,
    commission: Money,
    net: Money,
}

impl CommissionSplit {
    /// Returns the gross amount that was split.
    #[must_use]
    pub const fn gross(&self) -> &Money {
        &self.gross
    }

    /// Returns the platform commission.
    #[must_use]
    pub const fn commission(&self) -> &Money {
        &self.commission
    }

    /// Returns the worker's net payout.
    #[must_use]
    pub const fn net(&self) -> &Money {
        &self.net
    }
}
