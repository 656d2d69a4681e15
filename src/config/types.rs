//! Configuration types for payroll calculation.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calculation::MAX_RESOLUTION_ROUNDS;
use crate::models::TaxBracket;

/// Metadata about the tax jurisdiction a configuration describes.
#[derive(Debug, Clone, Deserialize)]
pub struct JurisdictionMetadata {
    /// Short code for the configuration (e.g., "NG-PAYE").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// ISO 4217 currency code of all amounts.
    pub currency: String,
    /// URL to the governing legislation.
    #[serde(default)]
    pub source_url: Option<String>,
}

/// settings.yaml file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsFile {
    /// Jurisdiction metadata.
    pub jurisdiction: JurisdictionMetadata,
    /// Named numeric settings.
    #[serde(default)]
    pub settings: PayrollSettings,
}

/// Named numeric payroll settings.
///
/// Settings are a plain key to value map so new statutory rates can be added
/// without code changes. The accessors below return typed defaults for the
/// keys the engine itself uses when the key is absent.
///
/// # Example
///
/// ```
/// use payroll_engine::config::PayrollSettings;
/// use rust_decimal::Decimal;
///
/// let settings = PayrollSettings::new().with(PayrollSettings::PENSION_RATE, Decimal::from(10));
/// assert_eq!(settings.pension_rate(), Decimal::from(10));
/// assert_eq!(settings.rent_relief_cap(), Decimal::from(500_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayrollSettings {
    values: BTreeMap<String, Decimal>,
}

impl PayrollSettings {
    /// Employee pension contribution rate, percent of pensionable pay.
    pub const PENSION_RATE: &'static str = "PENSION_RATE";
    /// Health insurance rate, percent of annual gross, granted as relief.
    pub const NHIS_RATE: &'static str = "NHIS_RATE";
    /// Share of annual rent granted as relief, percent.
    pub const RENT_RELIEF_RATE: &'static str = "RENT_RELIEF_RATE";
    /// Maximum annual rent relief.
    pub const RENT_RELIEF_CAP: &'static str = "RENT_RELIEF_CAP";
    /// Cap on component resolution rounds.
    pub const MAX_RESOLUTION_ROUNDS: &'static str = "MAX_RESOLUTION_ROUNDS";

    /// Creates an empty settings map; every accessor returns its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the settings with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: Decimal) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Sets `key` to `value`.
    pub fn set(&mut self, key: impl Into<String>, value: Decimal) {
        self.values.insert(key.into(), value);
    }

    /// Returns the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.values.get(key).copied()
    }

    /// Returns the value for `key`, or `default` when absent.
    pub fn get_or(&self, key: &str, default: Decimal) -> Decimal {
        self.get(key).unwrap_or(default)
    }

    /// Pension rate in percent (default 8).
    pub fn pension_rate(&self) -> Decimal {
        self.get_or(Self::PENSION_RATE, Decimal::from(8))
    }

    /// Health insurance relief rate in percent (default 1.75).
    pub fn nhis_rate(&self) -> Decimal {
        self.get_or(Self::NHIS_RATE, Decimal::new(175, 2))
    }

    /// Rent relief rate in percent (default 20).
    pub fn rent_relief_rate(&self) -> Decimal {
        self.get_or(Self::RENT_RELIEF_RATE, Decimal::from(20))
    }

    /// Rent relief cap (default 500,000).
    pub fn rent_relief_cap(&self) -> Decimal {
        self.get_or(Self::RENT_RELIEF_CAP, Decimal::from(500_000))
    }

    /// Maximum resolution rounds (default 5).
    ///
    /// Fractions are truncated; negative or out-of-range values fall back to
    /// the default.
    pub fn max_resolution_rounds(&self) -> u32 {
        self.get(Self::MAX_RESOLUTION_ROUNDS)
            .and_then(|value| value.trunc().to_u32())
            .unwrap_or(MAX_RESOLUTION_ROUNDS)
    }

    /// Iterates over all settings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.values.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

/// A bracket schedule effective from a given date.
#[derive(Debug, Clone, Deserialize)]
pub struct BracketSchedule {
    /// The first day this schedule applies.
    pub effective_date: NaiveDate,
    /// Free-text description of the schedule.
    #[serde(default)]
    pub description: Option<String>,
    /// The brackets, in any order.
    pub brackets: Vec<TaxBracket>,
}

/// The complete payroll configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct PayrollConfig {
    /// Jurisdiction metadata.
    metadata: JurisdictionMetadata,
    /// Named settings.
    settings: PayrollSettings,
    /// Bracket schedules (sorted oldest first).
    schedules: Vec<BracketSchedule>,
}

impl PayrollConfig {
    /// Creates a new PayrollConfig from its component parts.
    pub fn new(
        metadata: JurisdictionMetadata,
        settings: PayrollSettings,
        schedules: Vec<BracketSchedule>,
    ) -> Self {
        let mut sorted_schedules = schedules;
        sorted_schedules.sort_by(|a, b| a.effective_date.cmp(&b.effective_date));
        Self {
            metadata,
            settings,
            schedules: sorted_schedules,
        }
    }

    /// Returns the jurisdiction metadata.
    pub fn jurisdiction(&self) -> &JurisdictionMetadata {
        &self.metadata
    }

    /// Returns the settings.
    pub fn settings(&self) -> &PayrollSettings {
        &self.settings
    }

    /// Returns all bracket schedules, oldest first.
    pub fn schedules(&self) -> &[BracketSchedule] {
        &self.schedules
    }
}
