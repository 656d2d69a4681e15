//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading payroll
//! settings and tax bracket schedules from YAML files.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::TaxBracketTable;

use super::types::{BracketSchedule, JurisdictionMetadata, PayrollConfig, PayrollSettings, SettingsFile};

/// Loads and provides access to payroll configuration.
///
/// The `ConfigLoader` reads YAML configuration files from a directory
/// and provides methods to query settings and bracket schedules.
///
/// # Directory Structure
///
/// The configuration directory should have the following structure:
/// ```text
/// config/ng-paye/
/// ├── settings.yaml        # Jurisdiction metadata and named rates
/// └── tax_brackets/
///     ├── 2025-01-01.yaml  # Schedule effective from this date
///     └── 2026-01-01.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
/// use chrono::NaiveDate;
///
/// let loader = ConfigLoader::load("./config/ng-paye").unwrap();
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
/// let brackets = loader.brackets_effective_on(date).unwrap();
/// println!("{} tiers in force", brackets.brackets().len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: PayrollConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - `settings.yaml` or the `tax_brackets` directory is missing
    /// - Any file contains invalid YAML
    /// - Any required field is missing from the configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use payroll_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/ng-paye")?;
    /// # Ok::<(), payroll_engine::error::EngineError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings_file = Self::load_yaml::<SettingsFile>(&path.join("settings.yaml"))?;
        let schedules = Self::load_schedules(&path.join("tax_brackets"))?;

        info!(
            jurisdiction = %settings_file.jurisdiction.code,
            schedules = schedules.len(),
            "Loaded payroll configuration"
        );

        let config = PayrollConfig::new(
            settings_file.jurisdiction,
            settings_file.settings,
            schedules,
        );

        Ok(Self { config })
    }

    /// Wraps an already-built configuration.
    pub fn from_config(config: PayrollConfig) -> Self {
        Self { config }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all schedule files from the tax_brackets directory.
    fn load_schedules(dir: &Path) -> EngineResult<Vec<BracketSchedule>> {
        let dir_str = dir.display().to_string();

        if !dir.exists() {
            return Err(EngineError::ConfigNotFound { path: dir_str });
        }

        let entries = fs::read_dir(dir).map_err(|_| EngineError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut schedules = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                let schedule = Self::load_yaml::<BracketSchedule>(&path)?;

                // Validate eagerly so a broken file fails at load time.
                TaxBracketTable::new(schedule.brackets.clone()).map_err(|e| {
                    EngineError::ConfigParseError {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    }
                })?;

                schedules.push(schedule);
            }
        }

        Ok(schedules)
    }

    /// Returns the underlying payroll configuration.
    pub fn config(&self) -> &PayrollConfig {
        &self.config
    }

    /// Returns the jurisdiction metadata.
    pub fn jurisdiction(&self) -> &JurisdictionMetadata {
        self.config.jurisdiction()
    }

    /// Returns the payroll settings.
    pub fn settings(&self) -> &PayrollSettings {
        self.config.settings()
    }

    /// Gets the bracket table in force on a given date.
    ///
    /// Picks the most recent schedule effective on or before `date`. If every
    /// schedule starts after `date`, the most recent schedule is used and a
    /// warning is logged.
    ///
    /// # Returns
    ///
    /// Returns the validated table, or:
    /// - `BracketTableEmpty` if no schedules are configured, or the selected
    ///   schedule has no brackets
    /// - `MalformedBracketTable` if the selected schedule is inconsistent
    ///
    /// # Example
    ///
    /// ```no_run
    /// use payroll_engine::config::ConfigLoader;
    /// use chrono::NaiveDate;
    ///
    /// let loader = ConfigLoader::load("./config/ng-paye")?;
    /// let date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
    /// let table = loader.brackets_effective_on(date)?;
    /// # Ok::<(), payroll_engine::error::EngineError>(())
    /// ```
    pub fn brackets_effective_on(&self, date: NaiveDate) -> EngineResult<TaxBracketTable> {
        let schedules = self.config.schedules();

        // Schedules are sorted by effective_date ascending, so search from the end
        let schedule = match schedules.iter().rfind(|s| s.effective_date <= date) {
            Some(schedule) => schedule,
            None => {
                let latest = schedules.last().ok_or_else(|| EngineError::BracketTableEmpty {
                    period: date.to_string(),
                })?;
                warn!(
                    requested = %date,
                    fallback = %latest.effective_date,
                    "No bracket schedule in force on date, using most recent schedule"
                );
                latest
            }
        };

        TaxBracketTable::new(schedule.brackets.clone()).map_err(|e| match e {
            EngineError::BracketTableEmpty { .. } => EngineError::BracketTableEmpty {
                period: date.to_string(),
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/ng-paye"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.jurisdiction().code, "NG-PAYE");
        assert_eq!(loader.jurisdiction().currency, "NGN");
        assert_eq!(loader.config().schedules().len(), 2);
    }

    #[test]
    fn test_settings_loaded_correctly() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let settings = loader.settings();

        assert_eq!(settings.pension_rate(), dec("8"));
        assert_eq!(settings.nhis_rate(), dec("1.75"));
        assert_eq!(settings.rent_relief_cap(), dec("500000"));
        assert_eq!(settings.get("NHF_RATE"), Some(dec("2.5")));
    }

    #[test]
    fn test_2026_schedule_selected_for_2026_dates() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let table = loader.brackets_effective_on(date("2026-06-30")).unwrap();

        let brackets = table.brackets();
        assert_eq!(brackets.len(), 6);
        assert_eq!(brackets[0].income_to, Some(dec("800000")));
        assert_eq!(brackets[5].income_from, dec("50000000"));
        assert_eq!(brackets[5].income_to, None);
    }

    #[test]
    fn test_2025_schedule_selected_for_2025_dates() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let table = loader.brackets_effective_on(date("2025-12-31")).unwrap();

        assert_eq!(table.brackets()[0].income_to, Some(dec("300000")));
        assert_eq!(table.brackets()[5].income_from, dec("3200000"));
    }

    #[test]
    fn test_date_before_all_schedules_falls_back_to_latest() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let table = loader.brackets_effective_on(date("2019-01-31")).unwrap();

        assert_eq!(table.brackets()[0].income_to, Some(dec("800000")));
    }

    #[test]
    fn test_no_schedules_is_bracket_table_empty() {
        let loader = ConfigLoader::from_config(PayrollConfig::new(
            JurisdictionMetadata {
                code: "TEST".to_string(),
                name: "Test".to_string(),
                currency: "NGN".to_string(),
                source_url: None,
            },
            PayrollSettings::new(),
            vec![],
        ));

        match loader.brackets_effective_on(date("2026-01-31")) {
            Err(EngineError::BracketTableEmpty { period }) => assert_eq!(period, "2026-01-31"),
            other => panic!("Expected BracketTableEmpty, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("./nonexistent/path");
        assert!(result.is_err());

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("settings.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }
}
