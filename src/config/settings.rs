//! Application configuration loading from config.toml
//!
//! Every section is optional; a missing file section falls back to the defaults below.
//! Times are written as `"HH:MM"` and weekdays as English names or abbreviations
//! (`"wed"`, `"Wednesday"`), both interpreted in the configured UTC offset.
//!
//! ```toml
//! [period]
//! cutover_weekday = "wed"
//! cutover_time = "10:00"
//! utc_offset_minutes = 60
//!
//! [orders]
//! min_quantity = 1
//! max_quantity = 100
//! removal_ttl_secs = 30
//!
//! [schedule]
//! reminder_time = "09:00"
//! digest_weekday = "wed"
//! digest_time = "09:30"
//!
//! [[products]]
//! name = "normal"
//! description = "Plain roll"
//! ```

use crate::{
    core::{order::QuantityLimits, period::Cutover, service::ServiceSettings},
    errors::{Error, Result},
};
use chrono::{FixedOffset, NaiveTime, Weekday};
use serde::Deserialize;
use std::{path::Path, time::Duration};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Weekly rollover
    pub period: PeriodConfig,
    /// Quantity bounds and removal confirmation window
    pub orders: OrdersConfig,
    /// Reminder and digest times
    pub schedule: ScheduleConfig,
    /// Products to seed when missing
    pub products: Vec<ProductConfig>,
}

/// `[period]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    /// Weekday the order window rolls over
    pub cutover_weekday: String,
    /// Local time of the rollover, `HH:MM`
    pub cutover_time: String,
    /// Offset of local time from UTC in minutes
    pub utc_offset_minutes: i32,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            cutover_weekday: "wed".to_string(),
            cutover_time: "10:00".to_string(),
            utc_offset_minutes: 60,
        }
    }
}

/// `[orders]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    /// Smallest quantity per item
    pub min_quantity: i64,
    /// Largest quantity per item
    pub max_quantity: i64,
    /// Seconds a removal waits for confirmation
    pub removal_ttl_secs: u64,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            min_quantity: 1,
            max_quantity: 100,
            removal_ttl_secs: 30,
        }
    }
}

/// `[schedule]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local time of the daily reminder, `HH:MM`
    pub reminder_time: String,
    /// Weekday of the digest
    pub digest_weekday: String,
    /// Local time of the digest, `HH:MM`
    pub digest_time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reminder_time: "09:00".to_string(),
            digest_weekday: "wed".to_string(),
            digest_time: "09:30".to_string(),
        }
    }
}

/// Configuration for a single product
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ProductConfig {
    /// Name users type when ordering
    pub name: String,
    /// Optional description shown in the product list
    pub description: Option<String>,
}

/// Parsed times for the scheduled jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSchedule {
    /// Daily reminder time
    pub reminder_time: NaiveTime,
    /// Digest weekday
    pub digest_weekday: Weekday,
    /// Digest time
    pub digest_time: NaiveTime,
    /// Offset all times are expressed in
    pub offset: FixedOffset,
}

impl Config {
    /// The configured UTC offset.
    ///
    /// # Errors
    /// Returns `Config` if the offset is out of range.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.period.utc_offset_minutes * 60).ok_or_else(|| Error::Config {
            message: format!(
                "utc_offset_minutes {} is out of range",
                self.period.utc_offset_minutes
            ),
        })
    }

    /// Builds the order service settings.
    ///
    /// # Errors
    /// Returns `Config` for an unparsable weekday, time or offset, or for inverted
    /// quantity bounds.
    pub fn service_settings(&self) -> Result<ServiceSettings> {
        let cutover = Cutover {
            weekday: parse_weekday(&self.period.cutover_weekday)?,
            time: parse_time(&self.period.cutover_time)?,
            offset: self.offset()?,
        };

        if self.orders.min_quantity < 1 || self.orders.min_quantity > self.orders.max_quantity {
            return Err(Error::Config {
                message: format!(
                    "Invalid quantity bounds {}-{}",
                    self.orders.min_quantity, self.orders.max_quantity
                ),
            });
        }

        Ok(ServiceSettings {
            cutover,
            limits: QuantityLimits {
                min: self.orders.min_quantity,
                max: self.orders.max_quantity,
            },
            removal_ttl: Duration::from_secs(self.orders.removal_ttl_secs),
        })
    }

    /// Builds the job schedule.
    ///
    /// # Errors
    /// Returns `Config` for an unparsable weekday, time or offset.
    pub fn job_schedule(&self) -> Result<JobSchedule> {
        Ok(JobSchedule {
            reminder_time: parse_time(&self.schedule.reminder_time)?,
            digest_weekday: parse_weekday(&self.schedule.digest_weekday)?,
            digest_time: parse_time(&self.schedule.digest_time)?,
            offset: self.offset()?,
        })
    }
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| Error::Config {
        message: format!("Invalid time '{value}' (expected HH:MM): {e}"),
    })
}

fn parse_weekday(value: &str) -> Result<Weekday> {
    value.trim().parse::<Weekday>().map_err(|_| Error::Config {
        message: format!("Invalid weekday '{value}'"),
    })
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `CONFIG_PATH` (default `./config.toml`).
///
/// A missing file is not an error; the defaults are used instead.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        tracing::warn!("No config file at {path}, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}
