// ⚙️ Configuration - farm constants and server settings
// Read from environment variables (a .env file is loaded first by the binaries)

use crate::error::{FarmError, FarmResult};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_COOP_COUNT: u32 = 7;
pub const DEFAULT_SALES_COOP: u32 = 1;
pub const DEFAULT_INVOICE_PREFIX: &str = "Fact";
pub const DEFAULT_INVOICE_DIGITS: usize = 4;
pub const DEFAULT_DB_PATH: &str = "coops.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Domain constants for the rotation pipeline and invoicing
#[derive(Debug, Clone, PartialEq)]
pub struct FarmConfig {
    /// Number of coop slots in the rotation pipeline
    pub coop_count: u32,
    /// Coop that invoices deduct sold birds from (the oldest batch)
    pub sales_coop: u32,
    pub invoice_prefix: String,
    /// Zero-padded width of the invoice sequence
    pub invoice_digits: usize,
}

impl Default for FarmConfig {
    fn default() -> Self {
        FarmConfig {
            coop_count: DEFAULT_COOP_COUNT,
            sales_coop: DEFAULT_SALES_COOP,
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            invoice_digits: DEFAULT_INVOICE_DIGITS,
        }
    }
}

impl FarmConfig {
    pub fn from_env() -> FarmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> FarmResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FarmConfig::default();

        let config = FarmConfig {
            coop_count: parse_var(&lookup, "COOP_COUNT")?.unwrap_or(defaults.coop_count),
            sales_coop: parse_var(&lookup, "SALES_COOP")?.unwrap_or(defaults.sales_coop),
            invoice_prefix: lookup("INVOICE_PREFIX").unwrap_or(defaults.invoice_prefix),
            invoice_digits: parse_var(&lookup, "INVOICE_DIGITS")?
                .unwrap_or(defaults.invoice_digits),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FarmResult<()> {
        if self.coop_count == 0 {
            return Err(FarmError::InvalidConfig(
                "COOP_COUNT must be at least 1".to_string(),
            ));
        }
        if self.sales_coop < 1 || self.sales_coop > self.coop_count {
            return Err(FarmError::InvalidConfig(format!(
                "SALES_COOP must be between 1 and {}, got {}",
                self.coop_count, self.sales_coop
            )));
        }
        if self.invoice_prefix.trim().is_empty() {
            return Err(FarmError::InvalidConfig(
                "INVOICE_PREFIX must not be empty".to_string(),
            ));
        }
        if self.invoice_digits == 0 || self.invoice_digits > 12 {
            return Err(FarmError::InvalidConfig(format!(
                "INVOICE_DIGITS must be between 1 and 12, got {}",
                self.invoice_digits
            )));
        }
        Ok(())
    }
}

/// Where the binaries find the database and how the server listens
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub bind_addr: String,
    /// Directory of a prebuilt dashboard UI to serve at `/`
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        ServerConfig {
            db_path: lookup("COOP_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            bind_addr: lookup("COOP_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            static_dir: lookup("COOP_STATIC_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> FarmResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            FarmError::InvalidConfig(format!("{} is not a valid number: '{}'", key, raw))
        }),
    }
}
