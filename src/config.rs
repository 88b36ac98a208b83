use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub commission: CommissionConfig,
    pub settlement: SettlementConfig,
}

/// Platform commission rates in percent. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionConfig {
    /// Taken from repayment profit.
    pub profit_percent: Decimal,
    /// Booked when a project reaches its target. Zero disables it.
    pub funding_percent: Decimal,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            profit_percent: Decimal::from_int(5),
            funding_percent: Decimal::zero(),
        }
    }
}

/// Money handling rules shared by the ledger services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    pub min_investment: Decimal,
    /// Decimal places of the settlement currency.
    pub currency_scale: u32,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            min_investment: Decimal::from_int(100),
            currency_scale: 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let profit_percent = parse_percent(&env_map, "PROFIT_COMMISSION_PERCENT", "5")?;
        let funding_percent = parse_percent(&env_map, "FUNDING_COMMISSION_PERCENT", "0")?;

        let min_investment = parse_decimal(&env_map, "MIN_INVESTMENT", "100")?;
        if !min_investment.is_positive() {
            return Err(ConfigError::InvalidValue(
                "MIN_INVESTMENT".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let currency_scale = env_map
            .get("CURRENCY_SCALE")
            .map(|s| s.as_str())
            .unwrap_or("2")
            .parse::<u32>()
            .ok()
            .filter(|scale| *scale <= 8)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CURRENCY_SCALE".to_string(),
                    "must be an integer between 0 and 8".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            commission: CommissionConfig {
                profit_percent,
                funding_percent,
            },
            settlement: SettlementConfig {
                min_investment,
                currency_scale,
            },
        })
    }
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("not a decimal number: {}", raw))
    })
}

fn parse_percent(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let value = parse_decimal(env_map, key, default)?;
    if value.is_negative() || value > Decimal::hundred() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be between 0 and 100, got {}", value),
        ));
    }
    Ok(value)
}
