use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub strict_shipment_transitions: bool,
    pub gp_subscription_days: i64,
    pub gp_subscription_amount: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            strict_shipment_transitions: parse_or_default(
                "STRICT_SHIPMENT_TRANSITIONS",
                defaults.strict_shipment_transitions,
            )?,
            gp_subscription_days: parse_or_default(
                "GP_SUBSCRIPTION_DAYS",
                defaults.gp_subscription_days,
            )?,
            gp_subscription_amount: parse_or_default(
                "GP_SUBSCRIPTION_AMOUNT",
                defaults.gp_subscription_amount,
            )?,
        };

        if config.gp_subscription_days <= 0 {
            return Err(AppError::Internal(
                "invalid GP_SUBSCRIPTION_DAYS: must be > 0".to_string(),
            ));
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            strict_shipment_transitions: false,
            gp_subscription_days: 30,
            gp_subscription_amount: 5000.0,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
