use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_RATING_ENDPOINT: &str = "https://www.goodreads.com/book/review_counts.json";

#[derive(Debug, Clone)]
pub struct Config {
	pub database_url: String,
	pub rating_api_key: String,
	pub rating_endpoint: String,
	pub rating_timeout: Duration,
	pub bind_addr: String,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let timeout_secs: u64 = try_load(&lookup, "RATING_TIMEOUT_SECS", "5")?;
		if timeout_secs == 0 {
			return Err(ConfigError::Invalid {
				key: "RATING_TIMEOUT_SECS",
				reason: "must be at least 1".to_string(),
			});
		}

		Ok(Self {
			database_url: required(&lookup, "DATABASE_URL")?,
			rating_api_key: required(&lookup, "GOODREADS_API")?,
			rating_endpoint: try_load(&lookup, "RATING_ENDPOINT", DEFAULT_RATING_ENDPOINT)?,
			rating_timeout: Duration::from_secs(timeout_secs),
			bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:8080")?,
		})
	}
}

/// Reads just the database url, for tools that never talk to the rating service.
pub fn database_url() -> Result<String, ConfigError> {
	required(&|key: &str| env::var(key).ok(), "DATABASE_URL")
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	lookup(key)
		.filter(|value| !value.trim().is_empty())
		.ok_or(ConfigError::Missing(key))
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
	T::Err: Display,
{
	lookup(key)
		.unwrap_or_else(|| {
			info!("{key} not set, using default: {default}");
			default.to_string()
		})
		.parse()
		.map_err(|e: T::Err| ConfigError::Invalid {
			key,
			reason: e.to_string(),
		})
}
