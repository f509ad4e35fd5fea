use thiserror::Error;

/// Failure of a data access operation.
///
/// "No matching row" is never an error: lookups return `Ok(None)` or an empty
/// list, so callers can tell an empty result from a failed query.
#[derive(Debug, Error)]
pub enum DbError {
	/// A unique constraint rejected the row (duplicate username, isbn, ...)
	#[error("row conflicts with an existing one")]
	Conflict,

	#[error("database error: {0}")]
	Persistence(#[from] sqlx::Error),
}

impl DbError {
	/// Classifies a failed insert, separating unique violations from the rest.
	pub fn from_insert(err: sqlx::Error) -> Self {
		match &err {
			sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict,
			_ => DbError::Persistence(err),
		}
	}
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("{0} is not set")]
	Missing(&'static str),

	#[error("invalid value for {key}: {reason}")]
	Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ImportError {
	#[error("could not find {0}")]
	Missing(String),

	#[error("could not read csv file: {0}")]
	Csv(#[from] csv::Error),

	#[error("expected an isbn,title,author,year header, found {0:?}")]
	BadHeader(String),

	#[error("none of the {0} rows could be read")]
	NoUsableRows(usize),

	#[error("database error: {0}")]
	Db(#[from] sqlx::Error),
}
