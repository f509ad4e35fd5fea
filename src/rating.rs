//! Client for the external rating service (Goodreads `review_counts.json`).
//!
//! Lookups are best effort: every failure is logged and reported as "no
//! external rating", never surfaced to the reader.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::RatingSummary;

#[derive(Debug, Error)]
pub enum RatingError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("rating service answered {0}")]
	Status(u16),

	#[error("no book in rating response")]
	NoBook,

	#[error("unparsable rating value: {0}")]
	BadValue(String),
}

#[derive(Debug, Deserialize)]
struct ReviewCounts {
	#[serde(default)]
	books: Vec<BookCounts>,
}

#[derive(Debug, Deserialize)]
struct BookCounts {
	average_rating: Option<NumOrText>,
	work_ratings_count: Option<NumOrText>,
}

// the service sends averages as "3.82" and counts as numbers, accept both spellings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumOrText {
	Num(f64),
	Text(String),
}

impl NumOrText {
	fn as_f64(&self) -> Result<f64, RatingError> {
		let (value, raw) = match self {
			NumOrText::Num(n) => (Some(*n), n.to_string()),
			NumOrText::Text(s) => (s.trim().parse::<f64>().ok(), s.clone()),
		};
		// "NaN" and "inf" parse as floats but are not ratings
		value.filter(|v| v.is_finite()).ok_or(RatingError::BadValue(raw))
	}
}

#[derive(Clone)]
pub struct RatingClient {
	http: reqwest::Client,
	endpoint: String,
	api_key: String,
}

impl RatingClient {
	pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, RatingError> {
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.connect_timeout(timeout)
			.build()?;
		Ok(Self {
			http,
			endpoint: endpoint.to_string(),
			api_key: api_key.to_string(),
		})
	}

	/// Average rating and rating count for `isbn`, `None` when unavailable.
	pub async fn fetch_rating(&self, isbn: &str) -> Option<RatingSummary> {
		match self.try_fetch(isbn).await {
			Ok(summary) => Some(summary),
			Err(RatingError::Network(e)) => {
				warn!(isbn, "rating lookup failed: {e}");
				None
			}
			Err(e) => {
				debug!(isbn, "no external rating: {e}");
				None
			}
		}
	}

	async fn try_fetch(&self, isbn: &str) -> Result<RatingSummary, RatingError> {
		let response = self
			.http
			.get(&self.endpoint)
			.query(&[("key", self.api_key.as_str()), ("isbns", isbn)])
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(RatingError::Status(status.as_u16()));
		}

		let counts: ReviewCounts = response.json().await?;
		summary_from(counts)
	}
}

fn summary_from(counts: ReviewCounts) -> Result<RatingSummary, RatingError> {
	let book = counts.books.into_iter().next().ok_or(RatingError::NoBook)?;
	let average = book
		.average_rating
		.ok_or_else(|| RatingError::BadValue("missing average_rating".into()))?
		.as_f64()?;
	let count = book
		.work_ratings_count
		.ok_or_else(|| RatingError::BadValue("missing work_ratings_count".into()))?
		.as_f64()?;
	Ok(RatingSummary {
		average,
		count: count as i64,
	})
}
