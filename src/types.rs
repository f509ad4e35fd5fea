use serde::Deserialize;

pub type ReaderId = i64;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Reader {
	pub reader_id: ReaderId,
	pub username: String,
	pub passwordhash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
	pub isbn: String,
	pub title: String,
	pub author: String,
	pub year_of_publication: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Review {
	pub rating: i64,
	pub review: String,
}

/// Last search submitted by a reader. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchCriteria {
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub author: String,
	#[serde(default)]
	pub isbn: String,
}

impl SearchCriteria {
	pub fn is_empty(&self) -> bool {
		self.title.is_empty() && self.author.is_empty() && self.isbn.is_empty()
	}
}

#[derive(Deserialize, Debug, Default)]
pub struct FormLogin {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub password: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct FormRegister {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub password: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct FormReview {
	#[serde(default)]
	pub rating: Option<String>,
	#[serde(default)]
	pub review: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
	pub average: f64,
	pub count: i64,
}

impl RatingSummary {
	/// Average of the given reviews rounded to two decimals, `None` when empty.
	pub fn from_reviews(reviews: &[Review]) -> Option<Self> {
		if reviews.is_empty() {
			return None;
		}
		let sum: i64 = reviews.iter().map(|r| r.rating).sum();
		let count = reviews.len() as i64;
		let average = (sum as f64 / count as f64 * 100.0).round() / 100.0;
		Some(Self { average, count })
	}
}

/// Book fields as shown on the detail page, "?" when the isbn is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInfo {
	pub isbn: String,
	pub title: String,
	pub author: String,
	pub year: String,
}

impl BookInfo {
	pub fn placeholder(isbn: &str) -> Self {
		BookInfo {
			isbn: isbn.to_string(),
			title: "?".to_string(),
			author: "?".to_string(),
			year: "?".to_string(),
		}
	}
}

impl From<Book> for BookInfo {
	fn from(book: Book) -> Self {
		BookInfo {
			isbn: book.isbn,
			title: book.title,
			author: book.author,
			year: book.year_of_publication.to_string(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct BookPage {
	pub book: BookInfo,
	pub book_error: Option<String>,
	pub external_rating: Option<RatingSummary>,
	pub local_rating: Option<RatingSummary>,
	pub my_review: Option<Review>,
	pub reviews: Vec<Review>,
	pub logged_in: bool,
	pub error: Option<String>,
}

impl BookPage {
	/// Rating shown to the reader: local reviews win over the external service.
	pub fn displayed_rating(&self) -> Option<(RatingSummary, RatingSource)> {
		self.local_rating
			.map(|r| (r, RatingSource::Readers))
			.or(self.external_rating.map(|r| (r, RatingSource::External)))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingSource {
	Readers,
	External,
}
