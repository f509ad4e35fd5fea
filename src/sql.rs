use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::debug;

use crate::error::DbError;
use crate::types::{Book, Reader, ReaderId, Review, SearchCriteria};

pub type Db = Pool<Sqlite>;

pub const TABLE_SCHEMA: &[&str] = &[
	r#"
CREATE TABLE IF NOT EXISTS readers (
	reader_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	username TEXT NOT NULL UNIQUE,
	passwordhash TEXT NOT NULL
);"#,
	r#"
CREATE TABLE IF NOT EXISTS books (
	isbn TEXT NOT NULL PRIMARY KEY,
	title TEXT NOT NULL,
	author TEXT NOT NULL,
	year_of_publication INTEGER NOT NULL
);"#,
	r#"
CREATE TABLE IF NOT EXISTS reviews (
	isbn TEXT NOT NULL,
	reader_id INTEGER NOT NULL,
	rating INTEGER NOT NULL,
	review TEXT NOT NULL,
	FOREIGN KEY(isbn) REFERENCES books(isbn),
	FOREIGN KEY(reader_id) REFERENCES readers(reader_id)
);"#,
	"CREATE INDEX IF NOT EXISTS reviews_by_book ON reviews (isbn, reader_id);",
];

pub async fn connect(url: &str) -> Result<Db, DbError> {
	let options = SqliteConnectOptions::from_str(url)?
		.create_if_missing(true)
		.foreign_keys(true);

	let pool = if url.contains(":memory:") {
		// every connection to :memory: is its own database, keep exactly one alive
		SqlitePoolOptions::new()
			.max_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect_with(options)
			.await?
	} else {
		SqlitePoolOptions::new()
			.max_connections(5)
			.acquire_timeout(std::time::Duration::from_secs(3))
			.connect_with(options)
			.await?
	};
	Ok(pool)
}

pub async fn init_schema(db: &Db) -> Result<(), DbError> {
	for statement in TABLE_SCHEMA {
		sqlx::query(statement).execute(db).await?;
	}
	Ok(())
}

pub async fn find_reader_by_username(db: &Db, username: &str) -> Result<Option<Reader>, DbError> {
	let reader = sqlx::query_as::<_, Reader>(
		"SELECT reader_id, username, passwordhash FROM readers WHERE username = ?",
	)
	.bind(username)
	.fetch_optional(db)
	.await?;
	Ok(reader)
}

pub async fn find_reader_by_id(db: &Db, reader_id: ReaderId) -> Result<Option<Reader>, DbError> {
	let reader = sqlx::query_as::<_, Reader>(
		"SELECT reader_id, username, passwordhash FROM readers WHERE reader_id = ?",
	)
	.bind(reader_id)
	.fetch_optional(db)
	.await?;
	Ok(reader)
}

pub async fn find_reader_by_credentials(
	db: &Db,
	username: &str,
	passwordhash: &str,
) -> Result<Option<ReaderId>, DbError> {
	let reader_id = sqlx::query_scalar::<_, ReaderId>(
		"SELECT reader_id FROM readers WHERE username = ? AND passwordhash = ?",
	)
	.bind(username)
	.bind(passwordhash)
	.fetch_optional(db)
	.await?;
	Ok(reader_id)
}

pub async fn username_taken(db: &Db, username: &str) -> Result<bool, DbError> {
	Ok(find_reader_by_username(db, username).await?.is_some())
}

pub async fn create_reader(db: &Db, username: &str, passwordhash: &str) -> Result<ReaderId, DbError> {
	let done = sqlx::query("INSERT INTO readers (username, passwordhash) VALUES (?, ?)")
		.bind(username)
		.bind(passwordhash)
		.execute(db)
		.await
		.map_err(DbError::from_insert)?;
	debug!(username, reader_id = done.last_insert_rowid(), "reader created");
	Ok(done.last_insert_rowid())
}

// wraps a user supplied fragment in wildcards, with LIKE metacharacters escaped
fn like_pattern(fragment: &str) -> String {
	let mut pattern = String::with_capacity(fragment.len() + 2);
	pattern.push('%');
	for chr in fragment.chars() {
		if matches!(chr, '%' | '_' | '\\') {
			pattern.push('\\');
		}
		pattern.push(chr);
	}
	pattern.push('%');
	pattern
}

pub async fn search_books(db: &Db, criteria: &SearchCriteria) -> Result<Vec<Book>, DbError> {
	let books = sqlx::query_as::<_, Book>(
		r#"
SELECT isbn, title, author, year_of_publication
FROM books
WHERE isbn LIKE ? ESCAPE '\'
	AND title LIKE ? ESCAPE '\'
	AND author LIKE ? ESCAPE '\'
ORDER BY title, isbn
		"#,
	)
	.bind(like_pattern(&criteria.isbn))
	.bind(like_pattern(&criteria.title))
	.bind(like_pattern(&criteria.author))
	.fetch_all(db)
	.await?;
	Ok(books)
}

pub async fn get_book(db: &Db, isbn: &str) -> Result<Option<Book>, DbError> {
	let book = sqlx::query_as::<_, Book>(
		"SELECT isbn, title, author, year_of_publication FROM books WHERE isbn = ?",
	)
	.bind(isbn)
	.fetch_optional(db)
	.await?;
	Ok(book)
}

pub async fn get_review_by_reader_and_book(
	db: &Db,
	isbn: &str,
	reader_id: ReaderId,
) -> Result<Option<Review>, DbError> {
	let review = sqlx::query_as::<_, Review>(
		"SELECT rating, review FROM reviews WHERE isbn = ? AND reader_id = ?",
	)
	.bind(isbn)
	.bind(reader_id)
	.fetch_optional(db)
	.await?;
	Ok(review)
}

/// Reviews of `isbn` written by anyone but `reader_id`; all of them when nobody is logged in.
pub async fn get_other_reviews(
	db: &Db,
	isbn: &str,
	reader_id: Option<ReaderId>,
) -> Result<Vec<Review>, DbError> {
	let reviews = match reader_id {
		Some(reader_id) => {
			sqlx::query_as::<_, Review>(
				"SELECT rating, review FROM reviews WHERE isbn = ? AND reader_id <> ? ORDER BY rowid",
			)
			.bind(isbn)
			.bind(reader_id)
			.fetch_all(db)
			.await?
		}
		None => {
			sqlx::query_as::<_, Review>("SELECT rating, review FROM reviews WHERE isbn = ? ORDER BY rowid")
				.bind(isbn)
				.fetch_all(db)
				.await?
		}
	};
	Ok(reviews)
}

/// Replaces the reader's review of a book: delete then insert, one transaction.
pub async fn upsert_review(
	db: &Db,
	isbn: &str,
	reader_id: ReaderId,
	rating: i64,
	review: &str,
) -> Result<(), DbError> {
	let mut tx = db.begin().await?;

	let written = async {
		sqlx::query("DELETE FROM reviews WHERE isbn = ? AND reader_id = ?")
			.bind(isbn)
			.bind(reader_id)
			.execute(&mut *tx)
			.await?;
		sqlx::query("INSERT INTO reviews (isbn, reader_id, rating, review) VALUES (?, ?, ?, ?)")
			.bind(isbn)
			.bind(reader_id)
			.bind(rating)
			.bind(review)
			.execute(&mut *tx)
			.await?;
		Ok::<_, sqlx::Error>(())
	}
	.await;

	match written {
		Ok(()) => {
			tx.commit().await?;
			Ok(())
		}
		Err(err) => {
			tx.rollback().await?;
			Err(DbError::Persistence(err))
		}
	}
}
