//! Replaces the book catalog with the contents of a csv file.
//!
//! The file has a header row followed by `isbn,title,author,year` records.
//! Rows that cannot be read are reported and left out, the rest are inserted
//! in batches of [`BATCH_SIZE`]. Each row gets its own savepoint, so a row the
//! database refuses only loses itself, never its batch.

use std::future::Future;
use std::io;
use std::path::Path;

use sqlx::{Connection, Sqlite, Transaction};
use tracing::{info, warn};

use crate::error::ImportError;
use crate::sql::Db;
use crate::types::Book;

pub const BATCH_SIZE: usize = 50;

const HEADER: [&str; 4] = ["isbn", "title", "author", "year"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
	pub line: u64,
	pub reason: String,
}

#[derive(Debug, Default)]
pub struct Catalog {
	pub books: Vec<Book>,
	pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
	pub committed: usize,
	pub skipped: Vec<String>,
	pub interrupted: bool,
}

pub fn read_books_from_path(path: &Path) -> Result<Catalog, ImportError> {
	let file = std::fs::File::open(path).map_err(|e| match e.kind() {
		io::ErrorKind::NotFound => ImportError::Missing(path.display().to_string()),
		_ => ImportError::Csv(csv::Error::from(e)),
	})?;
	read_books(file)
}

fn is_catalog_header(header: &csv::StringRecord) -> bool {
	header.len() == HEADER.len()
		&& header
			.iter()
			.zip(HEADER)
			.all(|(found, wanted)| found.trim().eq_ignore_ascii_case(wanted))
}

/// Parses a catalog csv.
///
/// Fails without touching anything when the header is not
/// `isbn,title,author,year` or when every data row was rejected, so a file in
/// the wrong format never gets as far as truncating the catalog.
pub fn read_books<R: io::Read>(source: R) -> Result<Catalog, ImportError> {
	let mut reader = csv::ReaderBuilder::new()
		.has_headers(true)
		.flexible(true)
		.from_reader(source);

	let header = reader.headers()?;
	if !is_catalog_header(header) {
		return Err(ImportError::BadHeader(header.iter().collect::<Vec<_>>().join(",")));
	}

	let mut catalog = Catalog::default();
	for (n, record) in reader.records().enumerate() {
		// header is line 1
		let fallback_line = n as u64 + 2;
		let record = match record {
			Ok(record) => record,
			Err(e) if e.is_io_error() => return Err(ImportError::Csv(e)),
			Err(e) => {
				let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
				catalog.rejected.push(RejectedRow { line, reason: e.to_string() });
				continue;
			}
		};
		let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);

		if record.len() < 4 {
			catalog.rejected.push(RejectedRow {
				line,
				reason: format!("expected 4 fields, found {}", record.len()),
			});
			continue;
		}
		let year = match record[3].trim().parse::<i64>() {
			Ok(year) => year,
			Err(e) => {
				catalog.rejected.push(RejectedRow {
					line,
					reason: format!("invalid year {:?}: {e}", &record[3]),
				});
				continue;
			}
		};

		catalog.books.push(Book {
			isbn: record[0].to_string(),
			title: record[1].to_string(),
			author: record[2].to_string(),
			year_of_publication: year,
		});
	}

	if catalog.books.is_empty() && !catalog.rejected.is_empty() {
		return Err(ImportError::NoUsableRows(catalog.rejected.len()));
	}
	Ok(catalog)
}

/// Empties reviews and books, reviews first since they reference books.
pub async fn truncate_catalog(db: &Db) -> Result<(), ImportError> {
	let mut tx = db.begin().await?;
	sqlx::query("DELETE FROM reviews").execute(&mut *tx).await?;
	sqlx::query("DELETE FROM books").execute(&mut *tx).await?;
	tx.commit().await?;
	Ok(())
}

async fn insert_book(tx: &mut Transaction<'_, Sqlite>, book: &Book) -> Result<(), sqlx::Error> {
	let mut row = tx.begin().await?;
	let inserted = sqlx::query(
		"INSERT INTO books (isbn, title, author, year_of_publication) VALUES (?, ?, ?, ?)",
	)
	.bind(&book.isbn)
	.bind(&book.title)
	.bind(&book.author)
	.bind(book.year_of_publication)
	.execute(&mut *row)
	.await;

	match inserted {
		Ok(_) => row.commit().await,
		Err(e) => {
			row.rollback().await?;
			Err(e)
		}
	}
}

/// Truncates the catalog and inserts `books`, committing every [`BATCH_SIZE`] rows.
///
/// `interrupt` is polled once before each row. When it has resolved the open
/// batch is rolled back and the import stops; batches committed before stay
/// in place.
pub async fn replace_catalog<F>(db: &Db, books: &[Book], interrupt: F) -> Result<ImportSummary, ImportError>
where
	F: Future<Output = ()>,
{
	tokio::pin!(interrupt);

	truncate_catalog(db).await?;
	info!("books table truncated");

	let mut summary = ImportSummary::default();
	let mut pending = 0;
	let mut tx = db.begin().await?;

	for (n, book) in books.iter().enumerate() {
		let stop = tokio::select! {
			biased;
			_ = &mut interrupt => true,
			_ = std::future::ready(()) => false,
		};
		if stop {
			tx.rollback().await?;
			warn!(rolled_back = pending, "import stopped by user");
			summary.interrupted = true;
			return Ok(summary);
		}

		match insert_book(&mut tx, book).await {
			Ok(()) => pending += 1,
			Err(e) => {
				warn!(isbn = %book.isbn, "row skipped: {e}");
				summary.skipped.push(book.isbn.clone());
			}
		}

		if n % BATCH_SIZE == BATCH_SIZE - 1 {
			tx.commit().await?;
			summary.committed += pending;
			pending = 0;
			info!("{} books handled", n + 1);
			tx = db.begin().await?;
		}
	}

	tx.commit().await?;
	summary.committed += pending;
	Ok(summary)
}

/// Reads `path` and, only if it parsed, replaces the catalog with it.
pub async fn import_file<F>(db: &Db, path: &Path, interrupt: F) -> Result<ImportSummary, ImportError>
where
	F: Future<Output = ()>,
{
	let catalog = read_books_from_path(path)?;
	for row in &catalog.rejected {
		warn!(line = row.line, "row discarded: {}", row.reason);
	}
	info!("{} books read from csv file", catalog.books.len());

	replace_catalog(db, &catalog.books, interrupt).await
}
