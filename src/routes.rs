use axum::{
	extract::{Path, State},
	response::{IntoResponse, Redirect, Response},
	Form,
};
use maud::Markup;
use tracing::{error, info, warn};

use crate::error::DbError;
use crate::password;
use crate::session::Session;
use crate::sql::{self, Db};
use crate::state::AppState;
use crate::types::{
	BookInfo, BookPage, FormLogin, FormRegister, FormReview, RatingSummary, ReaderId, SearchCriteria,
};
use crate::views;

const MIN_PASSWORD_LEN: usize = 4;
const MIN_USERNAME_LEN: usize = 2;

// username of the logged-in reader, for the page header
async fn username_of(db: &Db, reader_id: Option<ReaderId>) -> Option<String> {
	let reader_id = reader_id?;
	match sql::find_reader_by_id(db, reader_id).await {
		Ok(reader) => reader.map(|r| r.username),
		Err(e) => {
			warn!(reader_id, "could not fetch reader: {e}");
			None
		}
	}
}

pub async fn index(State(state): State<AppState>, session: Session) -> Redirect {
	match username_of(&state.db, session.reader_id().await).await {
		Some(_) => Redirect::to("/search"),
		None => Redirect::to("/login"),
	}
}

pub async fn display_register(State(state): State<AppState>, session: Session) -> Markup {
	let username = username_of(&state.db, session.reader_id().await).await;
	views::register(username.as_deref(), None)
}

pub async fn perform_register(
	State(state): State<AppState>,
	mut session: Session,
	Form(form): Form<FormRegister>,
) -> Response {
	match register_reader(&state.db, &form).await {
		Ok(reader_id) => {
			info!(reader_id, username = %form.name, "reader registered");
			session.login(reader_id).await;
			Redirect::to("/search").into_response()
		}
		Err(error) => {
			let username = username_of(&state.db, session.reader_id().await).await;
			views::register(username.as_deref(), Some(error.as_str())).into_response()
		}
	}
}

async fn register_reader(db: &Db, form: &FormRegister) -> Result<ReaderId, String> {
	if form.password.chars().count() < MIN_PASSWORD_LEN {
		return Err(format!("Password should contain at least {MIN_PASSWORD_LEN} characters!"));
	}
	let name = form.name.as_str();
	if name.chars().count() < MIN_USERNAME_LEN {
		return Err(format!("Username should contain at least {MIN_USERNAME_LEN} characters!"));
	}

	match sql::username_taken(db, name).await {
		Ok(false) => {}
		Ok(true) => return Err(format!("Username already in use: {name}")),
		Err(e) => {
			error!(username = name, "username lookup failed: {e}");
			return Err(format!("Could not check username: {name}"));
		}
	}

	match sql::create_reader(db, name, &password::hash(&form.password)).await {
		Ok(reader_id) => Ok(reader_id),
		Err(DbError::Conflict) => Err(format!("Username already in use: {name}")),
		Err(e) => {
			error!(username = name, "could not add reader: {e}");
			Err(format!("Could not add reader: {name}"))
		}
	}
}

pub async fn display_login(State(state): State<AppState>, session: Session) -> Markup {
	let username = username_of(&state.db, session.reader_id().await).await;
	views::login(username.as_deref(), None)
}

pub async fn perform_login(
	State(state): State<AppState>,
	mut session: Session,
	Form(form): Form<FormLogin>,
) -> Response {
	session.clear().await;

	let hash = password::hash(&form.password);
	match sql::find_reader_by_credentials(&state.db, &form.name, &hash).await {
		Ok(Some(reader_id)) => {
			info!(reader_id, "reader logged in");
			session.login(reader_id).await;
			Redirect::to("/search").into_response()
		}
		Ok(None) => views::login(None, Some("Incorrect username or password!")).into_response(),
		Err(e) => {
			error!("credential lookup failed: {e}");
			views::login(None, Some("Could not check credentials, please try again.")).into_response()
		}
	}
}

pub async fn logout(session: Session) -> Redirect {
	session.clear().await;
	Redirect::to("/login")
}

pub async fn display_search(State(state): State<AppState>, session: Session) -> Markup {
	let username = username_of(&state.db, session.reader_id().await).await;
	views::search(username.as_deref(), None)
}

pub async fn perform_search(
	State(state): State<AppState>,
	session: Session,
	Form(criteria): Form<SearchCriteria>,
) -> Response {
	if criteria.is_empty() {
		session.set_search(None).await;
		let username = username_of(&state.db, session.reader_id().await).await;
		return views::search(username.as_deref(), Some("At least one search field should be filled!"))
			.into_response();
	}
	session.set_search(Some(criteria)).await;
	Redirect::to("/results").into_response()
}

pub async fn display_results(State(state): State<AppState>, session: Session) -> Response {
	let data = session.data().await;
	let Some(criteria) = data.search else {
		return Redirect::to("/search").into_response();
	};
	let username = username_of(&state.db, data.reader_id).await;

	match sql::search_books(&state.db, &criteria).await {
		Ok(books) => views::results(username.as_deref(), &books, None).into_response(),
		Err(e) => {
			error!(?criteria, "book search failed: {e}");
			views::results(username.as_deref(), &[], Some("Could not search books.")).into_response()
		}
	}
}

pub async fn display_book(
	State(state): State<AppState>,
	session: Session,
	Path(isbn): Path<String>,
) -> Markup {
	book_page(&state, &session, &isbn, None).await
}

pub async fn perform_review(
	State(state): State<AppState>,
	session: Session,
	Path(isbn): Path<String>,
	Form(form): Form<FormReview>,
) -> Markup {
	let reader_id = session.reader_id().await;
	let error = submit_review(&state.db, &isbn, reader_id, &form).await.err();
	book_page(&state, &session, &isbn, error).await
}

fn parse_rating(raw: Option<&str>) -> Result<i64, String> {
	let raw = raw.map(str::trim).unwrap_or_default();
	if raw.is_empty() {
		return Err("Please enter a rating!".to_string());
	}
	match raw.parse::<i64>() {
		Ok(rating) if (1..=5).contains(&rating) => Ok(rating),
		_ => Err("Rating should be a whole number between 1 and 5!".to_string()),
	}
}

async fn submit_review(
	db: &Db,
	isbn: &str,
	reader_id: Option<ReaderId>,
	form: &FormReview,
) -> Result<(), String> {
	let reader_id = reader_id.ok_or_else(|| "Please log in to submit a review.".to_string())?;
	let rating = parse_rating(form.rating.as_deref())?;

	sql::upsert_review(db, isbn, reader_id, rating, &form.review)
		.await
		.map_err(|e| {
			error!(isbn, reader_id, "could not add review: {e}");
			"Could not add review.".to_string()
		})?;
	info!(isbn, reader_id, rating, "review saved");
	Ok(())
}

async fn book_page(state: &AppState, session: &Session, isbn: &str, error: Option<String>) -> Markup {
	let reader_id = session.reader_id().await;
	let username = username_of(&state.db, reader_id).await;

	let (book, book_error) = match sql::get_book(&state.db, isbn).await {
		Ok(Some(book)) => (BookInfo::from(book), None),
		Ok(None) => (BookInfo::placeholder(isbn), Some(format!("Could not find ISBN {isbn}."))),
		Err(e) => {
			error!(isbn, "book lookup failed: {e}");
			(BookInfo::placeholder(isbn), Some(format!("Could not search book: {isbn}")))
		}
	};

	let my_review = match reader_id {
		Some(reader_id) => sql::get_review_by_reader_and_book(&state.db, isbn, reader_id)
			.await
			.unwrap_or_else(|e| {
				warn!(isbn, reader_id, "could not fetch own review: {e}");
				None
			}),
		None => None,
	};

	let external_rating = state.ratings.fetch_rating(isbn).await;

	let reviews = sql::get_other_reviews(&state.db, isbn, reader_id)
		.await
		.unwrap_or_else(|e| {
			warn!(isbn, "could not fetch reviews: {e}");
			Vec::new()
		});
	let local_rating = RatingSummary::from_reviews(&reviews);

	let view = BookPage {
		book,
		book_error,
		external_rating,
		local_rating,
		my_review,
		reviews,
		logged_in: username.is_some(),
		error,
	};
	views::book(username.as_deref(), &view)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rating_must_be_present() {
		assert_eq!(parse_rating(None), Err("Please enter a rating!".to_string()));
		assert_eq!(parse_rating(Some("  ")), Err("Please enter a rating!".to_string()));
	}

	#[test]
	fn rating_must_be_in_range() {
		assert_eq!(parse_rating(Some("4")), Ok(4));
		assert_eq!(parse_rating(Some(" 1 ")), Ok(1));
		assert!(parse_rating(Some("0")).is_err());
		assert!(parse_rating(Some("6")).is_err());
		assert!(parse_rating(Some("4.5")).is_err());
	}

	#[tokio::test]
	async fn short_password_is_checked_first() {
		let db = sql::tests::memory_db().await;
		let form = FormRegister {
			name: "x".into(),
			password: "abc".into(),
		};
		let err = register_reader(&db, &form).await.unwrap_err();
		assert_eq!(err, "Password should contain at least 4 characters!");
	}

	#[tokio::test]
	async fn duplicate_username_is_reported() {
		let db = sql::tests::memory_db().await;
		let form = FormRegister {
			name: "alice".into(),
			password: "pass1234".into(),
		};
		let first = register_reader(&db, &form).await.unwrap();
		let err = register_reader(&db, &form).await.unwrap_err();
		assert_eq!(err, "Username already in use: alice");

		let hash = password::hash("pass1234");
		assert_eq!(sql::find_reader_by_credentials(&db, "alice", &hash).await.unwrap(), Some(first));
	}

	#[tokio::test]
	async fn anonymous_review_is_refused() {
		let db = sql::tests::memory_db().await;
		let form = FormReview {
			rating: Some("5".into()),
			review: "great".into(),
		};
		let err = submit_review(&db, "0000000001", None, &form).await.unwrap_err();
		assert_eq!(err, "Please log in to submit a review.");
	}

	#[tokio::test]
	async fn missing_rating_does_not_touch_existing_review() {
		let db = sql::tests::memory_db().await;
		sql::tests::add_book(&db, "0000000001", "Placeholder", "Nobody", 2000).await;
		let reader = sql::create_reader(&db, "alice", &password::hash("pass1234")).await.unwrap();
		sql::upsert_review(&db, "0000000001", reader, 4, "nice").await.unwrap();

		let form = FormReview {
			rating: None,
			review: "changed my mind".into(),
		};
		let err = submit_review(&db, "0000000001", Some(reader), &form).await.unwrap_err();
		assert_eq!(err, "Please enter a rating!");

		let kept = sql::get_review_by_reader_and_book(&db, "0000000001", reader).await.unwrap().unwrap();
		assert_eq!(kept.review, "nice");
	}
}
