//! Drives the router end to end against an in-memory database.
//!
//! The rating client points at a closed local port, so every book page takes
//! the "no external rating" path.

use std::time::Duration;

use axum::{
	body::Body,
	http::{header, Request, StatusCode},
	response::Response,
	Router,
};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use bookrev::{build_router, rating::RatingClient, sql, AppState};

async fn setup() -> (Router, sql::Db) {
	let db = sql::connect("sqlite::memory:").await.unwrap();
	sql::init_schema(&db).await.unwrap();
	let ratings = RatingClient::new("http://127.0.0.1:9/review_counts.json", "key", Duration::from_secs(1)).unwrap();
	(build_router(AppState::new(db.clone(), ratings)), db)
}

async fn add_book(db: &sql::Db, isbn: &str, title: &str) {
	sqlx::query("INSERT INTO books (isbn, title, author, year_of_publication) VALUES (?, ?, 'Some Author', 1999)")
		.bind(isbn)
		.bind(title)
		.execute(db)
		.await
		.unwrap();
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder().method("GET").uri(uri);
	if let Some(cookie) = cookie {
		builder = builder.header(header::COOKIE, cookie);
	}
	builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder()
		.method("POST")
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
	if let Some(cookie) = cookie {
		builder = builder.header(header::COOKIE, cookie);
	}
	builder.body(Body::from(form.to_string())).unwrap()
}

fn session_cookie(response: &Response) -> String {
	let set_cookie = response
		.headers()
		.get(header::SET_COOKIE)
		.expect("response should set the session cookie")
		.to_str()
		.unwrap();
	set_cookie.split(';').next().unwrap().to_string()
}

fn location(response: &Response) -> &str {
	response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

async fn body_text(response: Response) -> String {
	let bytes = response.into_body().collect().await.unwrap().to_bytes();
	String::from_utf8(bytes.to_vec()).unwrap()
}

// registers `name` and returns the session cookie of the new login
async fn register(app: &Router, name: &str, password: &str) -> String {
	let response = app
		.clone()
		.oneshot(post("/register", &format!("name={name}&password={password}"), None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/search");
	session_cookie(&response)
}

#[tokio::test]
async fn index_sends_anonymous_readers_to_login() {
	let (app, _) = setup().await;
	let response = app.oneshot(get("/", None)).await.unwrap();
	assert_eq!(response.status(), StatusCode::SEE_OTHER);
	assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn registered_reader_lands_on_search() {
	let (app, _) = setup().await;
	let cookie = register(&app, "alice", "pass1234").await;

	let response = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
	assert_eq!(location(&response), "/search");

	let response = app.oneshot(get("/search", Some(&cookie))).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	assert!(body_text(response).await.contains("alice"));
}

#[tokio::test]
async fn duplicate_registration_is_refused() {
	let (app, db) = setup().await;
	register(&app, "alice", "pass1234").await;
	let original = sql::find_reader_by_username(&db, "alice").await.unwrap().unwrap();

	let response = app
		.clone()
		.oneshot(post("/register", "name=alice&password=different", None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	assert!(body_text(response).await.contains("Username already in use: alice"));

	let response = app
		.oneshot(post("/login", "name=alice&password=pass1234", None))
		.await
		.unwrap();
	assert_eq!(location(&response), "/search");
	let hash = bookrev::password::hash("pass1234");
	assert_eq!(
		sql::find_reader_by_credentials(&db, "alice", &hash).await.unwrap(),
		Some(original.reader_id)
	);
}

#[tokio::test]
async fn wrong_password_gives_generic_error() {
	let (app, _) = setup().await;
	register(&app, "alice", "pass1234").await;

	let response = app
		.oneshot(post("/login", "name=alice&password=nope", None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	assert!(body_text(response).await.contains("Incorrect username or password!"));
}

#[tokio::test]
async fn logout_forgets_the_reader() {
	let (app, _) = setup().await;
	let cookie = register(&app, "alice", "pass1234").await;

	let response = app.clone().oneshot(get("/logout", Some(&cookie))).await.unwrap();
	assert_eq!(location(&response), "/login");

	let response = app.oneshot(get("/", Some(&cookie))).await.unwrap();
	assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn empty_search_is_rejected() {
	let (app, _) = setup().await;
	let response = app
		.oneshot(post("/search", "title=&author=&isbn=", None))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	assert!(body_text(response).await.contains("At least one search field should be filled!"));
}

#[tokio::test]
async fn results_without_search_redirect_back() {
	let (app, _) = setup().await;
	let response = app.oneshot(get("/results", None)).await.unwrap();
	assert_eq!(location(&response), "/search");
}

#[tokio::test]
async fn search_then_results_lists_matches() {
	let (app, db) = setup().await;
	add_book(&db, "0380795272", "Krondor: The Betrayal").await;
	add_book(&db, "1416949658", "The Dark Is Rising").await;

	let response = app
		.clone()
		.oneshot(post("/search", "title=krondor&author=&isbn=", None))
		.await
		.unwrap();
	assert_eq!(location(&response), "/results");
	let cookie = session_cookie(&response);

	let response = app.oneshot(get("/results", Some(&cookie))).await.unwrap();
	let body = body_text(response).await;
	assert!(body.contains("/book/0380795272"));
	assert!(!body.contains("The Dark Is Rising"));
}

#[tokio::test]
async fn unknown_book_still_renders() {
	let (app, _) = setup().await;
	let response = app.oneshot(get("/book/0000000000", None)).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let body = body_text(response).await;
	assert!(body.contains("Could not find ISBN 0000000000."));
	assert!(body.contains("<title>?</title>"));
}

#[tokio::test]
async fn review_is_saved_and_replaced() {
	let (app, db) = setup().await;
	add_book(&db, "0380795272", "Krondor: The Betrayal").await;
	let cookie = register(&app, "alice", "pass1234").await;

	for form in ["rating=2&review=slow+start", "rating=5&review=great+ending"] {
		let response = app
			.clone()
			.oneshot(post("/book/0380795272", form, Some(&cookie)))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
	}

	let reader = sql::find_reader_by_username(&db, "alice").await.unwrap().unwrap();
	let review = sql::get_review_by_reader_and_book(&db, "0380795272", reader.reader_id)
		.await
		.unwrap()
		.unwrap();
	assert_eq!(review.rating, 5);
	assert_eq!(review.review, "great ending");
	let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews").fetch_one(&db).await.unwrap();
	assert_eq!(rows, 1);
}

#[tokio::test]
async fn other_readers_reviews_drive_the_rating() {
	let (app, db) = setup().await;
	add_book(&db, "0380795272", "Krondor: The Betrayal").await;
	let alice = register(&app, "alice", "pass1234").await;
	let bob = register(&app, "bob", "pass5678").await;

	app.clone()
		.oneshot(post("/book/0380795272", "rating=4&review=solid", Some(&alice)))
		.await
		.unwrap();

	let response = app.oneshot(get("/book/0380795272", Some(&bob))).await.unwrap();
	let body = body_text(response).await;
	assert!(body.contains("solid"));
	assert!(body.contains("4.00"));
}

#[tokio::test]
async fn review_without_rating_shows_error() {
	let (app, db) = setup().await;
	add_book(&db, "0380795272", "Krondor: The Betrayal").await;
	let cookie = register(&app, "alice", "pass1234").await;

	let response = app
		.oneshot(post("/book/0380795272", "rating=&review=no+stars", Some(&cookie)))
		.await
		.unwrap();
	assert!(body_text(response).await.contains("Please enter a rating!"));

	let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews").fetch_one(&db).await.unwrap();
	assert_eq!(rows, 0);
}

#[tokio::test]
async fn login_issues_a_new_session_id() {
	let (app, _) = setup().await;
	register(&app, "alice", "pass1234").await;

	// a session id handed to the browser before login
	let planted = "bookrev_session=0b7f3c52-2a55-4c4e-9a3e-6f1d0c9a8b11";
	let response = app
		.clone()
		.oneshot(post("/login", "name=alice&password=pass1234", Some(planted)))
		.await
		.unwrap();
	assert_eq!(location(&response), "/search");
	let issued = session_cookie(&response);
	assert_ne!(issued, planted);

	let response = app.clone().oneshot(get("/", Some(planted))).await.unwrap();
	assert_eq!(location(&response), "/login");
	let response = app.oneshot(get("/", Some(&issued))).await.unwrap();
	assert_eq!(location(&response), "/search");
}
