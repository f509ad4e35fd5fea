use maud::{html, Markup, DOCTYPE};

use crate::types::{Book, BookPage, RatingSource, Review};

fn page(title: &str, username: Option<&str>, content: Markup) -> Markup {
	html! {
		(DOCTYPE)
		html {
			head {
				meta charset="utf-8";
				title { (title) }
			}
			body {
				nav {
					@if let Some(name) = username {
						span { "Logged in as " b { (name) } }
						" | " a href="/search" { "Search" }
						" | " a href="/logout" { "Log out" }
					} @else {
						a href="/login" { "Log in" }
						" | " a href="/register" { "Register" }
					}
				}
				h1 { (title) }
				(content)
			}
		}
	}
}

fn error_banner(error: Option<&str>) -> Markup {
	html! {
		@if let Some(error) = error {
			p class="error" { (error) }
		}
	}
}

pub fn register(username: Option<&str>, error: Option<&str>) -> Markup {
	page("Registration", username, html! {
		(error_banner(error))
		form method="POST" action="/register" {
			input name="name" type="text" placeholder="username" {}
			input name="password" type="password" placeholder="password" {}
			button { "Register" }
		}
	})
}

pub fn login(username: Option<&str>, error: Option<&str>) -> Markup {
	page("Log In", username, html! {
		(error_banner(error))
		form method="POST" action="/login" {
			input name="name" type="text" placeholder="username" {}
			input name="password" type="password" placeholder="password" {}
			button { "Log In" }
		}
	})
}

pub fn search(username: Option<&str>, error: Option<&str>) -> Markup {
	page("Search Books", username, html! {
		(error_banner(error))
		form method="POST" action="/search" {
			input name="title" type="text" placeholder="title" {}
			input name="author" type="text" placeholder="author" {}
			input name="isbn" type="text" placeholder="ISBN" {}
			button { "Search" }
		}
	})
}

pub fn results(username: Option<&str>, books: &[Book], error: Option<&str>) -> Markup {
	page("Search Results", username, html! {
		(error_banner(error))
		table {
			thead { tr {
				th { "ISBN" }
				th { "Title" }
				th { "Author" }
				th { "Year" }
			} }
			tbody {
				@for book in books {
					tr {
						td { a href={ "/book/" (book.isbn) } { (book.isbn) } }
						td { (book.title) }
						td { (book.author) }
						td { (book.year_of_publication) }
					}
				}
			}
		}
		p { (books.len()) " book(s) found. " a href="/search" { "New search" } }
	})
}

fn review_item(review: &Review) -> Markup {
	html! {
		li {
			b { (review.rating) "/5" }
			@for line in review.review.lines() {
				p { (line) }
			}
		}
	}
}

pub fn book(username: Option<&str>, view: &BookPage) -> Markup {
	let info = &view.book;
	page(&info.title, username, html! {
		(error_banner(view.book_error.as_deref()))
		dl {
			dt { "Author" } dd { (info.author) }
			dt { "Published" } dd { (info.year) }
			dt { "ISBN" } dd { (info.isbn) }
		}

		@match view.displayed_rating() {
			Some((rating, source)) => {
				p class="rating" {
					"Average rating " b { (format!("{:.2}", rating.average)) }
					" from " (rating.count) " rating(s)"
					@if source == RatingSource::External { " on Goodreads" }
					"."
				}
			}
			None => { p class="rating" { "No ratings yet." } }
		}

		h2 { "Your review" }
		(error_banner(view.error.as_deref()))
		@if view.logged_in {
			form method="POST" action={ "/book/" (info.isbn) } {
				select name="rating" {
					option value="" { "rating" }
					@for n in 1..=5 {
						@let chosen = view.my_review.as_ref().map(|r| r.rating) == Some(n);
						option value=(n) selected[chosen] { (n) }
					}
				}
				textarea name="review" {
					@if let Some(mine) = &view.my_review { (mine.review) }
				}
				button {
					@if view.my_review.is_some() { "Update review" } @else { "Submit review" }
				}
			}
		} @else {
			p { a href="/login" { "Log in" } " to review this book." }
		}

		h2 { "Reviews by other readers" }
		@if view.reviews.is_empty() {
			p { "Nobody else reviewed this book yet." }
		} @else {
			ul { @for review in &view.reviews { (review_item(review)) } }
		}
	})
}
