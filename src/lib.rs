// book reviews: readers, catalog search and reviews

pub mod config;
pub mod error;
pub mod import;
pub mod password;
pub mod rating;
pub mod routes;
pub mod session;
pub mod sql;
pub mod state;
pub mod types;
pub mod views;

use axum::{routing::get, Router};
use tokio::signal::{self, ctrl_c};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use state::AppState;

pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bookrev=debug"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn build_router(state: AppState) -> Router {
	Router::new()
		.route("/", get(routes::index))
		.route("/register", get(routes::display_register).post(routes::perform_register))
		.route("/login", get(routes::display_login).post(routes::perform_login))
		.route("/logout", get(routes::logout))
		.route("/search", get(routes::display_search).post(routes::perform_search))
		.route("/results", get(routes::display_results))
		.route("/book/:isbn", get(routes::display_book).post(routes::perform_review))
		.layer(CookieManagerLayer::new())
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

pub async fn serve(state: AppState, bind_addr: &str) -> std::io::Result<()> {
	let listener = tokio::net::TcpListener::bind(bind_addr).await?;
	info!("listening on {bind_addr}");

	axum::serve(listener, build_router(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if ctrl_c().await.is_ok() {
			info!("received Ctrl+C, shutting down");
		} else {
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
				info!("received terminate signal, shutting down");
			}
			Err(_) => std::future::pending::<()>().await,
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
