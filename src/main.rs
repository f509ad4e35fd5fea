// book reviews web server

use anyhow::Context;
use tracing::info;

use bookrev::{config::Config, init_tracing, rating::RatingClient, serve, sql, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenvy::dotenv().ok();
	init_tracing();

	let config = Config::from_env().context("environment misconfigured")?;

	// set up connection pool
	let db = sql::connect(&config.database_url)
		.await
		.context("can't connect to database")?;
	sql::init_schema(&db).await.context("can't create tables")?;

	let ratings = RatingClient::new(&config.rating_endpoint, &config.rating_api_key, config.rating_timeout)
		.context("can't build rating client")?;

	info!(endpoint = %config.rating_endpoint, timeout = ?config.rating_timeout, "rating service configured");
	serve(AppState::new(db, ratings), &config.bind_addr).await?;
	info!("server stopped");
	Ok(())
}
