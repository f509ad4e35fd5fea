// Replaces the books table with the contents of a csv file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use bookrev::{config, import, init_tracing, sql};

#[derive(Parser, Debug)]
#[command(name = "bookrev-import", about = "Load a csv of books into the catalog, replacing its contents")]
struct Args {
	/// csv file with an isbn,title,author,year header
	#[arg(long, default_value = "books.csv")]
	csv: PathBuf,
}

async fn interrupted() {
	if tokio::signal::ctrl_c().await.is_err() {
		// no handler, never interrupt
		std::future::pending::<()>().await;
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	dotenvy::dotenv().ok();
	init_tracing();
	let args = Args::parse();

	let db = match config::database_url() {
		Ok(url) => sql::connect(&url).await,
		Err(e) => {
			error!("{e}");
			return ExitCode::FAILURE;
		}
	};
	let db = match db {
		Ok(db) => db,
		Err(e) => {
			error!("can't connect to database: {e}");
			return ExitCode::FAILURE;
		}
	};
	if let Err(e) = sql::init_schema(&db).await {
		error!("can't create tables: {e}");
		return ExitCode::FAILURE;
	}

	info!("reading {}", args.csv.display());
	match import::import_file(&db, &args.csv, interrupted()).await {
		Ok(summary) if summary.interrupted => {
			warn!("stopped by user, {} books kept", summary.committed);
			ExitCode::from(130)
		}
		Ok(summary) => {
			info!(
				skipped = summary.skipped.len(),
				"{} books from the csv have been inserted", summary.committed
			);
			ExitCode::SUCCESS
		}
		Err(e) => {
			error!("import failed: {e}");
			ExitCode::FAILURE
		}
	}
}
