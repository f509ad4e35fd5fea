use crate::rating::RatingClient;
use crate::session::SessionStore;
use crate::sql::Db;

/// Everything a handler needs, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
	pub db: Db,
	pub sessions: SessionStore,
	pub ratings: RatingClient,
}

impl AppState {
	pub fn new(db: Db, ratings: RatingClient) -> Self {
		AppState {
			db,
			sessions: SessionStore::new(),
			ratings,
		}
	}
}
