//! Cookie backed sessions.
//!
//! The browser only holds a random session id; reader id and search criteria
//! stay server side in [`SessionStore`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tokio::sync::Mutex;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use uuid::Uuid;

use crate::state::AppState;
use crate::types::{ReaderId, SearchCriteria};

pub const SESSION_COOKIE: &str = "bookrev_session";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
	pub reader_id: Option<ReaderId>,
	pub search: Option<SearchCriteria>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
	inner: Arc<Mutex<HashMap<Uuid, SessionData>>>,
}

impl SessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	async fn get(&self, id: Uuid) -> SessionData {
		self.inner.lock().await.get(&id).cloned().unwrap_or_default()
	}

	async fn update<F: FnOnce(&mut SessionData)>(&self, id: Uuid, change: F) {
		let mut sessions = self.inner.lock().await;
		let data = sessions.entry(id).or_default();
		change(data);
		if *data == SessionData::default() {
			sessions.remove(&id);
		}
	}

	/// Drops whatever `old` held and stores a login under a fresh id.
	async fn rotate_login(&self, old: Uuid, reader_id: ReaderId) -> Uuid {
		let id = Uuid::new_v4();
		let mut sessions = self.inner.lock().await;
		sessions.remove(&old);
		sessions.insert(
			id,
			SessionData {
				reader_id: Some(reader_id),
				search: None,
			},
		);
		id
	}

	#[cfg(test)]
	async fn len(&self) -> usize {
		self.inner.lock().await.len()
	}
}

/// Handle on the current browser's session, extracted per request.
pub struct Session {
	id: Uuid,
	store: SessionStore,
	cookies: Cookies,
}

impl Session {
	pub async fn data(&self) -> SessionData {
		self.store.get(self.id).await
	}

	pub async fn reader_id(&self) -> Option<ReaderId> {
		self.data().await.reader_id
	}

	/// Forgets everything and logs `reader_id` in.
	///
	/// The reader gets a new session id, the one the browser came with is
	/// dropped.
	pub async fn login(&mut self, reader_id: ReaderId) {
		self.id = self.store.rotate_login(self.id, reader_id).await;
		self.cookies.add(session_cookie(self.id));
	}

	pub async fn set_search(&self, criteria: Option<SearchCriteria>) {
		self.store.update(self.id, |data| data.search = criteria).await;
	}

	pub async fn clear(&self) {
		self.store.update(self.id, |data| *data = SessionData::default()).await;
	}
}

fn session_cookie(id: Uuid) -> Cookie<'static> {
	Cookie::build((SESSION_COOKIE, id.to_string()))
		.path("/")
		.http_only(true)
		.same_site(SameSite::Lax)
		.build()
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
	type Rejection = <Cookies as FromRequestParts<AppState>>::Rejection;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		let cookies = Cookies::from_request_parts(parts, state).await?;

		let known = cookies
			.get(SESSION_COOKIE)
			.and_then(|c| Uuid::parse_str(c.value()).ok());
		let id = match known {
			Some(id) => id,
			None => {
				let id = Uuid::new_v4();
				cookies.add(session_cookie(id));
				id
			}
		};

		Ok(Session {
			id,
			store: state.sessions.clone(),
			cookies,
		})
	}
}
