//! Users-related HTTP API.
mod activate;
mod directory;
mod register;

use axum::Router;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// `{message}` body shared by the confirmation responses.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        // `POST /users` goes to `register`, `GET /users` to the directory.
        .route("/", post(register::handler).get(directory::list))
        // `POST /users/activation/{token}` redeems an activation token.
        .route("/activation/{token}", post(activate::handler))
        // `GET /users/{id}` goes to a single profile.
        .route("/{id}", get(directory::get))
}
