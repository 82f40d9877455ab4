mod repository;
mod service;
pub mod validate;

pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};

/// User as saved on database.
///
/// `password`, `inactive` and `activation_token` never leave the process:
/// callers only ever see the [`UserProfile`] projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub inactive: bool,
    #[serde(skip)]
    pub activation_token: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Privacy-filtered projection served by the directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// One directory page.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    pub content: Vec<UserProfile>,
    pub page: i64,
    pub size: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}
