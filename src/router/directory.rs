use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::AppState;
use crate::error::Result;
use crate::pagination::PagePlan;
use crate::user::{UserPage, UserProfile};

/// Raw query inputs: may be absent, non-numeric or out of range.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    size: Option<String>,
}

/// Handler to list active users, paginated.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<UserPage>> {
    let plan =
        PagePlan::from_raw(query.page.as_deref(), query.size.as_deref());

    Ok(Json(state.users.directory(&plan).await?))
}

/// Handler to fetch a single active user.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.users.profile(id).await?))
}
