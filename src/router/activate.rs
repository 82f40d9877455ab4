use axum::Json;
use axum::extract::{Path, State};

use crate::AppState;
use crate::catalog::Locale;
use crate::error::Result;
use crate::router::Message;

/// Handler to redeem an activation token.
pub async fn handler(
    State(state): State<AppState>,
    locale: Locale,
    Path(token): Path<String>,
) -> Result<Json<Message>> {
    state.users.activate(&token).await?;

    Ok(Json(Message {
        message: state
            .catalog
            .resolve("account_activation_success", &locale.0),
    }))
}
