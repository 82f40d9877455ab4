use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::AppState;
use crate::catalog::Locale;
use crate::error::Result;
use crate::router::Message;
use crate::user::validate::{self, Registration};

/// Handler to register a user.
///
/// Validation runs before any side effect: rejected payloads never reach
/// the registration workflow, so no partial state exists for them.
pub async fn handler(
    State(state): State<AppState>,
    locale: Locale,
    body: std::result::Result<Json<Registration>, JsonRejection>,
) -> Result<Json<Message>> {
    let Json(body) = body?;

    let data = validate::validate(&body, state.repo.as_ref()).await?;
    state.users.register(data).await?;

    Ok(Json(Message {
        message: state.catalog.resolve("user_create_success", &locale.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Message;
    use crate::*;
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    fn valid_body() -> Value {
        json!({
            "username": "user1",
            "email": "user1@mail.com",
            "password": "Secret123",
        })
    }

    #[tokio::test]
    async fn test_register_returns_success_message() {
        let (state, _, _) = test_state();
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/users",
            valid_body().to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Message = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.message, "User created successfully");
    }

    #[tokio::test]
    async fn test_register_ignores_client_sent_state_fields() {
        let (state, repo, _) = test_state();
        let app = app(state);

        let mut body = valid_body();
        // the stored row is inactive with a token no matter what the
        // client claims.
        body["inactive"] = json!(false);
        body["activationToken"] = json!(null);

        let response =
            make_request(app, Method::POST, "/users", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let rows = repo.rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].inactive);
        assert!(rows[0].activation_token.is_some());
    }

    #[tokio::test]
    async fn test_register_null_username() {
        let (state, _, _) = test_state();
        let app = app(state);

        let body = json!({
            "username": null,
            "email": "user1@mail.com",
            "password": "Secret123",
        });
        let response =
            make_request(app, Method::POST, "/users", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        let errors = body["validationErrors"].as_object().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["username"], "Username cannot be null");
        assert_eq!(body["path"], "/users");
        assert!(body["timestamp"].is_i64());
        assert_eq!(body["message"], "Validation failure");
    }

    #[tokio::test]
    async fn test_register_error_map_keeps_declared_field_order() {
        let (state, _, _) = test_state();
        let app = app(state);

        let body = json!({
            "username": null,
            "email": null,
            "password": "Secret123",
        });
        let response =
            make_request(app, Method::POST, "/users", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let raw = String::from_utf8(bytes.to_vec()).unwrap();
        let body: Value = serde_json::from_slice(raw.as_bytes()).unwrap();
        let errors = body["validationErrors"].as_object().unwrap();
        assert_eq!(errors.len(), 2);

        // serialized order is declared rule order, username before email.
        let errors_raw = &raw[raw.find("validationErrors").unwrap()..];
        assert!(
            errors_raw.find("username").unwrap()
                < errors_raw.find("email").unwrap()
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (state, _, _) = test_state();
        let app = app(state.clone());

        let first = make_request(
            app.clone(),
            Method::POST,
            "/users",
            valid_body().to_string(),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);

        let body = json!({
            "username": "user2",
            "email": "user1@mail.com",
            "password": "Secret123",
        });
        let second =
            make_request(app, Method::POST, "/users", body.to_string()).await;
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);

        let bytes = second.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let errors = body["validationErrors"].as_object().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["email"], "Email already in use");
    }

    #[tokio::test]
    async fn test_register_dispatch_failure_is_bad_gateway() {
        let (state, repo, notifier) = test_state();
        let app = app(state);
        notifier.fail_next_sends();

        let response = make_request(
            app,
            Method::POST,
            "/users",
            valid_body().to_string(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(repo.rows().is_empty());

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Email failure");
        assert!(body.get("validationErrors").is_none());
    }

    #[tokio::test]
    async fn test_register_localized_messages() {
        let (state, _, _) = test_state();
        let app = app(state);

        let body = json!({
            "username": null,
            "email": "user1@mail.com",
            "password": "Secret123",
        });
        let response = make_localized_request(
            app,
            Method::POST,
            "/users",
            body.to_string(),
            "es-MX,en;q=0.8",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Fallo de validación");
        assert_eq!(
            body["validationErrors"]["username"],
            "El usuario no puede ser nulo"
        );
    }

    #[tokio::test]
    async fn test_register_invalid_json_body() {
        let (state, _, _) = test_state();
        let app = app(state);

        let response =
            make_request(app, Method::POST, "/users", "{not json".into())
                .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Request body is not valid JSON");
    }
}
