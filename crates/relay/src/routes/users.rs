//! User lifecycle handlers.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, put},
};
use cartsync_core::{Email, EmailError};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::{User, UserUpdate};
use crate::services::RemoteSubscriber;
use crate::state::AppState;

/// Build the user router, mounted at `/users`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(register))
        .route("/remote", get(list_remote))
        .route("/verify-mailchimp", get(verify_mailchimp))
        .route("/{email}", put(update))
}

/// Body of `POST /users`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Body of `PUT /users/{email}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Response for a successful connectivity check.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn validation(err: EmailError) -> AppError {
    AppError::Validation(err.to_string())
}

/// Register a user and subscribe them to the list.
///
/// # Errors
///
/// Returns 400 for a missing name, a missing or malformed email, or an
/// unreadable body; otherwise whatever the platform call produced.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>)> {
    let Json(body) = payload?;

    let (Some(name), Some(email)) = (
        body.name.filter(|n| !n.is_empty()),
        body.email.filter(|e| !e.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Name and email are required".to_string(),
        ));
    };
    let email = Email::parse(&email).map_err(validation)?;

    let user = state.users().register(&name, email).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update the user registered under the path email.
///
/// # Errors
///
/// Returns 400 for a malformed replacement email, 404 if no user is
/// registered under the path email.
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(email): Path<String>,
    payload: std::result::Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<User>> {
    if email.is_empty() {
        return Err(validation(EmailError::Empty));
    }
    let Json(body) = payload?;

    let new_email = body
        .email
        .filter(|e| !e.is_empty())
        .map(|e| Email::parse(&e))
        .transpose()
        .map_err(validation)?;

    // Stored emails are always well-formed, so a malformed key cannot match
    let current =
        Email::parse(&email).map_err(|_| AppError::NotFound("User not found".to_string()))?;

    let update = UserUpdate {
        name: body.name.filter(|n| !n.is_empty()),
        email: new_email,
    };
    let user = state.users().update(&current, &update).await?;
    Ok(Json(user))
}

/// Local users in registration order.
pub async fn list(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.users().list().await)
}

/// Every member of the marketing list.
///
/// # Errors
///
/// Returns an error if the platform cannot be listed.
pub async fn list_remote(State(state): State<AppState>) -> Result<Json<Vec<RemoteSubscriber>>> {
    Ok(Json(state.users().list_remote().await?))
}

/// Ping the marketing platform.
///
/// # Errors
///
/// Returns 503 if the platform cannot be reached.
pub async fn verify_mailchimp(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.users().verify_connection().await?;
    Ok(Json(MessageResponse {
        message: "Mailchimp connection verified",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::db::InMemoryDirectory;
    use crate::services::MarketingError;
    use crate::services::fake::{Call, FakePlatform, Op};

    fn app() -> (Router, Arc<FakePlatform>) {
        let platform = Arc::new(FakePlatform::new());
        let state = AppState::new(Arc::new(InMemoryDirectory::new()), platform.clone());
        let app = Router::new().nest("/users", router()).with_state(state);
        (app, platform)
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_register_returns_created_user() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            json_request("POST", "/users", &json!({"name": "Jane Doe", "email": "jane@x.com"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["name"], "Jane Doe");
        assert_eq!(body["email"], "jane@x.com");
        assert!(body["signupDate"].is_string());
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email_without_side_effects() {
        let (app, platform) = app();

        for email in ["", "jane", "jane@x", "ja ne@x.com", "@x.com"] {
            let (status, body) = send(
                &app,
                json_request("POST", "/users", &json!({"name": "Jane", "email": email})),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{email}");
            assert_eq!(body["error"], "validation_error");
        }

        let (_, users) = send(&app, get("/users")).await;
        assert_eq!(users, json!([]));
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_register_requires_name_and_email() {
        let (app, _) = app();
        let (status, body) = send(&app, json_request("POST", "/users", &json!({"name": "Jane"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Name and email are required");
    }

    #[tokio::test]
    async fn test_register_accepts_whitespace_name() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            json_request("POST", "/users", &json!({"name": " ", "email": "jane@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], " ");
    }

    #[tokio::test]
    async fn test_register_malformed_body_is_bad_request() {
        let (app, _) = app();
        let request = Request::post("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_register_platform_failure_keeps_user() {
        let (app, platform) = app();
        platform.fail(
            Op::Add,
            MarketingError::Api {
                status: 400,
                title: "Invalid Resource".to_string(),
                detail: "jane@x.com looks fake or invalid".to_string(),
            },
        );

        let (status, body) = send(
            &app,
            json_request("POST", "/users", &json!({"name": "Jane Doe", "email": "jane@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "remote_api_error");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("jane@x.com looks fake or invalid")
        );

        let (_, users) = send(&app, get("/users")).await;
        assert_eq!(users[0]["email"], "jane@x.com");
    }

    #[tokio::test]
    async fn test_update_changes_name_only() {
        let (app, _) = app();
        let (_, created) = send(
            &app,
            json_request("POST", "/users", &json!({"name": "Jane Doe", "email": "jane@x.com"})),
        )
        .await;

        let (status, updated) = send(
            &app,
            json_request("PUT", "/users/jane@x.com", &json!({"name": "Jane Smith"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Jane Smith");
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["signupDate"], created["signupDate"]);
        assert_eq!(updated["email"], "jane@x.com");
    }

    #[tokio::test]
    async fn test_update_ignores_empty_fields() {
        let (app, platform) = app();
        send(
            &app,
            json_request("POST", "/users", &json!({"name": "Jane Doe", "email": "jane@x.com"})),
        )
        .await;

        let (status, updated) = send(
            &app,
            json_request("PUT", "/users/jane@x.com", &json!({"name": "", "email": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Jane Doe");
        assert_eq!(updated["email"], "jane@x.com");
        assert!(
            platform
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Update { email, .. } if email == "jane@x.com"))
        );
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_new_email() {
        let (app, platform) = app();
        send(
            &app,
            json_request("POST", "/users", &json!({"name": "Jane Doe", "email": "jane@x.com"})),
        )
        .await;

        let (status, body) = send(
            &app,
            json_request("PUT", "/users/jane@x.com", &json!({"email": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid email format");
        assert_eq!(platform.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let (app, platform) = app();
        for uri in ["/users/ghost@x.com", "/users/not-an-email"] {
            let (status, body) = send(&app, json_request("PUT", uri, &json!({"name": "X"}))).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"], "not_found");
        }
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_remote() {
        let (app, platform) = app();
        platform.seed("jane@x.com", "Jane Doe", &["VIP"]);

        let (status, body) = send(&app, get("/users/remote")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["email_address"], "jane@x.com");
        assert_eq!(platform.calls(), vec![Call::List]);
    }

    #[tokio::test]
    async fn test_list_remote_failure() {
        let (app, platform) = app();
        platform.fail(Op::List, MarketingError::Connectivity("refused".to_string()));

        let (status, body) = send(&app, get("/users/remote")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Failed to get users from Mailchimp")
        );
    }

    #[tokio::test]
    async fn test_verify_mailchimp() {
        let (app, platform) = app();
        let (status, body) = send(&app, get("/users/verify-mailchimp")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Mailchimp connection verified"}));

        platform.fail(Op::Ping, MarketingError::Connectivity("refused".to_string()));
        let (status, body) = send(&app, get("/users/verify-mailchimp")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "connectivity_error");
    }
}
