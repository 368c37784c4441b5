//! Abandoned-cart handlers.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use crate::error::Result;
use crate::models::AbandonedCart;
use crate::services::RemoteSubscriber;
use crate::state::AppState;

/// Build the abandoned-cart router, mounted at `/abandoned-cart`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(status).post(record))
}

/// Relay an abandoned cart; responds with the updated list member.
///
/// # Errors
///
/// Returns 400 for a missing or malformed email or an unreadable body, and
/// 502 `remote_api_error` if the member is unknown to the platform (the
/// tag lookup 404 is propagated, no member is created).
#[instrument(skip(state, payload))]
pub async fn record(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AbandonedCart>, JsonRejection>,
) -> Result<(StatusCode, Json<RemoteSubscriber>)> {
    let Json(cart) = payload?;
    let member = state.carts().record(&cart).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Liveness string for storefront integrators.
pub async fn status() -> &'static str {
    "Abandoned cart route is working"
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
    use crate::services::fake::FakePlatform;

    fn app() -> (Router, Arc<FakePlatform>) {
        let platform = Arc::new(FakePlatform::new());
        let state = AppState::new(Arc::new(InMemoryDirectory::new()), platform.clone());
        let app = Router::new()
            .nest("/abandoned-cart", router())
            .with_state(state);
        (app, platform)
    }

    fn payload() -> Value {
        json!({
            "customerName": "Jane Doe",
            "email": "jane@x.com",
            "cartId": "cart-1",
            "cartItems": [
                {"name": "Shoe", "quantity": 2, "price": 9.5},
                {"name": "Sock", "quantity": 1, "price": 3}
            ],
            "totalPrice": 22,
            "abandonmentTimestamp": "2024-05-01T10:00:00Z",
            "returnUrl": "https://shop.example.com/cart/cart-1"
        })
    }

    async fn post(app: Router, body: &Value) -> (StatusCode, Value) {
        let request = Request::post("/abandoned-cart")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_route() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/abandoned-cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Abandoned cart route is working");
    }

    #[tokio::test]
    async fn test_record_returns_member() {
        let (app, platform) = app();
        platform.seed("jane@x.com", "Jane Doe", &["New-customer"]);

        let (status, body) = post(app, &payload()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email_address"], "jane@x.com");
        assert_eq!(body["merge_fields"]["CARTID"], "cart-1");
        assert_eq!(
            body["merge_fields"]["CARTITEMS"],
            "Shoe (2) - $9.5, Sock (1) - $3"
        );
        assert_eq!(body["merge_fields"]["TOTALPRICE"], "22");
    }

    #[tokio::test]
    async fn test_missing_email_is_bad_request() {
        let (app, platform) = app();
        let mut body = payload();
        body.as_object_mut().unwrap().remove("email");

        let (status, body) = post(app, &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email is required");
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_email_is_bad_request() {
        let (app, platform) = app();
        let mut body = payload();
        body["email"] = json!("jane@x");

        let (status, body) = post(app, &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid email format");
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_member_is_gateway_error() {
        let (app, _) = app();
        let (status, body) = post(app, &payload()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "remote_api_error");
    }
}
