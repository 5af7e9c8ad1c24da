//! HTTP endpoints
//!
//! Three request/response cycles, each a linear composition of the SSO
//! client and the token store:
//!
//! - `GET /ping` — liveness, no dependencies
//! - `GET /token?code=...` — exchange code, verify identity, persist, respond
//! - `POST /refresh` — validate client id, look up stored row, renew, respond
//!
//! Plus `GET /metrics` for Prometheus text exposition.

use axum::Router;
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN};
use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::Error;
use crate::store::{NewToken, TokenStore};
use eve_sso::SsoClient;

/// Shared application state, constructed once in `main` and handed to every
/// handler via the `State` extractor. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub sso: SsoClient,
    pub store: TokenStore,
    pub client_id: String,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes, shared state, and the CORS layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(get_ping))
        .route("/token", get(get_token))
        .route("/refresh", post(post_refresh))
        .route("/metrics", get(get_metrics))
        .layer(cors_layer())
        .with_state(state)
}

/// Cross-origin policy: any origin with credentials, the three headers the
/// frontend sends, Content-Length exposed, preflight cached for 12 hours.
/// Credentials forbid the wildcard origin, so the request origin is mirrored.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ORIGIN, AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([CONTENT_LENGTH])
        .max_age(Duration::from_secs(12 * 60 * 60))
}

async fn get_ping() -> impl IntoResponse {
    crate::metrics::record_request("ping");
    Json(serde_json::json!({"message": "pong"}))
}

async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.prometheus.render(),
    )
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    code: Option<String>,
}

/// Successful exchange response.
#[derive(Debug, Serialize)]
struct TokenGrant {
    token: String,
    #[serde(rename = "characterName")]
    character_name: String,
    #[serde(rename = "characterID")]
    character_id: i64,
}

async fn get_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenGrant>, Error> {
    crate::metrics::record_request("token");
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or(Error::MissingCode)?;
    let request_id = format!("req_{}", Uuid::new_v4().as_simple());
    exchange_token(&state, &code, &request_id).await
}

/// Exchange the code, resolve the character, persist a new row.
#[instrument(skip_all, fields(request_id = %request_id))]
async fn exchange_token(
    state: &AppState,
    code: &str,
    request_id: &str,
) -> Result<Json<TokenGrant>, Error> {
    let tokens = state.sso.exchange_code(code).await?;
    let character = state.sso.verify(&tokens.access_token).await?;

    let record = state
        .store
        .create(NewToken {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            character_id: character.character_id,
            character_name: character.character_name,
        })
        .await?;

    info!(
        character_id = record.character_id,
        character = %record.character_name,
        "issued token"
    );

    Ok(Json(TokenGrant {
        token: record.access_token,
        character_name: record.character_name,
        character_id: record.character_id,
    }))
}

/// Refresh request body, accepted as JSON, form-urlencoded, or XML.
///
/// Fields default to empty so presence can be validated explicitly with
/// distinct errors instead of an opaque deserialization failure.
#[derive(Debug, Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    token: String,
    #[serde(rename = "client_ID", default)]
    client_id: String,
}

/// Successful refresh response.
#[derive(Debug, Serialize)]
struct RefreshGrant {
    token: String,
}

async fn post_refresh(
    State(state): State<AppState>,
    BoundBody(body): BoundBody<RefreshRequest>,
) -> Result<Json<RefreshGrant>, Error> {
    crate::metrics::record_request("refresh");
    if body.token.is_empty() {
        return Err(Error::MissingToken);
    }
    // Checked before any lookup or outbound call
    if body.client_id.is_empty() || body.client_id != state.client_id {
        return Err(Error::ClientIdMismatch);
    }
    let request_id = format!("req_{}", Uuid::new_v4().as_simple());
    renew_token(&state, &body.token, &request_id).await
}

/// Look up the stored row, renew against the authority, overwrite in place.
#[instrument(skip_all, fields(request_id = %request_id))]
async fn renew_token(
    state: &AppState,
    access_token: &str,
    request_id: &str,
) -> Result<Json<RefreshGrant>, Error> {
    let record = state
        .store
        .find_by_access_token(access_token)
        .await?
        .ok_or(Error::TokenNotFound)?;

    let tokens = state.sso.refresh(&record.refresh_token).await?;
    state
        .store
        .update_access_token(record.id, &tokens.access_token)
        .await?;

    info!(character_id = record.character_id, "renewed access token");

    Ok(Json(RefreshGrant {
        token: tokens.access_token,
    }))
}

/// Body extractor dispatching on Content-Type: JSON, form-urlencoded, or
/// XML. Anything else is rejected up front with a 400.
pub struct BoundBody<T>(pub T);

impl<S, T> FromRequest<S> for BoundBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("application/json") {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| Error::InvalidBody(e.to_string()))?;
            Ok(Self(value))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| Error::InvalidBody(e.to_string()))?;
            Ok(Self(value))
        } else if content_type.starts_with("application/xml")
            || content_type.starts_with("text/xml")
        {
            let body = String::from_request(req, state)
                .await
                .map_err(|e| Error::InvalidBody(e.to_string()))?;
            let value = quick_xml::de::from_str(&body)
                .map_err(|e| Error::InvalidBody(format!("invalid XML body: {e}")))?;
            Ok(Self(value))
        } else {
            Err(Error::InvalidBody(format!(
                "unsupported content type: {content_type}"
            )))
        }
    }
}
