use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::{
    referrals::ReferralRequest, registration::RegistrationRequest, ServiceChannels, ServiceError,
};

mod referrals;
mod registration;

/// Header carrying the already-authenticated caller.
pub const CALLER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    registration_channel: mpsc::Sender<RegistrationRequest>,
    referral_channel: mpsc::Sender<ReferralRequest>,
}

impl From<ServiceChannels> for AppState {
    fn from(channels: ServiceChannels) -> Self {
        AppState {
            registration_channel: channels.registration,
            referral_channel: channels.referrals,
        }
    }
}

/// Envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
    pub errors: Option<Vec<String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: Option<&str>) -> Self {
        ApiResponse {
            success: true,
            message: message.map(str::to_string),
            data: Some(data),
            errors: None,
        }
    }

    pub fn fail(message: &str, errors: Option<Vec<String>>) -> Self {
        ApiResponse {
            success: false,
            message: Some(message.to_string()),
            data: None,
            errors,
        }
    }
}

pub type JsonResponse = (StatusCode, Json<Value>);

fn reply<T: Serialize>(status: StatusCode, response: ApiResponse<T>) -> JsonResponse {
    (status, Json(json!(response)))
}

fn error_response(error: ServiceError) -> JsonResponse {
    match error {
        ServiceError::NotFound(what) => reply(
            StatusCode::NOT_FOUND,
            ApiResponse::<()>::fail(&format!("{what} not found"), None),
        ),
        ServiceError::ValidationFailed(errors) => reply(
            StatusCode::BAD_REQUEST,
            ApiResponse::<()>::fail("Validation failed", Some(errors)),
        ),
        error @ (ServiceError::Misconfigured(_)
        | ServiceError::Repository(_, _)
        | ServiceError::Communication(_, _)) => {
            log::error!("Request failed: {error}");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::<()>::fail("An unexpected error occurred", Some(vec![error.to_string()])),
            )
        }
    }
}

/// Sends a request to a service and waits for its answer.
async fn dispatch<R, T>(
    channel: &mpsc::Sender<R>,
    service: &str,
    request: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?
}

/// Identity of the caller, taken from [`CALLER_HEADER`].
pub struct CallerId(pub String);

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = JsonResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CallerId(value.to_string()))
            .ok_or_else(|| {
                reply(
                    StatusCode::BAD_REQUEST,
                    ApiResponse::<()>::fail("Missing caller identity", None),
                )
            })
    }
}

/// JSON request body. Malformed bodies are answered with the same
/// "Validation failed" envelope as field checks.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = JsonResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                log::debug!("Rejected request body: {}", rejection.body_text());
                Err(reply(
                    StatusCode::BAD_REQUEST,
                    ApiResponse::<()>::fail("Validation failed", Some(vec![rejection.body_text()])),
                ))
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/registration", post(registration::register_user))
        .route("/api/referrals/page", get(referrals::get_referral_page))
        .route("/api/referrals/history", get(referrals::get_referral_history))
        .route("/api/referrals/track", post(referrals::track_referral_click))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(listen: &str, channels: ServiceChannels) -> Result<(), anyhow::Error> {
    let app = router(AppState::from(channels));

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
