use axum::{extract::State, http::StatusCode};

use super::{dispatch, error_response, reply, ApiResponse, AppState, JsonBody, JsonResponse};
use crate::models::users::{NewRegistration, RegistrationOutcome, RegistrationResult};
use crate::services::registration::RegistrationRequest;

pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(registration): JsonBody<NewRegistration>,
) -> JsonResponse {
    if let Err(errors) = registration.validate() {
        return reply(
            StatusCode::BAD_REQUEST,
            ApiResponse::<RegistrationResult>::fail("Validation failed", Some(errors)),
        );
    }

    let outcome = dispatch(&state.registration_channel, "Registration", |response| {
        RegistrationRequest::Register {
            registration,
            response,
        }
    })
    .await;

    match outcome {
        Ok(RegistrationOutcome::DuplicateName { .. }) => reply(
            StatusCode::CONFLICT,
            ApiResponse::<RegistrationResult>::fail("A user with this name already exists.", None),
        ),
        Ok(registered) => reply(
            StatusCode::OK,
            ApiResponse::ok(
                RegistrationResult::from(registered),
                Some("Registration successful"),
            ),
        ),
        Err(service_error) => error_response(service_error),
    }
}
