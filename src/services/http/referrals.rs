use axum::{extract::State, http::StatusCode};

use super::{
    dispatch, error_response, reply, ApiResponse, AppState, CallerId, JsonBody, JsonResponse,
};
use crate::models::referrals::TrackReferral;
use crate::services::{referrals::ReferralRequest, ServiceError};

pub async fn get_referral_page(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> JsonResponse {
    let page = dispatch(&state.referral_channel, "Referrals", |response| {
        ReferralRequest::GetPage { user_id, response }
    })
    .await;

    match page {
        Ok(page) => reply(StatusCode::OK, ApiResponse::ok(page, None)),
        Err(service_error) => error_response(service_error),
    }
}

pub async fn get_referral_history(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> JsonResponse {
    let history = dispatch(&state.referral_channel, "Referrals", |response| {
        ReferralRequest::GetHistory { user_id, response }
    })
    .await;

    match history {
        Ok(history) => reply(StatusCode::OK, ApiResponse::ok(history, None)),
        Err(service_error) => error_response(service_error),
    }
}

pub async fn track_referral_click(
    State(state): State<AppState>,
    JsonBody(click): JsonBody<TrackReferral>,
) -> JsonResponse {
    let tracked = dispatch(&state.referral_channel, "Referrals", |response| {
        ReferralRequest::TrackClick { click, response }
    })
    .await;

    match tracked {
        Ok(click) => reply(StatusCode::OK, ApiResponse::ok(click, None)),
        Err(ServiceError::ValidationFailed(_)) => reply(
            StatusCode::BAD_REQUEST,
            ApiResponse::<()>::fail("ReferralCode is required", None),
        ),
        Err(service_error) => error_response(service_error),
    }
}
