//! API v0 endpoints.
//!
//! Version 0 signals an unstable API; breaking changes are expected.
//! Voltages are integer microvolts on the wire. Register addresses in paths
//! may be decimal or `0x` hex.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use super::server::SharedState;
use crate::{
    api_client::types::{
        DriverInfo, ErrorBody, RailState, RailVoltage, RegisterValue, SetVoltageRequest,
        SetVoltageResponse, WriteRegisterRequest,
    },
    config::parse_u8,
    error::VrError,
    rail::Rail,
    service::RailReading,
    tracing::prelude::*,
    types::Voltage,
};

/// Build the v0 API routes.
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(get_info))
        .route("/rails", get(list_rails))
        .route("/rails/{name}", get(get_rail).put(set_rail))
        .route(
            "/registers/{address}",
            get(read_register).put(write_register),
        )
}

/// Error returned by every handler, rendered as an [`ErrorBody`].
enum ApiError {
    Service(VrError),
    BadRequest(String),
}

impl From<VrError> for ApiError {
    fn from(err: VrError) -> Self {
        Self::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::Service(err) => {
                let (status, kind) = match &err {
                    VrError::UnknownRail(_) => (StatusCode::NOT_FOUND, "unknown_rail"),
                    VrError::Transport(e) => {
                        warn!(error = %e, "Bus transaction failed");
                        (StatusCode::BAD_GATEWAY, "transport_error")
                    }
                    VrError::Unbound => (StatusCode::SERVICE_UNAVAILABLE, "unbound"),
                };
                (status, kind, err.to_string())
            }
        };

        let body = ErrorBody {
            error: kind.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Health check endpoint.
async fn health() -> &'static str {
    "OK"
}

async fn get_info(State(state): State<SharedState>) -> Json<DriverInfo> {
    Json(state.info.clone())
}

/// Every rail with its range and current voltage.
async fn list_rails(State(state): State<SharedState>) -> ApiResult<Vec<RailState>> {
    let readings = state.service.list_rails().await?;
    Ok(Json(readings.into_iter().map(rail_state).collect()))
}

fn rail_state(reading: RailReading) -> RailState {
    let RailReading { rail, voltage } = reading;
    let class = rail.class();
    let (microvolts, error) = match voltage {
        Ok(v) => (Some(v.uv()), None),
        Err(e) => (None, Some(e.to_string())),
    };

    RailState {
        name: rail.name().to_string(),
        bank: rail.bank(),
        class,
        register: rail.register(),
        min_microvolts: class.min_voltage().uv(),
        max_microvolts: class.max_voltage().uv(),
        microvolts,
        error,
    }
}

async fn get_rail(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<RailVoltage> {
    let rail: Rail = name.parse().map_err(VrError::from)?;
    let voltage = state.service.read_rail(rail).await?;

    Ok(Json(RailVoltage {
        name: rail.name().to_string(),
        microvolts: voltage.uv(),
    }))
}

/// Program a rail. Responds with the voltage read back after settling.
async fn set_rail(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    body: Result<Json<SetVoltageRequest>, JsonRejection>,
) -> ApiResult<SetVoltageResponse> {
    let rail: Rail = name.parse().map_err(VrError::from)?;
    let Json(request) = body?;

    let actual = state
        .service
        .write_rail(rail, Voltage::from_uv(request.microvolts))
        .await?;

    Ok(Json(SetVoltageResponse {
        name: rail.name().to_string(),
        requested_microvolts: request.microvolts,
        microvolts: actual.uv(),
    }))
}

fn parse_register(address: &str) -> Result<u8, ApiError> {
    parse_u8(address)
        .map_err(|_| ApiError::BadRequest(format!("invalid register address: {:?}", address)))
}

async fn read_register(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> ApiResult<RegisterValue> {
    let address = parse_register(&address)?;
    let value = state.service.read_register(address).await?;
    Ok(Json(RegisterValue { address, value }))
}

async fn write_register(
    State(state): State<SharedState>,
    Path(address): Path<String>,
    body: Result<Json<WriteRegisterRequest>, JsonRejection>,
) -> ApiResult<RegisterValue> {
    let address = parse_register(&address)?;
    let Json(request) = body?;

    let value = state
        .service
        .write_register(address, request.value)
        .await?;
    Ok(Json(RegisterValue { address, value }))
}
