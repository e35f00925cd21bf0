//! Axum-based HTTP server over a shared [`Station`].
//!
//! Provides REST endpoints for:
//! - GET `/api/state` - Connection state, polling flag and sensor cache
//! - POST `/api/power` - Switch track power
//! - POST `/api/loco/speed` - Set locomotive speed
//! - POST `/api/loco/direction` - Set locomotive direction
//! - POST `/api/loco/function` - Switch a locomotive function
//! - POST `/api/turnout` - Throw a turnout
//! - GET `/api/sensors/:device/:bit` - One cached sensor input
//!
//! Station calls block on the serial line, so handlers run them on the
//! blocking thread pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::address::TurnoutAddress;
use crate::commands::DccCommand;
use crate::config::WebConfig;
use crate::station::Station;
use crate::traits::{FunctionState, Power, Transport};

use super::api::{
    ApiResponse, CommandResponse, FunctionRequest, LocoDirectionRequest, LocoSpeedRequest,
    PowerRequest, SensorBitResponse, StateResponse, TurnoutRequest,
};

/// Station shared between the HTTP handlers and the rest of the program.
pub type SharedStation<T> = Arc<Station<T>>;

// ============================================================================
// Helpers
// ============================================================================

/// Run a blocking station call off the async runtime.
async fn blocking<T, F, R>(station: SharedStation<T>, f: F) -> Option<R>
where
    T: Transport + 'static,
    F: FnOnce(&Station<T>) -> R + Send + 'static,
    R: Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&station)).await {
        Ok(result) => Some(result),
        Err(e) => {
            error!(error = %e, "station task failed");
            None
        }
    }
}

/// Send `command` and report whether it was acknowledged.
async fn dispatch<T: Transport + 'static>(
    station: SharedStation<T>,
    command: DccCommand,
) -> Json<ApiResponse<CommandResponse>> {
    if !station.is_ready() {
        return Json(ApiResponse::err("Station not ready"));
    }
    let wire = command.encode();
    let acknowledged =
        blocking(station, move |s| crate::parsing::is_success(&s.execute(&command))).await;

    match acknowledged {
        Some(ack) => Json(ApiResponse::ok(CommandResponse::from_ack(ack, wire))),
        None => Json(ApiResponse::err("Station task failed")),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/state - Returns connection and sensor state
async fn get_state<T: Transport + 'static>(
    State(station): State<SharedStation<T>>,
) -> Json<ApiResponse<StateResponse>> {
    let state = blocking(station, |s| StateResponse {
        connection: s.state(),
        polling: s.is_polling(),
        sensors: s.sensor_snapshot(),
    })
    .await;

    match state {
        Some(state) => Json(ApiResponse::ok(state)),
        None => Json(ApiResponse::err("Station task failed")),
    }
}

/// POST /api/power - Switch track power
///
/// Accepts JSON: `{"on": true}`
async fn set_power<T: Transport + 'static>(
    State(station): State<SharedStation<T>>,
    body: Result<Json<PowerRequest>, JsonRejection>,
) -> Json<ApiResponse<CommandResponse>> {
    let Ok(Json(req)) = body else {
        return Json(ApiResponse::err("Invalid power request"));
    };
    dispatch(station, DccCommand::SetPower(Power::from(req.on))).await
}

/// POST /api/loco/speed - Set locomotive speed
///
/// Accepts JSON: `{"address": 10, "speed": 400}` with optional `speed_step`
async fn set_loco_speed<T: Transport + 'static>(
    State(station): State<SharedStation<T>>,
    body: Result<Json<LocoSpeedRequest>, JsonRejection>,
) -> Json<ApiResponse<CommandResponse>> {
    let Ok(Json(req)) = body else {
        return Json(ApiResponse::err("Invalid speed request"));
    };
    let command = DccCommand::SetLocoSpeed {
        address: req.address,
        speed: req.speed,
        speed_step: req.speed_step,
    };
    dispatch(station, command).await
}

/// POST /api/loco/direction - Set locomotive direction
///
/// Accepts JSON: `{"address": 10, "direction": "forward"}` or `"reverse"`
async fn set_loco_direction<T: Transport + 'static>(
    State(station): State<SharedStation<T>>,
    body: Result<Json<LocoDirectionRequest>, JsonRejection>,
) -> Json<ApiResponse<CommandResponse>> {
    let Ok(Json(req)) = body else {
        return Json(ApiResponse::err("Invalid direction request"));
    };
    let command = DccCommand::SetLocoDirection {
        address: req.address,
        direction: req.direction,
    };
    dispatch(station, command).await
}

/// POST /api/loco/function - Switch a locomotive function
///
/// Accepts JSON: `{"address": 10, "function": 0, "on": true}`
async fn set_loco_function<T: Transport + 'static>(
    State(station): State<SharedStation<T>>,
    body: Result<Json<FunctionRequest>, JsonRejection>,
) -> Json<ApiResponse<CommandResponse>> {
    let Ok(Json(req)) = body else {
        return Json(ApiResponse::err("Invalid function request"));
    };
    let command = DccCommand::SetLocoFunction {
        address: req.address,
        function: req.function,
        state: FunctionState::from(req.on),
    };
    dispatch(station, command).await
}

/// POST /api/turnout - Throw a turnout
///
/// Accepts JSON: `{"address": 1, "direction": "diverging"}` or `"straight"`
async fn set_turnout<T: Transport + 'static>(
    State(station): State<SharedStation<T>>,
    body: Result<Json<TurnoutRequest>, JsonRejection>,
) -> Json<ApiResponse<CommandResponse>> {
    let Ok(Json(req)) = body else {
        return Json(ApiResponse::err("Invalid turnout request"));
    };
    let address = match TurnoutAddress::new(req.address) {
        Ok(address) => address,
        Err(e) => return Json(ApiResponse::err(e.to_string())),
    };
    let command = DccCommand::SetTurnout {
        address,
        direction: req.direction,
    };
    dispatch(station, command).await
}

/// GET /api/sensors/:device/:bit - One cached sensor input
async fn get_sensor_bit<T: Transport + 'static>(
    State(station): State<SharedStation<T>>,
    path: Result<Path<(usize, u8)>, PathRejection>,
) -> Json<ApiResponse<SensorBitResponse>> {
    let Ok(Path((device, bit))) = path else {
        return Json(ApiResponse::err("Invalid sensor path"));
    };
    Json(ApiResponse::ok(SensorBitResponse {
        device,
        bit,
        set: station.read_bit(device, bit),
        valid: station.sensor_reading(device).is_some(),
    }))
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self::from_config(&WebConfig::default())
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from shared WebConfig
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router<T: Transport + 'static>(
    station: SharedStation<T>,
    config: &WebServerConfig,
) -> Router {
    let mut router = Router::new()
        .route("/api/state", get(get_state::<T>))
        .route("/api/power", post(set_power::<T>))
        .route("/api/loco/speed", post(set_loco_speed::<T>))
        .route("/api/loco/direction", post(set_loco_direction::<T>))
        .route("/api/loco/function", post(set_loco_function::<T>))
        .route("/api/turnout", post(set_turnout::<T>))
        .route("/api/sensors/:device/:bit", get(get_sensor_bit::<T>))
        .fallback(not_found)
        .with_state(station);

    // Add CORS if requested
    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Serve the API until the process is killed.
pub async fn run_server_with_state<T: Transport + 'static>(
    station: SharedStation<T>,
    config: WebServerConfig,
) -> Result<(), std::io::Error> {
    run_server_until(station, config, std::future::pending()).await
}

/// Serve the API until `shutdown` resolves.
pub async fn run_server_until<T, S>(
    station: SharedStation<T>,
    config: WebServerConfig,
    shutdown: S,
) -> Result<(), std::io::Error>
where
    T: Transport + 'static,
    S: Future<Output = ()> + Send + 'static,
{
    let router = build_router(station, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "web server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
