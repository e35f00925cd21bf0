//! API response types for the HTTP service.

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionState;

// Re-export shared request types from messages module
pub use crate::messages::{
    FunctionRequest, LocoDirectionRequest, LocoSpeedRequest, PowerRequest, TurnoutRequest,
};

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Station state: connection, poller and the sensor cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    /// Connection lifecycle state
    pub connection: ConnectionState,
    /// Whether the background poller is running
    pub polling: bool,
    /// Cached bitfield per S88 device (`null` when invalid)
    pub sensors: Vec<Option<u32>>,
}

/// Command result response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Whether the controller acknowledged the command
    pub accepted: bool,
    /// Command expression that was sent
    pub result: String,
}

impl CommandResponse {
    /// Command acknowledged with `200 Ok`.
    pub fn accepted(result: impl Into<String>) -> Self {
        Self {
            accepted: true,
            result: result.into(),
        }
    }

    /// Command dropped or not acknowledged.
    pub fn rejected(result: impl Into<String>) -> Self {
        Self {
            accepted: false,
            result: result.into(),
        }
    }

    /// Build from an acknowledgement flag.
    pub fn from_ack(acknowledged: bool, result: impl Into<String>) -> Self {
        if acknowledged {
            Self::accepted(result)
        } else {
            Self::rejected(result)
        }
    }
}

/// One cached sensor input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorBitResponse {
    /// 1-indexed S88 device
    pub device: usize,
    /// 1-indexed sensor input
    pub bit: u8,
    /// Whether the input reads set
    pub set: bool,
    /// Whether the device's cached reading is valid
    pub valid: bool,
}
