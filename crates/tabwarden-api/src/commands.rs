//! Command types for the tabwardend protocol

use serde::{Deserialize, Serialize};
use tabwarden_util::ClientId;

use crate::API_VERSION;

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidLimit,
    RateLimited,
    InternalError,
}

/// All possible commands from display clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get the current timer/block status snapshot
    GetTimerInfo,

    /// Set the session time budget in minutes.
    ///
    /// The display layer validates the range [1, 1440] before sending;
    /// the daemon rejects out-of-range values at the protocol boundary
    /// so the engine never sees them.
    SetTimeLimit { minutes: u32 },

    /// Set the daily open quota. Always acknowledged, always ignored:
    /// the quota is fixed and this command exists for display parity.
    SetDailyOpensLimit { limit: u32 },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    TimerInfo(crate::TimerInfo),
    LimitSet {
        minutes: u32,
    },
    /// The acknowledged-but-ignored quota "update"
    DailyOpensLimitSet {
        limit: u32,
    },
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    Health(crate::HealthStatus),
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = Request::new(1, Command::GetTimerInfo);
        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
        assert!(matches!(parsed.command, Command::GetTimerInfo));
    }

    #[test]
    fn set_time_limit_wire_shape() {
        let req = Request::new(2, Command::SetTimeLimit { minutes: 30 });
        let json = serde_json::to_string(&req).unwrap();

        assert!(json.contains("\"type\":\"set_time_limit\""));
        assert!(json.contains("\"minutes\":30"));
    }

    #[test]
    fn error_response_serialization() {
        let resp = Response::error(
            3,
            ErrorInfo::new(ErrorCode::InvalidLimit, "limit out of range"),
        );
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 3);
        match parsed.result {
            ResponseResult::Err(e) => assert_eq!(e.code, ErrorCode::InvalidLimit),
            ResponseResult::Ok(_) => panic!("expected error result"),
        }
    }
}
