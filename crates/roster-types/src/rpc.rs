use serde::{Deserialize, Serialize};

use crate::Status;

// ============================================================================
// RPC Protocol
// ============================================================================

pub const METHOD_ADD_USER: &str = "add-user";
pub const METHOD_GET_USER_BY_ID: &str = "get-user-by-id";
pub const METHOD_GET_USERS_BY_IDS: &str = "get-users-by-ids";
pub const METHOD_SEARCH_USERS: &str = "search-users";
pub const METHOD_LIST_USERS: &str = "list-users";
pub const METHOD_DESCRIBE_SESSION: &str = "describe-session";
pub const METHOD_SHUTDOWN: &str = "shutdown";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest<P> {
    pub method: String,
    pub params: P,
    #[serde(default)]
    pub profile: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcResponse<R> {
    Success {
        result: R,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profiling: Option<ProfilingData>,
    },
    Error {
        error: Status,
    },
}

impl<R> RpcResponse<R> {
    pub fn success(result: R) -> Self {
        RpcResponse::Success {
            result,
            profiling: None,
        }
    }

    pub fn error(status: Status) -> Self {
        RpcResponse::Error { error: status }
    }

    pub fn into_result(self) -> Result<R, Status> {
        match self {
            RpcResponse::Success { result, .. } => Ok(result),
            RpcResponse::Error { error } => Err(error),
        }
    }
}

// ============================================================================
// Shutdown
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShutdownParams {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownResult {
    pub status: String,
}

// ============================================================================
// Describe Session
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescribeSessionParams {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeSessionResult {
    pub daemon_pid: u32,
    pub listen_addr: String,
    pub user_count: usize,
}

// ============================================================================
// Profiling
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionStats {
    pub name: String,
    pub calls: u32,
    pub total_us: u64,
    pub avg_us: u64,
    pub p90_us: u64,
    pub max_us: u64,
}

/// Timing of one profiled request: the whole method call plus the spans
/// recorded beneath it, grouped by function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilingData {
    pub method: String,
    pub total_us: u64,
    pub functions: Vec<FunctionStats>,
}
