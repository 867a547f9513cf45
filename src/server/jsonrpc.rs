//! JSON-RPC 2.0 envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const VERSION: &str = "2.0";

/// Standard error codes.
pub mod error_code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// Any message on the wire: request, notification or response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A request that could not be answered.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("parse error: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params for '{method}': {source}")]
    InvalidParams {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn code(&self) -> i64 {
        match self {
            ProtocolError::Parse(_) => error_code::PARSE_ERROR,
            ProtocolError::InvalidRequest(_) => error_code::INVALID_REQUEST,
            ProtocolError::MethodNotFound(_) => error_code::METHOD_NOT_FOUND,
            ProtocolError::InvalidParams { .. } => error_code::INVALID_PARAMS,
            ProtocolError::Internal(_) => error_code::INTERNAL_ERROR,
        }
    }

    pub fn to_response_error(&self) -> ResponseError {
        ResponseError {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}

impl Message {
    /// A response carrying `result`. A null id answers a request whose id
    /// could not be read.
    pub fn response(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            id,
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, error: &ProtocolError) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            id,
            method: None,
            params: None,
            result: None,
            error: Some(error.to_response_error()),
        }
    }

    pub fn notification(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            id: None,
            method: Some(method.to_string()),
            params: Some(params),
            result: None,
            error: None,
        }
    }

    /// Serialize for the wire. A response without an id still carries
    /// `"id": null`.
    pub fn to_json(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if self.method.is_none() && self.id.is_none() {
            if let Value::Object(map) = &mut value {
                map.insert("id".to_string(), Value::Null);
            }
        }
        value
    }
}
