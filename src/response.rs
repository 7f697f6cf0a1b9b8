use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    ParamError,
    BizError,
    /// Defined for callers but only emitted under `SystemErrorPolicy::SystemCode`.
    SystemError,
}

impl ResultCode {
    pub fn code(self) -> i32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::ParamError => 1001,
            ResultCode::BizError => 1002,
            ResultCode::SystemError => -1,
        }
    }

    pub fn msg(self) -> &'static str {
        match self {
            ResultCode::Success => "success",
            ResultCode::ParamError => "parameter validation error",
            ResultCode::BizError => "business error",
            ResultCode::SystemError => "system error",
        }
    }
}

/// Uniform `{code, msg, data}` wrapper. `data` is serialized as `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn succeed(data: T) -> Self {
        Self {
            code: ResultCode::Success.code(),
            msg: ResultCode::Success.msg().to_string(),
            data: Some(data),
        }
    }

    pub fn fail(code: ResultCode, msg: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            msg: msg.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
