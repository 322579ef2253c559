use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Uniform success envelope: `{"success": true, "data"?, "message"?, "id"?}`.
///
/// Every endpoint, success or failure, returns this shape (failures through
/// [`crate::error::ApiError`]); no handler ever emits a bare body.
#[derive(Debug)]
pub struct Envelope {
    data: Option<Value>,
    message: Option<String>,
    id: Option<Value>,
    status_code: StatusCode,
}

impl Envelope {
    /// 200 OK with a data payload (entity or list).
    pub fn data<T: Serialize>(data: T) -> Self {
        Self {
            data: serde_json::to_value(data).ok(),
            message: None,
            id: None,
            status_code: StatusCode::OK,
        }
    }

    /// 200 OK with a message only (update/delete acknowledgements).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            id: None,
            status_code: StatusCode::OK,
        }
    }

    /// 201 Created carrying the generated (or caller-supplied natural) key.
    pub fn created(message: impl Into<String>, id: impl Serialize) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            id: serde_json::to_value(id).ok(),
            status_code: StatusCode::CREATED,
        }
    }

    /// 201 Created returning the stored row itself (weeks family behavior).
    pub fn created_data<T: Serialize>(data: T) -> Self {
        Self {
            data: serde_json::to_value(data).ok(),
            message: None,
            id: None,
            status_code: StatusCode::CREATED,
        }
    }

    /// Attach a data payload to an existing envelope (e.g. login user info).
    pub fn with_data<T: Serialize>(mut self, data: T) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let mut body = json!({ "success": true });
        if let Some(data) = self.data {
            body["data"] = data;
        }
        if let Some(message) = self.message {
            body["message"] = Value::String(message);
        }
        if let Some(id) = self.id {
            body["id"] = id;
        }
        (self.status_code, Json(body)).into_response()
    }
}

/// Handler result alias: success envelope or taxonomy error.
pub type ApiResult = Result<Envelope, crate::error::ApiError>;
