use seatkeeper_application::CheckPermissionInput;
use serde::{Deserialize, Serialize};

/// Incoming permission question.
#[derive(Debug, Deserialize)]
pub struct CheckPermissionRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub resourcetype: String,
    #[serde(default)]
    pub resourceid: String,
}

impl From<CheckPermissionRequest> for CheckPermissionInput {
    fn from(value: CheckPermissionRequest) -> Self {
        Self {
            subject: value.subject,
            operation: value.operation,
            resource_type: value.resourcetype,
            resource_id: value.resourceid,
        }
    }
}

/// Permission decision payload.
#[derive(Debug, Serialize)]
pub struct CheckPermissionResponse {
    pub result: bool,
}
