use serde::Serialize;

/// Body of a successful access check: an empty JSON object.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AccessGranted {}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
