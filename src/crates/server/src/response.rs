//! Response envelope helpers, mirroring pcastone-orca's `api::response` module (a
//! `{success, data}` envelope over plain JSON).

use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    Json(SuccessResponse { success: true, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wraps_data_under_success_flag() {
        let envelope = SuccessResponse { success: true, data: serde_json::json!({"a": 1}) };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["a"], 1);
    }
}
