//! API route definitions.

use axum::{Json, Router, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;
use tracing::error;

use crate::AppState;
use bilans_db::entities::sea_orm_active_enums::BusinessEntity;
use bilans_shared::AppError;

pub mod health;
pub mod history;
pub mod invoices;
pub mod registry;
pub mod settlements;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(invoices::routes())
        .merge(settlements::routes())
        .merge(history::routes())
        .merge(registry::routes())
}

/// Parses an entity discriminator from a request field.
#[must_use]
pub fn parse_entity(value: &str) -> Option<BusinessEntity> {
    match value {
        "zloty_gron" => Some(BusinessEntity::ZlotyGron),
        "srebrny_bucznik" => Some(BusinessEntity::SrebrnyBucznik),
        _ => None,
    }
}

/// Storage-key prefix for an entity.
#[must_use]
pub const fn entity_key(entity: BusinessEntity) -> &'static str {
    match entity {
        BusinessEntity::ZlotyGron => "zloty_gron",
        BusinessEntity::SrebrnyBucznik => "srebrny_bucznik",
    }
}

/// Standard error envelope.
pub(crate) fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message
        })),
    )
        .into_response()
}

/// Renders an [`AppError`] with its conventional status and code.
pub(crate) fn app_error(err: &AppError) -> Response {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, err.error_code(), &err.to_string())
}

/// 500 envelope for unexpected failures; the detail goes to the log only.
pub(crate) fn internal_error(err: &dyn std::fmt::Display) -> Response {
    error!(error = %err, "request failed");
    app_error(&AppError::Internal("An error occurred".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_accepts_known_values() {
        assert_eq!(parse_entity("zloty_gron"), Some(BusinessEntity::ZlotyGron));
        assert_eq!(
            parse_entity("srebrny_bucznik"),
            Some(BusinessEntity::SrebrnyBucznik)
        );
        assert_eq!(parse_entity("hotel"), None);
        assert_eq!(parse_entity(""), None);
    }

    #[test]
    fn test_entity_key_roundtrips() {
        for entity in [BusinessEntity::ZlotyGron, BusinessEntity::SrebrnyBucznik] {
            assert_eq!(parse_entity(entity_key(entity)), Some(entity));
        }
    }
}
