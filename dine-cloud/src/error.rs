//! Unified service-layer error type for dine-cloud
//!
//! `ServiceError` bridges the gap between DB-layer errors (`sqlx::Error`, `BoxError`)
//! and the API-layer error (`AppError`). Transactional db functions return it so
//! a business-rule rejection found mid-transaction propagates with `?` and the
//! transaction rolls back on drop.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Db`: Database/infrastructure errors (auto-logged, mapped to InternalError)
/// - `App`: Business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (sqlx, reqwest, serde, etc.)
    Db(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

macro_rules! rule_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ServiceError {
                fn from(e: $ty) -> Self {
                    ServiceError::App(e.into())
                }
            }
        )*
    };
}

rule_error!(
    shared::order::LifecycleError,
    shared::order::SessionError,
    shared::payment::PaymentRuleError,
    shared::kds::KdsError,
    shared::staff::StaffError,
    shared::billing::SplitError,
);

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Log an infrastructure error and hide it behind `InternalError`
pub fn internal(e: impl std::fmt::Display) -> AppError {
    tracing::error!("Query error: {e}");
    AppError::new(ErrorCode::InternalError)
}

/// Name of the violated unique constraint, if `e` is a `23505` error
pub fn unique_violation(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Map a unique violation on `constraint` to `conflict`, anything else to `Db`
pub fn map_unique(e: sqlx::Error, constraint: &str, conflict: AppError) -> ServiceError {
    match unique_violation(&e) {
        Some(name) if name == constraint => ServiceError::App(conflict),
        _ => ServiceError::Db(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_errors_keep_their_codes() {
        let err: AppError = ServiceError::from(shared::staff::StaffError::LastOwner).into();
        assert_eq!(err.code, ErrorCode::LastOwner);
    }

    #[test]
    fn db_errors_become_internal() {
        let err: AppError = ServiceError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(unique_violation(&sqlx::Error::RowNotFound), None);
    }

    #[test]
    fn map_unique_passes_other_errors_through() {
        let mapped = map_unique(
            sqlx::Error::PoolTimedOut,
            "uq_venue_tables_label",
            AppError::new(ErrorCode::TableLabelExists),
        );
        assert!(matches!(mapped, ServiceError::Db(_)));
    }
}
