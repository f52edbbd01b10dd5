//! SDK error conversion
//!
//! Folds `SdkError` into the engine's store error taxonomy by dispatch kind
//! and service error code.

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use nav_core::{Error, StoreErrorKind};

/// Convert an SDK failure of `operation` into a store error
pub(crate) fn store_error<E, R>(operation: &str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::TimeoutError(_) => StoreErrorKind::Timeout,
        SdkError::DispatchFailure(failure) if failure.is_timeout() => StoreErrorKind::Timeout,
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => StoreErrorKind::Network,
        SdkError::ServiceError(service) => classify_code(service.err().code()),
        _ => StoreErrorKind::Unknown,
    };

    let message = match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        _ => DisplayErrorContext(&err).to_string(),
    };

    tracing::debug!(operation, %kind, %message, "store request failed");
    Error::store(operation, kind, message)
}

/// Map an S3 error code to a store error kind
pub(crate) fn classify_code(code: Option<&str>) -> StoreErrorKind {
    match code {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound" | "NoSuchUpload") => {
            StoreErrorKind::NotFound
        }
        Some(
            "AccessDenied"
            | "Forbidden"
            | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch"
            | "AllAccessDisabled",
        ) => StoreErrorKind::AccessDenied,
        Some("RequestTimeout" | "RequestTimeTooSkewed") => StoreErrorKind::Timeout,
        Some("SlowDown" | "ServiceUnavailable" | "InternalError") => StoreErrorKind::Network,
        _ => StoreErrorKind::Unknown,
    }
}
