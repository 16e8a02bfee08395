//! Error types for dynadump.
//!
//! Store failures are mapped from AWS SDK errors into [`DumpError`].
//! Uses typed `SdkError` variant matching, not string parsing of debug output.

use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Classification of a failed store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Connection,
    Credentials,
    AccessDenied,
    Throttled,
    Validation,
    ResourceInUse,
    Other,
}

impl TransportKind {
    fn name(&self) -> &'static str {
        match self {
            TransportKind::Connection => "connection",
            TransportKind::Credentials => "credentials",
            TransportKind::AccessDenied => "access denied",
            TransportKind::Throttled => "throttled",
            TransportKind::Validation => "validation",
            TransportKind::ResourceInUse => "resource in use",
            TransportKind::Other => "error",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum DumpError {
    /// A store call failed (network, auth, throttling, validation...).
    #[error("{operation} failed ({kind}){}: {message}", table_suffix(.table))]
    Transport {
        operation: &'static str,
        table: Option<String>,
        kind: TransportKind,
        message: String,
    },

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("artifact not found: {}", .path.display())]
    ArtifactNotFound { path: PathBuf },

    /// A schema or data file does not follow the artifact contract.
    #[error("malformed artifact {}: {reason}", .path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    /// A single item was rejected by the destination table.
    #[error("failed to write item to '{table}': {source}")]
    ItemWrite {
        table: String,
        #[source]
        source: Box<DumpError>,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rename pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn table_suffix(table: &Option<String>) -> String {
    match table {
        Some(t) => format!(" on '{}'", t),
        None => String::new(),
    }
}

impl DumpError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            DumpError::ArtifactNotFound { path }
        } else {
            DumpError::Io { path, source }
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        DumpError::MalformedArtifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for `TableNotFound` and `ArtifactNotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DumpError::TableNotFound(_) | DumpError::ArtifactNotFound { .. }
        )
    }

    pub(crate) fn transport(
        operation: &'static str,
        table: Option<&str>,
        kind: TransportKind,
        message: impl Into<String>,
    ) -> Self {
        DumpError::Transport {
            operation,
            table: table.map(str::to_string),
            kind,
            message: message.into(),
        }
    }
}

// ========== TYPED ERROR MAPPING ==========

/// Map non-service `SdkError` variants (dispatch failures, timeouts, etc.).
///
/// Returns `None` for `ServiceError`.
fn map_outer_sdk_error<E, R>(
    err: &SdkError<E, R>,
    operation: &'static str,
    table: Option<&str>,
) -> Option<DumpError>
where
    E: fmt::Debug,
    R: fmt::Debug,
{
    let transport = |kind, message: String| Some(DumpError::transport(operation, table, kind, message));

    match err {
        SdkError::DispatchFailure(dispatch) => {
            if dispatch.is_timeout() {
                transport(
                    TransportKind::Connection,
                    "connection timed out, check your network or endpoint".to_string(),
                )
            } else if dispatch.is_io() {
                transport(
                    TransportKind::Connection,
                    "connection failed (I/O error), check if the endpoint is reachable".to_string(),
                )
            } else {
                transport(
                    TransportKind::Connection,
                    "connection failed, check if the endpoint is reachable".to_string(),
                )
            }
        }
        SdkError::TimeoutError(_) => transport(
            TransportKind::Connection,
            "connection timed out, check your network or endpoint".to_string(),
        ),
        SdkError::ConstructionFailure(err) => {
            let msg = format!("{:?}", err);
            if msg.contains("credentials")
                || msg.contains("Credentials")
                || msg.contains("NoCredentialsError")
            {
                transport(
                    TransportKind::Credentials,
                    "no AWS credentials found; configure them via environment variables \
                    (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY), an AWS profile, or an IAM role"
                        .to_string(),
                )
            } else {
                transport(TransportKind::Other, format!("failed to build request: {}", msg))
            }
        }
        SdkError::ResponseError(err) => {
            transport(TransportKind::Other, format!("invalid response: {:?}", err))
        }
        SdkError::ServiceError(_) => None,
        _ => transport(TransportKind::Other, format!("unknown error: {:?}", err)),
    }
}

/// Map a DynamoDB service error code to a transport kind.
fn classify_service_code(code: Option<&str>) -> TransportKind {
    match code {
        Some("UnrecognizedClientException")
        | Some("InvalidAccessKeyId")
        | Some("SignatureDoesNotMatch")
        | Some("ExpiredTokenException")
        | Some("ExpiredToken")
        | Some("MissingAuthenticationToken") => TransportKind::Credentials,
        Some("AccessDeniedException") | Some("AccessDenied") => TransportKind::AccessDenied,
        Some("ProvisionedThroughputExceededException")
        | Some("LimitExceededException")
        | Some("RequestLimitExceeded")
        | Some("Throttling")
        | Some("ThrottlingException")
        | Some("TooManyRequestsException") => TransportKind::Throttled,
        Some("ValidationException")
        | Some("ConditionalCheckFailedException")
        | Some("ItemCollectionSizeLimitExceededException") => TransportKind::Validation,
        Some("ResourceInUseException") | Some("TableInUseException") => {
            TransportKind::ResourceInUse
        }
        _ => TransportKind::Other,
    }
}

/// Map DynamoDB SDK errors using typed `SdkError` variants.
///
/// For `ServiceError`, uses `ProvideErrorMetadata` to get the error code and message
/// instead of parsing debug strings. `ResourceNotFoundException` becomes
/// [`DumpError::TableNotFound`] when a table name is known.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>, operation: &'static str, table: Option<&str>) -> DumpError
where
    E: ProvideErrorMetadata + fmt::Debug + fmt::Display,
    R: fmt::Debug,
{
    if let Some(mapped) = map_outer_sdk_error(&err, operation, table) {
        return mapped;
    }

    if let Some(service_err) = err.as_service_error() {
        let meta = ProvideErrorMetadata::meta(service_err);
        let code = meta.code();

        if code == Some("ResourceNotFoundException") {
            if let Some(t) = table {
                return DumpError::TableNotFound(t.to_string());
            }
        }

        let message = meta
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| service_err.to_string());
        return DumpError::transport(operation, table, classify_service_code(code), message);
    }

    DumpError::transport(
        operation,
        table,
        TransportKind::Other,
        format!("unexpected DynamoDB error: {:?}", err),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_codes_are_classified() {
        assert_eq!(
            classify_service_code(Some("ThrottlingException")),
            TransportKind::Throttled
        );
        assert_eq!(
            classify_service_code(Some("ExpiredTokenException")),
            TransportKind::Credentials
        );
        assert_eq!(
            classify_service_code(Some("ResourceInUseException")),
            TransportKind::ResourceInUse
        );
        assert_eq!(classify_service_code(None), TransportKind::Other);
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = DumpError::io(
            "export/users.json",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());

        let err = DumpError::io(
            "export/users.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, DumpError::Io { .. }));
    }

    #[test]
    fn transport_display_names_table() {
        let err = DumpError::transport("Scan", Some("users"), TransportKind::Throttled, "slow down");
        assert_eq!(err.to_string(), "Scan failed (throttled) on 'users': slow down");
    }
}
