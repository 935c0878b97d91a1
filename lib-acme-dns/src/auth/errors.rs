use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeError;
use std::path::PathBuf;
use thiserror::Error;

/// Represents every failure the authentication hook can run into.
///
/// None of these are retried. The process driver prints the error and exits with a
/// non-zero status, so the `Display` output is what the operator sees.
///
/// # Variants
///
/// - `MissingSetting`: A required setting (environment variable or flag) was not supplied.
/// - `InvalidAllowFrom`: The CIDR allow-list is not a JSON encoded list of strings.
/// - `UnsupportedEnvVersion`: The configured settings version is outside the supported range.
/// - `StorageUnreadable`: The credential storage file exists but could not be read.
/// - `StorageCorrupted`: The credential storage file is not a JSON object of account records.
/// - `StorageWrite`: The credential storage file could not be created or written.
/// - `RegistrationFailed`: The acme-dns `/register` call did not answer `201 Created`.
/// - `UpdateFailed`: The acme-dns `/update` call did not answer `200 OK`.
/// - `OutputFailed`: The CNAME instruction could not be written for the operator.
/// - `RequestFailed`: Transport level errors from `reqwest`.
/// - `SerdeError`: JSON serialization or deserialization failures.
/// - `ParseError`: The acme-dns base URL could not be parsed.
#[derive(Debug, Error)]
pub enum AcmeDnsErrors {
    #[error("`{setting}` or the environment variable `{env}` must be set")]
    MissingSetting {
        setting: &'static str,
        env: &'static str,
    },

    #[error("ALLOW_FROM must be a list of strings encoded as JSON: {0}")]
    InvalidAllowFrom(String),

    #[error(
        "ENV_VERSION {found} is not supported, this hook is compatible with versions {min}-{max}"
    )]
    UnsupportedEnvVersion { found: u32, min: u32, max: u32 },

    #[error("Storage file {} exists but cannot be read: {source}", .path.display())]
    StorageUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage JSON in {} is corrupted: {source}", .path.display())]
    StorageCorrupted {
        path: PathBuf,
        #[source]
        source: SerdeError,
    },

    #[error("Could not write storage file {}: {source}", .path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Encountered an error while trying to register a new acme-dns account. HTTP status {status}, Response body: {body}"
    )]
    RegistrationFailed { status: u16, body: String },

    #[error(
        "Encountered an error while trying to update TXT record in acme-dns.\n\
         ------- Request headers:\n{request_headers}\n\
         ------- Request body:\n{request_body}\n\
         ------- Response HTTP status: {status}\n\
         ------- Response body: {response_body}"
    )]
    UpdateFailed {
        request_headers: String,
        request_body: String,
        status: u16,
        response_body: String,
    },

    #[error("Could not print the CNAME instruction: {0}")]
    OutputFailed(#[source] std::io::Error),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] ReqwestError),

    #[error("Serialization or deserialization error using Serde: {0}")]
    SerdeError(#[from] SerdeError),

    #[error("Error in parsing url: {0}")]
    ParseError(#[from] url::ParseError),
}
