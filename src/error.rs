use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AssetError {
    #[error("invalid version string: {0}")]
    InvalidVersion(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("malformed catalog document: {0}")]
    CatalogParse(String),

    #[error("{0} not found in resource catalog")]
    ResourceNotFound(String),

    #[error("wire format error: {0}")]
    WireFormat(String),

    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("malformed field descriptor in {sheet}: {message}")]
    MalformedDescriptor { sheet: String, message: String },

    #[error("metadata decode failed for {table}: {message}")]
    TableDecode { table: String, message: String },

    #[error("missing character name for id {0}")]
    UnknownCharacterId(i64),

    #[error("download request failed: {0}")]
    DownloadHttp(String),

    #[error("destination already exists: {0}")]
    DestinationConflict(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
