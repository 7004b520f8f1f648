use thiserror::Error;

/// Failure to decode or encode a workspace snapshot document. The
/// snapshot is all-or-nothing: any error here means the payload is
/// rejected as a whole and no partial state is adopted.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed workspace document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("item {index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
}
