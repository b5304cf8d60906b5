use crate::permission::ConfirmStage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("helper deploy failed: {0}")]
    Deploy(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("cannot parse model response: {reason}")]
    Parse { reason: String, raw: String },
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("copy aborted at stage {}", .stage.number())]
    PermissionDenied { stage: ConfirmStage },
    #[error("transfer failed: {0}")]
    Transfer(String),
    #[error("a model request is already pending")]
    Busy,
    #[error("model request failed: {0}")]
    Model(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
