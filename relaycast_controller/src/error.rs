use relaycast_core::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("unknown command id {0}")]
    UnknownCommandId(u32),
    #[error("plug-in {path:?} does not export symbol {symbol:?}")]
    MissingSymbol { path: String, symbol: String },
    #[error("plug-in {0:?} failed to open")]
    OpenFailed(String),
    #[error("plug-in {0:?} init() returned a non-zero error code")]
    InitFailed(String),
    #[error("a worker task could not be started: {0}")]
    Task(#[from] std::io::Error),
}

impl Classify for ControllerError {
    fn kind(&self) -> ErrorKind {
        match self {
            ControllerError::UnknownCommandId(_) => ErrorKind::Params,
            ControllerError::MissingSymbol { .. } | ControllerError::OpenFailed(_) | ControllerError::InitFailed(_) => {
                ErrorKind::Lib
            }
            ControllerError::Task(_) => ErrorKind::Task,
        }
    }
}
