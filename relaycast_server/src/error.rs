use relaycast_core::error::{Classify, ErrorKind};
use relaycast_link::LinkError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server name {0:?} is already registered")]
    NameTaken(String),
    #[error("no server named {0:?} is registered")]
    NotFound(String),
    #[error("failed to bind listen socket: {0}")]
    Bind(#[from] LinkError),
    #[error("failed to start a worker task: {0}")]
    Task(#[from] std::io::Error),
}

impl Classify for ServerError {
    fn kind(&self) -> ErrorKind {
        match self {
            ServerError::NameTaken(_) => ErrorKind::State,
            ServerError::NotFound(_) => ErrorKind::List,
            ServerError::Bind(_) => ErrorKind::Io,
            ServerError::Task(_) => ErrorKind::Task,
        }
    }
}
