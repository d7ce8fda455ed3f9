use relaycast_core::error::{Classify, ErrorKind};
use relaycast_link::LinkError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("client name {0:?} is already registered")]
    NameTaken(String),
    #[error("no client named {0:?} is registered")]
    NotFound(String),
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("failed to start a worker task: {0}")]
    Task(#[from] std::io::Error),
}

impl Classify for ClientError {
    fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NameTaken(_) => ErrorKind::State,
            ClientError::NotFound(_) => ErrorKind::List,
            ClientError::Link(_) => ErrorKind::Io,
            ClientError::Task(_) => ErrorKind::Task,
        }
    }
}
