use {
    crate::iso7816::StatusWord,
    std::{error::Error as StdError, sync::Arc},
    thiserror::Error,
};

pub type StepResult<T> = Result<T, ProtocolError>;

/// Why a protocol step did not produce its output.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The commands could not be built from the given parameter.
    #[error("could not build commands: {0}")]
    Build(#[source] anyhow::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The card answered with a status word that was not accepted.
    #[error("{context}: card returned {status}")]
    Card {
        status:  StatusWord,
        context: &'static str,
    },

    #[error("malformed response: {0}")]
    Malformed(#[source] anyhow::Error),

    /// A MAC or signature did not verify, or a mandatory one was missing.
    #[error("{0}")]
    Verification(&'static str),

    /// The caller asked for responses the step cannot evaluate.
    #[error("contract violation: {0}")]
    Contract(String),
}

/// The exchange with the card failed before any response could be read.
#[derive(Clone, Debug, Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    message: String,
    #[source]
    source:  Option<Arc<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source:  None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source:  Some(Arc::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ProtocolError {
    /// Status word of a card failure.
    pub const fn status(&self) -> Option<StatusWord> {
        match self {
            Self::Card { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
