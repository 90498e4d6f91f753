use thiserror::Error;

use chat_history::HistoryError;

use crate::provider::BoxError;
use crate::tools::ToolError;

#[derive(Error, Debug)]
pub enum ChatError {
    /// Provider failure, preserving the original message and cause. The
    /// display form equals the provider error's own message.
    #[error("{message}")]
    Provider {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The optional guard against runaway tool recursion tripped.
    #[error("Tool round limit of {0} exceeded")]
    ToolRoundLimit(usize),
}

pub type Result<T> = std::result::Result<T, ChatError>;
