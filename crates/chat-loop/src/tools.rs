use async_trait::async_trait;
use thiserror::Error;

use chat_history::Tool;

#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Tool execution collaborator.
///
/// `execute` receives one requested invocation and returns the completed
/// tool carrying its result and call id. Domain-level failures may also be
/// encoded into the returned tool's result instead of erroring, in which
/// case the provider sees them on the next round.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &Tool) -> std::result::Result<Tool, ToolError>;

    /// The resolved tool set advertised to the provider.
    fn available_tools(&self) -> Vec<Tool>;
}

/// Executor advertising no tools. Any execution request fails with
/// `NotFound`.
#[derive(Debug, Default)]
pub struct NoTools;

#[async_trait]
impl ToolExecutor for NoTools {
    async fn execute(&self, call: &Tool) -> std::result::Result<Tool, ToolError> {
        Err(ToolError::NotFound(call.name.clone()))
    }

    fn available_tools(&self) -> Vec<Tool> {
        Vec::new()
    }
}
