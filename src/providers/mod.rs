pub mod gemini;

pub use gemini::{GeminiClient, GenerateContentResponse};

use crate::{errors::Result, models::GenerationRequest};

/// The external image synthesis service, seen from the orchestrator.
pub trait GenerationClient {
    /// Checks that a call could be issued at all. Failing here is fatal for
    /// the whole run.
    fn preflight(&self) -> Result<()>;

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerateContentResponse>;
}
