//! Generation provider abstraction
//!
//! A provider turns a composed prompt into an incrementally-delivered text
//! output. Fragments are forwarded through `fragment_tx` as soon as they are
//! decoded; the return value decides the owning stream's terminal state.

pub mod gemini;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::GenerateError;
use crate::types::PromptBundle;

pub use gemini::GeminiProvider;

/// Unified streaming text-generation interface.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Stream a generation for `bundle`.
    ///
    /// The provider must send fragments to `fragment_tx` as they arrive
    /// from the model, never buffering the whole output first. Returning
    /// `Ok(())` means the model finished cleanly (possibly having emitted
    /// nothing); any `Err` becomes the stream's failure terminal.
    async fn stream_generate(
        &self,
        bundle: &PromptBundle,
        fragment_tx: mpsc::Sender<String>,
        cancel_token: CancellationToken,
    ) -> Result<(), GenerateError>;

    /// The model identifier this provider generates with.
    fn model_id(&self) -> &str;
}
