//! # Afribac Core
//!
//! The AI command pipeline behind the editor's "Ask AI" menu.
//!
//! - [`document`]: the posted editor snapshot and its Markdown views
//! - [`prompts`]: one [`prompts::PromptSpec`] per tool, rendered as tagged sections
//! - [`router`]: explicit tool or one constrained classifier call
//! - [`orchestrator`]: prepares a request and streams [`events::StreamEvent`]s
//!
//! Providers are reached only through [`traits::LanguageModel`], so the whole
//! pipeline runs against [`test_support::mocks`] in tests.

pub mod document;
pub mod events;
pub mod markdown_joiner;
pub mod messages;
pub mod orchestrator;
pub mod prompts;
pub mod router;
pub mod traits;
pub mod writer;

mod error;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use document::EditorSnapshot;
pub use error::{CommandError, CommandResult};
pub use events::{CommentResult, StreamEvent};
pub use orchestrator::{CommandPipeline, CommandRequest, PipelinePhase, PreparedCommand};
pub use router::{ToolName, ToolRouter, ToolSelection};
