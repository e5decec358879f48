//! Prompt construction for each AI tool
//!
//! Every prompt is a [`PromptSpec`] built from a [`PromptInput`]; no prompt
//! touches the network or mutates the snapshot.

mod builder;
mod choose_tool;
mod comment;
mod edit;
mod generate;

pub use builder::{OutputFormatting, PromptSpec};
pub use choose_tool::choose_tool_prompt;
pub use comment::{comment_prompt, comment_schema};
pub use edit::edit_prompt;
pub use generate::generate_prompt;

use crate::document::EditorSnapshot;
use crate::messages::{format_history, ChatMessage};

/// Everything a prompt may read
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub snapshot: &'a EditorSnapshot,
    pub messages: &'a [ChatMessage],
    pub history_limit: usize,
}

impl<'a> PromptInput<'a> {
    pub fn new(
        snapshot: &'a EditorSnapshot,
        messages: &'a [ChatMessage],
        history_limit: usize,
    ) -> Self {
        Self {
            snapshot,
            messages,
            history_limit,
        }
    }

    pub fn history(&self) -> String {
        format_history(self.messages, self.history_limit)
    }
}

/// Shared by generation and edit prompts
pub(crate) const MDX_TAG_RULE: &str = "- CRITICAL: Do not remove or alter custom MDX tags such as <u>, <callout>, <kbd>, <toc>, <sub>, <sup>, <mark>, <del>, <date>, <span>, <column>, <column_group>, <file>, <audio>, <video> unless explicitly requested.";
