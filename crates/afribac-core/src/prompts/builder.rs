//! Tagged-section prompt assembly

use std::fmt::Write as _;

/// How the model should format its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatting {
    Markdown,
    PlainText,
    Json,
}

impl OutputFormatting {
    pub fn instruction(&self) -> &'static str {
        match self {
            OutputFormatting::Markdown => {
                "Format your answer in Markdown. Do not wrap the answer in code fences."
            }
            OutputFormatting::PlainText => {
                "Answer in plain text without any Markdown syntax."
            }
            OutputFormatting::Json => {
                "Answer with JSON only. No prose, no code fences."
            }
        }
    }
}

/// Structured prompt description.
///
/// Sections render in a fixed order: task, rules, examples, background data,
/// history, output formatting, prefilled response. Optional sections that are
/// `None` are left out entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptSpec {
    pub task: String,
    pub rules: String,
    pub examples: Vec<String>,
    pub history: String,
    pub background_data: Option<String>,
    pub output_formatting: Option<OutputFormatting>,
    pub prefilled_response: Option<String>,
}

impl PromptSpec {
    pub fn new(task: impl Into<String>, rules: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            rules: rules.into(),
            ..Default::default()
        }
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.history = history.into();
        self
    }

    pub fn with_background_data(mut self, data: impl Into<String>) -> Self {
        self.background_data = Some(data.into());
        self
    }

    pub fn with_output_formatting(mut self, formatting: OutputFormatting) -> Self {
        self.output_formatting = Some(formatting);
        self
    }

    pub fn with_prefilled_response(mut self, prefix: impl Into<String>) -> Self {
        self.prefilled_response = Some(prefix.into());
        self
    }

    /// Render the final prompt text
    pub fn render(&self) -> String {
        let mut out = String::new();

        section(&mut out, "task", &self.task);
        section(&mut out, "rules", &self.rules);

        let examples: String = self
            .examples
            .iter()
            .map(|example| format!("<example>\n{}\n</example>", example.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        section(&mut out, "examples", &examples);

        if let Some(data) = &self.background_data {
            section(&mut out, "backgroundData", data);
        }

        section(&mut out, "history", &self.history);

        if let Some(formatting) = self.output_formatting {
            section(&mut out, "outputFormatting", formatting.instruction());
        }

        if let Some(prefix) = &self.prefilled_response {
            section(&mut out, "prefilledResponse", prefix);
        }

        out.truncate(out.trim_end().len());
        out
    }
}

fn section(out: &mut String, tag: &str, body: &str) {
    // Infallible: writing into a String
    let _ = write!(out, "<{tag}>\n{body}\n</{tag}>\n\n");
}
