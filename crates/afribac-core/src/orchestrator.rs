//! Command pipeline
//!
//! A request goes through [`CommandPipeline::prepare`] (synchronous checks,
//! provider resolution, model handles) and then [`PreparedCommand::run`], which
//! streams events while moving through the [`PipelinePhase`]s:
//!
//! ```text
//! Init -> ToolResolved -> Executing -> Finished
//! ```
//!
//! Failures in `prepare` happen before any byte is written and map to plain
//! HTTP errors. Failures during `run` become a terminal `error` event.

use crate::document::{EditorSnapshot, Node, Range};
use crate::error::{CommandError, CommandResult};
use crate::events::{CommentResult, StreamEvent};
use crate::markdown_joiner::MarkdownJoiner;
use crate::messages::ChatMessage;
use crate::prompts::{comment_prompt, comment_schema, edit_prompt, generate_prompt, PromptInput, PromptSpec};
use crate::router::{ToolName, ToolRouter, ToolSelection};
use crate::traits::{LanguageModel, LlmMessage, ModelFactory};
use crate::writer::{BodySink, EventSink};
use afribac_config::{resolve_model, AiConfig, ModelRequest, ProviderKind, ResolvedModel};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Editor context posted with every command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContext {
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub selection: Option<Range>,
    #[serde(default)]
    pub tool_name: Option<String>,
}

/// Body of `POST /api/ai/command`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub ctx: CommandContext,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Init,
    ToolResolved,
    Executing,
    Finished,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Init => "init",
            PipelinePhase::ToolResolved => "tool_resolved",
            PipelinePhase::Executing => "executing",
            PipelinePhase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// What the executing phase will do
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPlan {
    Comment(PromptSpec),
    /// `generate` or `edit`: the rendered prompt goes out as the single user
    /// message, always to the model resolved in `prepare` (the forced
    /// model), with no tool calling.
    Text { tool: ToolName, prompt: PromptSpec },
}

impl ToolPlan {
    pub fn build(tool: ToolName, input: &PromptInput<'_>) -> CommandResult<Self> {
        Ok(match tool {
            ToolName::Comment => ToolPlan::Comment(comment_prompt(input)),
            ToolName::Generate => ToolPlan::Text {
                tool,
                prompt: generate_prompt(input),
            },
            ToolName::Edit => ToolPlan::Text {
                tool,
                prompt: edit_prompt(input)?,
            },
        })
    }
}

/// Entry point shared by all requests
#[derive(Clone)]
pub struct CommandPipeline {
    config: Arc<AiConfig>,
    factory: Arc<dyn ModelFactory>,
}

impl CommandPipeline {
    pub fn new(config: Arc<AiConfig>, factory: Arc<dyn ModelFactory>) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Validate a request and bind it to concrete models.
    ///
    /// Nothing is sent to a provider here.
    pub fn prepare(&self, request: CommandRequest) -> CommandResult<PreparedCommand> {
        let CommandRequest {
            ctx,
            messages,
            model,
            provider,
        } = request;

        let resolved = resolve_model(
            &ModelRequest { model, provider },
            self.config.key_availability(),
            &self.config.model_defaults(),
        )?;

        let snapshot = EditorSnapshot::new(ctx.children, ctx.selection);
        if !snapshot.selection_in_bounds() {
            return Err(CommandError::InvalidSelection);
        }

        let explicit = ToolName::parse_param(ctx.tool_name.as_deref());
        let history_limit = self.config.command.history_limit;

        let plan = match explicit {
            Some(tool) => {
                let input = PromptInput::new(&snapshot, &messages, history_limit);
                Some(ToolPlan::build(tool, &input)?)
            }
            None => None,
        };

        let model = self.factory.create(&resolved)?;
        let classifier = match explicit {
            Some(_) => None,
            None => Some(self.factory.create_classifier(&resolved)?),
        };

        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            provider = %resolved.provider,
            model = %resolved.model,
            fell_back = resolved.fell_back,
            tool = explicit.map(|t| t.as_str()).unwrap_or("auto"),
            "Prepared AI command"
        );

        Ok(PreparedCommand {
            request_id,
            snapshot,
            messages,
            history_limit,
            channel_buffer: self.config.command.channel_buffer,
            resolved,
            explicit,
            plan,
            model,
            classifier,
        })
    }
}

/// A validated command ready to stream
pub struct PreparedCommand {
    request_id: Uuid,
    snapshot: EditorSnapshot,
    messages: Vec<ChatMessage>,
    history_limit: usize,
    channel_buffer: usize,
    resolved: ResolvedModel,
    explicit: Option<ToolName>,
    plan: Option<ToolPlan>,
    model: Arc<dyn LanguageModel>,
    classifier: Option<Arc<dyn LanguageModel>>,
}

impl fmt::Debug for PreparedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCommand")
            .field("request_id", &self.request_id)
            .field("resolved", &self.resolved)
            .field("explicit", &self.explicit)
            .finish_non_exhaustive()
    }
}

impl PreparedCommand {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn resolved(&self) -> &ResolvedModel {
        &self.resolved
    }

    pub fn explicit_tool(&self) -> Option<ToolName> {
        self.explicit
    }

    /// Run on a background task and return the event receiver
    pub fn spawn(self) -> mpsc::Receiver<StreamEvent> {
        let (sink, rx) = EventSink::channel(self.channel_buffer);
        let span = info_span!(
            "ai_command",
            request_id = %self.request_id,
            provider = %self.resolved.provider,
            model = %self.resolved.model,
        );

        tokio::spawn(
            async move {
                match self.run(sink).await {
                    Ok(()) => debug!("Command stream complete"),
                    Err(CommandError::StreamClosed) => {
                        info!("Client disconnected, command cancelled")
                    }
                    Err(e) => warn!(error = %e, "Command failed"),
                }
            }
            .instrument(span),
        );

        rx
    }

    /// Drive the command to completion, writing into `sink`
    pub async fn run(mut self, sink: EventSink) -> CommandResult<()> {
        let mut phase = PipelinePhase::Init;
        debug!(%phase, "Command started");

        let selection = match self.resolve_tool().await {
            Ok(selection) => selection,
            Err(e) => {
                warn!(%phase, error = %e, "Tool resolution failed");
                sink.fail(e.to_string()).await?;
                return Err(e);
            }
        };

        let body = sink.announce(&selection).await?;
        phase = PipelinePhase::ToolResolved;
        debug!(%phase, tool = selection.as_str(), "Tool announced");

        let tool = match selection {
            ToolSelection::Tool(tool) => tool,
            ToolSelection::Unrecognized(raw) => {
                warn!(answer = %raw, "No tool matches the classifier answer, nothing to execute");
                body.close();
                return Ok(());
            }
        };

        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => {
                let input = PromptInput::new(&self.snapshot, &self.messages, self.history_limit);
                match ToolPlan::build(tool, &input) {
                    Ok(plan) => plan,
                    Err(e) => {
                        body.fail(e.to_string()).await?;
                        return Err(e);
                    }
                }
            }
        };

        phase = PipelinePhase::Executing;
        debug!(%phase, tool = %tool, "Executing tool");

        let result = match plan {
            ToolPlan::Comment(prompt) => self.stream_comments(prompt, body).await,
            ToolPlan::Text { prompt, .. } => self.stream_text(prompt, body).await,
        };

        phase = PipelinePhase::Finished;
        debug!(%phase, "Command finished");
        result
    }

    async fn resolve_tool(&self) -> CommandResult<ToolSelection> {
        if let Some(tool) = self.explicit {
            return Ok(ToolSelection::Tool(tool));
        }
        let classifier = self.classifier.as_deref().unwrap_or(self.model.as_ref());
        let input = PromptInput::new(&self.snapshot, &self.messages, self.history_limit);
        Ok(ToolRouter::resolve(None, &input, classifier).await?)
    }

    async fn stream_comments(&self, prompt: PromptSpec, body: BodySink) -> CommandResult<()> {
        let mut comments = body.comments();
        let mut stream = self.model.stream_array(prompt.render(), comment_schema());
        let mut count = 0usize;

        while let Some(item) = stream.next().await {
            let parsed = item.map_err(CommandError::from).and_then(|value| {
                serde_json::from_value::<CommentResult>(value)
                    .map_err(|e| CommandError::InvalidOutput(e.to_string()))
            });

            match parsed {
                Ok(comment) => {
                    if !self.snapshot.contains_block(&comment.block_id) {
                        warn!(block_id = %comment.block_id, "Comment targets an unknown block");
                    }
                    count += 1;
                    comments.push(comment).await?;
                }
                Err(e) => {
                    warn!(error = %e, emitted = count, "Comment stream failed");
                    comments.fail(e.to_string()).await?;
                    return Err(e);
                }
            }
        }

        debug!(count, "Comments streamed");
        comments.finish().await?;
        Ok(())
    }

    async fn stream_text(&self, prompt: PromptSpec, body: BodySink) -> CommandResult<()> {
        let mut text = body.text();
        let mut joiner = MarkdownJoiner::new();
        let mut stream = self
            .model
            .stream_text(vec![LlmMessage::user(prompt.render())]);

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(delta) => {
                    if let Some(piece) = joiner.push(&delta) {
                        text.delta(piece).await?;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Text stream failed");
                    if let Some(rest) = joiner.flush() {
                        text.delta(rest).await?;
                    }
                    text.fail(e.to_string()).await?;
                    return Err(e.into());
                }
            }
        }

        if let Some(rest) = joiner.flush() {
            text.delta(rest).await?;
        }
        text.end().await?;
        Ok(())
    }
}
