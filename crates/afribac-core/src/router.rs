//! Tool selection for a command request

use crate::messages::ChatMessage;
use crate::prompts::{choose_tool_prompt, PromptInput};
use crate::traits::{LanguageModel, LlmResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// The three things the AI command can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolName {
    /// Write new content
    Generate,
    /// Rewrite the selection
    Edit,
    /// Annotate the document
    Comment,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [ToolName::Generate, ToolName::Edit, ToolName::Comment];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Generate => "generate",
            ToolName::Edit => "edit",
            ToolName::Comment => "comment",
        }
    }

    /// Interpret the optional `toolName` request parameter.
    ///
    /// Unknown names are logged and treated as absent.
    pub fn parse_param(param: Option<&str>) -> Option<ToolName> {
        let raw = param?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse() {
            Ok(tool) => Some(tool),
            Err(_) => {
                warn!(tool_name = raw, "Ignoring invalid toolName parameter");
                None
            }
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Tools the classifier may pick from
pub fn allowed_tools(is_selecting: bool) -> &'static [ToolName] {
    if is_selecting {
        &[ToolName::Generate, ToolName::Edit, ToolName::Comment]
    } else {
        &[ToolName::Generate, ToolName::Comment]
    }
}

/// Outcome of tool resolution as announced to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSelection {
    Tool(ToolName),
    /// Classifier answer outside the enum, passed through verbatim
    Unrecognized(String),
}

impl ToolSelection {
    pub fn as_str(&self) -> &str {
        match self {
            ToolSelection::Tool(tool) => tool.as_str(),
            ToolSelection::Unrecognized(raw) => raw,
        }
    }

    pub fn tool(&self) -> Option<ToolName> {
        match self {
            ToolSelection::Tool(tool) => Some(*tool),
            ToolSelection::Unrecognized(_) => None,
        }
    }
}

impl Serialize for ToolSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ToolSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.parse() {
            Ok(tool) => ToolSelection::Tool(tool),
            Err(raw) => ToolSelection::Unrecognized(raw),
        })
    }
}

/// Picks the tool for a request
pub struct ToolRouter;

impl ToolRouter {
    /// Use `explicit` when present; otherwise ask `classifier` once, constrained
    /// to [`allowed_tools`].
    pub async fn resolve(
        explicit: Option<ToolName>,
        input: &PromptInput<'_>,
        classifier: &dyn LanguageModel,
    ) -> LlmResult<ToolSelection> {
        if let Some(tool) = explicit {
            debug!(tool = %tool, "Using explicit tool");
            return Ok(ToolSelection::Tool(tool));
        }

        let choices: Vec<&str> = allowed_tools(input.snapshot.is_selecting())
            .iter()
            .map(ToolName::as_str)
            .collect();
        let prompt = choose_tool_prompt(input).render();

        let answer = classifier.generate_enum(&prompt, &choices).await?;
        let answer = answer.trim().trim_matches('"').to_string();

        match answer.parse::<ToolName>() {
            Ok(tool) => {
                debug!(tool = %tool, "Classifier selected tool");
                Ok(ToolSelection::Tool(tool))
            }
            Err(raw) => {
                warn!(answer = %raw, "Classifier returned a value outside the tool enum");
                Ok(ToolSelection::Unrecognized(raw))
            }
        }
    }

    /// Convenience for callers holding raw messages
    pub async fn resolve_for(
        explicit: Option<ToolName>,
        snapshot: &crate::document::EditorSnapshot,
        messages: &[ChatMessage],
        history_limit: usize,
        classifier: &dyn LanguageModel,
    ) -> LlmResult<ToolSelection> {
        let input = PromptInput::new(snapshot, messages, history_limit);
        Self::resolve(explicit, &input, classifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::EditorSnapshot;
    use crate::test_support::mocks::{MockCall, MockLanguageModel};
    use serde_json::json;
    use tracing_test::traced_test;

    fn selecting_snapshot() -> EditorSnapshot {
        serde_json::from_value(json!({
            "children": [{"type": "p", "children": [{"text": "Bonjour"}]}],
            "selection": {
                "anchor": {"path": [0, 0], "offset": 0},
                "focus": {"path": [0, 0], "offset": 7}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(ToolName::parse_param(Some("edit")), Some(ToolName::Edit));
        assert_eq!(ToolName::parse_param(Some("")), None);
        assert_eq!(ToolName::parse_param(None), None);
    }

    #[test]
    #[traced_test]
    fn test_invalid_param_is_logged_and_dropped() {
        assert_eq!(ToolName::parse_param(Some("translate")), None);
        assert!(logs_contain("Ignoring invalid toolName parameter"));
    }

    #[test]
    fn test_allowed_tools_depend_on_selection() {
        assert_eq!(
            allowed_tools(false),
            &[ToolName::Generate, ToolName::Comment]
        );
        assert_eq!(allowed_tools(true).len(), 3);
    }

    #[test]
    fn test_tool_selection_serializes_as_string() {
        assert_eq!(
            serde_json::to_value(ToolSelection::Tool(ToolName::Comment)).unwrap(),
            json!("comment")
        );
        assert_eq!(
            serde_json::to_value(ToolSelection::Unrecognized("summarize".into())).unwrap(),
            json!("summarize")
        );
    }

    #[tokio::test]
    async fn test_explicit_tool_skips_classifier() {
        let model = MockLanguageModel::new().with_enum_answer("comment");
        let snapshot = EditorSnapshot::default();
        let messages = vec![ChatMessage::user("Écris la suite")];

        let selection =
            ToolRouter::resolve_for(Some(ToolName::Generate), &snapshot, &messages, 10, &model)
                .await
                .unwrap();

        assert_eq!(selection, ToolSelection::Tool(ToolName::Generate));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_classifier_without_selection_offers_two_tools() {
        let model = MockLanguageModel::new().with_enum_answer("comment");
        let snapshot = EditorSnapshot::default();
        let messages = vec![ChatMessage::user("Relis ce paragraphe.")];

        let selection = ToolRouter::resolve_for(None, &snapshot, &messages, 10, &model)
            .await
            .unwrap();

        assert_eq!(selection, ToolSelection::Tool(ToolName::Comment));
        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            MockCall::GenerateEnum { choices, prompt } => {
                assert_eq!(choices, &vec!["generate".to_string(), "comment".to_string()]);
                assert!(prompt.contains("Relis ce paragraphe."));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_classifier_with_selection_offers_edit() {
        let model = MockLanguageModel::new().with_enum_answer("edit");
        let messages = vec![ChatMessage::user("Corrige les fautes")];

        let selection =
            ToolRouter::resolve_for(None, &selecting_snapshot(), &messages, 10, &model)
                .await
                .unwrap();

        assert_eq!(selection, ToolSelection::Tool(ToolName::Edit));
        match &model.calls()[0] {
            MockCall::GenerateEnum { choices, .. } => {
                assert_eq!(choices, &vec!["generate", "edit", "comment"]);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_out_of_enum_answer_is_passed_through() {
        let model = MockLanguageModel::new().with_enum_answer("summarize");
        let messages = vec![ChatMessage::user("Résume")];

        let selection =
            ToolRouter::resolve_for(None, &EditorSnapshot::default(), &messages, 10, &model)
                .await
                .unwrap();

        assert_eq!(selection, ToolSelection::Unrecognized("summarize".into()));
        assert!(logs_contain("outside the tool enum"));
    }
}
