use super::{OutputFormatting, PromptInput, PromptSpec};
use serde_json::{json, Value};

const TASK: &str = "You are a document review assistant.
You receive a Markdown document in which every top-level block is wrapped as <block id=\"...\">content</block>.
<Selection> marks the text highlighted by the user, if any.
Read the blocks and write review comments. Each comment is an object with:
- blockId: the id of the block the comment refers to
- content: the exact span of original text the comment is about
- comment: your remark about that span";

const RULES: &str = "- If a comment spans several blocks, use the id of the first block.
- The content field must be copied from inside the block tag, without the block tags themselves. Keep any other MDX tags.
- Use the smallest relevant span as content: part of a block, a whole block, or several blocks separated by two newlines. Do not default to the whole block.
- Provide at least one comment.
- If a <Selection> exists, comment only on the selected text; a long selection deserves several comments.
- Write comments in the language of the document.";

const EXAMPLES: &[&str] = &[
    "User: Review this paragraph.
backgroundData:
<block id=\"1\">Le soleil se couche a l'ouest.</block>
Output:
[{\"blockId\": \"1\", \"content\": \"a l'ouest\", \"comment\": \"Accent manquant : « à l'ouest ».\"}]",
    "User: Leave feedback on the intro.
backgroundData:
<block id=\"a\"># Introduction</block>
<block id=\"b\">This essay discuss three points.</block>
Output:
[{\"blockId\": \"b\", \"content\": \"This essay discuss three points.\", \"comment\": \"Subject-verb agreement: use \\\"discusses\\\".\"}]",
];

/// Review prompt over the block-id annotated document
pub fn comment_prompt(input: &PromptInput<'_>) -> PromptSpec {
    PromptSpec::new(TASK, RULES)
        .with_examples(EXAMPLES.iter().copied())
        .with_background_data(input.snapshot.markdown_with_block_ids())
        .with_history(input.history())
        .with_output_formatting(OutputFormatting::Json)
}

/// JSON schema of one streamed comment element
pub fn comment_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "blockId": {
                "type": "string",
                "description": "Id of the block the comment refers to"
            },
            "content": {
                "type": "string",
                "description": "Original text span the comment is about"
            },
            "comment": {
                "type": "string",
                "description": "The review comment"
            }
        },
        "required": ["blockId", "content", "comment"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::{paragraph, snapshot};
    use crate::messages::ChatMessage;

    #[test]
    fn test_background_uses_block_ids() {
        let doc = snapshot(
            json!([paragraph("p1", "Premier."), paragraph("p2", "Second.")]),
            Value::Null,
        );
        let messages = vec![ChatMessage::user("Relis ce texte")];
        let prompt = comment_prompt(&PromptInput::new(&doc, &messages, 10));

        assert_eq!(
            prompt.background_data.as_deref(),
            Some("<block id=\"p1\">Premier.</block>\n<block id=\"p2\">Second.</block>")
        );
        assert_eq!(prompt.output_formatting, Some(OutputFormatting::Json));
        assert!(prompt.render().contains("USER: Relis ce texte"));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = comment_schema();
        assert_eq!(schema["required"], json!(["blockId", "content", "comment"]));
    }
}
