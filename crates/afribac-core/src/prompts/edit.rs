use super::{OutputFormatting, PromptInput, PromptSpec, MDX_TAG_RULE};
use crate::document::{SELECTION_END, SELECTION_START};
use crate::error::{CommandError, CommandResult};

const MULTI_BLOCK_TASK: &str = "The <Selection> in the background data is Markdown content selected by the user.
Modify only the content inside <Selection>, following the user's instruction.
Your output replaces the entire <Selection>.";

const MULTI_BLOCK_RULES: &str = "- Output only the replacement for <Selection>, without the <Selection> tags.
- Keep the original formatting and block structure unless the instruction says otherwise.
- Do not add or remove blocks (headings, list items, paragraphs) unless asked.
- No explanations, no code fences.";

const SINGLE_BLOCK_TASK: &str = "The background data is a paragraph containing a <Selection> chosen by the user.
Rewrite only the text inside <Selection>, following the user's instruction.
Your output is appended directly after the text in <prefilledResponse>.";

const SINGLE_BLOCK_RULES: &str = "- Output only the replacement for <Selection>, without the <Selection> tags and without the surrounding text.
- The replacement must read naturally right after the text in <prefilledResponse>.
- Keep the language and register of the original unless asked otherwise.
- No explanations, no code fences.";

const EXAMPLES: &[&str] = &[
    "User: Corrige les fautes.
backgroundData: Les élèves <Selection>sont aller</Selection> au musée.
Output: sont allés",
    "User: Make it more formal.
backgroundData: <Selection>Hey, the results look great!</Selection>
Output: The results are very encouraging.",
];

/// Rewrite prompt for the current selection.
///
/// Multi-block selections get the selected blocks wrapped in markers.
/// Single-block selections get the block with markers and the text before
/// the selection as the prefilled response.
pub fn edit_prompt(input: &PromptInput<'_>) -> CommandResult<PromptSpec> {
    let snapshot = input.snapshot;
    if !snapshot.is_selecting() {
        return Err(CommandError::EditRequiresSelection);
    }
    if !snapshot.selection_in_bounds() {
        return Err(CommandError::InvalidSelection);
    }

    let rules_with_tags = |rules: &str| format!("{rules}\n{MDX_TAG_RULE}");

    if snapshot.is_multi_block() {
        let selected = snapshot
            .selected_blocks_markdown()
            .ok_or(CommandError::InvalidSelection)?;

        return Ok(PromptSpec::new(MULTI_BLOCK_TASK, rules_with_tags(MULTI_BLOCK_RULES))
            .with_examples(EXAMPLES.iter().copied())
            .with_background_data(format!("{SELECTION_START}{selected}{SELECTION_END}"))
            .with_history(input.history())
            .with_output_formatting(OutputFormatting::Markdown));
    }

    let block = snapshot
        .selection_block_markdown()
        .ok_or(CommandError::InvalidSelection)?;
    let prefix = match block.find(SELECTION_START) {
        Some(pos) => block[..pos].to_string(),
        None => String::new(),
    };

    Ok(PromptSpec::new(SINGLE_BLOCK_TASK, rules_with_tags(SINGLE_BLOCK_RULES))
        .with_examples(EXAMPLES.iter().copied())
        .with_background_data(block)
        .with_history(input.history())
        .with_output_formatting(OutputFormatting::Markdown)
        .with_prefilled_response(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::{paragraph, point, snapshot};
    use crate::document::EditorSnapshot;
    use serde_json::{json, Value};

    #[test]
    fn test_requires_selection() {
        let doc = snapshot(json!([paragraph("a", "Texte")]), Value::Null);
        let result = edit_prompt(&PromptInput::new(&doc, &[], 10));
        assert_eq!(result, Err(CommandError::EditRequiresSelection));

        let collapsed = snapshot(
            json!([paragraph("a", "Texte")]),
            json!({"anchor": point(&[0, 0], 2), "focus": point(&[0, 0], 2)}),
        );
        let result = edit_prompt(&PromptInput::new(&collapsed, &[], 10));
        assert_eq!(result, Err(CommandError::EditRequiresSelection));
    }

    #[test]
    fn test_single_block_prefills_text_before_selection() {
        let doc = snapshot(
            json!([paragraph("a", "Avant"), paragraph("b", "Les élèves sont aller au musée.")]),
            json!({"anchor": point(&[1, 0], 11), "focus": point(&[1, 0], 21)}),
        );
        let prompt = edit_prompt(&PromptInput::new(&doc, &[], 10)).unwrap();

        assert_eq!(
            prompt.background_data.as_deref(),
            Some("Les élèves <Selection>sont aller</Selection> au musée.")
        );
        assert_eq!(prompt.prefilled_response.as_deref(), Some("Les élèves "));
    }

    #[test]
    fn test_multi_block_wraps_selected_blocks() {
        let doc = snapshot(
            json!([
                paragraph("a", "Un"),
                paragraph("b", "Deux"),
                paragraph("c", "Trois")
            ]),
            json!({"anchor": point(&[2, 0], 1), "focus": point(&[1, 0], 0)}),
        );
        let prompt = edit_prompt(&PromptInput::new(&doc, &[], 10)).unwrap();

        assert_eq!(
            prompt.background_data.as_deref(),
            Some("<Selection>Deux\n\nTrois</Selection>")
        );
        assert!(prompt.prefilled_response.is_none());
    }

    #[test]
    fn test_out_of_range_selection_is_rejected() {
        let doc: EditorSnapshot = snapshot(
            json!([paragraph("a", "Un")]),
            json!({"anchor": point(&[0, 0], 0), "focus": point(&[4, 0], 1)}),
        );
        let result = edit_prompt(&PromptInput::new(&doc, &[], 10));
        assert_eq!(result, Err(CommandError::InvalidSelection));
    }

    #[test]
    fn test_selection_on_element_path_is_rejected() {
        let doc: EditorSnapshot = snapshot(
            json!([paragraph("a", "Un texte")]),
            json!({"anchor": point(&[0], 0), "focus": point(&[0, 0], 3)}),
        );
        let result = edit_prompt(&PromptInput::new(&doc, &[], 10));
        assert_eq!(result, Err(CommandError::InvalidSelection));
    }
}
