use super::{OutputFormatting, PromptInput, PromptSpec, MDX_TAG_RULE};

const TASK: &str = "You are an advanced content generation assistant.
Generate content from the user's instructions, using the background data as context.
If the instruction asks for a creation or a transformation (summarize, translate, rewrite, build a table...), produce the final result directly from the background data.
Never ask the user for more content.";

const RULES: &str = "- <Selection> marks the text highlighted by the user.
- The background data is the user's current document in Markdown.
- Use only the background data and the <Selection> as input.
- Do not repeat the background data unless asked to.
- Do not wrap the output in code fences.
- Preserve whitespace-sensitive layouts such as column structures exactly: keep their line breaks and indentation.
- Answer in the language of the user's instruction.";

const EXAMPLES: &[&str] = &[
    "User: Écris une conclusion pour ce devoir.
Output: En définitive, ...",
    "User: Turn the selected list into a table.
backgroundData:
- Dakar: 3.9M
- Abidjan: 6.3M
Output:
| City | Population |
| --- | --- |
| Dakar | 3.9M |
| Abidjan | 6.3M |",
];

/// Free generation prompt.
///
/// A collapsed cursor is widened to its whole block so the model sees which
/// block the user is working in.
pub fn generate_prompt(input: &PromptInput<'_>) -> PromptSpec {
    let widened = input.snapshot.with_synthetic_selection();

    PromptSpec::new(TASK, format!("{RULES}\n{MDX_TAG_RULE}"))
        .with_examples(EXAMPLES.iter().copied())
        .with_background_data(widened.markdown_with_selection())
        .with_history(input.history())
        .with_output_formatting(OutputFormatting::Markdown)
}
