use super::{PromptInput, PromptSpec};

const EXAMPLES: &[&str] = &[
    "User: \"How can I improve this text?\"\nGood: generate\nBad: comment",
    "User: \"Résume ce passage\"\nGood: generate\nBad: edit",
    "User: \"Can you review this text and give me feedback?\"\nGood: comment\nBad: edit",
    "User: \"Relis ce paragraphe et laisse des commentaires\"\nGood: comment\nBad: generate",
];

const EDIT_EXAMPLES: &[&str] = &[
    "User: \"Corrige les fautes d'orthographe\" (with selected text)\nGood: edit\nBad: generate",
    "User: \"Make this shorter\" (with selected text)\nGood: edit\nBad: comment",
];

/// Classifier prompt; `edit` is only offered while text is selected
pub fn choose_tool_prompt(input: &PromptInput<'_>) -> PromptSpec {
    let is_selecting = input.snapshot.is_selecting();

    let task = if is_selecting {
        "You are a strict classifier. Classify the user's last request as \"generate\", \"edit\", or \"comment\"."
    } else {
        "You are a strict classifier. Classify the user's last request as \"generate\" or \"comment\"."
    };

    let mut rules = vec![
        "- Default is \"generate\". Any open question, idea request or creation request means \"generate\".",
    ];
    if is_selecting {
        rules.push(
            "- Only return \"edit\" if the user asks to change, rephrase, translate, fix or shorten the selected text.",
        );
    }
    rules.push(
        "- Only return \"comment\" if the user explicitly asks for comments, feedback, annotations or a review. Never infer \"comment\" implicitly.",
    );
    rules.push("- Return exactly one value with no explanation.");

    let mut examples: Vec<&str> = EXAMPLES.to_vec();
    if is_selecting {
        examples.extend_from_slice(EDIT_EXAMPLES);
    }

    PromptSpec::new(task, rules.join("\n"))
        .with_examples(examples)
        .with_history(input.history())
}
