//! Markdown rendering of the editor tree with optional selection markers

use super::{Element, Node, Point, Range, TextLeaf};

/// Opening selection marker understood by the prompts
pub const SELECTION_START: &str = "<Selection>";
/// Closing selection marker
pub const SELECTION_END: &str = "</Selection>";

const INLINE_ELEMENTS: &[&str] = &["a", "mention", "inline_equation", "date", "footnote"];

struct Marks<'a> {
    start: &'a Point,
    end: &'a Point,
}

/// Render `children[range]` as blank-line separated blocks.
///
/// Selection edges falling outside the rendered blocks are closed at the
/// rendered boundary, so the output always carries balanced markers.
pub(super) fn blocks(
    children: &[Node],
    range: std::ops::Range<usize>,
    selection: Option<&Range>,
) -> String {
    let range = range.start..range.end.min(children.len());
    let marks = selection
        .filter(|s| !s.is_collapsed())
        .map(|s| {
            let (start, end) = s.edges();
            Marks { start, end }
        });

    let mut out = range
        .clone()
        .map(|index| {
            let mut path = vec![index];
            block(&children[index], &mut path, marks.as_ref())
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    if let Some(marks) = &marks {
        let start_block = marks.start.block_index().unwrap_or(0);
        let end_block = marks.end.block_index().unwrap_or(0);
        if start_block < range.start && end_block >= range.start {
            out.insert_str(0, SELECTION_START);
        }
        if end_block >= range.end && start_block < range.end {
            out.push_str(SELECTION_END);
        }
    }

    out
}

fn block(node: &Node, path: &mut Vec<usize>, marks: Option<&Marks<'_>>) -> String {
    let el = match node {
        Node::Text(leaf) => return leaf_text(leaf, path, marks, false),
        Node::Element(el) => el,
    };

    let body = if let Some(level) = heading_level(&el.kind) {
        format!("{} {}", "#".repeat(level), inline_children(el, path, marks, false))
    } else {
        match el.kind.as_str() {
            "blockquote" => inline_children(el, path, marks, false)
                .lines()
                .map(|line| format!("> {line}"))
                .collect::<Vec<_>>()
                .join("\n"),
            "code_block" => {
                let lang = el.attr_str("lang").unwrap_or("");
                let lines = child_map(el, path, |child, path| match child {
                    Node::Element(line) => inline_children(line, path, marks, true),
                    Node::Text(leaf) => leaf_text(leaf, path, marks, true),
                });
                format!("```{lang}\n{}\n```", lines.join("\n"))
            }
            "hr" => "---".to_string(),
            "img" | "image" => {
                let caption = inline_children(el, path, marks, false);
                format!("![{}]({})", caption.trim(), el.attr_str("url").unwrap_or(""))
            }
            "table" => table(el, path, marks),
            _ if has_block_children(el) => {
                child_map(el, path, |child, path| block(child, path, marks)).join("\n\n")
            }
            _ => inline_children(el, path, marks, false),
        }
    };

    match el.attr_str("listStyleType") {
        Some(style) => {
            let indent = el.attr_u64("indent").unwrap_or(1).max(1) as usize;
            let pad = "  ".repeat(indent - 1);
            let bullet = match style {
                "decimal" => format!("{}.", el.attr_u64("listStart").unwrap_or(1)),
                "todo" if el.attr_bool("checked") => "- [x]".to_string(),
                "todo" => "- [ ]".to_string(),
                _ => "-".to_string(),
            };
            format!("{pad}{bullet} {body}")
        }
        None => body,
    }
}

fn table(el: &Element, path: &mut Vec<usize>, marks: Option<&Marks<'_>>) -> String {
    let rows = child_map(el, path, |row, path| match row {
        Node::Element(row) => child_map(row, path, |cell, path| {
            block(cell, path, marks).replace("\n\n", " ").replace('\n', " ")
        }),
        Node::Text(leaf) => vec![leaf_text(leaf, path, marks, false)],
    });

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, cells) in rows.iter().enumerate() {
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(cells.len().max(1))));
        }
    }
    lines.join("\n")
}

fn inline_children(
    el: &Element,
    path: &mut Vec<usize>,
    marks: Option<&Marks<'_>>,
    plain: bool,
) -> String {
    child_map(el, path, |child, path| match child {
        Node::Text(leaf) => leaf_text(leaf, path, marks, plain),
        Node::Element(inner) if inner.kind == "a" && !plain => {
            let label = inline_children(inner, path, marks, plain);
            format!("[{label}]({})", inner.attr_str("url").unwrap_or(""))
        }
        Node::Element(inner) => inline_children(inner, path, marks, plain),
    })
    .concat()
}

fn child_map<T, F>(el: &Element, path: &mut Vec<usize>, mut f: F) -> Vec<T>
where
    F: FnMut(&Node, &mut Vec<usize>) -> T,
{
    el.children
        .iter()
        .enumerate()
        .map(|(i, child)| {
            path.push(i);
            let out = f(child, path);
            path.pop();
            out
        })
        .collect()
}

fn leaf_text(leaf: &TextLeaf, path: &[usize], marks: Option<&Marks<'_>>, plain: bool) -> String {
    let mut text = leaf.text.clone();

    if let Some(marks) = marks {
        let mut inserts = Vec::with_capacity(2);
        if marks.start.path == path {
            inserts.push((marks.start.offset, SELECTION_START));
        }
        if marks.end.path == path {
            inserts.push((marks.end.offset, SELECTION_END));
        }
        // Highest offset first keeps lower char offsets valid
        inserts.sort_by(|a, b| b.0.cmp(&a.0));
        for (offset, marker) in inserts {
            let byte = char_to_byte(&text, offset);
            text.insert_str(byte, marker);
        }
    }

    if plain || leaf.text.trim().is_empty() {
        return text;
    }
    if leaf.code {
        text = wrap(&text, "`");
    }
    if leaf.bold {
        text = wrap(&text, "**");
    }
    if leaf.italic {
        text = wrap(&text, "_");
    }
    if leaf.strikethrough {
        text = wrap(&text, "~~");
    }
    text
}

/// Wrap with a delimiter, keeping surrounding whitespace outside it
fn wrap(text: &str, delimiter: &str) -> String {
    let start = text.len() - text.trim_start().len();
    let end = text.trim_end().len();
    format!(
        "{}{delimiter}{}{delimiter}{}",
        &text[..start],
        &text[start..end],
        &text[end..]
    )
}

fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

fn heading_level(kind: &str) -> Option<usize> {
    kind.strip_prefix('h')
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| (1..=6).contains(n))
}

fn has_block_children(el: &Element) -> bool {
    el.children.iter().any(|child| match child {
        Node::Element(inner) => !INLINE_ELEMENTS.contains(&inner.kind.as_str()),
        Node::Text(_) => false,
    })
}
