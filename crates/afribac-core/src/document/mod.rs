//! Editor document snapshot
//!
//! The editor posts its full node tree (`children`) and the current
//! `selection` with every command. This module models that snapshot and
//! derives the Markdown views the prompts need. The snapshot is read-only;
//! [`EditorSnapshot::with_synthetic_selection`] returns a new value.

mod markdown;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use markdown::{SELECTION_END, SELECTION_START};

/// A node of the editor tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Leaf carrying text and marks
    Text(TextLeaf),
    /// Element with children
    Element(Element),
}

/// Text leaf with inline marks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLeaf {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Element node (`p`, `h1`, `blockquote`, `code_block`, `a`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub children: Vec<Node>,
    /// Remaining attributes (`url`, `indent`, `listStyleType`, `lang`, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Element {
    /// String attribute
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Unsigned integer attribute
    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attributes.get(name).and_then(Value::as_u64)
    }

    /// Boolean attribute
    pub fn attr_bool(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Position inside a text leaf
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Child indices from the root down to the text leaf
    pub path: Vec<usize>,
    /// Character offset within the leaf
    pub offset: usize,
}

impl Point {
    /// Index of the top-level block containing this point
    pub fn block_index(&self) -> Option<usize> {
        self.path.first().copied()
    }
}

/// Editor selection; `anchor` may come after `focus` for backward selections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    /// Collapsed range at a single point
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// Whether anchor and focus coincide
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(start, end)` in document order
    pub fn edges(&self) -> (&Point, &Point) {
        if self.anchor <= self.focus {
            (&self.anchor, &self.focus)
        } else {
            (&self.focus, &self.anchor)
        }
    }
}

/// Immutable view of the editor at request time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub children: Vec<Node>,
    #[serde(default)]
    pub selection: Option<Range>,
}

impl EditorSnapshot {
    pub fn new(children: Vec<Node>, selection: Option<Range>) -> Self {
        Self {
            children,
            selection,
        }
    }

    /// An expanded (non-empty) selection exists
    pub fn is_selecting(&self) -> bool {
        self.selection.as_ref().is_some_and(|s| !s.is_collapsed())
    }

    /// The selection starts and ends in different top-level blocks
    pub fn is_multi_block(&self) -> bool {
        match &self.selection {
            Some(selection) => {
                let (start, end) = selection.edges();
                start.block_index() != end.block_index()
            }
            None => false,
        }
    }

    /// Identifier of a top-level block: its `id` attribute, else its index
    pub fn block_id(&self, index: usize) -> Option<String> {
        self.children.get(index).map(|node| match node {
            Node::Element(el) => el.id.clone().unwrap_or_else(|| index.to_string()),
            Node::Text(_) => index.to_string(),
        })
    }

    /// Whether `id` names a top-level block of this document
    pub fn contains_block(&self, id: &str) -> bool {
        (0..self.children.len()).any(|i| self.block_id(i).as_deref() == Some(id))
    }

    /// False unless both selection edges point at text leaves of the document
    pub fn selection_in_bounds(&self) -> bool {
        let Some(selection) = &self.selection else {
            return true;
        };
        let (start, end) = selection.edges();
        [start, end]
            .iter()
            .all(|point| matches!(self.node_at(&point.path), Some(Node::Text(_))))
    }

    /// Node addressed by `path`, walking down from the top-level blocks
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.children.get(*first)?, |node, index| match node {
            Node::Element(el) => el.children.get(*index),
            Node::Text(_) => None,
        })
    }

    /// Whole document as Markdown, no selection markers
    pub fn markdown(&self) -> String {
        markdown::blocks(&self.children, 0..self.children.len(), None)
    }

    /// Whole document with `<Selection>` markers around the selected range
    pub fn markdown_with_selection(&self) -> String {
        markdown::blocks(
            &self.children,
            0..self.children.len(),
            self.selection.as_ref(),
        )
    }

    /// Every block wrapped as `<block id="ID">...</block>`, with selection markers
    pub fn markdown_with_block_ids(&self) -> String {
        (0..self.children.len())
            .map(|index| {
                let id = self.block_id(index).unwrap_or_else(|| index.to_string());
                let body = markdown::blocks(
                    &self.children,
                    index..index + 1,
                    self.selection.as_ref(),
                );
                format!("<block id=\"{id}\">{body}</block>")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Markdown of the blocks the selection touches, without markers
    pub fn selected_blocks_markdown(&self) -> Option<String> {
        let (first, last) = self.selected_block_span()?;
        Some(markdown::blocks(&self.children, first..last + 1, None))
    }

    /// The block holding the selection start, with selection markers
    pub fn selection_block_markdown(&self) -> Option<String> {
        let (first, _) = self.selected_block_span()?;
        Some(markdown::blocks(
            &self.children,
            first..first + 1,
            self.selection.as_ref(),
        ))
    }

    /// Snapshot whose collapsed cursor is widened to cover its whole block.
    ///
    /// Expanded selections and snapshots without a selection are returned unchanged.
    pub fn with_synthetic_selection(&self) -> EditorSnapshot {
        let Some(selection) = &self.selection else {
            return self.clone();
        };
        if !selection.is_collapsed() {
            return self.clone();
        }
        let Some(index) = selection.anchor.block_index() else {
            return self.clone();
        };
        let Some(block) = self.children.get(index) else {
            return self.clone();
        };

        match (first_leaf(block, vec![index]), last_leaf(block, vec![index])) {
            (Some((start, _)), Some((end, end_len))) => EditorSnapshot {
                children: self.children.clone(),
                selection: Some(Range {
                    anchor: Point {
                        path: start,
                        offset: 0,
                    },
                    focus: Point {
                        path: end,
                        offset: end_len,
                    },
                }),
            },
            _ => self.clone(),
        }
    }

    fn selected_block_span(&self) -> Option<(usize, usize)> {
        let selection = self.selection.as_ref()?;
        let (start, end) = selection.edges();
        let last_block = self.children.len().checked_sub(1)?;
        let first = start.block_index()?.min(last_block);
        let last = end.block_index()?.min(last_block);
        Some((first, last))
    }
}

fn first_leaf(node: &Node, path: Vec<usize>) -> Option<(Vec<usize>, usize)> {
    match node {
        Node::Text(leaf) => Some((path, leaf.text.chars().count())),
        Node::Element(el) => el.children.iter().enumerate().find_map(|(i, child)| {
            let mut child_path = path.clone();
            child_path.push(i);
            first_leaf(child, child_path)
        }),
    }
}

fn last_leaf(node: &Node, path: Vec<usize>) -> Option<(Vec<usize>, usize)> {
    match node {
        Node::Text(leaf) => Some((path, leaf.text.chars().count())),
        Node::Element(el) => el.children.iter().enumerate().rev().find_map(|(i, child)| {
            let mut child_path = path.clone();
            child_path.push(i);
            last_leaf(child, child_path)
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn paragraph(id: &str, text: &str) -> Value {
        json!({"type": "p", "id": id, "children": [{"text": text}]})
    }

    pub(crate) fn snapshot(children: Value, selection: Value) -> EditorSnapshot {
        serde_json::from_value(json!({"children": children, "selection": selection})).unwrap()
    }

    pub(crate) fn point(path: &[usize], offset: usize) -> Value {
        json!({"path": path, "offset": offset})
    }

    #[test]
    fn test_deserialize_plate_value() {
        let snap = snapshot(
            json!([{
                "type": "p",
                "id": "b1",
                "children": [{"text": "Hello "}, {"text": "world", "bold": true}]
            }]),
            Value::Null,
        );

        assert_eq!(snap.children.len(), 1);
        match &snap.children[0] {
            Node::Element(el) => {
                assert_eq!(el.kind, "p");
                assert_eq!(el.id.as_deref(), Some("b1"));
                assert!(matches!(&el.children[1], Node::Text(t) if t.bold));
            }
            Node::Text(_) => panic!("expected element"),
        }
        assert!(snap.selection.is_none());
    }

    #[test]
    fn test_selection_state() {
        let children = json!([paragraph("a", "first"), paragraph("b", "second")]);

        let collapsed = snapshot(
            children.clone(),
            json!({"anchor": point(&[0, 0], 2), "focus": point(&[0, 0], 2)}),
        );
        assert!(!collapsed.is_selecting());
        assert!(!collapsed.is_multi_block());

        let within = snapshot(
            children.clone(),
            json!({"anchor": point(&[0, 0], 0), "focus": point(&[0, 0], 5)}),
        );
        assert!(within.is_selecting());
        assert!(!within.is_multi_block());

        let backward = snapshot(
            children,
            json!({"anchor": point(&[1, 0], 3), "focus": point(&[0, 0], 1)}),
        );
        assert!(backward.is_selecting());
        assert!(backward.is_multi_block());
        let (start, _) = backward.selection.as_ref().unwrap().edges();
        assert_eq!(start.path, vec![0, 0]);
    }

    #[test]
    fn test_block_ids_fall_back_to_index() {
        let snap = snapshot(
            json!([paragraph("abc", "x"), {"type": "p", "children": [{"text": "y"}]}]),
            Value::Null,
        );
        assert_eq!(snap.block_id(0).as_deref(), Some("abc"));
        assert_eq!(snap.block_id(1).as_deref(), Some("1"));
        assert!(snap.contains_block("abc"));
        assert!(!snap.contains_block("zzz"));
    }

    #[test]
    fn test_synthetic_selection_covers_cursor_block() {
        let snap = snapshot(
            json!([
                paragraph("a", "first"),
                {"type": "p", "id": "b", "children": [{"text": "sec"}, {"text": "ond", "italic": true}]}
            ]),
            json!({"anchor": point(&[1, 0], 1), "focus": point(&[1, 0], 1)}),
        );

        let widened = snap.with_synthetic_selection();
        let selection = widened.selection.as_ref().unwrap();
        assert_eq!(selection.anchor, Point { path: vec![1, 0], offset: 0 });
        assert_eq!(selection.focus, Point { path: vec![1, 1], offset: 3 });
        assert!(widened.is_selecting());
        // original is untouched
        assert!(!snap.is_selecting());
    }

    #[test]
    fn test_synthetic_selection_keeps_expanded_selection() {
        let snap = snapshot(
            json!([paragraph("a", "first")]),
            json!({"anchor": point(&[0, 0], 1), "focus": point(&[0, 0], 3)}),
        );
        assert_eq!(snap.with_synthetic_selection(), snap);
    }

    #[test]
    fn test_selected_blocks_span() {
        let snap = snapshot(
            json!([paragraph("a", "one"), paragraph("b", "two"), paragraph("c", "three")]),
            json!({"anchor": point(&[0, 0], 1), "focus": point(&[1, 0], 2)}),
        );
        assert_eq!(snap.selected_blocks_markdown().unwrap(), "one\n\ntwo");
        assert_eq!(
            snap.selection_block_markdown().unwrap(),
            "o<Selection>ne</Selection>"
        );
    }

    #[test]
    fn test_selection_must_point_at_text_leaves() {
        let blocks = json!([paragraph("a", "one"), paragraph("b", "two")]);

        let leaf = snapshot(blocks.clone(), json!({"anchor": point(&[0, 0], 0), "focus": point(&[1, 0], 2)}));
        assert!(leaf.selection_in_bounds());

        let element = snapshot(blocks.clone(), json!({"anchor": point(&[0], 0), "focus": point(&[1, 0], 2)}));
        assert!(!element.selection_in_bounds());

        let past_leaf = snapshot(blocks.clone(), json!({"anchor": point(&[0, 0, 0], 0), "focus": point(&[0, 0], 1)}));
        assert!(!past_leaf.selection_in_bounds());

        let missing_child = snapshot(blocks, json!({"anchor": point(&[0, 3], 0), "focus": point(&[0, 0], 1)}));
        assert!(!missing_child.selection_in_bounds());
    }
}
