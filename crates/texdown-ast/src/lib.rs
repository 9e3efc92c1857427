//! Arena-backed syntax tree for texdown documents.
//!
//! Nodes live in a single [`Ast`] arena and are addressed by [`NodeId`]
//! handles. Parents own their children through handle lists stored in named
//! slots ([`Slot`]); the `parent` link of a node is a plain handle and is
//! rebuilt in one pass after construction, since children are always built
//! before their parent exists.

mod span;
mod token;

pub use span::{LineColumn, Span};
pub use token::{Token, TokenKind};

use serde::Serialize;
use std::fmt::Write;

/// Stable handle of a node inside an [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Namespaces of user labels. Each namespace is numbered independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelNamespace {
    Picture,
    Table,
    Application,
    Reference,
    Formula,
}

impl LabelNamespace {
    pub const ALL: [LabelNamespace; 5] = [
        LabelNamespace::Picture,
        LabelNamespace::Table,
        LabelNamespace::Application,
        LabelNamespace::Reference,
        LabelNamespace::Formula,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LabelNamespace::Picture => "picture",
            LabelNamespace::Table => "table",
            LabelNamespace::Application => "application",
            LabelNamespace::Reference => "reference",
            LabelNamespace::Formula => "formula",
        }
    }

    /// Prefix used for `\label` keys in generated LaTeX.
    pub fn latex_prefix(&self) -> &'static str {
        match self {
            LabelNamespace::Picture => "fig",
            LabelNamespace::Table => "tab",
            LabelNamespace::Application => "app",
            LabelNamespace::Reference => "src",
            LabelNamespace::Formula => "eq",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NbspKind {
    /// `~`
    Space,
    /// `~-`
    Hyphen,
}

/// Named child container of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Children,
    Header,
    Rows,
    Name,
    /// N-th positional argument of an opcode
    Positional(usize),
    /// N-th keyed argument of an opcode, in insertion order
    Keyed(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    File {
        path: String,
        source: String,
        children: Vec<NodeId>,
    },
    /// Unparsed source, only present between file creation and tokenization
    Raw { text: String },
    /// Tokenized source, only present between tokenization and parsing
    Tokens { tokens: Vec<Token> },

    Text { text: String },
    Paragraph { children: Vec<NodeId> },
    Heading { depth: u8, children: Vec<NodeId> },
    List {
        ordered: bool,
        /// Always `false`; kept for renderers that distinguish tight lists.
        loose: bool,
        start: Option<u32>,
        children: Vec<NodeId>,
    },
    ListItem { indent: usize, children: Vec<NodeId> },
    Blockquote { children: Vec<NodeId> },
    Table {
        align: Vec<Option<Alignment>>,
        header: Vec<NodeId>,
        rows: Vec<NodeId>,
    },
    TableRow { children: Vec<NodeId> },
    TableCell { children: Vec<NodeId> },
    Link { href: String, children: Vec<NodeId> },
    Image { src: String, children: Vec<NodeId> },
    Code { language: Option<String>, text: String },
    CodeSpan { text: String },
    Em { children: Vec<NodeId> },
    Strong { children: Vec<NodeId> },
    Del { children: Vec<NodeId> },
    Underline { children: Vec<NodeId> },
    NonBreakingSpace { kind: NbspKind },
    HorizontalRule,
    FormulaBlock { text: String },
    FormulaSpan { text: String },
    LatexBlock { text: String },
    LatexSpan { text: String },
    Comment { text: String },
    SoftBreak,
    ParagraphBreak,

    OpCode {
        name: String,
        label: Option<String>,
        positional: Vec<Vec<NodeId>>,
        /// `(@key value)` groups in source order, duplicates included
        keyed: Vec<(String, Vec<NodeId>)>,
    },

    PictureProcessed {
        index: usize,
        label: String,
        href: String,
        width: Option<String>,
        height: Option<String>,
        name: Vec<NodeId>,
    },
    TableProcessed {
        index: usize,
        label: String,
        name: Vec<NodeId>,
        children: Vec<NodeId>,
    },
    CodeProcessed {
        index: usize,
        label: String,
        language: Option<String>,
        name: Vec<NodeId>,
        children: Vec<NodeId>,
    },
    FormulaProcessed {
        index: usize,
        label: String,
        children: Vec<NodeId>,
    },
    ApplicationProcessed {
        index: usize,
        label: String,
        name: Vec<NodeId>,
    },
    SourceProcessed {
        index: usize,
        label: String,
        children: Vec<NodeId>,
    },
    Reference {
        namespace: LabelNamespace,
        label: String,
        index: usize,
    },
}

impl NodeKind {
    pub fn text(s: impl Into<String>) -> Self {
        NodeKind::Text { text: s.into() }
    }

    /// Type tag used in outlines and diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::File { .. } => "File",
            NodeKind::Raw { .. } => "Raw",
            NodeKind::Tokens { .. } => "Tokens",
            NodeKind::Text { .. } => "Text",
            NodeKind::Paragraph { .. } => "Paragraph",
            NodeKind::Heading { .. } => "Heading",
            NodeKind::List { .. } => "List",
            NodeKind::ListItem { .. } => "ListItem",
            NodeKind::Blockquote { .. } => "Blockquote",
            NodeKind::Table { .. } => "Table",
            NodeKind::TableRow { .. } => "TableRow",
            NodeKind::TableCell { .. } => "TableCell",
            NodeKind::Link { .. } => "Link",
            NodeKind::Image { .. } => "Image",
            NodeKind::Code { .. } => "Code",
            NodeKind::CodeSpan { .. } => "CodeSpan",
            NodeKind::Em { .. } => "Em",
            NodeKind::Strong { .. } => "Strong",
            NodeKind::Del { .. } => "Del",
            NodeKind::Underline { .. } => "Underline",
            NodeKind::NonBreakingSpace { .. } => "NonBreakingSpace",
            NodeKind::HorizontalRule => "HorizontalRule",
            NodeKind::FormulaBlock { .. } => "FormulaBlock",
            NodeKind::FormulaSpan { .. } => "FormulaSpan",
            NodeKind::LatexBlock { .. } => "LatexBlock",
            NodeKind::LatexSpan { .. } => "LatexSpan",
            NodeKind::Comment { .. } => "Comment",
            NodeKind::SoftBreak => "SoftBreak",
            NodeKind::ParagraphBreak => "ParagraphBreak",
            NodeKind::OpCode { .. } => "OpCode",
            NodeKind::PictureProcessed { .. } => "PictureProcessed",
            NodeKind::TableProcessed { .. } => "TableProcessed",
            NodeKind::CodeProcessed { .. } => "CodeProcessed",
            NodeKind::FormulaProcessed { .. } => "FormulaProcessed",
            NodeKind::ApplicationProcessed { .. } => "ApplicationProcessed",
            NodeKind::SourceProcessed { .. } => "SourceProcessed",
            NodeKind::Reference { .. } => "Reference",
        }
    }

    /// Node types that may be grouped into a paragraph.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Text { .. }
                | NodeKind::Link { .. }
                | NodeKind::Image { .. }
                | NodeKind::CodeSpan { .. }
                | NodeKind::Em { .. }
                | NodeKind::Strong { .. }
                | NodeKind::Del { .. }
                | NodeKind::Underline { .. }
                | NodeKind::NonBreakingSpace { .. }
                | NodeKind::FormulaSpan { .. }
                | NodeKind::LatexSpan { .. }
                | NodeKind::Comment { .. }
                | NodeKind::OpCode { .. }
                | NodeKind::Reference { .. }
        )
    }

    /// Text of a `Text` node.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// True for a `Text` node containing only whitespace.
    pub fn is_blank_text(&self) -> bool {
        self.as_text().is_some_and(|t| t.trim().is_empty())
    }

    fn children_vec(&self) -> Option<&Vec<NodeId>> {
        match self {
            NodeKind::File { children, .. }
            | NodeKind::Paragraph { children, .. }
            | NodeKind::Heading { children, .. }
            | NodeKind::List { children, .. }
            | NodeKind::ListItem { children, .. }
            | NodeKind::Blockquote { children, .. }
            | NodeKind::TableRow { children, .. }
            | NodeKind::TableCell { children, .. }
            | NodeKind::Link { children, .. }
            | NodeKind::Image { children, .. }
            | NodeKind::Em { children, .. }
            | NodeKind::Strong { children, .. }
            | NodeKind::Del { children, .. }
            | NodeKind::Underline { children, .. }
            | NodeKind::TableProcessed { children, .. }
            | NodeKind::CodeProcessed { children, .. }
            | NodeKind::FormulaProcessed { children, .. }
            | NodeKind::SourceProcessed { children, .. } => Some(children),
            _ => None,
        }
    }

    fn children_vec_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            NodeKind::File { children, .. }
            | NodeKind::Paragraph { children, .. }
            | NodeKind::Heading { children, .. }
            | NodeKind::List { children, .. }
            | NodeKind::ListItem { children, .. }
            | NodeKind::Blockquote { children, .. }
            | NodeKind::TableRow { children, .. }
            | NodeKind::TableCell { children, .. }
            | NodeKind::Link { children, .. }
            | NodeKind::Image { children, .. }
            | NodeKind::Em { children, .. }
            | NodeKind::Strong { children, .. }
            | NodeKind::Del { children, .. }
            | NodeKind::Underline { children, .. }
            | NodeKind::TableProcessed { children, .. }
            | NodeKind::CodeProcessed { children, .. }
            | NodeKind::FormulaProcessed { children, .. }
            | NodeKind::SourceProcessed { children, .. } => Some(children),
            _ => None,
        }
    }

    fn name_vec_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            NodeKind::PictureProcessed { name, .. }
            | NodeKind::TableProcessed { name, .. }
            | NodeKind::CodeProcessed { name, .. }
            | NodeKind::ApplicationProcessed { name, .. } => Some(name),
            _ => None,
        }
    }

    /// All child slots of this node, in traversal order.
    pub fn slots(&self) -> Vec<(Slot, &[NodeId])> {
        let mut slots: Vec<(Slot, &[NodeId])> = Vec::new();
        match self {
            NodeKind::Table { header, rows, .. } => {
                slots.push((Slot::Header, header.as_slice()));
                slots.push((Slot::Rows, rows.as_slice()));
            }
            NodeKind::PictureProcessed { name, .. }
            | NodeKind::TableProcessed { name, .. }
            | NodeKind::CodeProcessed { name, .. }
            | NodeKind::ApplicationProcessed { name, .. } => {
                slots.push((Slot::Name, name.as_slice()));
            }
            NodeKind::OpCode {
                positional, keyed, ..
            } => {
                for (i, arg) in positional.iter().enumerate() {
                    slots.push((Slot::Positional(i), arg.as_slice()));
                }
                for (i, (_, arg)) in keyed.iter().enumerate() {
                    slots.push((Slot::Keyed(i), arg.as_slice()));
                }
            }
            _ => {}
        }
        if let Some(children) = self.children_vec() {
            slots.push((Slot::Children, children.as_slice()));
        }
        slots
    }

    pub fn slot_mut(&mut self, slot: Slot) -> Option<&mut Vec<NodeId>> {
        match slot {
            Slot::Children => self.children_vec_mut(),
            Slot::Name => self.name_vec_mut(),
            Slot::Header => match self {
                NodeKind::Table { header, .. } => Some(header),
                _ => None,
            },
            Slot::Rows => match self {
                NodeKind::Table { rows, .. } => Some(rows),
                _ => None,
            },
            Slot::Positional(i) => match self {
                NodeKind::OpCode { positional, .. } => positional.get_mut(i),
                _ => None,
            },
            Slot::Keyed(i) => match self {
                NodeKind::OpCode { keyed, .. } => keyed.get_mut(i).map(|(_, v)| v),
                _ => None,
            },
        }
    }

    /// The plain `children` slot, if the variant has one.
    pub fn children(&self) -> &[NodeId] {
        self.children_vec().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
}

/// Current position of a node: slot `slot` of `parent`, at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAddress {
    pub parent: NodeId,
    pub slot: Slot,
    pub index: usize,
}

/// Node arena. Nodes are never freed; a node spliced out of the tree simply
/// becomes unreachable from the root.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    /// Number of nodes ever allocated, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Children of `id` across all slots, in traversal order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id)
            .slots()
            .into_iter()
            .flat_map(|(_, items)| items.iter().copied())
            .collect()
    }

    /// Point the parent link of every direct child of `id` at `id`.
    pub fn adopt(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.nodes[child.index()].parent = Some(id);
        }
    }

    /// Recompute parent links for the whole subtree under `root`.
    pub fn rebuild_parents(&mut self, root: NodeId) {
        self.nodes[root.index()].parent = None;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let children = self.children(id);
            for &child in &children {
                self.nodes[child.index()].parent = Some(id);
            }
            stack.extend(children);
        }
    }

    /// Pre-order list of `root` and every node below it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.children(id);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Resolve the current address of `id` through its parent link.
    pub fn address_of(&self, id: NodeId) -> Option<NodeAddress> {
        let parent = self.parent(id)?;
        self.kind(parent)
            .slots()
            .into_iter()
            .find_map(|(slot, items)| {
                items
                    .iter()
                    .position(|&item| item == id)
                    .map(|index| NodeAddress {
                        parent,
                        slot,
                        index,
                    })
            })
    }

    /// True when `id` is still reachable from `root` through parent links.
    pub fn is_attached(&self, id: NodeId, root: NodeId) -> bool {
        let mut current = id;
        while current != root {
            match self.address_of(current) {
                Some(address) => current = address.parent,
                None => return false,
            }
        }
        true
    }

    /// Id stored at `address`, if the address is still valid.
    pub fn at(&self, address: NodeAddress) -> Option<NodeId> {
        self.kind(address.parent)
            .slots()
            .into_iter()
            .find(|(slot, _)| *slot == address.slot)
            .and_then(|(_, items)| items.get(address.index).copied())
    }

    /// Replace the node at `address` by `replacement`. Returns the removed id.
    pub fn splice(&mut self, address: NodeAddress, replacement: Vec<NodeId>) -> Option<NodeId> {
        let inserted = replacement.clone();
        let removed = {
            let container = self.nodes[address.parent.index()]
                .kind
                .slot_mut(address.slot)?;
            if address.index >= container.len() {
                return None;
            }
            let drained: Vec<NodeId> = container
                .splice(address.index..=address.index, replacement)
                .collect();
            drained.first().copied()
        };
        for id in inserted {
            self.nodes[id.index()].parent = Some(address.parent);
        }
        removed
    }

    /// Remove the node at `address` from its container.
    pub fn remove_at(&mut self, address: NodeAddress) -> Option<NodeId> {
        let container = self.nodes[address.parent.index()]
            .kind
            .slot_mut(address.slot)?;
        if address.index >= container.len() {
            return None;
        }
        Some(container.remove(address.index))
    }

    /// Number of nodes under `root` (inclusive) matching `pred`.
    pub fn count(&self, root: NodeId, pred: impl Fn(&NodeKind) -> bool) -> usize {
        self.descendants(root)
            .into_iter()
            .filter(|&id| pred(self.kind(id)))
            .count()
    }

    /// Source text of the file node `root`.
    pub fn source(&self, root: NodeId) -> Option<&str> {
        match self.kind(root) {
            NodeKind::File { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Compact one-line rendering of a subtree, e.g.
    /// `Heading#1[Text("Header")]`. Intended for tests and debugging.
    pub fn outline(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(id, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, out: &mut String) {
        let kind = self.kind(id);
        out.push_str(kind.tag());
        match kind {
            NodeKind::Text { text }
            | NodeKind::CodeSpan { text }
            | NodeKind::FormulaSpan { text }
            | NodeKind::FormulaBlock { text }
            | NodeKind::LatexSpan { text }
            | NodeKind::LatexBlock { text } => {
                let _ = write!(out, "({:?})", text);
            }
            NodeKind::Heading { depth, .. } => {
                let _ = write!(out, "#{}", depth);
            }
            NodeKind::Link { href, .. } => {
                let _ = write!(out, "({})", href);
            }
            NodeKind::Image { src, .. } => {
                let _ = write!(out, "({})", src);
            }
            NodeKind::OpCode { name, label, .. } => {
                let _ = write!(out, "({}", name);
                if let Some(label) = label {
                    let _ = write!(out, "[{}]", label);
                }
                out.push(')');
            }
            NodeKind::Reference {
                namespace, label, index,
            } => {
                let _ = write!(out, "({}:{}={})", namespace.name(), label, index);
            }
            NodeKind::PictureProcessed { index, label, .. }
            | NodeKind::TableProcessed { index, label, .. }
            | NodeKind::CodeProcessed { index, label, .. }
            | NodeKind::FormulaProcessed { index, label, .. }
            | NodeKind::ApplicationProcessed { index, label, .. }
            | NodeKind::SourceProcessed { index, label, .. } => {
                let _ = write!(out, "({}={})", label, index);
            }
            _ => {}
        }
        let children = self.children(id);
        if !children.is_empty() {
            out.push('[');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                self.write_outline(*child, out);
            }
            out.push(']');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(ast: &mut Ast, s: &str, start: usize) -> NodeId {
        ast.alloc(NodeKind::text(s), Span::new(start, start + s.len()))
    }

    fn sample() -> (Ast, NodeId, NodeId, NodeId) {
        let mut ast = Ast::new();
        let a = text(&mut ast, "a", 0);
        let b = text(&mut ast, "b", 2);
        let em = ast.alloc(NodeKind::Em { children: vec![b] }, Span::new(1, 4));
        let para = ast.alloc(
            NodeKind::Paragraph {
                children: vec![a, em],
            },
            Span::new(0, 4),
        );
        let file = ast.alloc(
            NodeKind::File {
                path: "doc.md".into(),
                source: "a_b_".into(),
                children: vec![para],
            },
            Span::new(0, 4),
        );
        ast.rebuild_parents(file);
        (ast, file, em, b)
    }

    #[test]
    fn test_rebuild_parents() {
        let (ast, file, em, b) = sample();
        assert_eq!(ast.parent(file), None);
        assert_eq!(ast.parent(b), Some(em));
        let para = ast.kind(file).children()[0];
        assert_eq!(ast.parent(em), Some(para));
    }

    #[test]
    fn test_descendants_preorder() {
        let (ast, file, _, _) = sample();
        let tags: Vec<&str> = ast
            .descendants(file)
            .into_iter()
            .map(|id| ast.kind(id).tag())
            .collect();
        assert_eq!(tags, vec!["File", "Paragraph", "Text", "Em", "Text"]);
    }

    #[test]
    fn test_splice_replaces_and_reparents() {
        let (mut ast, file, em, _) = sample();
        let address = ast.address_of(em).unwrap();
        assert_eq!(address.index, 1);
        let x = text(&mut ast, "x", 1);
        let y = text(&mut ast, "y", 2);
        assert_eq!(ast.splice(address, vec![x, y]), Some(em));
        assert_eq!(ast.parent(x), Some(address.parent));
        assert_eq!(ast.at(address), Some(x));
        assert!(!ast.is_attached(em, file));
        assert!(ast.is_attached(y, file));
        assert_eq!(
            ast.outline(file),
            r#"File[Paragraph[Text("a"), Text("x"), Text("y")]]"#
        );
    }

    #[test]
    fn test_splice_with_nothing_removes() {
        let (mut ast, file, em, _) = sample();
        let address = ast.address_of(em).unwrap();
        ast.splice(address, Vec::new());
        assert_eq!(ast.count(file, |k| matches!(k, NodeKind::Em { .. })), 0);
    }

    #[test]
    fn test_opcode_slots() {
        let mut ast = Ast::new();
        let p = text(&mut ast, "p", 0);
        let k = text(&mut ast, "k", 1);
        let keyed = vec![("width".to_string(), vec![k])];
        let op = ast.alloc(
            NodeKind::OpCode {
                name: "P".into(),
                label: Some("x".into()),
                positional: vec![vec![p]],
                keyed,
            },
            Span::new(0, 2),
        );
        ast.adopt(op);
        assert_eq!(ast.children(op), vec![p, k]);
        let address = ast.address_of(k).unwrap();
        assert_eq!(address.slot, Slot::Keyed(0));
        assert_eq!(ast.outline(op), r#"OpCode(P[x])[Text("p"), Text("k")]"#);
    }

    #[test]
    fn test_table_slots_order() {
        let mut ast = Ast::new();
        let head = ast.alloc(NodeKind::TableRow { children: vec![] }, Span::new(0, 3));
        let row = ast.alloc(NodeKind::TableRow { children: vec![] }, Span::new(4, 7));
        let table = ast.alloc(
            NodeKind::Table {
                align: vec![None],
                header: vec![head],
                rows: vec![row],
            },
            Span::new(0, 7),
        );
        ast.adopt(table);
        assert_eq!(ast.address_of(row).unwrap().slot, Slot::Rows);
        assert_eq!(ast.address_of(head).unwrap().slot, Slot::Header);
    }
}
