/// AST node types for parsed documents
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Document(Vec<Node>),
    // Block-level nodes
    Paragraph(Vec<Node>),
    Heading {
        level: u8,
        children: Vec<Node>,
    },
    CodeBlock {
        info: String,
        literal: String,
    },
    ThematicBreak,
    BlockQuote(Vec<Node>),
    UnorderedList {
        tight: bool, // Tight lists don't wrap simple items in <p>
        children: Vec<Node>,
    },
    OrderedList {
        start: u32,
        tight: bool,
        children: Vec<Node>,
    },
    ListItem(Vec<Node>),
    /// GFM task-list item, produced by the tasklist extension's
    /// postprocess pass from a plain list item
    TaskItem {
        checked: bool,
        children: Vec<Node>,
    },
    FootnoteDefinition {
        label: String,
        children: Vec<Node>,
    },
    HtmlBlock(String),
    // GFM tables
    Table {
        alignments: Vec<Alignment>,
        children: Vec<Node>, // TableRow nodes, first row is the header
    },
    TableRow(Vec<Node>),
    TableCell {
        is_header: bool,
        children: Vec<Node>,
    },
    // Inline nodes
    Text(String),
    Code(String),
    Emphasis(Vec<Node>),
    Strong(Vec<Node>),
    Strikethrough(Vec<Node>),
    Link {
        destination: String,
        title: Option<String>,
        children: Vec<Node>,
    },
    Image {
        destination: String,
        title: Option<String>,
        alt_text: Vec<Node>,
    },
    SoftBreak,
    HardBreak,
    HtmlInline(String),
    FootnoteReference(String),
    /// Wrapper produced when a bracket reference resolves to an
    /// attributes-only definition: `[text][badge]` with `[badge]: {.x}`
    InlineAttributes {
        attributes: String,
        children: Vec<Node>,
    },
    // Open extension points: node kinds owned by a registered syntax
    // extension, addressed by the extension's node-type name rather than
    // a compile-time variant
    CustomBlock {
        name: String,
        literal: String,
        attributes: Vec<(String, String)>,
        children: Vec<Node>,
    },
    CustomInline {
        name: String,
        literal: String,
        attributes: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    None,
    Left,
    Right,
    Center,
}

impl Node {
    /// The renderer-facing tag for this node. Built-in kinds use fixed
    /// names; extension kinds report the name their owning extension
    /// registered, so a renderer can dispatch on unknown node types.
    pub fn type_name(&self) -> &str {
        match self {
            Node::Document(_) => "document",
            Node::Paragraph(_) => "paragraph",
            Node::Heading { .. } => "heading",
            Node::CodeBlock { .. } => "code_block",
            Node::ThematicBreak => "thematic_break",
            Node::BlockQuote(_) => "block_quote",
            Node::UnorderedList { .. } | Node::OrderedList { .. } => "list",
            Node::ListItem(_) => "item",
            Node::TaskItem { .. } => "tasklist",
            Node::FootnoteDefinition { .. } => "footnote_definition",
            Node::HtmlBlock(_) => "html_block",
            Node::Table { .. } => "table",
            Node::TableRow(_) => "table_row",
            Node::TableCell { .. } => "table_cell",
            Node::Text(_) => "text",
            Node::Code(_) => "code",
            Node::Emphasis(_) => "emph",
            Node::Strong(_) => "strong",
            Node::Strikethrough(_) => "strikethrough",
            Node::Link { .. } => "link",
            Node::Image { .. } => "image",
            Node::SoftBreak => "softbreak",
            Node::HardBreak => "linebreak",
            Node::HtmlInline(_) => "html_inline",
            Node::FootnoteReference(_) => "footnote_reference",
            Node::InlineAttributes { .. } => "attribute",
            Node::CustomBlock { name, .. } | Node::CustomInline { name, .. } => name,
        }
    }

    /// The node's ordered child sequence. Leaves return an empty slice.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document(children)
            | Node::Paragraph(children)
            | Node::BlockQuote(children)
            | Node::ListItem(children)
            | Node::TableRow(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Strikethrough(children) => children,
            Node::Heading { children, .. }
            | Node::UnorderedList { children, .. }
            | Node::OrderedList { children, .. }
            | Node::TaskItem { children, .. }
            | Node::FootnoteDefinition { children, .. }
            | Node::Table { children, .. }
            | Node::TableCell { children, .. }
            | Node::Link { children, .. }
            | Node::InlineAttributes { children, .. }
            | Node::CustomBlock { children, .. } => children,
            Node::Image { alt_text, .. } => alt_text,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [Node] {
        match self {
            Node::Document(children)
            | Node::Paragraph(children)
            | Node::BlockQuote(children)
            | Node::ListItem(children)
            | Node::TableRow(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Strikethrough(children) => children,
            Node::Heading { children, .. }
            | Node::UnorderedList { children, .. }
            | Node::OrderedList { children, .. }
            | Node::TaskItem { children, .. }
            | Node::FootnoteDefinition { children, .. }
            | Node::Table { children, .. }
            | Node::TableCell { children, .. }
            | Node::Link { children, .. }
            | Node::InlineAttributes { children, .. }
            | Node::CustomBlock { children, .. } => children,
            Node::Image { alt_text, .. } => alt_text,
            _ => &mut [],
        }
    }

    /// Depth-first walk over the subtree rooted here, yielding an `Enter`
    /// event before a node's children and an `Exit` event after them.
    /// Sufficient for any renderer to traverse extension-defined nodes via
    /// `type_name` without knowing the variant.
    pub fn events(&self) -> Events<'_> {
        Events {
            stack: vec![Step::Enter(self)],
        }
    }
}

/// One traversal event from [`Node::events`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'a> {
    Enter(&'a Node),
    Exit(&'a Node),
}

enum Step<'a> {
    Enter(&'a Node),
    Exit(&'a Node),
}

pub struct Events<'a> {
    stack: Vec<Step<'a>>,
}

impl<'a> Iterator for Events<'a> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Event<'a>> {
        match self.stack.pop()? {
            Step::Enter(node) => {
                self.stack.push(Step::Exit(node));
                for child in node.children().iter().rev() {
                    self.stack.push(Step::Enter(child));
                }
                Some(Event::Enter(node))
            }
            Step::Exit(node) => Some(Event::Exit(node)),
        }
    }
}
