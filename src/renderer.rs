/// HTML output for parsed trees, plus a CommonMark re-serializer for the
/// structural subset used by round-trip tests.
use std::collections::HashMap;

use crate::ast::{Alignment, Node};
use crate::inlines::flatten_text;
use crate::options::Options;
use crate::strings::percent_encode;

pub struct HtmlRenderer {
    options: Options,
}

impl HtmlRenderer {
    pub fn new(options: Options) -> HtmlRenderer {
        HtmlRenderer { options }
    }

    /// Render a tree to HTML. Footnote definitions are lifted out of
    /// document order into a trailing section, numbered by first use.
    pub fn render(&self, node: &Node) -> String {
        let mut ctx = RenderContext {
            options: self.options,
            footnote_order: Vec::new(),
            footnote_numbers: HashMap::new(),
        };
        if let Node::Document(children) = node {
            ctx.number_footnotes(node);
            let mut out = String::new();
            for child in children {
                if !matches!(child, Node::FootnoteDefinition { .. }) {
                    ctx.render_block(child, &mut out, false);
                }
            }
            ctx.render_footnote_section(children, &mut out);
            out
        } else {
            let mut out = String::new();
            ctx.number_footnotes(node);
            ctx.render_block(node, &mut out, false);
            out
        }
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new(Options::NONE)
    }
}

struct RenderContext {
    options: Options,
    footnote_order: Vec<String>,
    footnote_numbers: HashMap<String, usize>,
}

impl RenderContext {
    /// Assign footnote numbers in order of first reference.
    fn number_footnotes(&mut self, root: &Node) {
        for event in root.events() {
            if let crate::ast::Event::Enter(Node::FootnoteReference(label)) = event
                && !self.footnote_numbers.contains_key(label)
            {
                self.footnote_numbers
                    .insert(label.clone(), self.footnote_order.len() + 1);
                self.footnote_order.push(label.clone());
            }
        }
    }

    fn render_footnote_section(&self, blocks: &[Node], out: &mut String) {
        if self.footnote_order.is_empty() {
            return;
        }
        let mut definitions: HashMap<&str, &Node> = HashMap::new();
        for block in blocks {
            if let Node::FootnoteDefinition { label, .. } = block {
                definitions.entry(label.as_str()).or_insert(block);
            }
        }
        out.push_str("<section class=\"footnotes\">\n<ol>\n");
        for label in &self.footnote_order {
            let Some(Node::FootnoteDefinition { children, .. }) =
                definitions.get(label.as_str())
            else {
                continue;
            };
            out.push_str(&format!("<li id=\"fn-{}\">\n", escape_html(label)));
            let backref = format!(
                " <a href=\"#fnref-{}\" class=\"footnote-backref\">\u{21a9}</a>",
                escape_html(label)
            );
            // The backlink rides inside the final paragraph when there is one
            if let Some((Node::Paragraph(inlines), rest)) = children.split_last() {
                for child in rest {
                    self.render_block(child, out, false);
                }
                out.push_str("<p>");
                for inline in inlines {
                    self.render_inline(inline, out);
                }
                out.push_str(&backref);
                out.push_str("</p>\n");
            } else {
                for child in children.iter() {
                    self.render_block(child, out, false);
                }
                out.push_str("<p>");
                out.push_str(backref.trim_start());
                out.push_str("</p>\n");
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ol>\n</section>\n");
    }

    /// `tight` suppresses the paragraph wrapper, for items of tight lists.
    fn render_block(&self, node: &Node, out: &mut String, tight: bool) {
        match node {
            Node::Document(children) => {
                for child in children {
                    self.render_block(child, out, false);
                }
            }
            Node::Paragraph(children) => {
                if tight {
                    for child in children {
                        self.render_inline(child, out);
                    }
                } else {
                    out.push_str("<p>");
                    for child in children {
                        self.render_inline(child, out);
                    }
                    out.push_str("</p>\n");
                }
            }
            Node::Heading { level, children } => {
                out.push_str(&format!("<h{}>", level));
                for child in children {
                    self.render_inline(child, out);
                }
                out.push_str(&format!("</h{}>\n", level));
            }
            Node::CodeBlock { info, literal } => {
                let language = info.split_whitespace().next().unwrap_or("");
                if language.is_empty() {
                    out.push_str(&format!("<pre><code>{}</code></pre>\n", escape_html(literal)));
                } else {
                    out.push_str(&format!(
                        "<pre><code class=\"language-{}\">{}</code></pre>\n",
                        escape_html(language),
                        escape_html(literal)
                    ));
                }
            }
            Node::ThematicBreak => out.push_str("<hr />\n"),
            Node::BlockQuote(children) => {
                out.push_str("<blockquote>\n");
                for child in children {
                    self.render_block(child, out, false);
                }
                out.push_str("</blockquote>\n");
            }
            Node::UnorderedList { tight, children } => {
                out.push_str("<ul>\n");
                for child in children {
                    self.render_block(child, out, *tight);
                }
                out.push_str("</ul>\n");
            }
            Node::OrderedList {
                start,
                tight,
                children,
            } => {
                if *start == 1 {
                    out.push_str("<ol>\n");
                } else {
                    out.push_str(&format!("<ol start=\"{}\">\n", start));
                }
                for child in children {
                    self.render_block(child, out, *tight);
                }
                out.push_str("</ol>\n");
            }
            Node::ListItem(children) => {
                self.render_list_item(children, None, out, tight);
            }
            Node::TaskItem { checked, children } => {
                self.render_list_item(children, Some(*checked), out, tight);
            }
            Node::Table {
                alignments,
                children,
            } => {
                self.render_table(alignments, children, out);
            }
            Node::TableRow(cells) => {
                out.push_str("<tr>\n");
                for cell in cells {
                    self.render_table_cell(cell, None, out);
                }
                out.push_str("</tr>\n");
            }
            Node::TableCell { .. } => {
                self.render_table_cell(node, None, out);
            }
            Node::HtmlBlock(literal) => {
                if self.options.contains(Options::UNSAFE_HTML) {
                    out.push_str(literal);
                } else {
                    out.push_str("<!-- raw HTML omitted -->\n");
                }
            }
            Node::FootnoteDefinition { .. } => {
                // Rendered by the trailing section, not in document order
            }
            Node::CustomBlock {
                literal, children, ..
            } => {
                out.push_str(&format!("<div class=\"{}\">", node.type_name()));
                if children.is_empty() {
                    out.push_str(&escape_html(literal));
                } else {
                    out.push('\n');
                    for child in children {
                        self.render_block(child, out, false);
                    }
                }
                out.push_str("</div>\n");
            }
            other => self.render_inline(other, out),
        }
    }

    fn render_list_item(
        &self,
        children: &[Node],
        checkbox: Option<bool>,
        out: &mut String,
        tight: bool,
    ) {
        let block_content = !tight
            || children
                .iter()
                .any(|c| !matches!(c, Node::Paragraph(_)))
            || children.len() > 1;
        out.push_str("<li>");
        if block_content {
            out.push('\n');
        }
        if let Some(checked) = checkbox {
            if checked {
                out.push_str("<input type=\"checkbox\" checked=\"\" disabled=\"\" /> ");
            } else {
                out.push_str("<input type=\"checkbox\" disabled=\"\" /> ");
            }
        }
        for child in children {
            self.render_block(child, out, !block_content);
        }
        out.push_str("</li>\n");
    }

    fn render_table(&self, alignments: &[Alignment], rows: &[Node], out: &mut String) {
        out.push_str("<table>\n");
        let mut rows = rows.iter();
        if let Some(Node::TableRow(cells)) = rows.next() {
            out.push_str("<thead>\n<tr>\n");
            for (index, cell) in cells.iter().enumerate() {
                self.render_table_cell(cell, alignments.get(index), out);
            }
            out.push_str("</tr>\n</thead>\n");
        }
        let body: Vec<&Node> = rows.collect();
        if !body.is_empty() {
            out.push_str("<tbody>\n");
            for row in body {
                if let Node::TableRow(cells) = row {
                    out.push_str("<tr>\n");
                    for (index, cell) in cells.iter().enumerate() {
                        self.render_table_cell(cell, alignments.get(index), out);
                    }
                    out.push_str("</tr>\n");
                }
            }
            out.push_str("</tbody>\n");
        }
        out.push_str("</table>\n");
    }

    fn render_table_cell(&self, cell: &Node, alignment: Option<&Alignment>, out: &mut String) {
        let Node::TableCell {
            is_header,
            children,
        } = cell
        else {
            return;
        };
        let tag = if *is_header { "th" } else { "td" };
        match alignment {
            Some(Alignment::Left) => out.push_str(&format!("<{} align=\"left\">", tag)),
            Some(Alignment::Right) => out.push_str(&format!("<{} align=\"right\">", tag)),
            Some(Alignment::Center) => out.push_str(&format!("<{} align=\"center\">", tag)),
            _ => out.push_str(&format!("<{}>", tag)),
        }
        for child in children {
            self.render_inline(child, out);
        }
        out.push_str(&format!("</{}>\n", tag));
    }

    fn render_inline(&self, node: &Node, out: &mut String) {
        match node {
            Node::Text(text) => out.push_str(&escape_html(text)),
            Node::Code(code) => {
                out.push_str(&format!("<code>{}</code>", escape_html(code)));
            }
            Node::Emphasis(children) => {
                out.push_str("<em>");
                for child in children {
                    self.render_inline(child, out);
                }
                out.push_str("</em>");
            }
            Node::Strong(children) => {
                out.push_str("<strong>");
                for child in children {
                    self.render_inline(child, out);
                }
                out.push_str("</strong>");
            }
            Node::Strikethrough(children) => {
                out.push_str("<del>");
                for child in children {
                    self.render_inline(child, out);
                }
                out.push_str("</del>");
            }
            Node::Link {
                destination,
                title,
                children,
            } => {
                out.push_str(&format!(
                    "<a href=\"{}\"",
                    escape_html(&percent_encode(destination))
                ));
                if let Some(title) = title {
                    out.push_str(&format!(" title=\"{}\"", escape_html(title)));
                }
                out.push('>');
                for child in children {
                    self.render_inline(child, out);
                }
                out.push_str("</a>");
            }
            Node::Image {
                destination,
                title,
                alt_text,
            } => {
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"",
                    escape_html(&percent_encode(destination)),
                    escape_html(&flatten_text(alt_text))
                ));
                if let Some(title) = title {
                    out.push_str(&format!(" title=\"{}\"", escape_html(title)));
                }
                out.push_str(" />");
            }
            Node::SoftBreak => out.push('\n'),
            Node::HardBreak => out.push_str("<br />\n"),
            Node::HtmlInline(literal) => {
                if self.options.contains(Options::UNSAFE_HTML) {
                    out.push_str(literal);
                } else {
                    out.push_str("<!-- raw HTML omitted -->");
                }
            }
            Node::FootnoteReference(label) => {
                let number = self
                    .footnote_numbers
                    .get(label)
                    .copied()
                    .unwrap_or(0);
                out.push_str(&format!(
                    "<sup class=\"footnote-ref\"><a href=\"#fn-{0}\" id=\"fnref-{0}\">{1}</a></sup>",
                    escape_html(label),
                    number
                ));
            }
            Node::InlineAttributes {
                attributes,
                children,
            } => {
                out.push_str(&format!(
                    "<span data-attributes=\"{}\">",
                    escape_html(attributes)
                ));
                for child in children {
                    self.render_inline(child, out);
                }
                out.push_str("</span>");
            }
            Node::CustomInline { literal, .. } => {
                out.push_str(&format!(
                    "<span class=\"{}\">{}</span>",
                    node.type_name(),
                    escape_html(literal)
                ));
            }
            other => {
                // A block node in inline position still renders sensibly
                self.render_block(other, out, false);
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize a tree back to CommonMark text. Covers the structural subset
/// round-trip tests exercise; layout details of the source (indentation,
/// fence lengths, reference style) are normalized, not preserved.
pub fn to_commonmark(node: &Node) -> String {
    let mut out = String::new();
    match node {
        Node::Document(children) => {
            let rendered: Vec<String> = children.iter().map(commonmark_block).collect();
            out.push_str(&rendered.join("\n"));
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        _ => out.push_str(&commonmark_block(node)),
    }
    out
}

fn commonmark_block(node: &Node) -> String {
    match node {
        Node::Paragraph(children) => {
            let mut text = commonmark_inlines(children);
            text.push('\n');
            text
        }
        Node::Heading { level, children } => {
            format!(
                "{} {}\n",
                "#".repeat(*level as usize),
                commonmark_inlines(children)
            )
        }
        Node::CodeBlock { info, literal } => {
            format!("```{}\n{}```\n", info, literal)
        }
        Node::ThematicBreak => "***\n".to_string(),
        Node::BlockQuote(children) => {
            let inner: Vec<String> = children.iter().map(commonmark_block).collect();
            inner
                .join("\n")
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
                + "\n"
        }
        Node::UnorderedList { children, .. } => {
            let mut out = String::new();
            for child in children {
                out.push_str(&commonmark_list_item(child, "- ", "  "));
            }
            out
        }
        Node::OrderedList {
            start, children, ..
        } => {
            let mut out = String::new();
            for (offset, child) in children.iter().enumerate() {
                let marker = format!("{}. ", *start as usize + offset);
                let indent = " ".repeat(marker.len());
                out.push_str(&commonmark_list_item(child, &marker, &indent));
            }
            out
        }
        Node::HtmlBlock(literal) => literal.clone(),
        Node::FootnoteDefinition { label, children } => {
            let inner: Vec<String> = children.iter().map(commonmark_block).collect();
            let body = inner.join("\n");
            let mut lines = body.lines();
            let first = lines.next().unwrap_or("");
            let mut out = format!("[^{}]: {}\n", label, first);
            for line in lines {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(&format!("    {}\n", line));
                }
            }
            out
        }
        Node::Table { .. } | Node::TableRow(_) | Node::TableCell { .. } => {
            // Tables are not part of the round-trip subset
            String::new()
        }
        other => {
            let mut text = commonmark_inlines(std::slice::from_ref(other));
            text.push('\n');
            text
        }
    }
}

fn commonmark_list_item(item: &Node, marker: &str, indent: &str) -> String {
    let (checkbox, children) = match item {
        Node::ListItem(children) => (None, children.as_slice()),
        Node::TaskItem { checked, children } => (Some(*checked), children.as_slice()),
        other => (None, std::slice::from_ref(other)),
    };
    let inner: Vec<String> = children.iter().map(commonmark_block).collect();
    let body = inner.join("\n");
    let mut out = String::new();
    for (index, line) in body.lines().enumerate() {
        if index == 0 {
            out.push_str(marker);
            if let Some(checked) = checkbox {
                out.push_str(if checked { "[x] " } else { "[ ] " });
            }
            out.push_str(line);
        } else if line.is_empty() {
            // blank inner line needs no indent
        } else {
            out.push_str(indent);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

fn commonmark_inlines(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => {
                for c in text.chars() {
                    if matches!(c, '*' | '_' | '`' | '[' | ']' | '\\' | '<' | '~') {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
            Node::Code(code) => out.push_str(&format!("`{}`", code)),
            Node::Emphasis(children) => {
                out.push_str(&format!("*{}*", commonmark_inlines(children)));
            }
            Node::Strong(children) => {
                out.push_str(&format!("**{}**", commonmark_inlines(children)));
            }
            Node::Strikethrough(children) => {
                out.push_str(&format!("~~{}~~", commonmark_inlines(children)));
            }
            Node::Link {
                destination,
                title,
                children,
            } => match title {
                Some(title) => out.push_str(&format!(
                    "[{}]({} \"{}\")",
                    commonmark_inlines(children),
                    destination,
                    title
                )),
                None => out.push_str(&format!(
                    "[{}]({})",
                    commonmark_inlines(children),
                    destination
                )),
            },
            Node::Image {
                destination,
                title,
                alt_text,
            } => match title {
                Some(title) => out.push_str(&format!(
                    "![{}]({} \"{}\")",
                    commonmark_inlines(alt_text),
                    destination,
                    title
                )),
                None => out.push_str(&format!(
                    "![{}]({})",
                    commonmark_inlines(alt_text),
                    destination
                )),
            },
            Node::SoftBreak => out.push('\n'),
            Node::HardBreak => out.push_str("\\\n"),
            Node::HtmlInline(literal) => out.push_str(literal),
            Node::FootnoteReference(label) => out.push_str(&format!("[^{}]", label)),
            Node::InlineAttributes { children, .. } => {
                out.push_str(&commonmark_inlines(children));
            }
            Node::CustomInline { literal, .. } => out.push_str(literal),
            _ => out.push_str(&flatten_text(std::slice::from_ref(node))),
        }
    }
    out
}
