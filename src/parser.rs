/// Block parsing: a line-oriented two-pass parser. Pass one harvests link
/// reference definitions (URL and attributes forms) into the reference
/// map and drops their lines; pass two builds the block tree, handing leaf
/// text to the inline parser as each leaf closes. Registered syntax
/// extensions get a chance to open blocks ahead of the paragraph fallback
/// and to postprocess the finished tree.
use std::cell::Cell;
use std::sync::Arc;

use crate::ast::Node;
use crate::chunk::Chunk;
use crate::extension::{core_registry, BlockMatch, ExtensionRegistry, SyntaxExtension};
use crate::inlines::{scan_html_close_tag, scan_html_open_tag, InlineParser};
use crate::options::Options;
use crate::refmap::ReferenceMap;

/// Containers nested past this depth have their content flattened into
/// plain paragraph text instead of recursing further.
pub(crate) const MAX_NESTING_DEPTH: usize = 128;

const BLOCK_TAGS: [&str; 62] = [
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "section", "source",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

pub struct Parser {
    options: Options,
    extensions: Vec<Arc<dyn SyntaxExtension>>,
    refmap: ReferenceMap,
    depth: Cell<usize>,
}

/// A scanned list marker and the content geometry it implies.
struct ListMarker {
    ordered: bool,
    bullet: char,
    delimiter: char,
    start: u32,
    content_indent: usize,
    content: String,
    has_content: bool,
}

enum RefDef {
    Url {
        label: String,
        url: String,
        title: Option<String>,
    },
    Attributes {
        label: String,
        attributes: String,
    },
}

impl Parser {
    /// A parser with the built-in extensions selected by the option bits.
    /// The tag filter rides along whenever raw HTML is let through.
    pub fn new(options: Options) -> Parser {
        let registry = core_registry();
        let mut parser = Parser {
            options,
            extensions: Vec::new(),
            refmap: ReferenceMap::new(),
            depth: Cell::new(0),
        };
        let wanted = [
            (Options::TABLES, "table"),
            (Options::STRIKETHROUGH, "strikethrough"),
            (Options::TASKLIST, "tasklist"),
            (Options::AUTOLINKS, "autolink"),
            (Options::UNSAFE_HTML, "tagfilter"),
        ];
        for (bit, name) in wanted {
            if options.contains(bit)
                && let Some(ext) = registry.find(name)
            {
                parser.extensions.push(ext);
            }
        }
        parser
    }

    /// A parser using extensions from a caller-owned registry, attached by
    /// name. Names the registry does not know are skipped; their syntax
    /// simply stays plain text.
    pub fn with_registry(
        options: Options,
        registry: &ExtensionRegistry,
        names: &[&str],
    ) -> Parser {
        Parser {
            options,
            extensions: names.iter().filter_map(|name| registry.find(name)).collect(),
            refmap: ReferenceMap::new(),
            depth: Cell::new(0),
        }
    }

    pub fn attach_extension(&mut self, ext: Arc<dyn SyntaxExtension>) {
        self.extensions.push(ext);
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// The reference definitions harvested by the most recent parse.
    pub fn reference_map(&self) -> &ReferenceMap {
        &self.refmap
    }

    /// Parse a document. Never fails: unrecognized constructs degrade to
    /// paragraph text.
    pub fn parse(&mut self, input: &str) -> Node {
        self.refmap = ReferenceMap::new();
        self.depth.set(0);
        let lines: Vec<&str> = input.lines().collect();
        let kept = self.collect_reference_definitions(&lines);
        let kept_refs: Vec<&str> = kept.iter().map(String::as_str).collect();
        self.depth.set(0);
        let blocks = self.parse_blocks(&kept_refs);
        let mut document = Node::Document(blocks);
        for index in 0..self.extensions.len() {
            let ext = Arc::clone(&self.extensions[index]);
            ext.postprocess(&mut document);
        }
        document
    }

    /// Run the inline parser over leaf text with this session's options,
    /// reference map, and extensions.
    pub fn parse_inlines(&self, text: &str) -> Vec<Node> {
        if text.is_empty() {
            return Vec::new();
        }
        InlineParser::new(self.options, &self.refmap, &self.extensions).parse(text)
    }

    // ----- pass 1: reference definitions -----

    /// Walk the raw lines once, consuming reference definitions into the
    /// map and returning the lines that remain. Fenced code content and
    /// paragraph continuations are skipped; a definition only starts where
    /// a paragraph could. Blockquote and list-item content is stripped of
    /// its container prefix, scanned recursively, and re-emitted, so
    /// definitions inside containers land in the map too.
    fn collect_reference_definitions(&mut self, lines: &[&str]) -> Vec<String> {
        let mut kept = Vec::with_capacity(lines.len());
        let mut fence: Option<(char, usize)> = None;
        let mut in_paragraph = false;
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if let Some((fence_char, fence_len)) = fence {
                kept.push(line.to_string());
                if is_closing_fence(line, fence_char, fence_len) {
                    fence = None;
                }
                i += 1;
                continue;
            }
            if is_blank(line) {
                in_paragraph = false;
                kept.push(line.to_string());
                i += 1;
                continue;
            }
            if let Some(open) = scan_fence_open(line) {
                fence = Some((open.fence_char, open.fence_len));
                in_paragraph = false;
                kept.push(line.to_string());
                i += 1;
                continue;
            }
            let indent = count_indent_columns(line);
            let trimmed = line.trim_start();
            if indent <= 3 && trimmed.starts_with('>') {
                i += self.collect_blockquote_definitions(&lines[i..], &mut kept, &mut in_paragraph);
                continue;
            }
            if let Some(marker) = scan_list_marker(line)
                && (!in_paragraph || (marker.has_content && (!marker.ordered || marker.start == 1)))
            {
                i += self.collect_list_item_definitions(
                    &lines[i..],
                    &marker,
                    &mut kept,
                    &mut in_paragraph,
                );
                continue;
            }
            if !in_paragraph
                && indent <= 3
                && trimmed.starts_with('[')
                && let Some((def, consumed)) = self.scan_reference_definition(lines, i)
            {
                match def {
                    RefDef::Url { label, url, title } => self.refmap.create(&label, url, title),
                    RefDef::Attributes { label, attributes } => {
                        self.refmap.create_attributes(&label, attributes)
                    }
                }
                i += consumed;
                continue;
            }
            in_paragraph =
                !(indent >= 4 || self.parse_atx_heading(line).is_some() || is_thematic_break(line));
            kept.push(line.to_string());
            i += 1;
        }
        kept
    }

    /// Strip the `>` prefix from a run of blockquote lines, scan the inner
    /// text for definitions, and re-emit what survives. Lazy continuation
    /// lines without a marker are left for the caller; `in_paragraph` tells
    /// it whether the quote ended with an open paragraph.
    fn collect_blockquote_definitions(
        &mut self,
        lines: &[&str],
        kept: &mut Vec<String>,
        in_paragraph: &mut bool,
    ) -> usize {
        let mut inner: Vec<String> = Vec::new();
        let mut consumed = 0;
        for &line in lines {
            let trimmed = line.trim_start();
            if count_indent_columns(line) > 3 || !trimmed.starts_with('>') {
                break;
            }
            let mut rest = &trimmed[1..];
            if let Some(stripped) = rest.strip_prefix(' ').or_else(|| rest.strip_prefix('\t')) {
                rest = stripped;
            }
            inner.push(rest.to_string());
            consumed += 1;
        }
        let kept_inner = self.collect_inner_definitions(&inner);
        *in_paragraph = kept_inner.last().is_some_and(|last| {
            !is_blank(last)
                && count_indent_columns(last) < 4
                && self.looks_like_paragraph_text(last)
        });
        if kept_inner.is_empty() {
            // The whole quote was definitions; the empty quote remains
            kept.push(">".to_string());
        } else {
            for inner_line in kept_inner {
                if inner_line.is_empty() {
                    kept.push(">".to_string());
                } else {
                    kept.push(format!("> {inner_line}"));
                }
            }
        }
        consumed
    }

    /// Same treatment for a single list item: gather the lines indented to
    /// the item's content column, scan them, and re-emit behind the
    /// original marker. A fully consumed item keeps its bare marker.
    fn collect_list_item_definitions(
        &mut self,
        lines: &[&str],
        marker: &ListMarker,
        kept: &mut Vec<String>,
        in_paragraph: &mut bool,
    ) -> usize {
        let line = lines[0];
        let trimmed = line.trim_start();
        let marker_width = if marker.ordered {
            trimmed
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .count()
                + 1
        } else {
            1
        };
        let prefix = &line[..line.len() - trimmed.len() + marker_width];
        let pad = marker.content_indent - count_indent_columns(line) - marker_width;

        let mut inner: Vec<String> = vec![marker.content.clone()];
        let mut consumed = 1;
        while consumed < lines.len() {
            let next = lines[consumed];
            if is_blank(next) {
                // Blanks belong to the item only when indented content follows
                let mut ahead = consumed;
                while ahead < lines.len() && is_blank(lines[ahead]) {
                    ahead += 1;
                }
                if ahead < lines.len()
                    && count_indent_columns(lines[ahead]) >= marker.content_indent
                {
                    for _ in consumed..ahead {
                        inner.push(String::new());
                    }
                    consumed = ahead;
                    continue;
                }
                break;
            }
            if count_indent_columns(next) >= marker.content_indent {
                inner.push(remove_indent_columns(next, marker.content_indent));
                consumed += 1;
                continue;
            }
            break;
        }

        let kept_inner = self.collect_inner_definitions(&inner);
        *in_paragraph = kept_inner.last().is_some_and(|last| {
            !is_blank(last)
                && count_indent_columns(last) < 4
                && self.looks_like_paragraph_text(last)
        });
        let mut remaining = kept_inner.into_iter();
        match remaining.next() {
            Some(first) => kept.push(format!("{}{}{}", prefix, " ".repeat(pad), first)),
            None => kept.push(prefix.to_string()),
        }
        for inner_line in remaining {
            if inner_line.is_empty() {
                kept.push(String::new());
            } else {
                kept.push(format!(
                    "{}{}",
                    " ".repeat(marker.content_indent),
                    inner_line
                ));
            }
        }
        consumed
    }

    /// Recurse the definition scan into container content, leaving the
    /// content untouched once the nesting limit is hit.
    fn collect_inner_definitions(&mut self, inner: &[String]) -> Vec<String> {
        if self.depth.get() >= MAX_NESTING_DEPTH {
            return inner.to_vec();
        }
        self.depth.set(self.depth.get() + 1);
        let inner_refs: Vec<&str> = inner.iter().map(String::as_str).collect();
        let kept = self.collect_reference_definitions(&inner_refs);
        self.depth.set(self.depth.get() - 1);
        kept
    }

    /// Try to read one reference definition starting at `lines[start]`.
    /// Definitions may spread the label, destination, and title over
    /// several lines but cannot contain a blank line.
    fn scan_reference_definition(
        &self,
        lines: &[&str],
        start: usize,
    ) -> Option<(RefDef, usize)> {
        let mut window_lines: Vec<&str> = Vec::new();
        for &line in &lines[start..] {
            if is_blank(line) {
                break;
            }
            window_lines.push(line);
        }
        let window = window_lines.join("\n");
        let chars: Vec<char> = window.chars().collect();

        let mut i = 0;
        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
        if chars.get(i) != Some(&'[') {
            return None;
        }
        i += 1;

        let label_start = i;
        while i < chars.len() && chars[i] != ']' {
            match chars[i] {
                '\\' => i += 2,
                '[' => return None,
                _ => i += 1,
            }
        }
        if i >= chars.len() || i - label_start > 999 {
            return None;
        }
        let label: String = chars[label_start..i].iter().collect();
        if label.trim().is_empty() {
            return None;
        }
        // Footnote definitions share the bracket-colon shape
        if self.options.contains(Options::FOOTNOTES) && label.starts_with('^') {
            return None;
        }
        i += 1;
        if chars.get(i) != Some(&':') {
            return None;
        }
        i += 1;

        let mut newlines = 0;
        while i < chars.len() && matches!(chars[i], ' ' | '\t' | '\n') {
            if chars[i] == '\n' {
                newlines += 1;
                if newlines > 1 {
                    return None;
                }
            }
            i += 1;
        }
        if i >= chars.len() {
            return None;
        }

        if chars[i] == '{' && newlines == 0 {
            let brace_start = i;
            while i < chars.len() && chars[i] != '}' && chars[i] != '\n' {
                i += 1;
            }
            if chars.get(i) != Some(&'}') {
                return None;
            }
            i += 1;
            if !rest_of_line_blank(&chars, i) {
                return None;
            }
            let raw: String = chars[brace_start..i].iter().collect();
            let attributes = Chunk::from(raw).clean_attributes().into_string();
            return Some((
                RefDef::Attributes { label, attributes },
                consumed_lines(&chars, i),
            ));
        }

        let dest_start = i;
        if chars[i] == '<' {
            i += 1;
            while i < chars.len() && chars[i] != '>' && chars[i] != '\n' {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            if chars.get(i) != Some(&'>') {
                return None;
            }
            i += 1;
        } else {
            while i < chars.len() && !chars[i].is_whitespace() {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            if i == dest_start {
                return None;
            }
        }
        let raw_dest: String = chars[dest_start..i.min(chars.len())].iter().collect();
        let url = Chunk::from(raw_dest).clean_url().into_string();
        let after_dest = i.min(chars.len());
        let dest_line_complete = rest_of_line_blank(&chars, after_dest);

        let mut j = after_dest;
        let mut title_newlines = 0;
        while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\n') {
            if chars[j] == '\n' {
                title_newlines += 1;
                if title_newlines > 1 {
                    break;
                }
            }
            j += 1;
        }
        if let Some(&open_quote) = chars.get(j)
            && matches!(open_quote, '"' | '\'' | '(')
            && title_newlines <= 1
        {
            let close_quote = if open_quote == '(' { ')' } else { open_quote };
            let title_start = j;
            j += 1;
            while j < chars.len() && chars[j] != close_quote {
                if chars[j] == '\\' {
                    j += 1;
                }
                j += 1;
            }
            if j < chars.len() && rest_of_line_blank(&chars, j + 1) {
                let raw_title: String = chars[title_start..j + 1].iter().collect();
                let title = Chunk::from(raw_title).clean_title().into_string();
                return Some((
                    RefDef::Url {
                        label,
                        url,
                        title: Some(title),
                    },
                    consumed_lines(&chars, j + 1),
                ));
            }
        }

        // No valid title: the definition stands alone only if its
        // destination line ended cleanly
        if dest_line_complete {
            Some((
                RefDef::Url {
                    label,
                    url,
                    title: None,
                },
                consumed_lines(&chars, after_dest),
            ))
        } else {
            None
        }
    }

    // ----- pass 2: block structure -----

    fn parse_blocks(&self, lines: &[&str]) -> Vec<Node> {
        let mut blocks = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                i += 1;
                continue;
            }

            if let Some(node) = self.parse_atx_heading(line) {
                blocks.push(node);
                i += 1;
                continue;
            }
            if is_thematic_break(line) {
                blocks.push(Node::ThematicBreak);
                i += 1;
                continue;
            }
            if count_indent_columns(line) <= 3 && line.trim_start().starts_with('>') {
                let (node, consumed) = self.parse_blockquote(lines, i);
                blocks.push(node);
                i += consumed;
                continue;
            }
            if let Some(kind) = html_block_kind(line) {
                let (node, consumed) = self.parse_html_block(lines, i, kind);
                blocks.push(node);
                i += consumed;
                continue;
            }
            if let Some(marker) = scan_list_marker(line) {
                let (node, consumed) = self.parse_list(lines, i, marker);
                blocks.push(node);
                i += consumed;
                continue;
            }
            if scan_fence_open(line).is_some() {
                let (node, consumed) = self.parse_fenced_code(lines, i);
                blocks.push(node);
                i += consumed;
                continue;
            }
            if count_indent_columns(line) >= 4 {
                let (node, consumed) = self.parse_indented_code(lines, i);
                blocks.push(node);
                i += consumed;
                continue;
            }
            if let Some((node, consumed)) = self.try_parse_footnote_definition(lines, i) {
                blocks.push(node);
                i += consumed;
                continue;
            }
            if let Some(m) = self.try_extension_block(&lines[i..]) {
                blocks.push(m.node);
                i += m.lines_consumed;
                continue;
            }

            let (node, consumed) = self.parse_paragraph(lines, i);
            blocks.push(node);
            i += consumed;
        }
        blocks
    }

    /// Recurse into container content, flattening to a single paragraph
    /// once the nesting limit is hit.
    fn parse_nested_blocks(&self, lines: &[&str]) -> Vec<Node> {
        if self.depth.get() >= MAX_NESTING_DEPTH {
            let text = lines.join("\n");
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            return vec![Node::Paragraph(self.parse_inlines(trimmed))];
        }
        self.depth.set(self.depth.get() + 1);
        let blocks = self.parse_blocks(lines);
        self.depth.set(self.depth.get() - 1);
        blocks
    }

    fn try_extension_block(&self, rest: &[&str]) -> Option<BlockMatch> {
        for index in 0..self.extensions.len() {
            let ext = Arc::clone(&self.extensions[index]);
            if let Some(m) = ext.try_open_block(rest, self) {
                return Some(m);
            }
        }
        None
    }

    fn parse_atx_heading(&self, line: &str) -> Option<Node> {
        if count_indent_columns(line) > 3 {
            return None;
        }
        let trimmed = line.trim_start();
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        if level == 0 || level > 6 {
            return None;
        }
        let rest = &trimmed[level..];
        if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
            return None;
        }

        let mut content = rest.trim();
        // An all-hash tail preceded by a space is a closing sequence
        let without_hashes = content.trim_end_matches('#');
        if without_hashes.len() != content.len() {
            if without_hashes.is_empty() {
                content = "";
            } else if without_hashes.ends_with(' ') || without_hashes.ends_with('\t') {
                content = without_hashes.trim_end();
            }
        }
        Some(Node::Heading {
            level: level as u8,
            children: self.parse_inlines(content),
        })
    }

    fn parse_blockquote(&self, lines: &[&str], start: usize) -> (Node, usize) {
        let mut content: Vec<String> = Vec::new();
        let mut i = start;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                break;
            }
            let trimmed = line.trim_start();
            if count_indent_columns(line) <= 3 && trimmed.starts_with('>') {
                let mut rest = &trimmed[1..];
                if let Some(stripped) = rest.strip_prefix(' ').or_else(|| rest.strip_prefix('\t'))
                {
                    rest = stripped;
                }
                content.push(rest.to_string());
                i += 1;
                continue;
            }
            // Lazy continuation: the line must continue the paragraph the
            // quote is currently building
            let continuing_paragraph = content
                .last()
                .is_some_and(|last| !is_blank(last) && self.looks_like_paragraph_text(last));
            if continuing_paragraph
                && setext_level(line).is_none()
                && !self.interrupts_paragraph(&lines[i..], line)
            {
                content.push(line.trim_start().to_string());
                i += 1;
                continue;
            }
            break;
        }
        let inner: Vec<&str> = content.iter().map(String::as_str).collect();
        (Node::BlockQuote(self.parse_nested_blocks(&inner)), i - start)
    }

    fn looks_like_paragraph_text(&self, line: &str) -> bool {
        self.parse_atx_heading(line).is_none()
            && !is_thematic_break(line)
            && scan_fence_open(line).is_none()
            && !line.trim_start().starts_with('>')
            && scan_list_marker(line).is_none()
            && html_block_kind(line).is_none()
    }

    fn parse_html_block(&self, lines: &[&str], start: usize, kind: u8) -> (Node, usize) {
        let mut i = start;
        let mut collected: Vec<&str> = Vec::new();
        match kind {
            1..=5 => {
                while i < lines.len() {
                    collected.push(lines[i]);
                    if html_end_condition(lines[i], kind) {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            _ => {
                while i < lines.len() && !is_blank(lines[i]) {
                    collected.push(lines[i]);
                    i += 1;
                }
            }
        }
        let mut literal = collected.join("\n");
        literal.push('\n');
        (Node::HtmlBlock(literal), i - start)
    }

    fn parse_fenced_code(&self, lines: &[&str], start: usize) -> (Node, usize) {
        let Some(open) = scan_fence_open(lines[start]) else {
            return (
                Node::Paragraph(self.parse_inlines(lines[start].trim())),
                1,
            );
        };
        let mut content: Vec<String> = Vec::new();
        let mut i = start + 1;
        while i < lines.len() {
            if is_closing_fence(lines[i], open.fence_char, open.fence_len) {
                i += 1;
                break;
            }
            content.push(remove_indent_columns(
                lines[i],
                open.indent.min(count_indent_columns(lines[i])),
            ));
            i += 1;
        }
        let mut literal = content.join("\n");
        if !literal.is_empty() {
            literal.push('\n');
        }
        (
            Node::CodeBlock {
                info: open.info,
                literal,
            },
            i - start,
        )
    }

    fn parse_indented_code(&self, lines: &[&str], start: usize) -> (Node, usize) {
        let mut content: Vec<String> = Vec::new();
        let mut pending_blanks = 0;
        let mut i = start;
        let mut last_code = start;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                pending_blanks += 1;
                i += 1;
                continue;
            }
            if count_indent_columns(line) < 4 {
                break;
            }
            for _ in 0..pending_blanks {
                content.push(String::new());
            }
            pending_blanks = 0;
            content.push(remove_indent_columns(line, 4));
            last_code = i;
            i += 1;
        }
        let mut literal = content.join("\n");
        literal.push('\n');
        (
            Node::CodeBlock {
                info: String::new(),
                literal,
            },
            last_code - start + 1,
        )
    }

    fn parse_list(&self, lines: &[&str], start: usize, first: ListMarker) -> (Node, usize) {
        let ordered = first.ordered;
        let bullet = first.bullet;
        let delimiter = first.delimiter;
        let list_start = first.start;

        let mut items: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = vec![first.content];
        let mut current_indent = first.content_indent;
        let mut tight = true;
        let mut pending_blanks = 0;
        let mut i = start + 1;
        let mut end = start + 1;

        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                pending_blanks += 1;
                i += 1;
                continue;
            }
            let indent = count_indent_columns(line);

            if indent >= current_indent {
                // Continuation of the current item, possibly after blanks
                if pending_blanks > 0 {
                    tight = false;
                    for _ in 0..pending_blanks {
                        current.push(String::new());
                    }
                    pending_blanks = 0;
                }
                current.push(remove_indent_columns(line, current_indent));
                i += 1;
                end = i;
                continue;
            }
            if indent <= 3
                && let Some(marker) = scan_list_marker(line)
            {
                if marker.ordered != ordered
                    || (ordered && marker.delimiter != delimiter)
                    || (!ordered && marker.bullet != bullet)
                {
                    break;
                }
                if pending_blanks > 0 {
                    tight = false;
                }
                items.push(std::mem::take(&mut current));
                current.push(marker.content);
                current_indent = marker.content_indent;
                pending_blanks = 0;
                i += 1;
                end = i;
                continue;
            }
            if pending_blanks == 0
                && setext_level(line).is_none()
                && !self.interrupts_paragraph(&lines[i..], line)
            {
                current.push(line.trim_start().to_string());
                i += 1;
                end = i;
                continue;
            }
            break;
        }
        items.push(current);

        let children: Vec<Node> = items
            .iter()
            .map(|item_lines| {
                let inner: Vec<&str> = item_lines.iter().map(String::as_str).collect();
                Node::ListItem(self.parse_nested_blocks(&inner))
            })
            .collect();

        let node = if ordered {
            Node::OrderedList {
                start: list_start,
                tight,
                children,
            }
        } else {
            Node::UnorderedList { tight, children }
        };
        (node, end - start)
    }

    fn try_parse_footnote_definition(
        &self,
        lines: &[&str],
        start: usize,
    ) -> Option<(Node, usize)> {
        if !self.options.contains(Options::FOOTNOTES) {
            return None;
        }
        let line = lines[start];
        if count_indent_columns(line) > 3 {
            return None;
        }
        let trimmed = line.trim_start();
        let rest = trimmed.strip_prefix("[^")?;
        let close = rest.find(']')?;
        let label = &rest[..close];
        if label.is_empty() || label.contains(['[', ' ', '\t']) {
            return None;
        }
        let after = &rest[close + 1..];
        let body = after.strip_prefix(':')?;

        let mut content: Vec<String> = vec![body.trim_start().to_string()];
        let mut pending_blanks = 0;
        let mut i = start + 1;
        let mut end = start + 1;
        while i < lines.len() {
            let next = lines[i];
            if is_blank(next) {
                pending_blanks += 1;
                i += 1;
                continue;
            }
            if count_indent_columns(next) >= 4 {
                for _ in 0..pending_blanks {
                    content.push(String::new());
                }
                pending_blanks = 0;
                content.push(remove_indent_columns(next, 4));
                i += 1;
                end = i;
                continue;
            }
            if pending_blanks == 0
                && setext_level(next).is_none()
                && !self.interrupts_paragraph(&lines[i..], next)
                && !next.trim_start().starts_with("[^")
            {
                content.push(next.trim_start().to_string());
                i += 1;
                end = i;
                continue;
            }
            break;
        }

        let inner: Vec<&str> = content.iter().map(String::as_str).collect();
        Some((
            Node::FootnoteDefinition {
                label: label.to_string(),
                children: self.parse_nested_blocks(&inner),
            },
            end - start,
        ))
    }

    fn parse_paragraph(&self, lines: &[&str], start: usize) -> (Node, usize) {
        // Trailing spaces stay on interior lines; two or more before the
        // newline are a hard break. The final line is trimmed at the join.
        let mut content: Vec<&str> = vec![lines[start].trim_start()];
        let mut i = start + 1;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                break;
            }
            if let Some(level) = setext_level(line) {
                return (
                    Node::Heading {
                        level,
                        children: self.parse_inlines(content.join("\n").trim_end()),
                    },
                    i - start + 1,
                );
            }
            if self.interrupts_paragraph(&lines[i..], line) {
                break;
            }
            content.push(line.trim_start());
            i += 1;
        }
        (
            Node::Paragraph(self.parse_inlines(content.join("\n").trim_end())),
            i - start,
        )
    }

    /// Whether `line` starts a block that is allowed to cut a paragraph
    /// short. Indented code cannot; ordered lists only can when they start
    /// at 1; HTML type 7 cannot; registered extensions are asked last.
    fn interrupts_paragraph(&self, rest: &[&str], line: &str) -> bool {
        if is_thematic_break(line) || self.parse_atx_heading(line).is_some() {
            return true;
        }
        if count_indent_columns(line) <= 3 && line.trim_start().starts_with('>') {
            return true;
        }
        if scan_fence_open(line).is_some() {
            return true;
        }
        if matches!(html_block_kind(line), Some(1..=6)) {
            return true;
        }
        if let Some(marker) = scan_list_marker(line)
            && marker.has_content
            && (!marker.ordered || marker.start == 1)
        {
            return true;
        }
        self.try_extension_block(rest).is_some()
    }
}

// ----- line scanners -----

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Indent width in columns, with tabs advancing to the next multiple of 4.
pub(crate) fn count_indent_columns(line: &str) -> usize {
    let mut col = 0;
    for c in line.chars() {
        match c {
            ' ' => col += 1,
            '\t' => col = (col / 4 + 1) * 4,
            _ => break,
        }
    }
    col
}

/// Strip `cols` columns of leading whitespace. A tab that straddles the
/// cut point is replaced by its overshoot in spaces.
pub(crate) fn remove_indent_columns(line: &str, cols: usize) -> String {
    let mut col = 0;
    for (idx, c) in line.char_indices() {
        if col >= cols {
            return line[idx..].to_string();
        }
        match c {
            ' ' => col += 1,
            '\t' => {
                let next = (col / 4 + 1) * 4;
                if next > cols {
                    let mut out = " ".repeat(next - cols);
                    out.push_str(&line[idx + 1..]);
                    return out;
                }
                col = next;
            }
            _ => return line[idx..].to_string(),
        }
    }
    String::new()
}

fn is_thematic_break(line: &str) -> bool {
    if count_indent_columns(line) > 3 {
        return false;
    }
    let mut marker = None;
    let mut count = 0;
    for c in line.trim_start().chars() {
        match c {
            ' ' | '\t' => continue,
            '-' | '_' | '*' => {
                if marker.get_or_insert(c) != &c {
                    return false;
                }
                count += 1;
            }
            _ => return false,
        }
    }
    count >= 3
}

fn setext_level(line: &str) -> Option<u8> {
    if count_indent_columns(line) > 3 {
        return None;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c == '=') {
        Some(1)
    } else if trimmed.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

struct FenceOpen {
    fence_char: char,
    fence_len: usize,
    indent: usize,
    info: String,
}

fn scan_fence_open(line: &str) -> Option<FenceOpen> {
    let indent = count_indent_columns(line);
    if indent > 3 {
        return None;
    }
    let trimmed = line.trim_start();
    let fence_char = trimmed.chars().next()?;
    if fence_char != '`' && fence_char != '~' {
        return None;
    }
    let fence_len = trimmed.chars().take_while(|&c| c == fence_char).count();
    if fence_len < 3 {
        return None;
    }
    let info_raw = trimmed[fence_len..].trim();
    // Backtick info strings may not contain backticks
    if fence_char == '`' && info_raw.contains('`') {
        return None;
    }
    Some(FenceOpen {
        fence_char,
        fence_len,
        indent,
        info: crate::strings::decode_entities(&crate::strings::unescape(info_raw)),
    })
}

fn is_closing_fence(line: &str, fence_char: char, fence_len: usize) -> bool {
    if count_indent_columns(line) > 3 {
        return false;
    }
    let trimmed = line.trim();
    let run = trimmed.chars().take_while(|&c| c == fence_char).count();
    run >= fence_len && run == trimmed.len()
}

fn scan_list_marker(line: &str) -> Option<ListMarker> {
    let indent = count_indent_columns(line);
    if indent > 3 {
        return None;
    }
    let trimmed = line.trim_start();
    let first = trimmed.chars().next()?;

    let (ordered, bullet, delimiter, start, marker_width) = if matches!(first, '-' | '+' | '*') {
        (false, first, ' ', 0, 1)
    } else if first.is_ascii_digit() {
        let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.len() > 9 {
            return None;
        }
        let delimiter = trimmed.chars().nth(digits.len())?;
        if delimiter != '.' && delimiter != ')' {
            return None;
        }
        let start = digits.parse::<u32>().ok()?;
        (true, ' ', delimiter, start, digits.len() + 1)
    } else {
        return None;
    };

    let after = &trimmed[marker_width..];
    if !after.is_empty() && !after.starts_with(' ') && !after.starts_with('\t') {
        return None;
    }

    let marker_col = indent + marker_width;
    // Columns of whitespace between marker and content. None (end of
    // line) or more than 4 both mean the content starts one column in.
    let spacing = if after.trim().is_empty() {
        1
    } else {
        let cols = count_indent_columns(after);
        if cols > 4 { 1 } else { cols }
    };
    let content = if after.trim().is_empty() {
        String::new()
    } else {
        remove_indent_columns(after, spacing)
    };
    let has_content = !content.trim().is_empty();

    Some(ListMarker {
        ordered,
        bullet,
        delimiter,
        start,
        content_indent: marker_col + spacing,
        content,
        has_content,
    })
}

fn html_block_kind(line: &str) -> Option<u8> {
    if count_indent_columns(line) > 3 {
        return None;
    }
    let trimmed = line.trim_start();
    if !trimmed.starts_with('<') {
        return None;
    }
    let lower = trimmed.to_lowercase();
    for tag in ["script", "pre", "style", "textarea"] {
        if let Some(rest) = lower.strip_prefix('<').and_then(|r| r.strip_prefix(tag))
            && (rest.is_empty() || rest.starts_with([' ', '\t', '>']))
        {
            return Some(1);
        }
    }
    if trimmed.starts_with("<!--") {
        return Some(2);
    }
    if trimmed.starts_with("<?") {
        return Some(3);
    }
    if trimmed.starts_with("<![CDATA[") {
        return Some(5);
    }
    if trimmed.starts_with("<!")
        && trimmed
            .chars()
            .nth(2)
            .is_some_and(|c| c.is_ascii_alphabetic())
    {
        return Some(4);
    }

    let name_part = trimmed
        .strip_prefix("</")
        .or_else(|| trimmed.strip_prefix('<'))?;
    let name: String = name_part
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if !name.is_empty() && BLOCK_TAGS.contains(&name.to_lowercase().as_str()) {
        let after = &name_part[name.len()..];
        if after.is_empty() || after.starts_with([' ', '\t', '>']) || after.starts_with("/>") {
            return Some(6);
        }
    }

    // Type 7: a single complete tag alone on its line
    let chars: Vec<char> = trimmed.chars().collect();
    let tag_end = scan_html_open_tag(&chars, 0).or_else(|| scan_html_close_tag(&chars, 0))?;
    chars[tag_end..]
        .iter()
        .all(|c| c.is_whitespace())
        .then_some(7)
}

fn html_end_condition(line: &str, kind: u8) -> bool {
    match kind {
        1 => {
            let lower = line.to_lowercase();
            ["</script>", "</pre>", "</style>", "</textarea>"]
                .iter()
                .any(|close| lower.contains(close))
        }
        2 => line.contains("-->"),
        3 => line.contains("?>"),
        4 => line.contains('>'),
        5 => line.contains("]]>"),
        _ => false,
    }
}

fn rest_of_line_blank(chars: &[char], from: usize) -> bool {
    chars[from.min(chars.len())..]
        .iter()
        .take_while(|&&c| c != '\n')
        .all(|c| c.is_whitespace())
}

/// How many lines a definition covered, given the index just past its
/// last consumed character.
fn consumed_lines(chars: &[char], end: usize) -> usize {
    chars[..end.min(chars.len())]
        .iter()
        .filter(|&&c| c == '\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Node {
        Parser::new(Options::NONE).parse(input)
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn paragraph(s: &str) -> Node {
        Node::Paragraph(vec![text(s)])
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Node::Document(vec![]));
        assert_eq!(parse("   \n\t\n"), Node::Document(vec![]));
    }

    #[test]
    fn test_paragraphs_and_soft_breaks() {
        assert_eq!(
            parse("one\ntwo\n\nthree"),
            Node::Document(vec![
                Node::Paragraph(vec![text("one"), Node::SoftBreak, text("two")]),
                paragraph("three"),
            ])
        );
    }

    #[test]
    fn test_trailing_spaces_survive_to_a_hard_break() {
        assert_eq!(
            parse("hard  \nwrap"),
            Node::Document(vec![Node::Paragraph(vec![
                text("hard"),
                Node::HardBreak,
                text("wrap"),
            ])])
        );
        // Spaces at the very end of the paragraph are dropped
        assert_eq!(parse("tail  "), Node::Document(vec![paragraph("tail")]));
    }

    #[test]
    fn test_atx_headings() {
        assert_eq!(
            parse("# Title\n### Sub ###\n####### not a heading"),
            Node::Document(vec![
                Node::Heading {
                    level: 1,
                    children: vec![text("Title")],
                },
                Node::Heading {
                    level: 3,
                    children: vec![text("Sub")],
                },
                paragraph("####### not a heading"),
            ])
        );
    }

    #[test]
    fn test_setext_headings() {
        assert_eq!(
            parse("Title\n=====\nSub\n---"),
            Node::Document(vec![
                Node::Heading {
                    level: 1,
                    children: vec![text("Title")],
                },
                Node::Heading {
                    level: 2,
                    children: vec![text("Sub")],
                },
            ])
        );
    }

    #[test]
    fn test_thematic_breaks() {
        assert_eq!(
            parse("***\n- - -\n__ __ _"),
            Node::Document(vec![
                Node::ThematicBreak,
                Node::ThematicBreak,
                Node::ThematicBreak,
            ])
        );
    }

    #[test]
    fn test_fenced_code_block() {
        assert_eq!(
            parse("```rust\nfn main() {}\n```"),
            Node::Document(vec![Node::CodeBlock {
                info: "rust".to_string(),
                literal: "fn main() {}\n".to_string(),
            }])
        );
        // Unclosed fence runs to end of input
        assert_eq!(
            parse("~~~\ncode"),
            Node::Document(vec![Node::CodeBlock {
                info: String::new(),
                literal: "code\n".to_string(),
            }])
        );
    }

    #[test]
    fn test_indented_code_block() {
        assert_eq!(
            parse("    let x = 1;\n\n    let y = 2;"),
            Node::Document(vec![Node::CodeBlock {
                info: String::new(),
                literal: "let x = 1;\n\nlet y = 2;\n".to_string(),
            }])
        );
    }

    #[test]
    fn test_indented_code_cannot_interrupt_paragraph() {
        assert_eq!(
            parse("para\n    still para"),
            Node::Document(vec![Node::Paragraph(vec![
                text("para"),
                Node::SoftBreak,
                text("still para"),
            ])])
        );
    }

    #[test]
    fn test_blockquote_with_lazy_continuation() {
        assert_eq!(
            parse("> quoted\nlazy"),
            Node::Document(vec![Node::BlockQuote(vec![Node::Paragraph(vec![
                text("quoted"),
                Node::SoftBreak,
                text("lazy"),
            ])])])
        );
    }

    #[test]
    fn test_nested_blockquote() {
        assert_eq!(
            parse("> > deep\n> shallow"),
            Node::Document(vec![Node::BlockQuote(vec![Node::BlockQuote(vec![
                Node::Paragraph(vec![text("deep"), Node::SoftBreak, text("shallow")]),
            ])])])
        );
    }

    #[test]
    fn test_tight_unordered_list() {
        assert_eq!(
            parse("- a\n- b"),
            Node::Document(vec![Node::UnorderedList {
                tight: true,
                children: vec![
                    Node::ListItem(vec![paragraph("a")]),
                    Node::ListItem(vec![paragraph("b")]),
                ],
            }])
        );
    }

    #[test]
    fn test_loose_list_from_blank_between_items() {
        let Node::Document(blocks) = parse("- a\n\n- b") else {
            panic!("expected document");
        };
        assert!(matches!(
            blocks[0],
            Node::UnorderedList { tight: false, .. }
        ));
    }

    #[test]
    fn test_ordered_list_start_and_interrupt_rule() {
        assert_eq!(
            parse("3. three\n4. four"),
            Node::Document(vec![Node::OrderedList {
                start: 3,
                tight: true,
                children: vec![
                    Node::ListItem(vec![paragraph("three")]),
                    Node::ListItem(vec![paragraph("four")]),
                ],
            }])
        );
        // A list not starting at 1 cannot interrupt a paragraph
        assert_eq!(
            parse("para\n3. nope"),
            Node::Document(vec![Node::Paragraph(vec![
                text("para"),
                Node::SoftBreak,
                text("3. nope"),
            ])])
        );
    }

    #[test]
    fn test_nested_list() {
        assert_eq!(
            parse("- outer\n  - inner"),
            Node::Document(vec![Node::UnorderedList {
                tight: true,
                children: vec![Node::ListItem(vec![
                    paragraph("outer"),
                    Node::UnorderedList {
                        tight: true,
                        children: vec![Node::ListItem(vec![paragraph("inner")])],
                    },
                ])],
            }])
        );
    }

    #[test]
    fn test_bullet_change_starts_new_list() {
        let Node::Document(blocks) = parse("- a\n* b") else {
            panic!("expected document");
        };
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_html_block() {
        assert_eq!(
            parse("<div>\nraw\n</div>\n\nafter"),
            Node::Document(vec![
                Node::HtmlBlock("<div>\nraw\n</div>\n".to_string()),
                paragraph("after"),
            ])
        );
        assert_eq!(
            parse("<!-- c -->"),
            Node::Document(vec![Node::HtmlBlock("<!-- c -->\n".to_string())])
        );
    }

    #[test]
    fn test_reference_definition_resolves_and_disappears() {
        assert_eq!(
            parse("[label]: /url \"title\"\n\nsee [label]"),
            Node::Document(vec![Node::Paragraph(vec![
                text("see "),
                Node::Link {
                    destination: "/url".to_string(),
                    title: Some("title".to_string()),
                    children: vec![text("label")],
                },
            ])])
        );
    }

    #[test]
    fn test_reference_definition_not_inside_code_fence() {
        let Node::Document(blocks) = parse("```\n[label]: /url\n```\n\n[label]") else {
            panic!("expected document");
        };
        assert_eq!(
            blocks[1],
            Node::Paragraph(vec![text("[label]")])
        );
    }

    #[test]
    fn test_reference_definition_inside_blockquote() {
        assert_eq!(
            parse("> [foo]: /url\n\n[foo]"),
            Node::Document(vec![
                Node::BlockQuote(vec![]),
                Node::Paragraph(vec![Node::Link {
                    destination: "/url".to_string(),
                    title: None,
                    children: vec![text("foo")],
                }]),
            ])
        );
    }

    #[test]
    fn test_reference_definition_inside_list_item() {
        let Node::Document(blocks) = parse("- [foo]: /url\n\nsee [foo]") else {
            panic!("expected document");
        };
        assert!(matches!(blocks[0], Node::UnorderedList { .. }));
        assert_eq!(
            blocks[1],
            Node::Paragraph(vec![
                text("see "),
                Node::Link {
                    destination: "/url".to_string(),
                    title: None,
                    children: vec![text("foo")],
                },
            ])
        );
    }

    #[test]
    fn test_attributes_definition() {
        assert_eq!(
            parse("[badge]: {.pill #new}\n\na [badge] here"),
            Node::Document(vec![Node::Paragraph(vec![
                text("a "),
                Node::InlineAttributes {
                    attributes: ".pill #new".to_string(),
                    children: vec![text("badge")],
                },
                text(" here"),
            ])])
        );
    }

    #[test]
    fn test_first_definition_wins() {
        let mut parser = Parser::new(Options::NONE);
        parser.parse("[l]: /first\n[l]: /second\n\n[l]");
        assert_eq!(parser.reference_map().lookup("l").unwrap().url, "/first");
    }

    #[test]
    fn test_footnote_definition_and_reference() {
        assert_eq!(
            Parser::new(Options::FOOTNOTES).parse("text[^a]\n\n[^a]: the note"),
            Node::Document(vec![
                Node::Paragraph(vec![
                    text("text"),
                    Node::FootnoteReference("a".to_string()),
                ]),
                Node::FootnoteDefinition {
                    label: "a".to_string(),
                    children: vec![paragraph("the note")],
                },
            ])
        );
    }

    #[test]
    fn test_table_via_options() {
        let doc = Parser::new(Options::TABLES).parse("| a |\n| - |\n| 1 |");
        let Node::Document(blocks) = doc else {
            panic!("expected document");
        };
        assert!(matches!(blocks[0], Node::Table { .. }));
    }

    #[test]
    fn test_table_interrupts_paragraph() {
        let doc = Parser::new(Options::TABLES).parse("before\n| a | b |\n| - | - |");
        let Node::Document(blocks) = doc else {
            panic!("expected document");
        };
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], paragraph("before"));
        assert!(matches!(blocks[1], Node::Table { .. }));
    }

    #[test]
    fn test_tasklist_via_options() {
        let doc = Parser::new(Options::TASKLIST).parse("- [x] done\n- [ ] todo");
        let Node::Document(blocks) = doc else {
            panic!("expected document");
        };
        let Node::UnorderedList { children, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert!(matches!(children[0], Node::TaskItem { checked: true, .. }));
        assert!(matches!(
            children[1],
            Node::TaskItem { checked: false, .. }
        ));
    }

    #[test]
    fn test_gfm_strikethrough_and_autolink() {
        let doc = Parser::new(Options::GFM).parse("~~old~~ www.example.com");
        let Node::Document(blocks) = doc else {
            panic!("expected document");
        };
        let Node::Paragraph(inlines) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            inlines[0],
            Node::Strikethrough(vec![text("old")])
        );
        assert!(matches!(inlines[2], Node::Link { .. }));
    }

    #[test]
    fn test_deep_nesting_flattens_instead_of_overflowing() {
        let mut input = "> ".repeat(200);
        input.push_str("bottom");
        // Must terminate without blowing the stack and keep the text
        let doc = parse(&input);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("bottom"));
    }

    #[test]
    fn test_tab_indent_arithmetic() {
        assert_eq!(count_indent_columns("\tx"), 4);
        assert_eq!(count_indent_columns("  \tx"), 4);
        assert_eq!(remove_indent_columns("\t\tcode", 4), "\tcode");
        assert_eq!(remove_indent_columns("  \t  code", 4), "  code");
        assert_eq!(remove_indent_columns("\tcode", 2), "  code");
    }
}
