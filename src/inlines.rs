/// Inline parsing: the two-phase scan-then-resolve pass that turns leaf
/// block text into inline nodes. Phase one walks the text once, dispatching
/// on special characters and recording emphasis delimiter runs; phase two
/// resolves the delimiter runs into emphasis, strong, and extension nodes.
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

use crate::ast::Node;
use crate::chunk::Chunk;
use crate::extension::SyntaxExtension;
use crate::options::Options;
use crate::parser::MAX_NESTING_DEPTH;
use crate::refmap::{Reference, ReferenceMap};
use crate::strings::{is_ascii_punctuation, is_unicode_punctuation, scan_entity};

/// The characters that always interrupt a plain-text run, before any
/// extension adds its own.
const BASE_SPECIAL: [char; 8] = ['\\', '&', '`', '<', '!', '[', '*', '_'];

pub struct InlineParser<'p> {
    options: Options,
    refmap: &'p ReferenceMap,
    extensions: &'p [Arc<dyn SyntaxExtension>],
    special: HashSet<char>,
    depth: Cell<usize>,
}

/// A delimiter run awaiting resolution, kept inline in the parsed stream
/// so pairing never has to track node indices separately.
struct Delimiter {
    ch: char,
    count: usize,
    original: usize,
    can_open: bool,
    can_close: bool,
    owner: Option<usize>,
}

enum InlineItem {
    Node(Node),
    Delim(Delimiter),
}

impl<'p> InlineParser<'p> {
    pub fn new(
        options: Options,
        refmap: &'p ReferenceMap,
        extensions: &'p [Arc<dyn SyntaxExtension>],
    ) -> InlineParser<'p> {
        let mut special: HashSet<char> = BASE_SPECIAL.iter().copied().collect();
        for ext in extensions {
            for ch in ext.special_characters() {
                special.insert(ch);
            }
            for ch in ext.emphasis_characters() {
                special.insert(ch);
            }
        }
        InlineParser {
            options,
            refmap,
            extensions,
            special,
            depth: Cell::new(0),
        }
    }

    /// Add a character to the special set for this session. Text runs will
    /// break at it and offer it to extension inline matchers.
    pub fn add_special_character(&mut self, ch: char) {
        self.special.insert(ch);
    }

    /// Remove a character from the special set. Base CommonMark characters
    /// can be removed too; the caller is trusted to know what it is doing.
    pub fn remove_special_character(&mut self, ch: char) {
        self.special.remove(&ch);
    }

    /// Parse a leaf block's text into inline nodes.
    pub fn parse(&self, text: &str) -> Vec<Node> {
        let chars: Vec<char> = text.chars().collect();
        let mut items: Vec<InlineItem> = Vec::new();
        let mut buffer = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if c == '\n' {
                let trimmed_len = buffer.trim_end_matches(' ').len();
                let hard = buffer.len() - trimmed_len >= 2
                    || self.options.contains(Options::HARD_BREAKS);
                buffer.truncate(trimmed_len);
                flush_text(&mut items, &mut buffer);
                items.push(InlineItem::Node(if hard {
                    Node::HardBreak
                } else {
                    Node::SoftBreak
                }));
                i += 1;
                while i < chars.len() && chars[i] == ' ' {
                    i += 1;
                }
                continue;
            }

            if !self.special.contains(&c) {
                buffer.push(c);
                i += 1;
                continue;
            }

            match c {
                '\\' => {
                    if chars.get(i + 1) == Some(&'\n') {
                        flush_text(&mut items, &mut buffer);
                        items.push(InlineItem::Node(Node::HardBreak));
                        i += 2;
                        while i < chars.len() && chars[i] == ' ' {
                            i += 1;
                        }
                    } else if i + 1 < chars.len() && is_ascii_punctuation(chars[i + 1]) {
                        buffer.push(chars[i + 1]);
                        i += 2;
                    } else {
                        buffer.push('\\');
                        i += 1;
                    }
                }
                '&' => {
                    if let Some((decoded, end)) = scan_entity(&chars, i) {
                        buffer.push_str(&decoded);
                        i = end;
                    } else {
                        buffer.push('&');
                        i += 1;
                    }
                }
                '`' => {
                    if let Some((node, end)) = self.try_parse_code_span(&chars, i) {
                        flush_text(&mut items, &mut buffer);
                        items.push(InlineItem::Node(node));
                        i = end;
                    } else {
                        // No closing run: the whole opening run is literal
                        while i < chars.len() && chars[i] == '`' {
                            buffer.push('`');
                            i += 1;
                        }
                    }
                }
                '<' => {
                    if let Some((node, end)) = self.try_parse_angle_autolink(&chars, i) {
                        flush_text(&mut items, &mut buffer);
                        items.push(InlineItem::Node(node));
                        i = end;
                    } else if let Some((node, end)) = self.try_parse_html_inline(&chars, i) {
                        flush_text(&mut items, &mut buffer);
                        items.push(InlineItem::Node(node));
                        i = end;
                    } else {
                        buffer.push('<');
                        i += 1;
                    }
                }
                '!' => {
                    if chars.get(i + 1) == Some(&'[')
                        && let Some((node, end)) = self.try_parse_image(&chars, i)
                    {
                        flush_text(&mut items, &mut buffer);
                        items.push(InlineItem::Node(node));
                        i = end;
                    } else {
                        buffer.push('!');
                        i += 1;
                    }
                }
                '[' => {
                    if let Some((node, end)) = self.try_parse_bracket(&chars, i) {
                        flush_text(&mut items, &mut buffer);
                        items.push(InlineItem::Node(node));
                        i = end;
                    } else {
                        buffer.push('[');
                        i += 1;
                    }
                }
                _ if c == '*' || c == '_' || self.emphasis_owner(c).is_some() => {
                    let start = i;
                    while i < chars.len() && chars[i] == c {
                        i += 1;
                    }
                    let count = i - start;
                    // Extension delimiters only come in runs of one or two
                    if c != '*' && c != '_' && count > 2 {
                        for _ in 0..count {
                            buffer.push(c);
                        }
                        continue;
                    }
                    let (can_open, can_close) = compute_flanking(&chars, start, count, c);
                    flush_text(&mut items, &mut buffer);
                    items.push(InlineItem::Delim(Delimiter {
                        ch: c,
                        count,
                        original: count,
                        can_open,
                        can_close,
                        owner: self.emphasis_owner(c),
                    }));
                }
                _ => {
                    if let Some(index) = self.inline_owner(c)
                        && let Some(m) =
                            self.extensions[index].try_match_inline(&chars, i, self)
                    {
                        flush_text(&mut items, &mut buffer);
                        items.push(InlineItem::Node(m.node));
                        i = m.end;
                    } else {
                        buffer.push(c);
                        i += 1;
                    }
                }
            }
        }
        flush_text(&mut items, &mut buffer);

        self.process_emphasis(&mut items);
        finalize(items)
    }

    fn emphasis_owner(&self, ch: char) -> Option<usize> {
        self.extensions
            .iter()
            .position(|ext| ext.emphasis_characters().contains(&ch))
    }

    fn inline_owner(&self, ch: char) -> Option<usize> {
        self.extensions
            .iter()
            .position(|ext| ext.special_characters().contains(&ch))
    }

    /// Resolve delimiter runs into emphasis nodes. Closers are taken left
    /// to right; for each one the nearest compatible opener wins, honoring
    /// the modulo-3 restriction on delimiters that can both open and close.
    fn process_emphasis(&self, items: &mut Vec<InlineItem>) {
        let mut closer = 0;
        while closer < items.len() {
            let closes = matches!(
                &items[closer],
                InlineItem::Delim(d) if d.can_close && d.count > 0
            );
            if !closes {
                closer += 1;
                continue;
            }

            let Some(opener) = self.find_opener(items, closer) else {
                closer += 1;
                continue;
            };

            let (opener_count, closer_count, owner) = {
                let InlineItem::Delim(od) = &items[opener] else {
                    unreachable!()
                };
                let InlineItem::Delim(cd) = &items[closer] else {
                    unreachable!()
                };
                (od.count, cd.count, od.owner)
            };
            let use_delims = if opener_count >= 2 && closer_count >= 2 { 2 } else { 1 };

            if let InlineItem::Delim(d) = &mut items[opener] {
                d.count -= use_delims;
            }
            if let InlineItem::Delim(d) = &mut items[closer] {
                d.count -= use_delims;
            }

            // Everything strictly between the pair becomes the children;
            // unresolved delimiters inside turn into literal text
            let children = finalize(items.drain(opener + 1..closer).collect());
            let node = match owner {
                Some(index) => self.extensions[index].emphasis_node(children),
                None if use_delims == 2 => Node::Strong(children),
                None => Node::Emphasis(children),
            };
            items.insert(opener + 1, InlineItem::Node(node));

            let mut closer_index = opener + 2;
            if matches!(&items[opener], InlineItem::Delim(d) if d.count == 0) {
                items.remove(opener);
                closer_index -= 1;
            }
            if matches!(&items[closer_index], InlineItem::Delim(d) if d.count == 0) {
                items.remove(closer_index);
            }
            closer = closer_index;
        }
    }

    fn find_opener(&self, items: &[InlineItem], closer: usize) -> Option<usize> {
        let InlineItem::Delim(cd) = &items[closer] else {
            return None;
        };
        let mut j = closer;
        while j > 0 {
            j -= 1;
            if let InlineItem::Delim(od) = &items[j]
                && od.ch == cd.ch
                && od.can_open
                && od.count > 0
            {
                // Runs that can both open and close must not sum to a
                // multiple of 3 unless both lengths are
                let blocked = (cd.can_open || od.can_close)
                    && (od.original + cd.original) % 3 == 0
                    && !(od.original % 3 == 0 && cd.original % 3 == 0);
                if !blocked {
                    return Some(j);
                }
            }
        }
        None
    }

    /// Re-enter inline parsing for bracketed text, flattening to plain
    /// text once the nesting limit is reached instead of recursing further.
    fn parse_nested(&self, text: &str) -> Vec<Node> {
        if self.depth.get() >= MAX_NESTING_DEPTH {
            return vec![Node::Text(text.to_string())];
        }
        self.depth.set(self.depth.get() + 1);
        let nodes = self.parse(text);
        self.depth.set(self.depth.get() - 1);
        nodes
    }

    fn try_parse_code_span(&self, chars: &[char], start: usize) -> Option<(Node, usize)> {
        let mut i = start;
        while i < chars.len() && chars[i] == '`' {
            i += 1;
        }
        let run = i - start;

        // Find a closing run of exactly the same length
        let content_start = i;
        while i < chars.len() {
            if chars[i] == '`' {
                let close_start = i;
                while i < chars.len() && chars[i] == '`' {
                    i += 1;
                }
                if i - close_start == run {
                    let mut content: String = chars[content_start..close_start]
                        .iter()
                        .map(|&c| if c == '\n' { ' ' } else { c })
                        .collect();
                    if content.starts_with(' ')
                        && content.ends_with(' ')
                        && content.chars().any(|c| c != ' ')
                    {
                        content = content[1..content.len() - 1].to_string();
                    }
                    return Some((Node::Code(content), i));
                }
            } else {
                i += 1;
            }
        }
        None
    }

    fn try_parse_angle_autolink(&self, chars: &[char], start: usize) -> Option<(Node, usize)> {
        let mut i = start + 1;
        while i < chars.len() && chars[i] != '>' {
            if chars[i].is_whitespace() || chars[i] == '<' {
                return None;
            }
            i += 1;
        }
        if i >= chars.len() {
            return None;
        }

        let target: String = chars[start + 1..i].iter().collect();
        if is_absolute_uri(&target) {
            Some((
                Node::Link {
                    destination: target.clone(),
                    title: None,
                    children: vec![Node::Text(target)],
                },
                i + 1,
            ))
        } else if is_email_address(&target) {
            Some((
                Node::Link {
                    destination: format!("mailto:{}", target),
                    title: None,
                    children: vec![Node::Text(target)],
                },
                i + 1,
            ))
        } else {
            None
        }
    }

    fn try_parse_image(&self, chars: &[char], start: usize) -> Option<(Node, usize)> {
        let (node, end) = self.try_parse_bracket(chars, start + 1)?;
        match node {
            Node::Link {
                destination,
                title,
                children,
            } => Some((
                Node::Image {
                    destination,
                    title,
                    alt_text: children,
                },
                end,
            )),
            _ => None,
        }
    }

    /// Dispatch for `[`: footnote reference, inline link, full or collapsed
    /// reference link, then shortcut reference, in that order.
    fn try_parse_bracket(&self, chars: &[char], start: usize) -> Option<(Node, usize)> {
        if self.options.contains(Options::FOOTNOTES)
            && chars.get(start + 1) == Some(&'^')
            && let Some((label, end)) = scan_footnote_label(chars, start + 2)
        {
            return Some((Node::FootnoteReference(label), end));
        }

        let close = find_closing_bracket(chars, start + 1)?;
        let text: String = chars[start + 1..close].iter().collect();
        let after = close + 1;

        if chars.get(after) == Some(&'(')
            && let Some((destination, title, end)) = self.parse_inline_link_suffix(chars, after)
        {
            return Some((
                Node::Link {
                    destination,
                    title,
                    children: self.parse_nested(&text),
                },
                end,
            ));
        }

        if chars.get(after) == Some(&'[') {
            let label_close = find_closing_bracket(chars, after + 1)?;
            let label: String = chars[after + 1..label_close].iter().collect();
            let effective = if label.trim().is_empty() { &text } else { &label };
            let reference = self.refmap.lookup(effective)?;
            return Some((self.reference_node(reference, &text), label_close + 1));
        }

        let reference = self.refmap.lookup(&text)?;
        Some((self.reference_node(reference, &text), after))
    }

    fn reference_node(&self, reference: &Reference, text: &str) -> Node {
        if reference.is_attributes_reference {
            Node::InlineAttributes {
                attributes: reference.attributes.clone().unwrap_or_default(),
                children: self.parse_nested(text),
            }
        } else {
            Node::Link {
                destination: reference.url.clone(),
                title: reference.title.clone(),
                children: self.parse_nested(text),
            }
        }
    }

    /// Parse `(dest "title")` after link text. `open` points at the paren.
    fn parse_inline_link_suffix(
        &self,
        chars: &[char],
        open: usize,
    ) -> Option<(String, Option<String>, usize)> {
        let mut i = open + 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        let destination = if chars.get(i) == Some(&'<') {
            let dest_start = i;
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
            chars[dest_start..i].iter().collect::<String>()
        } else {
            let dest_start = i;
            let mut paren_depth: usize = 0;
            while i < chars.len() {
                match chars[i] {
                    c if c.is_whitespace() => break,
                    '\\' => i += 1,
                    '(' => paren_depth += 1,
                    ')' => {
                        if paren_depth == 0 {
                            break;
                        }
                        paren_depth -= 1;
                    }
                    _ => {}
                }
                i += 1;
            }
            chars[dest_start..i].iter().collect::<String>()
        };

        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        let title = if let Some(&open_quote) = chars.get(i)
            && matches!(open_quote, '"' | '\'' | '(')
        {
            let close_quote = if open_quote == '(' { ')' } else { open_quote };
            let title_start = i;
            i += 1;
            while i < chars.len() && chars[i] != close_quote {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= chars.len() {
                return None;
            }
            i += 1;
            let raw: String = chars[title_start..i].iter().collect();
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            Some(Chunk::from(raw).clean_title().into_string())
        } else {
            None
        };

        if chars.get(i) != Some(&')') {
            return None;
        }
        let destination = Chunk::from(destination).clean_url().into_string();
        Some((destination, title, i + 1))
    }

    fn try_parse_html_inline(&self, chars: &[char], start: usize) -> Option<(Node, usize)> {
        let end = scan_html_inline(chars, start)?;
        let raw: String = chars[start..end].iter().collect();
        Some((Node::HtmlInline(raw), end))
    }
}

fn flush_text(items: &mut Vec<InlineItem>, buffer: &mut String) {
    if !buffer.is_empty() {
        items.push(InlineItem::Node(Node::Text(std::mem::take(buffer))));
    }
}

/// Convert the resolved item stream to nodes: leftover delimiters become
/// literal text and adjacent text nodes merge.
fn finalize(items: Vec<InlineItem>) -> Vec<Node> {
    let mut nodes: Vec<Node> = Vec::with_capacity(items.len());
    for item in items {
        let node = match item {
            InlineItem::Node(node) => node,
            InlineItem::Delim(d) => {
                if d.count == 0 {
                    continue;
                }
                Node::Text(std::iter::repeat(d.ch).take(d.count).collect())
            }
        };
        if let Node::Text(text) = &node
            && let Some(Node::Text(previous)) = nodes.last_mut()
        {
            previous.push_str(text);
        } else {
            nodes.push(node);
        }
    }
    nodes
}

/// Left/right flanking per the emphasis rules, with the extra intraword
/// restriction for `_`.
fn compute_flanking(chars: &[char], start: usize, len: usize, ch: char) -> (bool, bool) {
    let before = if start == 0 { ' ' } else { chars[start - 1] };
    let after = chars.get(start + len).copied().unwrap_or(' ');

    let before_ws = before.is_whitespace();
    let after_ws = after.is_whitespace();
    let before_punct = is_unicode_punctuation(before);
    let after_punct = is_unicode_punctuation(after);

    let left = !after_ws && (!after_punct || before_ws || before_punct);
    let right = !before_ws && (!before_punct || after_ws || after_punct);

    if ch == '_' {
        (left && (!right || before_punct), right && (!left || after_punct))
    } else {
        (left, right)
    }
}

/// Collapse an inline subtree to its plain text, for image alt attributes.
pub(crate) fn flatten_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) | Node::Code(text) => out.push_str(text),
            Node::SoftBreak | Node::HardBreak => out.push(' '),
            _ => out.push_str(&flatten_text(node.children())),
        }
    }
    out
}

/// Find the `]` matching an already-consumed `[`, honoring escapes and
/// nested bracket pairs.
fn find_closing_bracket(chars: &[char], from: usize) -> Option<usize> {
    let mut depth = 0;
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => depth += 1,
            ']' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Footnote labels run to `]` and may not contain brackets or line breaks.
fn scan_footnote_label(chars: &[char], from: usize) -> Option<(String, usize)> {
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            ']' => {
                if i == from {
                    return None;
                }
                let label: String = chars[from..i].iter().collect();
                return Some((label, i + 1));
            }
            '[' | '\n' => return None,
            _ => i += 1,
        }
    }
    None
}

fn is_absolute_uri(target: &str) -> bool {
    let Some(colon) = target.find(':') else {
        return false;
    };
    let scheme = &target[..colon];
    if scheme.len() < 2 || scheme.len() > 32 {
        return false;
    }
    let mut scheme_chars = scheme.chars();
    let Some(first) = scheme_chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    if !scheme_chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '.' || c == '-') {
        return false;
    }
    !target[colon + 1..]
        .chars()
        .any(|c| c.is_whitespace() || c == '<' || c == '>')
}

fn is_email_address(target: &str) -> bool {
    let Some(at) = target.find('@') else {
        return false;
    };
    let (local, domain) = (&target[..at], &target[at + 1..]);
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let local_ok = local.chars().all(|c| {
        c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c)
    });
    let domain_ok = !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && domain
            .split('.')
            .all(|seg| {
                !seg.is_empty()
                    && !seg.starts_with('-')
                    && !seg.ends_with('-')
                    && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });
    local_ok && domain_ok
}

/// Scan one raw HTML inline construct starting at `<`. Returns the index
/// just past the closing delimiter.
fn scan_html_inline(chars: &[char], start: usize) -> Option<usize> {
    if starts_with_str(chars, start, "<!--") {
        return find_str(chars, start + 4, "-->").map(|i| i + 3);
    }
    if starts_with_str(chars, start, "<![CDATA[") {
        return find_str(chars, start + 9, "]]>").map(|i| i + 3);
    }
    if starts_with_str(chars, start, "<?") {
        return find_str(chars, start + 2, "?>").map(|i| i + 2);
    }
    if starts_with_str(chars, start, "<!") {
        if !chars.get(start + 2)?.is_ascii_alphabetic() {
            return None;
        }
        let mut i = start + 2;
        while i < chars.len() && chars[i] != '>' {
            i += 1;
        }
        return (i < chars.len()).then_some(i + 1);
    }
    if starts_with_str(chars, start, "</") {
        return scan_html_close_tag(chars, start);
    }
    scan_html_open_tag(chars, start)
}

pub(crate) fn scan_html_close_tag(chars: &[char], start: usize) -> Option<usize> {
    if !starts_with_str(chars, start, "</") {
        return None;
    }
    let i = scan_tag_name(chars, start + 2)?;
    let after_ws = skip_whitespace(chars, i);
    (chars.get(after_ws) == Some(&'>')).then_some(after_ws + 1)
}

fn scan_tag_name(chars: &[char], start: usize) -> Option<usize> {
    if !chars.get(start)?.is_ascii_alphabetic() {
        return None;
    }
    let mut i = start + 1;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '-') {
        i += 1;
    }
    Some(i)
}

pub(crate) fn scan_html_open_tag(chars: &[char], start: usize) -> Option<usize> {
    let mut i = scan_tag_name(chars, start + 1)?;
    loop {
        let after_ws = skip_whitespace(chars, i);
        match chars.get(after_ws) {
            Some('>') => return Some(after_ws + 1),
            Some('/') => {
                return (chars.get(after_ws + 1) == Some(&'>')).then_some(after_ws + 2);
            }
            Some(_) if after_ws > i => {
                i = scan_html_attribute(chars, after_ws)?;
            }
            _ => return None,
        }
    }
}

fn scan_html_attribute(chars: &[char], start: usize) -> Option<usize> {
    let first = *chars.get(start)?;
    if !first.is_ascii_alphabetic() && first != '_' && first != ':' {
        return None;
    }
    let mut i = start + 1;
    while i < chars.len()
        && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | ':' | '.' | '-'))
    {
        i += 1;
    }

    let after_ws = skip_whitespace(chars, i);
    if chars.get(after_ws) != Some(&'=') {
        return Some(i);
    }
    let mut i = skip_whitespace(chars, after_ws + 1);
    match chars.get(i) {
        Some(&quote @ ('"' | '\'')) => {
            i += 1;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            (i < chars.len()).then(|| i + 1)
        }
        Some(_) => {
            let value_start = i;
            while i < chars.len()
                && !chars[i].is_whitespace()
                && !matches!(chars[i], '"' | '\'' | '=' | '<' | '>' | '`')
            {
                i += 1;
            }
            (i > value_start).then_some(i)
        }
        None => None,
    }
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn starts_with_str(chars: &[char], pos: usize, prefix: &str) -> bool {
    prefix
        .chars()
        .enumerate()
        .all(|(k, c)| chars.get(pos + k) == Some(&c))
}

fn find_str(chars: &[char], from: usize, needle: &str) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        if starts_with_str(chars, i, needle) {
            return Some(i);
        }
        i += 1;
    }
    None
}
