/// Bare-URL autolinks in plain text: `www.` prefixed domains and absolute
/// `http://` / `https://` URLs are turned into links without angle
/// brackets. Trailing punctuation and unbalanced closing parens are left
/// outside the link.
use crate::ast::Node;
use crate::extension::{InlineMatch, SyntaxExtension};
use crate::inlines::InlineParser;

pub struct AutolinkExtension;

impl SyntaxExtension for AutolinkExtension {
    fn name(&self) -> &'static str {
        "autolink"
    }

    fn special_characters(&self) -> Vec<char> {
        vec!['h', 'w']
    }

    fn try_match_inline(
        &self,
        chars: &[char],
        pos: usize,
        _inlines: &InlineParser,
    ) -> Option<InlineMatch> {
        if !at_word_boundary(chars, pos) {
            return None;
        }

        let (prefix_len, implied_scheme) = if starts_with(chars, pos, "www.") {
            (4, true)
        } else if starts_with(chars, pos, "https://") {
            (8, false)
        } else if starts_with(chars, pos, "http://") {
            (7, false)
        } else {
            return None;
        };

        let mut end = pos + prefix_len;
        while end < chars.len() && !chars[end].is_whitespace() && chars[end] != '<' {
            end += 1;
        }
        let end = trim_trailing_punctuation(chars, pos, end);

        let rest = &chars[pos + prefix_len..end];
        if !is_valid_domain(rest) {
            return None;
        }

        let text: String = chars[pos..end].iter().collect();
        let destination = if implied_scheme {
            format!("http://{}", text)
        } else {
            text.clone()
        };
        Some(InlineMatch {
            node: Node::Link {
                destination,
                title: None,
                children: vec![Node::Text(text)],
            },
            end,
        })
    }
}

fn starts_with(chars: &[char], pos: usize, prefix: &str) -> bool {
    prefix
        .chars()
        .enumerate()
        .all(|(i, c)| chars.get(pos + i) == Some(&c))
}

/// A link may only start at the beginning of input or after whitespace or
/// an opening delimiter, never in the middle of a word.
fn at_word_boundary(chars: &[char], pos: usize) -> bool {
    if pos == 0 {
        return true;
    }
    let prev = chars[pos - 1];
    prev.is_whitespace() || matches!(prev, '*' | '_' | '~' | '(' | '[' | '\'' | '"')
}

/// The domain runs to the first `/`, `?`, or `#` and must contain a dot
/// with characters on both sides.
fn is_valid_domain(rest: &[char]) -> bool {
    let domain_end = rest
        .iter()
        .position(|&c| c == '/' || c == '?' || c == '#')
        .unwrap_or(rest.len());
    let domain = &rest[..domain_end];
    if domain.is_empty() {
        return false;
    }
    let valid_chars = domain
        .iter()
        .all(|&c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_');
    let has_inner_dot = domain
        .iter()
        .enumerate()
        .any(|(i, &c)| c == '.' && i > 0 && i + 1 < domain.len());
    valid_chars && has_inner_dot
}

/// Trailing sentence punctuation stays outside the link, as does every
/// `)` beyond the number of `(` inside it.
fn trim_trailing_punctuation(chars: &[char], start: usize, mut end: usize) -> usize {
    loop {
        if end <= start {
            return end;
        }
        match chars[end - 1] {
            '?' | '!' | '.' | ',' | ':' | '*' | '_' | '~' | ';' | '\'' | '"' => end -= 1,
            ')' => {
                let inner = &chars[start..end];
                let opens = inner.iter().filter(|&&c| c == '(').count();
                let closes = inner.iter().filter(|&&c| c == ')').count();
                if closes > opens {
                    end -= 1;
                } else {
                    return end;
                }
            }
            _ => return end,
        }
    }
}
