/// Zero-copy text views over the input buffer.
use std::borrow::Cow;

use crate::strings::{decode_entities, unescape};

/// A borrowed or owned span of source text. Construction from a `&str`
/// never copies; the cleaning operations allocate a fresh buffer only when
/// the cleaned content differs from the source bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    text: Cow<'a, str>,
}

impl<'a> Chunk<'a> {
    /// Borrow a chunk from source text. Zero-copy.
    pub fn new(text: &'a str) -> Chunk<'a> {
        Chunk {
            text: Cow::Borrowed(text),
        }
    }

    /// A chunk that owns its buffer, for extension-produced text.
    pub fn owned(text: String) -> Chunk<'static> {
        Chunk {
            text: Cow::Owned(text),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True while the chunk still borrows from the source buffer.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.text, Cow::Borrowed(_))
    }

    pub fn into_string(self) -> String {
        self.text.into_owned()
    }

    /// Clean a link destination: trim surrounding whitespace, strip one
    /// `<...>` wrapper, resolve backslash escapes and entities. Malformed
    /// escapes pass through literally.
    pub fn clean_url(self) -> Chunk<'a> {
        self.clean_with(strip_angle_brackets, true)
    }

    /// Clean a link title: trim whitespace, strip one pair of surrounding
    /// quotes or parens, resolve escapes and entities.
    pub fn clean_title(self) -> Chunk<'a> {
        self.clean_with(strip_title_delimiters, true)
    }

    /// Clean an attributes blob: trim whitespace and strip one `{...}`
    /// wrapper. Escapes inside attribute text stay literal.
    pub fn clean_attributes(self) -> Chunk<'a> {
        self.clean_with(strip_braces, false)
    }

    fn clean_with(self, strip: fn(&str) -> &str, resolve_escapes: bool) -> Chunk<'a> {
        let rewrite = |s: &str| -> Option<String> {
            if resolve_escapes && (s.contains('\\') || s.contains('&')) {
                Some(decode_entities(&unescape(s)))
            } else {
                None
            }
        };

        match self.text {
            Cow::Borrowed(source) => {
                let stripped = strip(source.trim());
                match rewrite(stripped) {
                    Some(cleaned) if cleaned != stripped => Chunk {
                        text: Cow::Owned(cleaned),
                    },
                    // Content unchanged: keep borrowing the source buffer
                    _ => Chunk {
                        text: Cow::Borrowed(stripped),
                    },
                }
            }
            Cow::Owned(source) => {
                let stripped = strip(source.trim());
                let cleaned = match rewrite(stripped) {
                    Some(cleaned) => cleaned,
                    None => stripped.to_string(),
                };
                Chunk {
                    text: Cow::Owned(cleaned),
                }
            }
        }
    }
}

impl<'a> From<&'a str> for Chunk<'a> {
    fn from(text: &'a str) -> Chunk<'a> {
        Chunk::new(text)
    }
}

impl From<String> for Chunk<'static> {
    fn from(text: String) -> Chunk<'static> {
        Chunk::owned(text)
    }
}

fn strip_angle_brackets(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('<') && s.ends_with('>') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn strip_title_delimiters(s: &str) -> &str {
    if s.len() >= 2 {
        let open = s.chars().next().unwrap_or(' ');
        let close = match open {
            '"' => '"',
            '\'' => '\'',
            '(' => ')',
            _ => return s,
        };
        if s.ends_with(close) {
            return &s[open.len_utf8()..s.len() - close.len_utf8()];
        }
    }
    s
}

fn strip_braces(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('{') && s.ends_with('}') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
