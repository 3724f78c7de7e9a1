/// Shared text utilities: backslash escapes, HTML entities, percent
/// encoding, punctuation classes, and reference-label normalization.
/// These sit outside the parsers so `chunk` and `refmap` can use the exact
/// same transforms as inline scanning.

/// Check if a character is ASCII punctuation (can be backslash-escaped)
pub fn is_ascii_punctuation(ch: char) -> bool {
    matches!(
        ch,
        '!' | '"'
            | '#'
            | '$'
            | '%'
            | '&'
            | '\''
            | '('
            | ')'
            | '*'
            | '+'
            | ','
            | '-'
            | '.'
            | '/'
            | ':'
            | ';'
            | '<'
            | '='
            | '>'
            | '?'
            | '@'
            | '['
            | '\\'
            | ']'
            | '^'
            | '_'
            | '`'
            | '{'
            | '|'
            | '}'
            | '~'
    )
}

/// Unicode punctuation/symbol check for the emphasis flanking rules.
/// ASCII fast path, then the common P and S category ranges; a full Unicode
/// database lookup is overkill for the flanking decision.
pub fn is_unicode_punctuation(c: char) -> bool {
    if c.is_ascii_punctuation() {
        return true;
    }

    let code = c as u32;
    matches!(code,
        // Latin-1 Supplement punctuation and symbols
        0x00A1..=0x00BF | 0x00D7 | 0x00F7 |
        // Currency symbols
        0x20A0..=0x20CF |
        // General Punctuation, Supplemental Punctuation
        0x2000..=0x206F | 0x2E00..=0x2E7F |
        // Arrows, Mathematical Operators, Miscellaneous Technical
        0x2190..=0x21FF | 0x2200..=0x22FF | 0x2300..=0x23FF |
        // Box Drawing through Dingbats
        0x2500..=0x25FF | 0x2600..=0x26FF | 0x2700..=0x27BF |
        // Misc Mathematical Symbols-A/B, Supplemental Arrows-A/B
        0x27C0..=0x27EF | 0x2980..=0x29FF | 0x27F0..=0x27FF | 0x2900..=0x297F |
        // Miscellaneous Symbols and Arrows
        0x2B00..=0x2BFF
    )
}

/// Resolve backslash escapes of ASCII punctuation. Any other backslash is
/// literal (malformed escapes pass through, never fail).
pub fn unescape(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && is_ascii_punctuation(chars[i + 1]) {
            result.push(chars[i + 1]);
            i += 2;
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }

    result
}

/// Decode HTML entities and numeric character references in a string.
pub fn decode_entities(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '&'
            && let Some((decoded, new_i)) = scan_entity(&chars, i)
        {
            result.push_str(&decoded);
            i = new_i;
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }

    result
}

/// Scan an HTML entity or numeric character reference starting at `start`
/// (which must point at '&'). Returns (decoded text, position after).
pub fn scan_entity(chars: &[char], start: usize) -> Option<(String, usize)> {
    if start >= chars.len() || chars[start] != '&' {
        return None;
    }

    let mut i = start + 1;

    if i < chars.len() && chars[i] == '#' {
        i += 1;

        // Hexadecimal reference: &#x... (1-6 hex digits)
        if i < chars.len() && (chars[i] == 'X' || chars[i] == 'x') {
            i += 1;
            let hex_start = i;
            while i < chars.len() && i - hex_start < 6 && chars[i].is_ascii_hexdigit() {
                i += 1;
            }
            if i > hex_start && i < chars.len() && chars[i] == ';' {
                let hex_str: String = chars[hex_start..i].iter().collect();
                if let Ok(code_point) = u32::from_str_radix(&hex_str, 16) {
                    return Some((replacement_checked(code_point).to_string(), i + 1));
                }
            }
        }
        // Decimal reference: 1-7 digits
        else {
            let dec_start = i;
            while i < chars.len() && i - dec_start < 7 && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i > dec_start && i < chars.len() && chars[i] == ';' {
                let dec_str: String = chars[dec_start..i].iter().collect();
                if let Ok(code_point) = dec_str.parse::<u32>() {
                    return Some((replacement_checked(code_point).to_string(), i + 1));
                }
            }
        }
    } else {
        // Named entity
        let name_start = i;
        while i < chars.len() && chars[i].is_ascii_alphanumeric() {
            i += 1;
        }
        if i > name_start && i < chars.len() && chars[i] == ';' {
            let name: String = chars[name_start..i].iter().collect();
            if let Some(decoded) = named_entity(&name) {
                return Some((decoded.to_string(), i + 1));
            }
        }
    }

    None
}

/// Invalid and null code points decode to U+FFFD
fn replacement_checked(code_point: u32) -> char {
    if code_point == 0 || code_point > 0x10FFFF {
        '\u{FFFD}'
    } else {
        char::from_u32(code_point).unwrap_or('\u{FFFD}')
    }
}

/// HTML5 named entities. A working subset; unknown names stay literal.
fn named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "nbsp" => "\u{00A0}",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "AElig" => "\u{00C6}",
        "frac34" => "\u{00BE}",
        "ouml" => "\u{00F6}",
        "auml" => "\u{00E4}",
        "uuml" => "\u{00FC}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "hellip" => "\u{2026}",
        "trade" => "\u{2122}",
        _ => return None,
    };
    Some(decoded)
}

/// Percent-encode a destination for use in href attributes. ASCII
/// alphanumerics and URL-safe punctuation pass through; everything else is
/// encoded as UTF-8 bytes.
pub fn percent_encode(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric()
            || matches!(
                ch,
                '-' | '_'
                    | '.'
                    | '~'
                    | '!'
                    | '*'
                    | '\''
                    | '('
                    | ')'
                    | ';'
                    | ':'
                    | '@'
                    | '&'
                    | '='
                    | '+'
                    | '$'
                    | ','
                    | '/'
                    | '?'
                    | '#'
                    | '['
                    | ']'
                    | '%'
            )
        {
            result.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).as_bytes() {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }

    result
}

/// Normalize a reference label for map insertion and lookup: case fold,
/// then collapse runs of internal whitespace to single spaces. Insertion
/// and lookup must agree exactly, so both go through this one function.
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .flat_map(|c| c.to_lowercase())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}
