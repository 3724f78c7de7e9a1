/// Tag filtering: a postprocess pass that neuters a fixed set of raw HTML
/// tags by rewriting their opening `<` to `&lt;` inside HTML literals.
/// The tag body is otherwise left alone, so the output stays valid HTML
/// that simply renders the tag as text.
use crate::ast::Node;
use crate::extension::SyntaxExtension;

const FILTERED_TAGS: [&str; 9] = [
    "title",
    "textarea",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "script",
    "plaintext",
];

pub struct TagfilterExtension;

impl SyntaxExtension for TagfilterExtension {
    fn name(&self) -> &'static str {
        "tagfilter"
    }

    fn postprocess(&self, document: &mut Node) {
        filter_node(document);
    }
}

fn filter_node(node: &mut Node) {
    match node {
        Node::HtmlBlock(literal) | Node::HtmlInline(literal) => {
            *literal = filter_tags(literal);
        }
        _ => {}
    }
    for child in node.children_mut() {
        filter_node(child);
    }
}

/// Replace `<` with `&lt;` wherever it opens one of the filtered tags,
/// matching case-insensitively and allowing a closing slash.
fn filter_tags(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    let mut out = String::with_capacity(html.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '<' && opens_filtered_tag(&chars, i + 1) {
            out.push_str("&lt;");
        } else {
            out.push(chars[i]);
        }
        i += 1;
    }
    out
}

fn opens_filtered_tag(chars: &[char], mut pos: usize) -> bool {
    if chars.get(pos) == Some(&'/') {
        pos += 1;
    }
    for tag in FILTERED_TAGS {
        if matches_tag_name(chars, pos, tag) {
            return true;
        }
    }
    false
}

fn matches_tag_name(chars: &[char], pos: usize, tag: &str) -> bool {
    let mut end = pos;
    for expected in tag.chars() {
        match chars.get(end) {
            Some(c) if c.to_ascii_lowercase() == expected => end += 1,
            _ => return false,
        }
    }
    // The name must terminate; otherwise `<styled>` would match `style`
    matches!(
        chars.get(end),
        None | Some(' ' | '\t' | '\n' | '>' | '/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_script_tags() {
        assert_eq!(
            filter_tags("<script>alert(1)</script>"),
            "&lt;script>alert(1)&lt;/script>"
        );
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        assert_eq!(filter_tags("<TITLE>x</TiTlE>"), "&lt;TITLE>x&lt;/TiTlE>");
    }

    #[test]
    fn test_leaves_other_tags_alone() {
        assert_eq!(filter_tags("<div><strong>ok</strong></div>"), "<div><strong>ok</strong></div>");
        // A longer name sharing a filtered prefix is not filtered
        assert_eq!(filter_tags("<styled-component>"), "<styled-component>");
    }

    #[test]
    fn test_postprocess_rewrites_html_nodes() {
        let ext = TagfilterExtension;
        let mut doc = Node::Document(vec![
            Node::HtmlBlock("<iframe src=\"x\"></iframe>".to_string()),
            Node::Paragraph(vec![Node::HtmlInline("<noembed>".to_string())]),
        ]);
        ext.postprocess(&mut doc);

        let Node::Document(blocks) = &doc else {
            panic!("expected document");
        };
        assert_eq!(
            blocks[0],
            Node::HtmlBlock("&lt;iframe src=\"x\">&lt;/iframe>".to_string())
        );
        assert_eq!(
            blocks[1],
            Node::Paragraph(vec![Node::HtmlInline("&lt;noembed>".to_string())])
        );
    }
}
