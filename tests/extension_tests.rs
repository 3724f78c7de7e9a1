use std::sync::Arc;

use gfmark::{
    BlockMatch, ExtensionRegistry, HtmlRenderer, InlineMatch, Node, Options, Parser,
    RegistryError, SyntaxExtension,
};
use gfmark::inlines::InlineParser;
use pretty_assertions::assert_eq;

/// Dollar-delimited inline math, carried as a custom node.
struct MathExtension;

impl SyntaxExtension for MathExtension {
    fn name(&self) -> &'static str {
        "math"
    }

    fn node_types(&self) -> Vec<&'static str> {
        vec!["math"]
    }

    fn special_characters(&self) -> Vec<char> {
        vec!['$']
    }

    fn try_match_inline(
        &self,
        chars: &[char],
        pos: usize,
        _inlines: &InlineParser,
    ) -> Option<InlineMatch> {
        if chars.get(pos) != Some(&'$') {
            return None;
        }
        let close = chars[pos + 1..].iter().position(|&c| c == '$')?;
        if close == 0 {
            return None;
        }
        let literal: String = chars[pos + 1..pos + 1 + close].iter().collect();
        Some(InlineMatch {
            node: Node::CustomInline {
                name: "math".to_string(),
                literal,
                attributes: vec![("display".to_string(), "inline".to_string())],
            },
            end: pos + close + 2,
        })
    }
}

/// `:::`-fenced callout blocks, carried as a custom node with the body
/// parsed as inline content.
struct CalloutExtension;

impl SyntaxExtension for CalloutExtension {
    fn name(&self) -> &'static str {
        "callout"
    }

    fn node_types(&self) -> Vec<&'static str> {
        vec!["callout"]
    }

    fn try_open_block(&self, lines: &[&str], parser: &Parser) -> Option<BlockMatch> {
        let kind = lines.first()?.strip_prefix(":::")?.trim();
        if kind.is_empty() {
            return None;
        }
        let mut body = Vec::new();
        let mut consumed = 1;
        for line in &lines[1..] {
            consumed += 1;
            if line.trim() == ":::" {
                break;
            }
            body.push(*line);
        }
        Some(BlockMatch {
            node: Node::CustomBlock {
                name: "callout".to_string(),
                literal: String::new(),
                attributes: vec![("kind".to_string(), kind.to_string())],
                children: vec![Node::Paragraph(parser.parse_inlines(&body.join("\n")))],
            },
            lines_consumed: consumed,
        })
    }
}

fn registry_with_both() -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();
    registry.register(Arc::new(MathExtension)).unwrap();
    registry.register(Arc::new(CalloutExtension)).unwrap();
    registry
}

#[test]
fn third_party_inline_extension_end_to_end() {
    let registry = registry_with_both();
    let mut parser = Parser::with_registry(Options::NONE, &registry, &["math"]);
    let doc = parser.parse("energy is $E = mc^2$ here");
    assert_eq!(
        doc,
        Node::Document(vec![Node::Paragraph(vec![
            Node::Text("energy is ".to_string()),
            Node::CustomInline {
                name: "math".to_string(),
                literal: "E = mc^2".to_string(),
                attributes: vec![("display".to_string(), "inline".to_string())],
            },
            Node::Text(" here".to_string()),
        ])])
    );

    let html = HtmlRenderer::new(Options::NONE).render(&doc);
    assert_eq!(
        html,
        "<p>energy is <span class=\"math\">E = mc^2</span> here</p>\n"
    );
}

#[test]
fn unmatched_extension_syntax_stays_literal() {
    let registry = registry_with_both();
    let mut parser = Parser::with_registry(Options::NONE, &registry, &["math"]);
    let doc = parser.parse("price is $5");
    assert_eq!(
        doc,
        Node::Document(vec![Node::Paragraph(vec![Node::Text(
            "price is $5".to_string()
        )])])
    );
}

#[test]
fn third_party_block_extension_end_to_end() {
    let registry = registry_with_both();
    let mut parser = Parser::with_registry(Options::NONE, &registry, &["callout"]);
    let doc = parser.parse("::: warning\nmind the *gap*\n:::\n\nafter");
    assert_eq!(
        doc,
        Node::Document(vec![
            Node::CustomBlock {
                name: "callout".to_string(),
                literal: String::new(),
                attributes: vec![("kind".to_string(), "warning".to_string())],
                children: vec![Node::Paragraph(vec![
                    Node::Text("mind the ".to_string()),
                    Node::Emphasis(vec![Node::Text("gap".to_string())]),
                ])],
            },
            Node::Paragraph(vec![Node::Text("after".to_string())]),
        ])
    );
}

#[test]
fn block_extension_can_interrupt_a_paragraph() {
    let registry = registry_with_both();
    let mut parser = Parser::with_registry(Options::NONE, &registry, &["callout"]);
    let doc = parser.parse("text\n::: note\nbody\n:::");
    let Node::Document(blocks) = doc else {
        panic!("expected document");
    };
    assert_eq!(blocks.len(), 2);
    assert!(matches!(blocks[1], Node::CustomBlock { .. }));
}

#[test]
fn unattached_extension_syntax_is_inert() {
    let registry = registry_with_both();
    // Registered but not attached by name
    let mut parser = Parser::with_registry(Options::NONE, &registry, &[]);
    let doc = parser.parse("$x$");
    assert_eq!(
        doc,
        Node::Document(vec![Node::Paragraph(vec![Node::Text("$x$".to_string())])])
    );
}

#[test]
fn unknown_names_are_skipped_by_with_registry() {
    let registry = registry_with_both();
    let mut parser = Parser::with_registry(Options::NONE, &registry, &["math", "nope"]);
    let doc = parser.parse("$x$");
    let Node::Document(blocks) = doc else {
        panic!("expected document");
    };
    let Node::Paragraph(inlines) = &blocks[0] else {
        panic!("expected paragraph");
    };
    assert!(matches!(inlines[0], Node::CustomInline { .. }));
}

#[test]
fn duplicate_name_registration_is_rejected() {
    let mut registry = registry_with_both();
    let err = registry.register(Arc::new(MathExtension)).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateExtension(name) if name == "math"));
    // The earlier registration survives the failed one
    assert!(registry.find("math").is_some());
    assert_eq!(registry.len(), 2);
}

#[test]
fn special_character_collision_is_rejected() {
    struct OtherDollar;
    impl SyntaxExtension for OtherDollar {
        fn name(&self) -> &'static str {
            "currency"
        }
        fn node_types(&self) -> Vec<&'static str> {
            vec!["currency"]
        }
        fn special_characters(&self) -> Vec<char> {
            vec!['$']
        }
    }

    let mut registry = registry_with_both();
    let err = registry.register(Arc::new(OtherDollar)).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::SpecialCharConflict { ch: '$', owner } if owner == "math"
    ));
    assert!(registry.find("currency").is_none());
}

#[test]
fn node_type_tags_are_assigned_per_registration() {
    let registry = registry_with_both();
    let math_tag = registry.node_type_tag("math").unwrap();
    let callout_tag = registry.node_type_tag("callout").unwrap();
    assert_ne!(math_tag, callout_tag);
    assert!(registry.node_type_tag("missing").is_none());
}

#[test]
fn caller_registry_combines_with_option_extensions() {
    // Built-in bits attach from the core registry even when additional
    // extensions come from a caller-owned one
    let registry = registry_with_both();
    let mut parser = Parser::with_registry(Options::NONE, &registry, &["math"]);
    parser.attach_extension(gfmark::core_registry().find("strikethrough").unwrap());
    let doc = parser.parse("~~$a$~~");
    assert_eq!(
        doc,
        Node::Document(vec![Node::Paragraph(vec![Node::Strikethrough(vec![
            Node::CustomInline {
                name: "math".to_string(),
                literal: "a".to_string(),
                attributes: vec![("display".to_string(), "inline".to_string())],
            },
        ])])])
    );
}
