/// Task-list items: list items whose paragraph text begins with `[ ]`,
/// `[x]`, or `[X]` followed by a space. Implemented as a postprocess pass
/// over the finished tree, after inline parsing has run, so markers inside
/// code spans or links are never mistaken for checkboxes.
use crate::ast::Node;
use crate::extension::SyntaxExtension;

pub struct TasklistExtension;

impl SyntaxExtension for TasklistExtension {
    fn name(&self) -> &'static str {
        "tasklist"
    }

    fn node_types(&self) -> Vec<&'static str> {
        vec!["tasklist"]
    }

    fn postprocess(&self, document: &mut Node) {
        convert_items(document);
    }
}

fn convert_items(node: &mut Node) {
    if let Node::UnorderedList { children, .. } | Node::OrderedList { children, .. } = node {
        for item in children.iter_mut() {
            if let Node::ListItem(item_children) = item
                && let Some(checked) = strip_marker(item_children)
            {
                let moved = std::mem::take(item_children);
                *item = Node::TaskItem {
                    checked,
                    children: moved,
                };
            }
        }
    }
    for child in node.children_mut() {
        convert_items(child);
    }
}

/// If the item opens with a checkbox marker, remove the marker from the
/// leading text and report its state.
fn strip_marker(children: &mut [Node]) -> Option<bool> {
    let first_block = children.first_mut()?;
    let Node::Paragraph(inlines) = first_block else {
        return None;
    };
    let Some(Node::Text(text)) = inlines.first_mut() else {
        return None;
    };

    let checked = if let Some(rest) = text.strip_prefix("[ ] ") {
        *text = rest.to_string();
        false
    } else if let Some(rest) = text.strip_prefix("[x] ").or_else(|| text.strip_prefix("[X] ")) {
        *text = rest.to_string();
        true
    } else {
        return None;
    };

    if text.is_empty() {
        inlines.remove(0);
    }
    Some(checked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str) -> Node {
        Node::ListItem(vec![Node::Paragraph(vec![Node::Text(text.to_string())])])
    }

    #[test]
    fn test_converts_marked_items() {
        let ext = TasklistExtension;
        let mut doc = Node::Document(vec![Node::UnorderedList {
            tight: true,
            children: vec![item("[ ] milk"), item("[x] bread"), item("plain")],
        }]);
        ext.postprocess(&mut doc);

        let Node::Document(blocks) = &doc else {
            panic!("expected document");
        };
        let Node::UnorderedList { children, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(
            children[0],
            Node::TaskItem {
                checked: false,
                children: vec![Node::Paragraph(vec![Node::Text("milk".to_string())])],
            }
        );
        assert!(matches!(
            children[1],
            Node::TaskItem { checked: true, .. }
        ));
        assert!(matches!(children[2], Node::ListItem(_)));
    }

    #[test]
    fn test_marker_requires_trailing_space() {
        let ext = TasklistExtension;
        let mut doc = Node::Document(vec![Node::UnorderedList {
            tight: true,
            children: vec![item("[x]tight")],
        }]);
        ext.postprocess(&mut doc);

        let Node::Document(blocks) = &doc else {
            panic!("expected document");
        };
        let Node::UnorderedList { children, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert!(matches!(children[0], Node::ListItem(_)));
    }

    #[test]
    fn test_converts_nested_lists() {
        let ext = TasklistExtension;
        let mut doc = Node::Document(vec![Node::UnorderedList {
            tight: true,
            children: vec![Node::ListItem(vec![
                Node::Paragraph(vec![Node::Text("outer".to_string())]),
                Node::UnorderedList {
                    tight: true,
                    children: vec![item("[X] inner")],
                },
            ])],
        }]);
        ext.postprocess(&mut doc);

        let Node::Document(blocks) = &doc else {
            panic!("expected document");
        };
        let Node::UnorderedList { children, .. } = &blocks[0] else {
            panic!("expected list");
        };
        let Node::ListItem(outer) = &children[0] else {
            panic!("expected plain item");
        };
        let Node::UnorderedList { children: inner, .. } = &outer[1] else {
            panic!("expected nested list");
        };
        assert!(matches!(inner[0], Node::TaskItem { checked: true, .. }));
    }
}
