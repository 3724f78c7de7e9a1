/// Strikethrough spans delimited by `~~`, routed through the emphasis
/// delimiter stack so flanking and pairing follow the same rules as `*`.
use crate::ast::Node;
use crate::extension::SyntaxExtension;

pub struct StrikethroughExtension;

impl SyntaxExtension for StrikethroughExtension {
    fn name(&self) -> &'static str {
        "strikethrough"
    }

    fn node_types(&self) -> Vec<&'static str> {
        vec!["strikethrough"]
    }

    fn emphasis_characters(&self) -> Vec<char> {
        vec!['~']
    }

    fn emphasis_node(&self, children: Vec<Node>) -> Node {
        Node::Strikethrough(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emphasis_node_wraps_children() {
        let ext = StrikethroughExtension;
        let node = ext.emphasis_node(vec![Node::Text("gone".to_string())]);
        assert_eq!(
            node,
            Node::Strikethrough(vec![Node::Text("gone".to_string())])
        );
    }
}
