/// Syntax-extension contract and the extension registry.
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::ast::Node;
use crate::extensions;
use crate::inlines::InlineParser;
use crate::parser::Parser;

/// A successful block-start match: the finished block and how many input
/// lines it consumed.
#[derive(Debug)]
pub struct BlockMatch {
    pub node: Node,
    pub lines_consumed: usize,
}

/// A successful inline match: the produced node and the scan position
/// immediately after the consumed text.
#[derive(Debug)]
pub struct InlineMatch {
    pub node: Node,
    pub end: usize,
}

/// A bundle of grammar added on top of the base CommonMark rules: new node
/// types, a block-start scanner, inline trigger characters, and an optional
/// whole-tree postprocess pass. Extensions are registered once and treated
/// as immutable afterwards, so implementations must be `Send + Sync`.
///
/// "No match" is the routine outcome for the scanner hooks and is expressed
/// as `None`, never as an error.
pub trait SyntaxExtension: Send + Sync {
    /// Registry name, used to attach the extension to a parse session.
    fn name(&self) -> &'static str;

    /// Node-type tags this extension owns. Each tag may be owned by exactly
    /// one extension for the lifetime of the registry.
    fn node_types(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Characters that should interrupt a plain-text run and be offered to
    /// [`SyntaxExtension::try_match_inline`].
    fn special_characters(&self) -> Vec<char> {
        Vec::new()
    }

    /// Characters routed through the emphasis delimiter stack instead of
    /// the plain inline handler (e.g. `~` for strikethrough). Paired runs
    /// are turned into nodes via [`SyntaxExtension::emphasis_node`].
    fn emphasis_characters(&self) -> Vec<char> {
        Vec::new()
    }

    /// Attempt to open a block at `lines[0]`. The full remaining line slice
    /// is available for lookahead; `parser` provides inline parsing of
    /// leaf text.
    fn try_open_block(&self, _lines: &[&str], _parser: &Parser) -> Option<BlockMatch> {
        None
    }

    /// Attempt an inline match at `chars[pos]`, one of this extension's
    /// special characters.
    fn try_match_inline(
        &self,
        _chars: &[char],
        _pos: usize,
        _inlines: &InlineParser,
    ) -> Option<InlineMatch> {
        None
    }

    /// Build the node for a resolved pair of this extension's emphasis
    /// delimiters.
    fn emphasis_node(&self, children: Vec<Node>) -> Node {
        Node::Emphasis(children)
    }

    /// Hook run over the finished document after inline resolution.
    fn postprocess(&self, _document: &mut Node) {}
}

/// Programmer-facing contract violations, reported at registration time.
/// These never surface during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("extension `{0}` is already registered")]
    DuplicateExtension(String),
    #[error("node type `{node_type}` is already owned by extension `{owner}`")]
    DuplicateNodeType { node_type: String, owner: String },
    #[error("special character `{ch}` is already claimed by extension `{owner}`")]
    SpecialCharConflict { ch: char, owner: String },
}

/// Process-unique tag for an extension-owned node type, assigned at
/// registration time. Tags are small integers above the built-in range
/// because third-party extensions register after the built-in set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeTag(pub u32);

const FIRST_EXTENSION_TAG: u32 = 0x8000;

/// Table of registered syntax extensions with O(1) dispatch lookups for
/// the block and inline parsers. Registration must finish before parsing
/// starts; afterwards the registry is only read.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn SyntaxExtension>>,
    by_name: HashMap<&'static str, usize>,
    node_owners: HashMap<&'static str, usize>,
    node_tags: HashMap<&'static str, NodeTag>,
    special_owners: HashMap<char, usize>,
    emphasis_owners: HashMap<char, usize>,
}

impl ExtensionRegistry {
    pub fn new() -> ExtensionRegistry {
        ExtensionRegistry::default()
    }

    /// Register an extension, claiming its name, node types, and trigger
    /// characters. Conflicts are rejected without touching the entries of
    /// already-registered extensions.
    pub fn register(&mut self, ext: Arc<dyn SyntaxExtension>) -> Result<(), RegistryError> {
        let name = ext.name();
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateExtension(name.to_string()));
        }

        // Validate every claim before committing any of them
        for node_type in ext.node_types() {
            if let Some(&owner) = self.node_owners.get(node_type) {
                return Err(RegistryError::DuplicateNodeType {
                    node_type: node_type.to_string(),
                    owner: self.extensions[owner].name().to_string(),
                });
            }
        }
        for ch in ext.special_characters().into_iter().chain(ext.emphasis_characters()) {
            let owner = self
                .special_owners
                .get(&ch)
                .or_else(|| self.emphasis_owners.get(&ch));
            if let Some(&owner) = owner {
                return Err(RegistryError::SpecialCharConflict {
                    ch,
                    owner: self.extensions[owner].name().to_string(),
                });
            }
        }

        let index = self.extensions.len();
        for node_type in ext.node_types() {
            let tag = NodeTag(FIRST_EXTENSION_TAG + self.node_tags.len() as u32);
            self.node_owners.insert(node_type, index);
            self.node_tags.insert(node_type, tag);
        }
        for ch in ext.special_characters() {
            self.special_owners.insert(ch, index);
        }
        for ch in ext.emphasis_characters() {
            self.emphasis_owners.insert(ch, index);
        }
        self.by_name.insert(name, index);
        self.extensions.push(ext);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn SyntaxExtension>> {
        self.by_name
            .get(name)
            .map(|&index| Arc::clone(&self.extensions[index]))
    }

    /// Which extension claims inline special character `ch`, if any.
    pub fn owner_of_special_char(&self, ch: char) -> Option<Arc<dyn SyntaxExtension>> {
        self.special_owners
            .get(&ch)
            .map(|&index| Arc::clone(&self.extensions[index]))
    }

    /// Which extension claims emphasis delimiter character `ch`, if any.
    pub fn owner_of_emphasis_char(&self, ch: char) -> Option<Arc<dyn SyntaxExtension>> {
        self.emphasis_owners
            .get(&ch)
            .map(|&index| Arc::clone(&self.extensions[index]))
    }

    /// The process-unique tag assigned to an extension node type.
    pub fn node_type_tag(&self, node_type: &str) -> Option<NodeTag> {
        self.node_tags.get(node_type).copied()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &Arc<dyn SyntaxExtension>> {
        self.extensions.iter()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

static CORE_REGISTRY: OnceCell<ExtensionRegistry> = OnceCell::new();

/// The process-wide registry holding the built-in GFM extension set.
/// Built exactly once on first use; concurrent first callers block until
/// the winner finishes, then everyone shares the immutable result.
pub fn core_registry() -> &'static ExtensionRegistry {
    CORE_REGISTRY.get_or_init(|| {
        let mut registry = ExtensionRegistry::new();
        let core: [Arc<dyn SyntaxExtension>; 5] = [
            extensions::create_table_extension(),
            extensions::create_strikethrough_extension(),
            extensions::create_tasklist_extension(),
            extensions::create_autolink_extension(),
            extensions::create_tagfilter_extension(),
        ];
        for ext in core {
            registry
                .register(ext)
                .expect("built-in extensions register without conflicts");
        }
        registry
    })
}

/// Force one-time registration of the built-in extension set.
pub fn ensure_core_extensions_registered() {
    let _ = core_registry();
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeExt {
        name: &'static str,
        node_types: Vec<&'static str>,
        specials: Vec<char>,
    }

    impl SyntaxExtension for FakeExt {
        fn name(&self) -> &'static str {
            self.name
        }
        fn node_types(&self) -> Vec<&'static str> {
            self.node_types.clone()
        }
        fn special_characters(&self) -> Vec<char> {
            self.specials.clone()
        }
    }

    #[test]
    fn test_register_and_find() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(Arc::new(FakeExt {
                name: "fake",
                node_types: vec!["fake_node"],
                specials: vec!['@'],
            }))
            .unwrap();

        assert!(registry.find("fake").is_some());
        assert!(registry.find("other").is_none());
        assert_eq!(
            registry.owner_of_special_char('@').unwrap().name(),
            "fake"
        );
        assert!(registry.node_type_tag("fake_node").is_some());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(Arc::new(FakeExt {
                name: "fake",
                node_types: vec![],
                specials: vec![],
            }))
            .unwrap();

        let err = registry
            .register(Arc::new(FakeExt {
                name: "fake",
                node_types: vec![],
                specials: vec![],
            }))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateExtension("fake".to_string()));
    }

    #[test]
    fn test_duplicate_node_type_leaves_registry_intact() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(Arc::new(FakeExt {
                name: "first",
                node_types: vec!["shared_node"],
                specials: vec!['@'],
            }))
            .unwrap();

        let err = registry
            .register(Arc::new(FakeExt {
                name: "second",
                node_types: vec!["second_node", "shared_node"],
                specials: vec!['%'],
            }))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateNodeType { .. }));

        // The failed registration must not have claimed anything
        assert_eq!(registry.len(), 1);
        assert!(registry.find("second").is_none());
        assert!(registry.node_type_tag("second_node").is_none());
        assert!(registry.owner_of_special_char('%').is_none());
        // And the winner's entries are untouched
        assert_eq!(
            registry.owner_of_special_char('@').unwrap().name(),
            "first"
        );
    }

    #[test]
    fn test_special_char_conflict_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(Arc::new(FakeExt {
                name: "first",
                node_types: vec![],
                specials: vec!['@'],
            }))
            .unwrap();

        let err = registry
            .register(Arc::new(FakeExt {
                name: "second",
                node_types: vec![],
                specials: vec!['@'],
            }))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::SpecialCharConflict {
                ch: '@',
                owner: "first".to_string()
            }
        );
    }

    #[test]
    fn test_node_tags_are_unique() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(Arc::new(FakeExt {
                name: "first",
                node_types: vec!["a", "b"],
                specials: vec![],
            }))
            .unwrap();
        registry
            .register(Arc::new(FakeExt {
                name: "second",
                node_types: vec!["c"],
                specials: vec![],
            }))
            .unwrap();

        let a = registry.node_type_tag("a").unwrap();
        let b = registry.node_type_tag("b").unwrap();
        let c = registry.node_type_tag("c").unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(a.0 >= FIRST_EXTENSION_TAG);
    }

    #[test]
    fn test_core_registry_initializes_once() {
        ensure_core_extensions_registered();
        let first = core_registry() as *const ExtensionRegistry;
        let second = core_registry() as *const ExtensionRegistry;
        assert_eq!(first, second);
        assert!(core_registry().find("table").is_some());
        assert!(core_registry().find("strikethrough").is_some());
    }
}
