/// CommonMark + GFM parser with a pluggable syntax-extension registry
pub mod ast;
pub mod chunk;
pub mod extension;
pub mod extensions;
pub mod inlines;
pub mod options;
pub mod parser;
pub mod refmap;
pub mod renderer;
pub mod strings;

pub use ast::{Alignment, Event, Node};
pub use extension::{
    core_registry, ensure_core_extensions_registered, BlockMatch, ExtensionRegistry, InlineMatch,
    NodeTag, RegistryError, SyntaxExtension,
};
pub use options::Options;
pub use parser::Parser;
pub use refmap::{Reference, ReferenceMap};
pub use renderer::{to_commonmark, HtmlRenderer};

/// Parse markdown into a tree using the process-wide registry. Extension
/// names beyond what the option bits already attach are looked up in the
/// core registry; unknown names are skipped.
pub fn parse(markdown: &str, options: Options, extension_names: &[&str]) -> Node {
    let mut parser = Parser::new(options);
    let registry = core_registry();
    for name in extension_names {
        if let Some(ext) = registry.find(name) {
            parser.attach_extension(ext);
        }
    }
    parser.parse(markdown)
}

/// Parse markdown text and render to HTML
pub fn markdown_to_html(markdown: &str, options: Options) -> String {
    let tree = Parser::new(options).parse(markdown);
    HtmlRenderer::new(options).render(&tree)
}
