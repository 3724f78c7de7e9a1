/// The built-in GFM extension set.
use std::sync::Arc;

use crate::extension::SyntaxExtension;

pub mod autolink;
pub mod strikethrough;
pub mod table;
pub mod tagfilter;
pub mod tasklist;

pub fn create_table_extension() -> Arc<dyn SyntaxExtension> {
    Arc::new(table::TableExtension)
}

pub fn create_strikethrough_extension() -> Arc<dyn SyntaxExtension> {
    Arc::new(strikethrough::StrikethroughExtension)
}

pub fn create_tasklist_extension() -> Arc<dyn SyntaxExtension> {
    Arc::new(tasklist::TasklistExtension)
}

pub fn create_autolink_extension() -> Arc<dyn SyntaxExtension> {
    Arc::new(autolink::AutolinkExtension)
}

pub fn create_tagfilter_extension() -> Arc<dyn SyntaxExtension> {
    Arc::new(tagfilter::TagfilterExtension)
}
