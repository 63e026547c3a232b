mod defaults;
mod document;
mod store;
mod validate;

pub use defaults::default_document;
pub use document::{
    ConditionalModifier, ConflictStrategy, ContextualRules, GlobalSettings, RuleSetDocument,
    TimeBasedRules, TimeWindow, CURRENT_DOCUMENT_VERSION,
};
pub use store::{RemoteConfigSource, RuleStore};
pub use validate::{migrate_document, parse_version, validate_document};
