//! Parse-level data model.

use indexmap::IndexMap;

/// Raw custom-property definitions collected from the root/universal
/// selectors, keyed by the full `--name`. Last definition wins.
pub type RawTokenTable = IndexMap<String, String>;

/// One selector-list rule as extracted from the source, before merging by
/// selector. Declarations keep their source order and duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    pub selectors: Vec<String>,
    pub declarations: Vec<(String, String)>,
    pub media_query: Option<String>,
}

impl ParsedRule {
    pub fn new(selectors: Vec<String>, media_query: Option<String>) -> Self {
        ParsedRule {
            selectors,
            declarations: Vec::new(),
            media_query,
        }
    }
}

/// Parser output: the ordered rule list plus the raw token table.
#[derive(Debug, Default, Clone)]
pub struct ParseOutput {
    pub rules: Vec<ParsedRule>,
    pub raw_tokens: RawTokenTable,
}
