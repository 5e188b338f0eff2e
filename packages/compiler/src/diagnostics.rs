//! Analysis warnings.
//!
//! The warning taxonomy is a closed set; the message text is informational
//! only and every machine-consumable detail lives in the typed fields.

use serde::{Deserialize, Serialize};

/// The closed set of warning kinds the analyzer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    /// Structural pseudo-class in the selector.
    StructuralDynamic,
    /// Container-unit dependency with no registered container ancestor.
    MissingContainer,
    /// Portal target could not be resolved to a rule.
    PortalMissing,
    /// A custom-property reference chained to a missing token; the written
    /// fallback was used when present.
    UnresolvedToken,
    /// A custom-property reference to a token that is never defined and has
    /// no fallback.
    UndefinedToken,
    /// A math function mixing absolute and runtime operands.
    MixedOperands,
    /// Cyclic custom-property reference chain.
    TokenCycle,
    /// Anomalous dependency chain (e.g. a cycle in the effective-parent
    /// graph).
    DepWarning,
}

/// A single warning attached to a rule or to the analysis as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Warning {
            kind,
            node_id: None,
            message: message.into(),
            token_name: None,
            referenced_token: None,
            property: None,
        }
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_tokens(
        mut self,
        token_name: impl Into<String>,
        referenced_token: impl Into<String>,
    ) -> Self {
        self.token_name = Some(token_name.into());
        self.referenced_token = Some(referenced_token.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }
}
