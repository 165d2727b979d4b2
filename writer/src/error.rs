//! Error types for the CTM writer.

use ctm_model::AssociationId;
use thiserror::Error;

/// Errors that abort a write.
///
/// A topic without a usable identity is not an error: it is treated as an
/// internal construct and skipped (see [`crate::identity`]).
#[derive(Debug, Error)]
pub enum CtmError {
    /// A reserved TMDM association does not have exactly one player for one
    /// of its reserved roles.
    #[error(
        "association {association:?} of type <{pattern}> has {count} players for role <{role}>, expected exactly 1"
    )]
    StructuralConstraint {
        /// The offending association.
        association: AssociationId,
        /// Subject identifier of the reserved association type.
        pattern: &'static str,
        /// Subject identifier of the reserved role type.
        role: &'static str,
        /// Number of players found for the role.
        count: usize,
    },

    /// A template was asked to extract arguments from a construct it does not
    /// match.
    #[error("template '{template}' is not adaptive for {construct}: {reason}")]
    AdaptivityViolation {
        /// Template name.
        template: String,
        /// Short description of the construct.
        construct: String,
        /// Why matching failed.
        reason: String,
    },

    /// A template has an entry in a position CTM cannot express.
    #[error("template '{template}' is malformed: {reason}")]
    InvalidTemplate {
        /// Template name.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A configuration key is unknown or its value cannot be used.
    #[error("invalid configuration for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key.
        key: String,
        /// What is wrong with the value.
        message: String,
    },

    /// An explicit prefix label is already bound to another namespace.
    #[error("prefix '{label}' is already bound to <{existing}>, cannot rebind it to <{requested}>")]
    PrefixConflict {
        /// The label.
        label: String,
        /// Namespace the label is bound to.
        existing: String,
        /// Namespace that was requested.
        requested: String,
    },

    /// The output sink failed. The destination may hold a truncated document.
    #[error("failed to write CTM output: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the writer.
pub type Result<T, E = CtmError> = std::result::Result<T, E>;
