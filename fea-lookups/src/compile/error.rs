//! Error types related to compilation

use smol_str::SmolStr;

use crate::common::GlyphName;

use super::lookups::{LayoutTable, LookupType};

/// The reason a feature failed to compile.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompilationErrorKind {
    /// A named glyph is not in the layout database
    #[error("glyph '{0}' is not in the layout database")]
    UnresolvedGlyph(GlyphName),
    /// A named class is undefined, or resolved to no glyphs
    #[error("class '@{0}' is undefined or empty")]
    EmptyClass(SmolStr),
    /// A named anchor is not in the layout database
    #[error("anchor '{0}' is not in the layout database")]
    UnresolvedAnchor(SmolStr),
    /// A referenced lookup is not registered
    #[error("lookup '{0}' is not defined")]
    UnresolvedLookup(SmolStr),
    /// A referenced feature is not registered
    #[error("feature '{0}' is not defined")]
    UnresolvedFeature(SmolStr),
    /// A rule does not match the type of the lookup it is added to
    #[error("cannot add a {found} rule to a {expected} lookup")]
    #[allow(missing_docs)]
    MixedLookupType {
        expected: LookupType,
        found: LookupType,
    },
    /// A contextual rule expands to too many sequences
    #[error("rule expands to {count} sequences, more than the limit of {limit}")]
    #[allow(missing_docs)]
    SequenceExplosion { count: usize, limit: usize },
    /// A lookup references itself, directly or indirectly
    #[error("lookup '{0}' references itself")]
    CyclicLookup(SmolStr),
    /// A feature references itself, directly or indirectly
    #[error("feature '{0}' references itself")]
    CyclicFeature(SmolStr),
    /// A lookup belongs to a different table than the feature using it
    #[error("lookup '{lookup}' is a {table} lookup, but is used from {expected}")]
    #[allow(missing_docs)]
    TableMismatch {
        lookup: SmolStr,
        table: LayoutTable,
        expected: LayoutTable,
    },
    /// A substitution rule has no replacement and is not an expansion rule
    #[error("substitution of '{0}' has no replacement")]
    MissingReplacement(SmolStr),
    /// A lookup is applied to an input position that matches no glyphs
    #[error("a lookup is applied to an empty input position")]
    EmptyInputPosition,
    /// A chaining rule has an input sequence with no positions
    #[error("a contextual rule has an empty input sequence")]
    EmptyInput,
    /// A ligature substitution has no components
    #[error("ligature '{0}' has no components")]
    EmptyLigature(SmolStr),
    /// A lookupflag statement follows rules in the same lookup, and changes
    /// the flags they were declared under
    #[error("lookup flags cannot change after rules have been added to a lookup")]
    FlagsChangedMidLookup,
    /// A lookup merged into another has different flags
    #[error("lookup '{0}' has different flags than the lookup it is merged into")]
    MergedFlagsMismatch(SmolStr),
}

/// A failure to compile a feature.
///
/// Carries the feature being compiled and, if the failure happened inside a
/// lookup, the innermost lookup's name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("feature '{feature}'{}: {kind}", in_lookup(.lookup))]
pub struct CompilationError {
    /// The feature that was abandoned
    pub feature: SmolStr,
    /// The innermost lookup being compiled, if any
    pub lookup: Option<SmolStr>,
    /// What went wrong
    pub kind: CompilationErrorKind,
}

fn in_lookup(lookup: &Option<SmolStr>) -> String {
    lookup
        .as_ref()
        .map(|name| format!(", lookup '{name}'"))
        .unwrap_or_default()
}

impl CompilationError {
    pub(crate) fn new(
        feature: impl Into<SmolStr>,
        lookup: Option<SmolStr>,
        kind: CompilationErrorKind,
    ) -> Self {
        CompilationError {
            feature: feature.into(),
            lookup,
            kind,
        }
    }
}

/// An error that occurs while registering definitions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two lookups share a name
    #[error("lookup '{0}' is already defined")]
    DuplicateLookup(SmolStr),
    /// Two features share a name
    #[error("feature '{0}' is already defined")]
    DuplicateFeature(SmolStr),
    /// A statement that only makes sense inside a feature or lookup
    #[error("a {0} cannot appear at the top level")]
    UnexpectedTopLevel(&'static str),
}

/// An error reported by the compiler
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum CompilerError {
    #[error("{0}")]
    Registry(
        #[from]
        #[source]
        RegistryError,
    ),
    #[error("Compilation failed with {} errors\n{}", .0.len(), display_errors(.0))]
    CompilationFail(Vec<CompilationError>),
}

fn display_errors(errors: &[CompilationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
