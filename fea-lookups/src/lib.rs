//! Compiling OpenType layout rules into GSUB/GPOS lookups.
//!
//! This crate owns the semantic core of a feature compiler: the rule [`ast`],
//! the glyph-set and sequence algebra that turn symbolic glyph references
//! into glyph ids, and the compilation pass that turns feature and lookup
//! definitions into ordered, typed [`Lookup`]s.
//!
//! Parsing source text and writing binary tables are left to collaborators:
//! a parser builds the AST and registers it in a [`FeaContext`], and the
//! [`Compilation`] produced by [`FeaContext::populate_features`] is handed
//! to a table writer.

#![deny(missing_docs)]

pub mod ast;
mod common;
pub mod compile;

#[cfg(test)]
mod tests;

pub use common::{
    AnchorPoint, Coverage, GlyphId16, GlyphMap, GlyphName, LayoutDatabase, LayoutDb,
    LINE_BREAK_CID,
};
pub use compile::{
    compile,
    error::{CompilationError, CompilationErrorKind, CompilerError, RegistryError},
    Compilation, FeaContext, FeatureKey, FeatureList, LayoutTable, Lookup, LookupId, LookupType,
    Opts, Subtable,
};
