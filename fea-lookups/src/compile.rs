//! Compiling rule ASTs into lookups

use crate::{ast::FeaRoot, common::LayoutDatabase};

use self::error::CompilerError;

pub use context::{FeaContext, FeatureList};
pub use lookups::{
    ChainPosition, ChainRule, FeatureKey, LayoutTable, Lookup, LookupId, LookupType,
    MarkClassRecord, ResolvedAnchor, Subtable,
};
pub use opts::Opts;
pub use output::Compilation;

mod compile_ctx;
mod context;
pub mod error;
mod lookups;
mod opts;
mod output;
mod resolve;

/// Register a program and compile the requested features.
///
/// This fails if the program cannot be registered, or if any feature fails
/// to compile. Use [`FeaContext::populate_features`] directly to keep the
/// features that did compile.
pub fn compile(
    root: FeaRoot,
    db: &dyn LayoutDatabase,
    features: &FeatureList,
    opts: &Opts,
) -> Result<Compilation, CompilerError> {
    let ctx = FeaContext::from_root(root)?;
    ctx.populate_features(db, features, opts).into_result()
}
