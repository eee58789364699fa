//! The rule AST.
//!
//! A parser builds these nodes and registers the top-level definitions in a
//! [`FeaContext`](crate::FeaContext). Every node is owned by exactly one
//! parent; the only links between definitions are by name
//! ([`LookupReference`], [`FeatureReference`], [`ClassComponent::ClassName`])
//! and are resolved during compilation.

mod glyphs;
mod regexp;
mod rules;

pub use glyphs::{Anchor, ClassComponent, Glyph, GlyphClass, GlyphSet};
pub use regexp::{GlyphSetRegExp, InlineRule, MarkedGlyphSetRegExp, PositionAction, Sequence};
pub use rules::{
    ChainingContextualRule, ClassDefinition, CursiveRule, FeaRoot, FeatureDefinition,
    FeatureReference, GlyphExpansion, LigatureSubstitutionRule, LookupDefinition,
    LookupFlagRule, LookupReference, LookupStatement, Mark2BaseClass, Mark2BaseRule,
    MarkAttachKind, SingleAdjustmentRule, SingleSubstitutionRule, StartEndLig, Statement,
    SubstTarget, ValueRecord, TATWEEL_FORMAT,
};

pub(crate) use rules::combine_flags;
