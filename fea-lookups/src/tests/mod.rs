//! Compiling small programs end to end.

use crate::{
    ast::{
        FeatureDefinition, Glyph, GlyphClass, GlyphSet, LookupDefinition, LookupReference,
        LookupStatement, SingleSubstitutionRule,
    },
    common::test_helpers::{init_logging, make_db},
    Compilation, FeaContext, FeatureList, GlyphId16, LayoutDb, Opts,
};

mod should_fail;

fn glyph(name: &str) -> Glyph {
    Glyph::from(name)
}

fn class(names: &[&str]) -> GlyphSet {
    names.iter().map(|name| glyph(name)).collect::<GlyphClass>().into()
}

fn ids(db: &LayoutDb, names: &[&str]) -> Vec<GlyphId16> {
    names
        .iter()
        .map(|name| crate::common::test_helpers::gid(db, name))
        .collect()
}

fn sub(target: &str, replacement: &str) -> LookupStatement {
    SingleSubstitutionRule::new(target, replacement, 1).into()
}

fn lookup(name: &str, statements: Vec<LookupStatement>) -> LookupDefinition {
    LookupDefinition::new(name, statements)
}

fn feature(name: &str, statements: Vec<LookupStatement>) -> FeatureDefinition {
    FeatureDefinition::new(name, statements)
}

fn reference(name: &str) -> LookupStatement {
    LookupReference::new(name).into()
}

/// Register the definitions and compile the features with default options.
fn compile_with(
    lookups: Vec<LookupDefinition>,
    features: Vec<FeatureDefinition>,
    requested: FeatureList,
) -> Compilation {
    compile_with_opts(lookups, features, requested, &Opts::new())
}

fn compile_with_opts(
    lookups: Vec<LookupDefinition>,
    features: Vec<FeatureDefinition>,
    requested: FeatureList,
    opts: &Opts,
) -> Compilation {
    init_logging();
    let mut ctx = FeaContext::new();
    for def in lookups {
        ctx.add_lookup(def).unwrap();
    }
    for def in features {
        ctx.add_feature(def).unwrap();
    }
    ctx.populate_features(&make_db(), &requested, opts)
}
