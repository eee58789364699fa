//! Programs that fail, and what is left of them afterwards

use pretty_assertions::assert_eq;
use write_fonts::tables::layout::LookupFlag;

use super::*;
use crate::{
    ast::{
        Anchor, ChainingContextualRule, ClassDefinition, CursiveRule, FeatureReference,
        GlyphExpansion, GlyphSetRegExp, InlineRule, LigatureSubstitutionRule, LookupFlagRule,
        MarkedGlyphSetRegExp, SingleAdjustmentRule, StartEndLig, SubstTarget, ValueRecord,
    },
    CompilationError, CompilationErrorKind, CompilerError, LayoutTable, LookupId, LookupType,
};

fn single_error(compilation: &Compilation) -> &CompilationError {
    assert_eq!(compilation.errors().len(), 1, "{:?}", compilation.errors());
    &compilation.errors()[0]
}

fn kern_rule() -> LookupStatement {
    SingleAdjustmentRule::new(glyph("a"), ValueRecord::advance(10)).into()
}

#[test]
fn mixed_lookup_type() {
    let compilation = compile_with(
        vec![lookup(
            "mixed",
            vec![
                kern_rule(),
                LigatureSubstitutionRule::new([glyph("f"), glyph("i")], "f_i").into(),
            ],
        )],
        vec![feature("test", vec![reference("mixed")])],
        FeatureList::new().gpos("test"),
    );
    assert_eq!(
        single_error(&compilation),
        &CompilationError {
            feature: "test".into(),
            lookup: Some("mixed".into()),
            kind: CompilationErrorKind::MixedLookupType {
                expected: LookupType::SinglePositioning,
                found: LookupType::LigatureSubstitution,
            },
        }
    );
    assert!(compilation
        .feature_lookups(LayoutTable::Gpos, "test")
        .is_none());
    assert!(compilation.gpos_lookups().is_empty());
}

#[test]
fn empty_class_fails_only_its_feature() {
    let bad = SingleSubstitutionRule {
        target: SubstTarget::Set(GlyphClass::named("empty").into()),
        ..SingleSubstitutionRule::new("a", "b", 1)
    };
    let undefined = SingleSubstitutionRule {
        target: SubstTarget::Set(GlyphClass::named("undefined").into()),
        ..SingleSubstitutionRule::new("a", "b", 1)
    };
    let compilation = compile_with(
        vec![],
        vec![
            feature("bad1", vec![sub("c", "d"), bad.into()]),
            feature("good", vec![sub("a", "b")]),
            feature("bad2", vec![undefined.into()]),
        ],
        FeatureList::new().gsub("bad1").gsub("good").gsub("bad2"),
    );
    let kinds = compilation
        .errors()
        .iter()
        .map(|e| (e.feature.as_str(), e.kind.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            ("bad1", CompilationErrorKind::EmptyClass("empty".into())),
            ("bad2", CompilationErrorKind::EmptyClass("undefined".into())),
        ]
    );
    let compiled = compilation
        .features()
        .map(|(key, _)| key.feature.as_str())
        .collect::<Vec<_>>();
    assert_eq!(compiled, ["good"]);
    // the implicit lookup of 'bad1' was discarded
    assert_eq!(compilation.gsub_lookups().len(), 1);
}

#[test]
fn unresolved_names() {
    let compilation = compile_with(
        vec![lookup(
            "l1",
            vec![LigatureSubstitutionRule::new([glyph("f"), glyph("zzz")], "f_i").into()],
        )],
        vec![
            feature("liga", vec![reference("l1")]),
            feature("calt", vec![reference("missing")]),
            feature("ss01", vec![FeatureReference::new("ss99").into()]),
            feature(
                "curs",
                vec![CursiveRule::new(glyph("a"), Anchor::Name("nowhere".into()), Anchor::Null)
                    .into()],
            ),
        ],
        FeatureList::new()
            .gsub("liga")
            .gsub("calt")
            .gsub("ss01")
            .gsub("nope")
            .gpos("curs"),
    );
    let errors = compilation
        .errors()
        .iter()
        .map(|e| (e.feature.as_str(), e.lookup.clone(), e.kind.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        errors,
        vec![
            (
                "liga",
                Some("l1".into()),
                CompilationErrorKind::UnresolvedGlyph("zzz".into())
            ),
            (
                "calt",
                None,
                CompilationErrorKind::UnresolvedLookup("missing".into())
            ),
            (
                "ss01",
                None,
                CompilationErrorKind::UnresolvedFeature("ss99".into())
            ),
            (
                "nope",
                None,
                CompilationErrorKind::UnresolvedFeature("nope".into())
            ),
            (
                "curs",
                None,
                CompilationErrorKind::UnresolvedAnchor("nowhere".into())
            ),
        ]
    );
    assert_eq!(compilation.features().count(), 0);
}

#[test]
fn cyclic_lookups() {
    let compilation = compile_with(
        vec![
            lookup("a", vec![reference("b")]),
            lookup("b", vec![reference("a")]),
        ],
        vec![feature("test", vec![reference("a")])],
        FeatureList::new().gsub("test"),
    );
    let error = single_error(&compilation);
    assert_eq!(error.lookup.as_deref(), Some("b"));
    assert_eq!(error.kind, CompilationErrorKind::CyclicLookup("a".into()));
}

#[test]
fn cyclic_features() {
    let compilation = compile_with(
        vec![],
        vec![
            feature("f1", vec![FeatureReference::new("f2").into()]),
            feature("f2", vec![FeatureReference::new("f1").into()]),
        ],
        FeatureList::new().gsub("f1"),
    );
    assert_eq!(
        single_error(&compilation).kind,
        CompilationErrorKind::CyclicFeature("f1".into())
    );
}

#[test]
fn sequence_explosion() {
    let input = ["a", "b", "c", "d"]
        .into_iter()
        .map(|name| GlyphSetRegExp::single(glyph(name)))
        .reduce(GlyphSetRegExp::or)
        .unwrap();
    let chain = ChainingContextualRule::new(
        GlyphSetRegExp::empty(),
        vec![MarkedGlyphSetRegExp::new(input)],
        GlyphSetRegExp::empty(),
    );
    let compilation = compile_with_opts(
        vec![],
        vec![feature("calt", vec![chain.into()])],
        FeatureList::new().gsub("calt"),
        &Opts::new().max_sequences(3),
    );
    assert_eq!(
        single_error(&compilation).kind,
        CompilationErrorKind::SequenceExplosion { count: 4, limit: 3 }
    );
}

#[test]
fn failed_feature_is_rolled_back() {
    let compilation = compile_with(
        vec![
            lookup("shared", vec![sub("a", "b")]),
            lookup("private", vec![sub("c", "d")]),
        ],
        vec![
            feature("first", vec![reference("shared")]),
            feature(
                "bad",
                vec![reference("shared"), reference("private"), reference("missing")],
            ),
            feature("later", vec![reference("private")]),
        ],
        FeatureList::new().gsub("first").gsub("bad").gsub("later"),
    );
    assert_eq!(single_error(&compilation).feature.as_str(), "bad");
    // 'shared' survives from 'first'; 'private' is recompiled for 'later'
    assert_eq!(compilation.gsub_lookups().len(), 2);
    assert_eq!(compilation.lookup_index("shared"), Some(LookupId::Gsub(0)));
    assert_eq!(compilation.lookup_index("private"), Some(LookupId::Gsub(1)));
    assert!(compilation
        .feature_lookups(LayoutTable::Gsub, "bad")
        .is_none());
}

#[test]
fn table_mismatch() {
    let inline_pos = ChainingContextualRule::new(
        GlyphSetRegExp::empty(),
        vec![MarkedGlyphSetRegExp::with_rule(
            glyph("a").into(),
            InlineRule::SinglePos(SingleAdjustmentRule::new(glyph("a"), ValueRecord::advance(1))),
        )],
        GlyphSetRegExp::empty(),
    );
    let compilation = compile_with(
        vec![lookup("kern1", vec![kern_rule()])],
        vec![
            feature("liga", vec![reference("kern1")]),
            feature("calt", vec![inline_pos.into()]),
        ],
        FeatureList::new().gsub("liga").gsub("calt"),
    );
    let kinds = compilation
        .errors()
        .iter()
        .map(|e| e.kind.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            CompilationErrorKind::TableMismatch {
                lookup: "kern1".into(),
                table: LayoutTable::Gpos,
                expected: LayoutTable::Gsub,
            },
            CompilationErrorKind::TableMismatch {
                lookup: "auto-lookup-0".into(),
                table: LayoutTable::Gpos,
                expected: LayoutTable::Gsub,
            },
        ]
    );
    assert!(compilation.gpos_lookups().is_empty());
}

#[test]
fn missing_replacement() {
    let rule = SingleSubstitutionRule {
        target: SubstTarget::Glyph(glyph("a")),
        replacement: None,
        format: 1,
        expansion: GlyphExpansion::default(),
        lig_marker: StartEndLig::Start,
    };
    let compilation = compile_with(
        vec![],
        vec![feature("test", vec![rule.into()])],
        FeatureList::new().gsub("test"),
    );
    assert_eq!(
        single_error(&compilation).kind,
        CompilationErrorKind::MissingReplacement("a".into())
    );
}

#[test]
fn lookup_on_empty_position() {
    let chain = ChainingContextualRule::new(
        GlyphSetRegExp::single(glyph("a")),
        vec![MarkedGlyphSetRegExp::with_lookup(
            GlyphSetRegExp::empty(),
            "sub1",
        )],
        GlyphSetRegExp::empty(),
    );
    let compilation = compile_with(
        vec![lookup("sub1", vec![sub("a", "b")])],
        vec![feature("calt", vec![chain.into()])],
        FeatureList::new().gsub("calt"),
    );
    assert_eq!(
        single_error(&compilation).kind,
        CompilationErrorKind::EmptyInputPosition
    );
}

#[test]
fn into_result_reports_every_failure() {
    let compilation = compile_with(
        vec![],
        vec![
            feature("f1", vec![reference("x")]),
            feature("f2", vec![reference("y")]),
        ],
        FeatureList::new().gsub("f1").gsub("f2"),
    );
    match compilation.into_result() {
        Err(CompilerError::CompilationFail(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn flags_cannot_change_after_rules_in_a_lookup() {
    let compilation = compile_with(
        vec![lookup(
            "l",
            vec![
                kern_rule(),
                LookupFlagRule::new(LookupFlag::IGNORE_MARKS).into(),
                SingleAdjustmentRule::new(glyph("b"), ValueRecord::advance(5)).into(),
            ],
        )],
        vec![feature("kern", vec![reference("l")])],
        FeatureList::new().gpos("kern"),
    );
    let error = single_error(&compilation);
    assert_eq!(error.lookup.as_deref(), Some("l"));
    assert_eq!(error.kind, CompilationErrorKind::FlagsChangedMidLookup);
    assert!(compilation.gpos_lookups().is_empty());
}

#[test]
fn merged_lookup_flags_must_match() {
    let compilation = compile_with(
        vec![
            lookup(
                "inner",
                vec![
                    LookupFlagRule::new(LookupFlag::IGNORE_MARKS).into(),
                    kern_rule(),
                ],
            ),
            lookup(
                "outer",
                vec![
                    SingleAdjustmentRule::new(glyph("b"), ValueRecord::advance(5)).into(),
                    reference("inner"),
                ],
            ),
        ],
        vec![feature("kern", vec![reference("outer")])],
        FeatureList::new().gpos("kern"),
    );
    let error = single_error(&compilation);
    assert_eq!(error.lookup.as_deref(), Some("outer"));
    assert_eq!(
        error.kind,
        CompilationErrorKind::MergedFlagsMismatch("inner".into())
    );
}

#[test]
fn classes_do_not_leak_between_features() {
    let uses_x = || -> LookupStatement {
        SingleAdjustmentRule::new(GlyphClass::named("x"), ValueRecord::advance(5)).into()
    };
    let features = || {
        vec![
            feature(
                "defs",
                vec![
                    ClassDefinition::new("x", [glyph("a"), glyph("b")].into_iter().collect())
                        .into(),
                    uses_x(),
                ],
            ),
            feature("use", vec![uses_x()]),
        ]
    };
    for requested in [
        FeatureList::new().gpos("defs").gpos("use"),
        FeatureList::new().gpos("use").gpos("defs"),
    ] {
        let compilation = compile_with(vec![], features(), requested);
        let error = single_error(&compilation);
        assert_eq!(error.feature.as_str(), "use");
        assert_eq!(error.kind, CompilationErrorKind::EmptyClass("x".into()));
        assert!(compilation
            .feature_lookups(LayoutTable::Gpos, "defs")
            .is_some());
    }
}

#[test]
fn class_from_failed_feature_is_forgotten() {
    let compilation = compile_with(
        vec![],
        vec![
            feature(
                "bad",
                vec![
                    ClassDefinition::new("x", [glyph("a")].into_iter().collect()).into(),
                    reference("missing"),
                ],
            ),
            feature(
                "use",
                vec![SingleAdjustmentRule::new(GlyphClass::named("x"), ValueRecord::advance(1))
                    .into()],
            ),
        ],
        FeatureList::new().gpos("bad").gpos("use"),
    );
    let kinds = compilation
        .errors()
        .iter()
        .map(|e| e.kind.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            CompilationErrorKind::UnresolvedLookup("missing".into()),
            CompilationErrorKind::EmptyClass("x".into()),
        ]
    );
}

#[test]
fn chaining_rule_needs_input() {
    let no_positions = ChainingContextualRule::new(
        GlyphSetRegExp::single(glyph("a")),
        vec![],
        GlyphSetRegExp::empty(),
    );
    // the second alternative matches nothing at all
    let empty_alternative = ChainingContextualRule::new(
        GlyphSetRegExp::empty(),
        vec![MarkedGlyphSetRegExp::new(GlyphSetRegExp::or(
            GlyphSetRegExp::single(glyph("a")),
            GlyphSetRegExp::empty(),
        ))],
        GlyphSetRegExp::empty(),
    );
    let compilation = compile_with(
        vec![],
        vec![
            feature("calt", vec![no_positions.into()]),
            feature("clig", vec![empty_alternative.into()]),
        ],
        FeatureList::new().gsub("calt").gsub("clig"),
    );
    let errors = compilation
        .errors()
        .iter()
        .map(|e| (e.feature.as_str(), e.kind.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        errors,
        vec![
            ("calt", CompilationErrorKind::EmptyInput),
            ("clig", CompilationErrorKind::EmptyInput),
        ]
    );
    assert!(compilation.gsub_lookups().is_empty());
}

#[test]
fn ligature_needs_components() {
    let compilation = compile_with(
        vec![],
        vec![feature(
            "liga",
            vec![LigatureSubstitutionRule::new([], "AB").into()],
        )],
        FeatureList::new().gsub("liga"),
    );
    assert_eq!(
        single_error(&compilation).kind,
        CompilationErrorKind::EmptyLigature("AB".into())
    );
}

#[test]
fn lookup_on_position_matching_no_glyphs() {
    let chain = ChainingContextualRule::new(
        GlyphSetRegExp::empty(),
        vec![MarkedGlyphSetRegExp::with_lookup(
            GlyphSetRegExp::single(GlyphClass::pattern("nothing.*")),
            "sub1",
        )],
        GlyphSetRegExp::empty(),
    );
    let compilation = compile_with(
        vec![lookup("sub1", vec![sub("a", "b")])],
        vec![feature("calt", vec![chain.into()])],
        FeatureList::new().gsub("calt"),
    );
    assert_eq!(
        single_error(&compilation).kind,
        CompilationErrorKind::EmptyInputPosition
    );
}
