//! Statements: rules, definitions and references

use ordered_float::OrderedFloat;
use smol_str::SmolStr;
use write_fonts::tables::layout::LookupFlag;

use super::{
    glyphs::{Anchor, Glyph, GlyphClass, GlyphSet},
    regexp::{GlyphSetRegExp, MarkedGlyphSetRegExp},
};

/// The single substitution format that denotes a tatweel expansion rather
/// than a substitution.
pub const TATWEEL_FORMAT: u16 = 11;

const MARK_ATTACHMENT_MASK: u16 = 0xFF00;

/// The root of a parsed program.
#[derive(Debug, Clone, Default)]
pub struct FeaRoot {
    /// Top-level statements, in source order
    pub statements: Vec<Statement>,
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A feature block
    Feature(FeatureDefinition),
    /// Anything that can also appear inside a feature or lookup
    Lookup(LookupStatement),
}

/// A statement that can appear inside a feature or lookup block.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum LookupStatement {
    ClassDefinition(ClassDefinition),
    SingleSubstitution(SingleSubstitutionRule),
    LigatureSubstitution(LigatureSubstitutionRule),
    SingleAdjustment(SingleAdjustmentRule),
    Cursive(CursiveRule),
    Mark2Base(Mark2BaseRule),
    ChainingContextual(ChainingContextualRule),
    LookupFlag(LookupFlagRule),
    FeatureReference(FeatureReference),
    LookupReference(LookupReference),
    LookupDefinition(LookupDefinition),
}

// a little helper to implement the conversions into LookupStatement
macro_rules! impl_into_statement {
    ($node:ty, $variant:ident) => {
        impl From<$node> for LookupStatement {
            fn from(src: $node) -> LookupStatement {
                LookupStatement::$variant(src)
            }
        }

        impl From<$node> for Statement {
            fn from(src: $node) -> Statement {
                Statement::Lookup(LookupStatement::$variant(src))
            }
        }
    };
}

impl_into_statement!(ClassDefinition, ClassDefinition);
impl_into_statement!(SingleSubstitutionRule, SingleSubstitution);
impl_into_statement!(LigatureSubstitutionRule, LigatureSubstitution);
impl_into_statement!(SingleAdjustmentRule, SingleAdjustment);
impl_into_statement!(CursiveRule, Cursive);
impl_into_statement!(Mark2BaseRule, Mark2Base);
impl_into_statement!(ChainingContextualRule, ChainingContextual);
impl_into_statement!(LookupFlagRule, LookupFlag);
impl_into_statement!(FeatureReference, FeatureReference);
impl_into_statement!(LookupReference, LookupReference);
impl_into_statement!(LookupDefinition, LookupDefinition);

impl From<FeatureDefinition> for Statement {
    fn from(src: FeatureDefinition) -> Statement {
        Statement::Feature(src)
    }
}

impl LookupStatement {
    /// A short human-readable name for this kind of statement.
    pub fn kind_name(&self) -> &'static str {
        match self {
            LookupStatement::ClassDefinition(_) => "class definition",
            LookupStatement::SingleSubstitution(_) => "single substitution",
            LookupStatement::LigatureSubstitution(_) => "ligature substitution",
            LookupStatement::SingleAdjustment(_) => "single adjustment",
            LookupStatement::Cursive(_) => "cursive attachment",
            LookupStatement::Mark2Base(_) => "mark attachment",
            LookupStatement::ChainingContextual(_) => "chaining contextual rule",
            LookupStatement::LookupFlag(_) => "lookupflag",
            LookupStatement::FeatureReference(_) => "feature reference",
            LookupStatement::LookupReference(_) => "lookup reference",
            LookupStatement::LookupDefinition(_) => "lookup definition",
        }
    }
}

/// A named feature block.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDefinition {
    name: SmolStr,
    statements: Vec<LookupStatement>,
}

impl FeatureDefinition {
    /// Create a new feature definition.
    pub fn new(name: impl Into<SmolStr>, statements: Vec<LookupStatement>) -> Self {
        FeatureDefinition {
            name: name.into(),
            statements,
        }
    }

    /// The feature's name
    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    /// The statements in this feature, in source order
    pub fn statements(&self) -> &[LookupStatement] {
        &self.statements
    }

    pub(crate) fn statements_mut(&mut self) -> &mut Vec<LookupStatement> {
        &mut self.statements
    }
}

/// A named lookup block.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupDefinition {
    name: SmolStr,
    statements: Vec<LookupStatement>,
}

impl LookupDefinition {
    /// Create a new lookup definition.
    pub fn new(name: impl Into<SmolStr>, statements: Vec<LookupStatement>) -> Self {
        LookupDefinition {
            name: name.into(),
            statements,
        }
    }

    /// The lookup's name
    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    /// The statements in this lookup, in source order
    pub fn statements(&self) -> &[LookupStatement] {
        &self.statements
    }

    pub(crate) fn statements_mut(&mut self) -> &mut Vec<LookupStatement> {
        &mut self.statements
    }
}

/// `@name = [...]`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    /// The class name, without any sigil
    pub name: SmolStr,
    /// The members of the class
    pub class: GlyphClass,
}

impl ClassDefinition {
    /// Create a new class definition.
    pub fn new(name: impl Into<SmolStr>, class: GlyphClass) -> Self {
        ClassDefinition {
            name: name.into(),
            class,
        }
    }
}

/// A reference to a feature, whose statements are included in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureReference {
    /// The referenced feature
    pub name: SmolStr,
}

impl FeatureReference {
    /// Create a new feature reference.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        FeatureReference { name: name.into() }
    }
}

/// A reference to a named lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupReference {
    /// The referenced lookup
    pub name: SmolStr,
}

impl LookupReference {
    /// Create a new lookup reference.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        LookupReference { name: name.into() }
    }
}

/// The target of a single substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum SubstTarget {
    /// A single glyph
    Glyph(Glyph),
    /// A set of glyphs; only valid for expansion rules
    Set(GlyphSet),
}

/// Where a glyph sits inside a ligature-like cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StartEndLig {
    /// Both starts and ends the cluster
    #[default]
    StartEnd,
    /// Starts the cluster
    Start,
    /// Ends the cluster
    End,
}

/// Limits on how far a glyph can be stretched by tatweel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct GlyphExpansion {
    pub min_left_tatweel: OrderedFloat<f32>,
    pub max_left_tatweel: OrderedFloat<f32>,
    pub min_right_tatweel: OrderedFloat<f32>,
    pub max_right_tatweel: OrderedFloat<f32>,
}

impl GlyphExpansion {
    /// An expansion with the same min and max on each side.
    pub fn symmetric(left: f32, right: f32) -> Self {
        GlyphExpansion {
            min_left_tatweel: left.into(),
            max_left_tatweel: left.into(),
            min_right_tatweel: right.into(),
            max_right_tatweel: right.into(),
        }
    }

    /// `true` if no stretching is allowed on either side.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `sub a by b`, or a tatweel expansion rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleSubstitutionRule {
    /// The glyph (or, for expansions, glyphs) being replaced
    pub target: SubstTarget,
    /// The replacement; absent for expansion rules
    pub replacement: Option<Glyph>,
    /// The substitution format
    pub format: u16,
    /// How far the replacement may be stretched
    pub expansion: GlyphExpansion,
    /// Cluster position marker
    pub lig_marker: StartEndLig,
}

impl SingleSubstitutionRule {
    /// A one-to-one substitution.
    pub fn new(target: impl Into<Glyph>, replacement: impl Into<Glyph>, format: u16) -> Self {
        SingleSubstitutionRule {
            target: SubstTarget::Glyph(target.into()),
            replacement: Some(replacement.into()),
            format,
            expansion: GlyphExpansion::default(),
            lig_marker: StartEndLig::default(),
        }
    }

    /// Set the expansion and cluster marker for this rule.
    pub fn with_expansion(mut self, expansion: GlyphExpansion, lig_marker: StartEndLig) -> Self {
        self.expansion = expansion;
        self.lig_marker = lig_marker;
        self
    }

    /// A tatweel rule: the target glyphs may be stretched, but not replaced.
    pub fn tatweel(target: SubstTarget, left: f32, right: f32) -> Self {
        SingleSubstitutionRule {
            target,
            replacement: None,
            format: TATWEEL_FORMAT,
            expansion: GlyphExpansion::symmetric(left, right),
            lig_marker: StartEndLig::StartEnd,
        }
    }

    /// `true` if this rule adjusts expansion instead of substituting.
    pub fn is_expansion(&self) -> bool {
        self.replacement.is_none() && self.format == TATWEEL_FORMAT
    }
}

/// `sub a b by a_b`
#[derive(Debug, Clone, PartialEq)]
pub struct LigatureSubstitutionRule {
    /// The glyphs that are replaced, in order
    pub components: Vec<Glyph>,
    /// The replacement
    pub ligature: Glyph,
}

impl LigatureSubstitutionRule {
    /// Create a new ligature rule.
    pub fn new(components: impl IntoIterator<Item = Glyph>, ligature: impl Into<Glyph>) -> Self {
        LigatureSubstitutionRule {
            components: components.into_iter().collect(),
            ligature: ligature.into(),
        }
    }
}

/// Placement and advance adjustments, in font units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct ValueRecord {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
}

impl ValueRecord {
    /// A record that only adjusts the horizontal advance.
    pub fn advance(x_advance: i16) -> Self {
        ValueRecord {
            x_advance,
            ..Default::default()
        }
    }

    /// A record that only adjusts placement.
    pub fn placement(x_placement: i16, y_placement: i16) -> Self {
        ValueRecord {
            x_placement,
            y_placement,
            ..Default::default()
        }
    }
}

/// `pos a <0 0 10 0>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SingleAdjustmentRule {
    /// The adjusted glyphs
    pub glyphs: GlyphSet,
    /// The adjustment
    pub value: ValueRecord,
    /// Whether the adjusted glyphs are marked for coloring
    pub color: bool,
}

impl SingleAdjustmentRule {
    /// Create a new adjustment rule.
    pub fn new(glyphs: impl Into<GlyphSet>, value: ValueRecord) -> Self {
        SingleAdjustmentRule {
            glyphs: glyphs.into(),
            value,
            color: false,
        }
    }

    /// Set the color flag.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// `pos cursive a <anchor entry> <anchor exit>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CursiveRule {
    /// The attached glyphs
    pub glyphs: GlyphSet,
    /// Entry anchor
    pub entry: Anchor,
    /// Exit anchor
    pub exit: Anchor,
}

impl CursiveRule {
    /// Create a new cursive rule.
    pub fn new(glyphs: impl Into<GlyphSet>, entry: Anchor, exit: Anchor) -> Self {
        CursiveRule {
            glyphs: glyphs.into(),
            entry,
            exit,
        }
    }
}

/// Whether marks attach to bases or to other marks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MarkAttachKind {
    /// Mark-to-base
    #[default]
    Base,
    /// Mark-to-mark
    Mark,
}

/// One mark class in a [`Mark2BaseRule`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mark2BaseClass {
    /// The marks in this class
    pub marks: GlyphSet,
    /// The anchor on the base glyph
    pub base_anchor: Anchor,
    /// The anchor on the mark glyph
    pub mark_anchor: Anchor,
    /// The name of the mark class
    pub class_name: SmolStr,
}

impl Mark2BaseClass {
    /// Create a new mark class.
    pub fn new(
        marks: impl Into<GlyphSet>,
        base_anchor: Anchor,
        mark_anchor: Anchor,
        class_name: impl Into<SmolStr>,
    ) -> Self {
        Mark2BaseClass {
            marks: marks.into(),
            base_anchor,
            mark_anchor,
            class_name: class_name.into(),
        }
    }
}

/// `pos base a <anchor> mark @TOP`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mark2BaseRule {
    /// The base (or base mark) glyphs
    pub base: GlyphSet,
    /// One entry per attached mark class
    pub classes: Vec<Mark2BaseClass>,
    /// Whether the bases are bases or marks
    pub kind: MarkAttachKind,
}

impl Mark2BaseRule {
    /// Create a new mark attachment rule.
    pub fn new(base: impl Into<GlyphSet>, classes: Vec<Mark2BaseClass>, kind: MarkAttachKind) -> Self {
        Mark2BaseRule {
            base: base.into(),
            classes,
            kind,
        }
    }
}

/// A chaining contextual rule.
///
/// The same node serves substitution and positioning; which one it is is
/// decided by the table being compiled, not by the rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainingContextualRule {
    /// Glyphs before the input, in source order
    pub backtrack: GlyphSetRegExp,
    /// The input positions
    pub input: Vec<MarkedGlyphSetRegExp>,
    /// Glyphs after the input
    pub lookahead: GlyphSetRegExp,
}

impl ChainingContextualRule {
    /// Create a new chaining rule.
    pub fn new(
        backtrack: GlyphSetRegExp,
        input: Vec<MarkedGlyphSetRegExp>,
        lookahead: GlyphSetRegExp,
    ) -> Self {
        ChainingContextualRule {
            backtrack,
            input,
            lookahead,
        }
    }
}

/// `lookupflag ...`
///
/// Modifies the flags of the lookup it appears in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupFlagRule {
    flags: LookupFlag,
    mark_filtering_set: Option<GlyphSet>,
}

impl LookupFlagRule {
    /// Create a new rule with the given flags.
    pub fn new(flags: LookupFlag) -> Self {
        LookupFlagRule {
            flags,
            mark_filtering_set: None,
        }
    }

    /// Create a new rule from a raw flag word.
    pub fn from_bits(bits: u16) -> Self {
        Self::new(LookupFlag::from_bits_truncate(bits))
    }

    /// Create a rule that only sets a mark filtering set.
    pub fn with_mark_filtering_set(set: GlyphSet) -> Self {
        let mut rule = Self::default();
        rule.set_mark_filtering_set(set);
        rule
    }

    /// Add a flag.
    pub fn set_flag(&mut self, flag: LookupFlag) {
        self.flags |= flag;
    }

    /// Set the mark attachment class (the high byte of the flag word).
    pub fn set_mark_attachment_class(&mut self, class: u8) {
        let bits = (self.flags.to_bits() & !MARK_ATTACHMENT_MASK) | (u16::from(class) << 8);
        self.flags = LookupFlag::from_bits_truncate(bits);
    }

    /// Set the mark filtering set, replacing any existing one.
    pub fn set_mark_filtering_set(&mut self, set: GlyphSet) {
        self.flags |= LookupFlag::USE_MARK_FILTERING_SET;
        self.mark_filtering_set = Some(set);
    }

    /// Merge another rule into this one.
    ///
    /// Flag bits are unioned. A mark attachment class or mark filtering set
    /// in `other` replaces the one in `self`.
    pub fn combine(&mut self, other: LookupFlagRule) {
        self.flags = combine_flags(self.flags, other.flags);
        if let Some(set) = other.mark_filtering_set {
            self.mark_filtering_set = Some(set);
        }
    }

    /// The flags
    pub fn flags(&self) -> LookupFlag {
        self.flags
    }

    /// The mark filtering set, if any
    pub fn mark_filtering_set(&self) -> Option<&GlyphSet> {
        self.mark_filtering_set.as_ref()
    }
}

/// Union two flag words, letting a non-zero mark attachment class in `new`
/// replace the one in `old`.
pub(crate) fn combine_flags(old: LookupFlag, new: LookupFlag) -> LookupFlag {
    let (old, new) = (old.to_bits(), new.to_bits());
    let class = if new & MARK_ATTACHMENT_MASK != 0 {
        new & MARK_ATTACHMENT_MASK
    } else {
        old & MARK_ATTACHMENT_MASK
    };
    LookupFlag::from_bits_truncate(((old | new) & !MARK_ATTACHMENT_MASK) | class)
}
