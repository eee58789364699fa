//! Glyph sequence expressions and the sequence algebra.
//!
//! A [`GlyphSetRegExp`] denotes a list of fixed-length sequences of
//! [`GlyphSet`]s. Concatenation takes the cross product of its operands
//! (left operand varies slowest) and alternation appends the right operand's
//! sequences to the left operand's, without deduplication.

use smol_str::SmolStr;

use super::{
    glyphs::{Glyph, GlyphSet},
    rules::{CursiveRule, SingleAdjustmentRule, ValueRecord},
};

/// One sequence denoted by a [`GlyphSetRegExp`].
///
/// Positions borrow from the expression; they are resolved to glyph ids by
/// whoever consumes the sequence.
pub type Sequence<'a> = Vec<&'a GlyphSet>;

/// An expression denoting a set of glyph sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlyphSetRegExp {
    /// A single position; the empty set denotes the empty sequence
    Single(GlyphSet),
    /// A literal run of glyphs; an empty run denotes the empty sequence
    Glyphs(Vec<GlyphSet>),
    /// Concatenation
    Sequence(Box<GlyphSetRegExp>, Box<GlyphSetRegExp>),
    /// Alternation
    Or(Box<GlyphSetRegExp>, Box<GlyphSetRegExp>),
}

impl GlyphSetRegExp {
    /// An expression denoting only the empty sequence.
    pub fn empty() -> Self {
        GlyphSetRegExp::Single(GlyphSet::Empty)
    }

    /// A single position.
    pub fn single(set: impl Into<GlyphSet>) -> Self {
        GlyphSetRegExp::Single(set.into())
    }

    /// A literal run of glyphs.
    pub fn glyphs(glyphs: impl IntoIterator<Item = Glyph>) -> Self {
        GlyphSetRegExp::Glyphs(glyphs.into_iter().map(GlyphSet::Glyph).collect())
    }

    /// `left` followed by `right`.
    pub fn seq(left: GlyphSetRegExp, right: GlyphSetRegExp) -> Self {
        GlyphSetRegExp::Sequence(Box::new(left), Box::new(right))
    }

    /// Either `left` or `right`.
    pub fn or(left: GlyphSetRegExp, right: GlyphSetRegExp) -> Self {
        GlyphSetRegExp::Or(Box::new(left), Box::new(right))
    }

    /// The number of sequences [`sequences`](Self::sequences) would return.
    ///
    /// This does not materialize anything, and saturates instead of
    /// overflowing, so it can be used to bound an expansion before doing it.
    pub fn count(&self) -> usize {
        match self {
            GlyphSetRegExp::Single(_) | GlyphSetRegExp::Glyphs(_) => 1,
            GlyphSetRegExp::Sequence(left, right) => left.count().saturating_mul(right.count()),
            GlyphSetRegExp::Or(left, right) => left.count().saturating_add(right.count()),
        }
    }

    /// Every sequence this expression denotes, in a stable order.
    pub fn sequences(&self) -> Vec<Sequence<'_>> {
        match self {
            GlyphSetRegExp::Single(set) if set.is_empty() => vec![Vec::new()],
            GlyphSetRegExp::Single(set) => vec![vec![set]],
            GlyphSetRegExp::Glyphs(sets) => vec![sets.iter().collect()],
            GlyphSetRegExp::Sequence(left, right) => {
                let right = right.sequences();
                left.sequences()
                    .into_iter()
                    .flat_map(|head| {
                        right.iter().map(move |tail| {
                            let mut seq = head.clone();
                            seq.extend(tail.iter().copied());
                            seq
                        })
                    })
                    .collect()
            }
            GlyphSetRegExp::Or(left, right) => {
                let mut result = left.sequences();
                result.extend(right.sequences());
                result
            }
        }
    }
}

impl From<GlyphSet> for GlyphSetRegExp {
    fn from(src: GlyphSet) -> Self {
        GlyphSetRegExp::Single(src)
    }
}

/// What happens at one input position of a chaining rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PositionAction {
    /// The position is only matched
    None,
    /// A named lookup is applied at this position
    Lookup(SmolStr),
    /// An inline rule is applied at this position.
    ///
    /// The compiler wraps it in a synthetic lookup.
    Inline(InlineRule),
}

/// A rule written directly at a chaining input position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InlineRule {
    /// A single adjustment
    SinglePos(SingleAdjustmentRule),
    /// A cursive attachment
    Cursive(CursiveRule),
}

/// One position in the input sequence of a chaining rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkedGlyphSetRegExp {
    /// The glyphs matched at this position
    pub regexp: GlyphSetRegExp,
    /// What to apply at this position
    pub action: PositionAction,
}

impl MarkedGlyphSetRegExp {
    /// A position that is matched but not modified.
    pub fn new(regexp: impl Into<GlyphSetRegExp>) -> Self {
        MarkedGlyphSetRegExp {
            regexp: regexp.into(),
            action: PositionAction::None,
        }
    }

    /// A position with a named lookup applied.
    pub fn with_lookup(regexp: impl Into<GlyphSetRegExp>, lookup: impl Into<SmolStr>) -> Self {
        MarkedGlyphSetRegExp {
            regexp: regexp.into(),
            action: PositionAction::Lookup(lookup.into()),
        }
    }

    /// A position with an inline rule applied.
    pub fn with_rule(glyphs: GlyphSet, rule: InlineRule) -> Self {
        MarkedGlyphSetRegExp {
            regexp: GlyphSetRegExp::Single(glyphs),
            action: PositionAction::Inline(rule),
        }
    }

    /// A position adjusted by a value record.
    ///
    /// The adjustment applies to the same glyphs that are matched.
    pub fn with_value_record(glyphs: GlyphSet, value: ValueRecord) -> Self {
        let rule = SingleAdjustmentRule::new(glyphs.clone(), value);
        Self::with_rule(glyphs, InlineRule::SinglePos(rule))
    }

    /// A position with a cursive attachment applied.
    pub fn with_cursive(glyphs: GlyphSet, rule: CursiveRule) -> Self {
        Self::with_rule(glyphs, InlineRule::Cursive(rule))
    }
}
