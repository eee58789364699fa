//! Symbolic glyphs, classes and anchors

use std::fmt::{Display, Formatter};

use smol_str::SmolStr;

use crate::common::GlyphName;

/// A single glyph, by name or by numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Glyph {
    /// A glyph name, resolved through the layout database
    Name(GlyphName),
    /// A numeric glyph id, used as-is
    Cid(u16),
}

impl From<GlyphName> for Glyph {
    fn from(src: GlyphName) -> Self {
        Glyph::Name(src)
    }
}

impl From<&str> for Glyph {
    fn from(src: &str) -> Self {
        Glyph::Name(src.into())
    }
}

impl From<SmolStr> for Glyph {
    fn from(src: SmolStr) -> Self {
        Glyph::Name(src.into())
    }
}

impl Display for Glyph {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Glyph::Name(name) => write!(f, "{name}"),
            Glyph::Cid(cid) => write!(f, "Cid({cid})"),
        }
    }
}

/// One member of a [`GlyphClass`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassComponent {
    /// A single glyph
    Glyph(Glyph),
    /// A previously defined named class
    ClassName(SmolStr),
    /// Every glyph whose name matches a pattern.
    ///
    /// Unlike a named class, this may legitimately match nothing.
    RegExp(SmolStr),
}

impl From<Glyph> for ClassComponent {
    fn from(src: Glyph) -> Self {
        ClassComponent::Glyph(src)
    }
}

/// An ordered list of components whose glyphs are unioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GlyphClass {
    components: Vec<ClassComponent>,
}

impl GlyphClass {
    /// Create a class from a list of components.
    pub fn new(components: Vec<ClassComponent>) -> Self {
        GlyphClass { components }
    }

    /// A class that refers to a single named class.
    pub fn named(name: impl Into<SmolStr>) -> Self {
        Self::new(vec![ClassComponent::ClassName(name.into())])
    }

    /// A class that matches glyph names against a pattern.
    pub fn pattern(pattern: impl Into<SmolStr>) -> Self {
        Self::new(vec![ClassComponent::RegExp(pattern.into())])
    }

    /// The components of this class, in source order.
    pub fn components(&self) -> &[ClassComponent] {
        &self.components
    }
}

impl FromIterator<Glyph> for GlyphClass {
    fn from_iter<T: IntoIterator<Item = Glyph>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(ClassComponent::Glyph).collect())
    }
}

/// The symbolic operand of a rule: a class, a single glyph, or nothing.
///
/// `Empty` is an explicit absence, used where a context position is
/// unconstrained; it resolves to no glyphs at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum GlyphSet {
    /// A glyph class
    Class(GlyphClass),
    /// A single glyph
    Glyph(Glyph),
    /// No glyphs
    #[default]
    Empty,
}

impl GlyphSet {
    /// `true` if this is the explicit empty set.
    pub fn is_empty(&self) -> bool {
        matches!(self, GlyphSet::Empty)
    }
}

impl From<Glyph> for GlyphSet {
    fn from(src: Glyph) -> Self {
        GlyphSet::Glyph(src)
    }
}

impl From<GlyphClass> for GlyphSet {
    fn from(src: GlyphClass) -> Self {
        GlyphSet::Class(src)
    }
}

/// An attachment point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Explicitly no anchor
    Null,
    /// A named anchor, looked up in the layout database
    Name(SmolStr),
    /// A literal coordinate pair
    FormatA {
        /// The x coordinate
        x: i16,
        /// The y coordinate
        y: i16,
    },
    /// An anchor computed per glyph by a named function.
    ///
    /// These are evaluated by the table writer, not by the compiler.
    Function(SmolStr),
}
