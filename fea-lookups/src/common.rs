//! Types and helpers shared across modules

use std::{
    collections::{BTreeSet, HashMap},
    fmt::{Debug, Display},
};

use smol_str::SmolStr;

pub use write_fonts::types::GlyphId16;

mod coverage;
mod glyph_map;

pub use coverage::Coverage;
pub use glyph_map::GlyphMap;

/// The cid reserved as a line-break placeholder.
///
/// Cids are passed through without consulting the glyph database; this one is
/// special only in that it never names a real glyph.
pub const LINE_BREAK_CID: u16 = 10;

/// The name of a glyph.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlyphName(SmolStr);

impl GlyphName {
    /// The name of the undefined glyph
    pub const NOTDEF: GlyphName = GlyphName(SmolStr::new_inline(".notdef"));

    /// Create a new glyph name.
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s))
    }

    /// The name, as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for GlyphName {
    fn from(value: String) -> Self {
        GlyphName(value.into())
    }
}

impl From<&str> for GlyphName {
    fn from(value: &str) -> Self {
        GlyphName(value.into())
    }
}

impl From<SmolStr> for GlyphName {
    fn from(value: SmolStr) -> Self {
        GlyphName(value)
    }
}

impl Debug for GlyphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for GlyphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for GlyphName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// this means if you have a HashMap<GlyphName, _> you can use &str to look
// up an item
impl std::borrow::Borrow<str> for GlyphName {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

/// A concrete anchor position, in font units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AnchorPoint {
    /// The x coordinate
    pub x: i16,
    /// The y coordinate
    pub y: i16,
}

impl AnchorPoint {
    /// Create a new anchor at the given coordinates.
    pub const fn new(x: i16, y: i16) -> Self {
        AnchorPoint { x, y }
    }
}

/// The glyph and anchor database that symbolic references resolve against.
///
/// The compiler never mutates the database, and assumes that answers are
/// stable for the duration of a compilation pass.
pub trait LayoutDatabase {
    /// Return the glyph id for a glyph name, if the glyph exists.
    fn glyph_by_name(&self, name: &str) -> Option<GlyphId16>;

    /// Return the members of a named class.
    ///
    /// Unknown classes return the empty set.
    fn class_by_name(&self, name: &str) -> BTreeSet<GlyphId16>;

    /// Return every glyph whose name matches the provided pattern.
    fn glyphs_by_pattern(&self, pattern: &str) -> BTreeSet<GlyphId16>;

    /// Return the position of a named anchor, if it exists.
    fn anchor_by_name(&self, name: &str) -> Option<AnchorPoint>;
}

/// A simple in-memory [`LayoutDatabase`].
///
/// Glyph ids are assigned by the [`GlyphMap`]; classes and anchors are added
/// with the builder-style methods.
#[derive(Clone, Debug, Default)]
pub struct LayoutDb {
    glyphs: GlyphMap,
    classes: HashMap<SmolStr, BTreeSet<GlyphId16>>,
    anchors: HashMap<SmolStr, AnchorPoint>,
}

impl LayoutDb {
    /// Create a new database from a glyph map.
    pub fn new(glyphs: GlyphMap) -> Self {
        LayoutDb {
            glyphs,
            ..Default::default()
        }
    }

    /// The glyph map backing this database.
    pub fn glyph_map(&self) -> &GlyphMap {
        &self.glyphs
    }

    /// Add a named class, whose members are given by glyph name.
    ///
    /// Names that are not in the glyph map are skipped.
    pub fn with_class<'a>(
        mut self,
        name: impl Into<SmolStr>,
        members: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let name = name.into();
        let mut ids = BTreeSet::new();
        for member in members {
            match self.glyphs.get(member) {
                Some(id) => {
                    ids.insert(id);
                }
                None => log::warn!("class '{name}' member '{member}' is not in the glyph map"),
            }
        }
        self.classes.insert(name, ids);
        self
    }

    /// Add a named anchor.
    pub fn with_anchor(mut self, name: impl Into<SmolStr>, x: i16, y: i16) -> Self {
        self.anchors.insert(name.into(), AnchorPoint::new(x, y));
        self
    }
}

impl LayoutDatabase for LayoutDb {
    fn glyph_by_name(&self, name: &str) -> Option<GlyphId16> {
        self.glyphs.get(name)
    }

    fn class_by_name(&self, name: &str) -> BTreeSet<GlyphId16> {
        self.classes.get(name).cloned().unwrap_or_default()
    }

    fn glyphs_by_pattern(&self, pattern: &str) -> BTreeSet<GlyphId16> {
        self.glyphs.matching(pattern)
    }

    fn anchor_by_name(&self, name: &str) -> Option<AnchorPoint> {
        self.anchors.get(name).copied()
    }
}
