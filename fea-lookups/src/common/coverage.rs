use std::{collections::BTreeSet, rc::Rc};

use super::GlyphId16;

/// A resolved set of glyphs, sorted by glyph id and deduplicated.
///
/// This is what every symbolic glyph reference ultimately resolves to, and
/// the ordering is what makes emitted subtables reproducible.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coverage(Rc<[GlyphId16]>);

impl Coverage {
    /// The glyphs in this set, in ascending order.
    pub fn glyphs(&self) -> &[GlyphId16] {
        &self.0
    }

    /// An empty coverage set
    pub fn empty() -> Self {
        Self(Rc::new([]))
    }

    /// Iterate the glyphs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = GlyphId16> + '_ {
        self.glyphs().iter().copied()
    }

    /// The number of glyphs in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if the set has no glyphs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if the glyph is a member of this set.
    pub fn contains(&self, gid: GlyphId16) -> bool {
        self.0.binary_search(&gid).is_ok()
    }
}

impl Default for Coverage {
    fn default() -> Self {
        Coverage::empty()
    }
}

impl std::iter::FromIterator<GlyphId16> for Coverage {
    fn from_iter<T: IntoIterator<Item = GlyphId16>>(iter: T) -> Self {
        iter.into_iter().collect::<BTreeSet<_>>().into()
    }
}

impl<'a> std::iter::IntoIterator for &'a Coverage {
    type Item = &'a GlyphId16;

    type IntoIter = std::slice::Iter<'a, GlyphId16>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<BTreeSet<GlyphId16>> for Coverage {
    fn from(src: BTreeSet<GlyphId16>) -> Coverage {
        Coverage(src.into_iter().collect())
    }
}

impl From<GlyphId16> for Coverage {
    fn from(src: GlyphId16) -> Coverage {
        let slice: &[_] = &[src];
        Coverage(slice.into())
    }
}
