use std::{
    collections::{BTreeSet, HashMap},
    iter::FromIterator,
};

use regex::Regex;

use super::{GlyphId16, GlyphName};

/// A glyph map for mapping from glyph names to numeral `GlyphId16`s.
///
/// Glyph ids are assigned in order, so the easiest way to construct this type
/// is by calling `collect()` on an iterator of names in glyph order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphMap {
    names: HashMap<GlyphName, GlyphId16>,
    order: Vec<GlyphName>,
}

impl GlyphMap {
    /// The total number of glyphs
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if this map contains no glyphs
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Return `true` if the map contains a glyph with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Return the `GlyphId16` for the provided name
    pub fn get(&self, name: &str) -> Option<GlyphId16> {
        self.names.get(name).copied()
    }

    /// Return the name of the glyph with the provided id.
    pub fn name(&self, id: GlyphId16) -> Option<&GlyphName> {
        self.order.get(id.to_u16() as usize)
    }

    /// Iterate the names in this map, in GID order.
    pub fn iter(&self) -> impl Iterator<Item = &GlyphName> + '_ {
        self.order.iter()
    }

    /// Return the ids of every glyph whose entire name matches `pattern`.
    ///
    /// An invalid pattern matches nothing.
    pub fn matching(&self, pattern: &str) -> BTreeSet<GlyphId16> {
        let re = match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(re) => re,
            Err(e) => {
                log::warn!("invalid glyph name pattern '{pattern}': {e}");
                return BTreeSet::new();
            }
        };
        self.order
            .iter()
            .filter(|name| re.is_match(name.as_str()))
            .filter_map(|name| self.get(name.as_str()))
            .collect()
    }
}

impl FromIterator<GlyphName> for GlyphMap {
    fn from_iter<T: IntoIterator<Item = GlyphName>>(iter: T) -> Self {
        let mut map = GlyphMap::default();
        for name in iter {
            if map.names.contains_key(&name) {
                log::warn!("duplicate glyph name '{name}' in glyph order");
                continue;
            }
            let Ok(raw) = u16::try_from(map.order.len()) else {
                log::warn!("glyph order exceeds {} glyphs, truncating", u16::MAX);
                break;
            };
            map.names.insert(name.clone(), GlyphId16::new(raw));
            map.order.push(name);
        }
        map
    }
}
