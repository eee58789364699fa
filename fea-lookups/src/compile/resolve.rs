//! Resolving symbolic glyph references to glyph ids

use std::collections::{BTreeSet, HashMap};

use smol_str::SmolStr;

use crate::{
    ast::{Anchor, ClassComponent, ClassDefinition, Glyph, GlyphClass, GlyphSet, GlyphSetRegExp},
    common::{AnchorPoint, Coverage, GlyphId16, LayoutDatabase, LINE_BREAK_CID},
};

use super::{error::CompilationErrorKind, lookups::ResolvedAnchor};

type Result<T> = std::result::Result<T, CompilationErrorKind>;

/// Resolves glyphs, classes and anchors against a layout database.
///
/// Classes defined in the rules shadow classes of the same name in the
/// database. A definition that failed to resolve is remembered, and its error
/// is reported wherever the class is used.
pub(crate) struct Resolver<'a> {
    db: &'a dyn LayoutDatabase,
    classes: HashMap<SmolStr, Result<Coverage>>,
}

/// A saved set of class definitions.
pub(crate) struct ClassScope(HashMap<SmolStr, Result<Coverage>>);

impl<'a> Resolver<'a> {
    pub(crate) fn new(db: &'a dyn LayoutDatabase) -> Self {
        Resolver {
            db,
            classes: HashMap::new(),
        }
    }

    /// Create a resolver and define each class, in order.
    ///
    /// Failures are deferred until the class is referenced.
    pub(crate) fn with_classes(db: &'a dyn LayoutDatabase, classes: &[ClassDefinition]) -> Self {
        let mut resolver = Self::new(db);
        for def in classes {
            if let Err(e) = resolver.define_class(&def.name, &def.class) {
                log::debug!("class '@{}' did not resolve: {e}", def.name);
            }
        }
        resolver
    }

    /// The classes defined so far, for [`restore_scope`](Self::restore_scope).
    pub(crate) fn scope(&self) -> ClassScope {
        ClassScope(self.classes.clone())
    }

    /// Forget every class defined since `scope` was taken.
    pub(crate) fn restore_scope(&mut self, scope: ClassScope) {
        self.classes = scope.0;
    }

    pub(crate) fn define_class(&mut self, name: &SmolStr, class: &GlyphClass) -> Result<()> {
        let resolved = self.class(class);
        let result = resolved.as_ref().map(|_| ()).map_err(Clone::clone);
        if self.classes.insert(name.clone(), resolved).is_some() {
            log::warn!("class '@{name}' is redefined");
        }
        result
    }

    pub(crate) fn glyph(&self, glyph: &Glyph) -> Result<GlyphId16> {
        match glyph {
            Glyph::Name(name) => self
                .db
                .glyph_by_name(name.as_str())
                .ok_or_else(|| CompilationErrorKind::UnresolvedGlyph(name.clone())),
            Glyph::Cid(cid) => {
                if *cid == LINE_BREAK_CID {
                    log::trace!("cid {cid} is the line-break placeholder");
                }
                Ok(GlyphId16::new(*cid))
            }
        }
    }

    fn component(&self, component: &ClassComponent) -> Result<BTreeSet<GlyphId16>> {
        match component {
            ClassComponent::Glyph(glyph) => self.glyph(glyph).map(|gid| BTreeSet::from([gid])),
            ClassComponent::ClassName(name) => {
                let glyphs = match self.classes.get(name) {
                    Some(Ok(glyphs)) => glyphs.iter().collect(),
                    Some(Err(e)) => return Err(e.clone()),
                    None => self.db.class_by_name(name),
                };
                if glyphs.is_empty() {
                    return Err(CompilationErrorKind::EmptyClass(name.clone()));
                }
                Ok(glyphs)
            }
            ClassComponent::RegExp(pattern) => {
                let glyphs = self.db.glyphs_by_pattern(pattern);
                if glyphs.is_empty() {
                    log::debug!("pattern '{pattern}' matched no glyphs");
                }
                Ok(glyphs)
            }
        }
    }

    /// The union of every component of the class.
    pub(crate) fn class(&self, class: &GlyphClass) -> Result<Coverage> {
        let mut glyphs = BTreeSet::new();
        for component in class.components() {
            glyphs.extend(self.component(component)?);
        }
        Ok(glyphs.into())
    }

    pub(crate) fn glyph_set(&self, set: &GlyphSet) -> Result<Coverage> {
        match set {
            GlyphSet::Class(class) => self.class(class),
            GlyphSet::Glyph(glyph) => self.glyph(glyph).map(Coverage::from),
            GlyphSet::Empty => Ok(Coverage::empty()),
        }
    }

    /// Resolve each position of a sequence.
    pub(crate) fn sequence(&self, sequence: &[&GlyphSet]) -> Result<Vec<Coverage>> {
        sequence.iter().map(|set| self.glyph_set(set)).collect()
    }

    pub(crate) fn anchor(&self, anchor: &Anchor) -> Result<ResolvedAnchor> {
        match anchor {
            Anchor::Null => Ok(ResolvedAnchor::Null),
            Anchor::Name(name) => self
                .db
                .anchor_by_name(name)
                .map(ResolvedAnchor::Point)
                .ok_or_else(|| CompilationErrorKind::UnresolvedAnchor(name.clone())),
            Anchor::FormatA { x, y } => Ok(ResolvedAnchor::Point(AnchorPoint::new(*x, *y))),
            Anchor::Function(name) => Ok(ResolvedAnchor::Function(name.clone())),
        }
    }

    /// Every concrete glyph id sequence the expression denotes.
    ///
    /// Each position of each symbolic sequence is expanded to its glyphs,
    /// with earlier positions varying slowest.
    pub(crate) fn glyph_sequences(
        &self,
        regexp: &GlyphSetRegExp,
        limit: usize,
    ) -> Result<Vec<Vec<GlyphId16>>> {
        let symbolic = regexp.count();
        if symbolic > limit {
            return Err(CompilationErrorKind::SequenceExplosion {
                count: symbolic,
                limit,
            });
        }
        let resolved = regexp
            .sequences()
            .iter()
            .map(|seq| self.sequence(seq))
            .collect::<Result<Vec<_>>>()?;
        let count = resolved
            .iter()
            .map(|positions| {
                positions
                    .iter()
                    .fold(1usize, |acc, glyphs| acc.saturating_mul(glyphs.len()))
            })
            .fold(0usize, usize::saturating_add);
        if count > limit {
            return Err(CompilationErrorKind::SequenceExplosion { count, limit });
        }

        let mut result = Vec::with_capacity(count);
        for positions in &resolved {
            let mut expanded = vec![Vec::new()];
            for glyphs in positions {
                expanded = expanded
                    .iter()
                    .flat_map(|prefix: &Vec<GlyphId16>| {
                        glyphs.iter().map(move |gid| {
                            let mut next = prefix.clone();
                            next.push(gid);
                            next
                        })
                    })
                    .collect();
            }
            result.extend(expanded);
        }
        Ok(result)
    }
}
