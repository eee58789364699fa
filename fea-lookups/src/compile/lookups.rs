//! Compiled lookups and the bookkeeping around them

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{Display, Formatter},
};

use smol_str::SmolStr;
use write_fonts::tables::layout::LookupFlag;

use crate::{
    ast::{GlyphExpansion, StartEndLig, ValueRecord},
    common::{AnchorPoint, Coverage, GlyphId16},
};

/// The table a lookup or feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayoutTable {
    /// Glyph substitution
    Gsub,
    /// Glyph positioning
    Gpos,
}

impl Display for LayoutTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutTable::Gsub => f.write_str("GSUB"),
            LayoutTable::Gpos => f.write_str("GPOS"),
        }
    }
}

/// The type of a compiled lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum LookupType {
    SingleSubstitution,
    LigatureSubstitution,
    ChainingSubstitution,
    SinglePositioning,
    CursivePositioning,
    MarkToBase,
    MarkToMark,
    ChainingPositioning,
    /// No rules have been added yet
    #[default]
    None,
}

impl LookupType {
    /// The table lookups of this type belong to.
    pub fn table(self) -> Option<LayoutTable> {
        match self {
            LookupType::SingleSubstitution
            | LookupType::LigatureSubstitution
            | LookupType::ChainingSubstitution => Some(LayoutTable::Gsub),
            LookupType::SinglePositioning
            | LookupType::CursivePositioning
            | LookupType::MarkToBase
            | LookupType::MarkToMark
            | LookupType::ChainingPositioning => Some(LayoutTable::Gpos),
            LookupType::None => None,
        }
    }

    /// The chaining type for a table.
    pub(crate) fn chaining(table: LayoutTable) -> Self {
        match table {
            LayoutTable::Gsub => LookupType::ChainingSubstitution,
            LayoutTable::Gpos => LookupType::ChainingPositioning,
        }
    }
}

impl Display for LookupType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LookupType::SingleSubstitution => "single substitution",
            LookupType::LigatureSubstitution => "ligature substitution",
            LookupType::ChainingSubstitution => "chaining substitution",
            LookupType::SinglePositioning => "single positioning",
            LookupType::CursivePositioning => "cursive positioning",
            LookupType::MarkToBase => "mark-to-base",
            LookupType::MarkToMark => "mark-to-mark",
            LookupType::ChainingPositioning => "chaining positioning",
            LookupType::None => "empty",
        };
        f.write_str(name)
    }
}

/// An anchor after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedAnchor {
    /// No anchor
    Null,
    /// A concrete position
    Point(AnchorPoint),
    /// An anchor computed per glyph by the table writer
    Function(SmolStr),
}

/// One mark class in a mark attachment subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MarkClassRecord {
    pub class_name: SmolStr,
    pub marks: Coverage,
    pub base_anchor: ResolvedAnchor,
    pub mark_anchor: ResolvedAnchor,
}

/// One input position of a compiled chaining rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPosition {
    /// The glyphs matched at this position
    pub glyphs: Coverage,
    /// The lookup applied at this position, if any
    pub lookup: Option<SmolStr>,
}

/// One fully expanded chaining rule.
///
/// All three sequences are in logical (reading) order; the backtrack is not
/// reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ChainRule {
    pub backtrack: Vec<Coverage>,
    pub input: Vec<ChainPosition>,
    pub lookahead: Vec<Coverage>,
}

impl ChainRule {
    /// The lookups applied by this rule, with their input position.
    pub fn lookups(&self) -> impl Iterator<Item = (usize, &SmolStr)> + '_ {
        self.input
            .iter()
            .enumerate()
            .filter_map(|(i, pos)| pos.lookup.as_ref().map(|name| (i, name)))
    }
}

/// One compiled rule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Subtable {
    /// A one-to-one mapping, or an expansion adjustment
    SingleSubstitution {
        mapping: BTreeMap<GlyphId16, GlyphId16>,
        format: u16,
        expansion: Option<GlyphExpansion>,
        lig_marker: StartEndLig,
    },
    LigatureSubstitution {
        components: Vec<GlyphId16>,
        ligature: GlyphId16,
    },
    SingleAdjustment {
        glyphs: Coverage,
        value: ValueRecord,
        color: bool,
    },
    Cursive {
        glyphs: Coverage,
        entry: ResolvedAnchor,
        exit: ResolvedAnchor,
    },
    MarkAttachment {
        bases: Coverage,
        classes: Vec<MarkClassRecord>,
    },
    /// Every expansion of a single chaining rule
    ChainingContext { rules: Vec<ChainRule> },
}

/// A compiled lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    name: SmolStr,
    table: LayoutTable,
    kind: LookupType,
    flags: LookupFlag,
    mark_filtering_set: Option<Coverage>,
    subtables: Vec<Subtable>,
}

impl Lookup {
    /// The lookup's name; synthetic lookups have generated names
    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    /// The table this lookup belongs to
    pub fn table(&self) -> LayoutTable {
        self.table
    }

    /// The type shared by every subtable
    pub fn kind(&self) -> LookupType {
        self.kind
    }

    /// The lookup flags
    pub fn flags(&self) -> LookupFlag {
        self.flags
    }

    /// The mark filtering set, if the flags use one
    pub fn mark_filtering_set(&self) -> Option<&Coverage> {
        self.mark_filtering_set.as_ref()
    }

    /// The subtables, in the order the rules were declared
    pub fn subtables(&self) -> &[Subtable] {
        &self.subtables
    }
}

/// Accumulates subtables for the lookup currently being compiled.
#[derive(Clone, Debug, Default)]
pub(crate) struct LookupBuilder {
    kind: LookupType,
    flags: LookupFlag,
    mark_filtering_set: Option<Coverage>,
    subtables: Vec<Subtable>,
}

impl LookupBuilder {
    pub(crate) fn with_flags(flags: LookupFlag, mark_filtering_set: Option<Coverage>) -> Self {
        LookupBuilder {
            flags,
            mark_filtering_set,
            ..Default::default()
        }
    }

    pub(crate) fn kind(&self) -> LookupType {
        self.kind
    }

    pub(crate) fn flags(&self) -> LookupFlag {
        self.flags
    }

    pub(crate) fn mark_filtering_set(&self) -> Option<&Coverage> {
        self.mark_filtering_set.as_ref()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.subtables.is_empty()
    }

    pub(crate) fn has_flags(&self, flags: LookupFlag, mark_set: Option<&Coverage>) -> bool {
        self.flags == flags && self.mark_filtering_set.as_ref() == mark_set
    }

    pub(crate) fn set_flags(&mut self, flags: LookupFlag, mark_set: Option<Coverage>) {
        self.flags = flags;
        self.mark_filtering_set = mark_set;
    }

    /// The caller is responsible for checking that `kind` matches.
    pub(crate) fn push(&mut self, kind: LookupType, subtable: Subtable) {
        self.kind = kind;
        self.subtables.push(subtable);
    }

    /// Take the accumulated subtables as a lookup, keeping the flags.
    ///
    /// Returns `None` if no rules were added.
    pub(crate) fn finish(&mut self, name: SmolStr) -> Option<Lookup> {
        let table = self.kind.table()?;
        Some(Lookup {
            name,
            table,
            kind: std::mem::take(&mut self.kind),
            flags: self.flags,
            mark_filtering_set: self.mark_filtering_set.clone(),
            subtables: std::mem::take(&mut self.subtables),
        })
    }
}

/// IDs assigned to lookups during compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub enum LookupId {
    /// An id for a GSUB lookup
    Gsub(usize),
    /// An id for a GPOS lookup
    Gpos(usize),
}

impl LookupId {
    /// The table this lookup belongs to
    pub fn table(self) -> LayoutTable {
        match self {
            LookupId::Gsub(_) => LayoutTable::Gsub,
            LookupId::Gpos(_) => LayoutTable::Gpos,
        }
    }

    /// The index of the lookup in its table's lookup list
    pub fn to_raw(self) -> usize {
        match self {
            LookupId::Gsub(idx) | LookupId::Gpos(idx) => idx,
        }
    }
}

/// A feature, qualified by the table it is compiled for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureKey {
    /// The table
    pub table: LayoutTable,
    /// The feature name
    pub feature: SmolStr,
}

impl FeatureKey {
    /// Create a new feature key.
    pub fn new(table: LayoutTable, feature: impl Into<SmolStr>) -> Self {
        FeatureKey {
            table,
            feature: feature.into(),
        }
    }
}

/// The lengths of the two lookup lists at some point in time.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Checkpoint {
    gsub: usize,
    gpos: usize,
}

/// Every lookup compiled so far, plus the name index.
#[derive(Clone, Debug, Default)]
pub(crate) struct AllLookups {
    gsub: Vec<Lookup>,
    gpos: Vec<Lookup>,
    // 'None' marks a definition that compiled to no rules
    named: HashMap<SmolStr, Option<LookupId>>,
}

impl AllLookups {
    pub(crate) fn insert(&mut self, lookup: Lookup) -> LookupId {
        let name = lookup.name.clone();
        let id = match lookup.table {
            LayoutTable::Gsub => {
                self.gsub.push(lookup);
                LookupId::Gsub(self.gsub.len() - 1)
            }
            LayoutTable::Gpos => {
                self.gpos.push(lookup);
                LookupId::Gpos(self.gpos.len() - 1)
            }
        };
        self.named.insert(name, Some(id));
        id
    }

    pub(crate) fn insert_empty(&mut self, name: SmolStr) {
        self.named.insert(name, None);
    }

    /// `Some` if a lookup with this name has been compiled.
    pub(crate) fn compiled(&self, name: &str) -> Option<Option<LookupId>> {
        self.named.get(name).copied()
    }

    pub(crate) fn get(&self, id: LookupId) -> Option<&Lookup> {
        match id {
            LookupId::Gsub(idx) => self.gsub.get(idx),
            LookupId::Gpos(idx) => self.gpos.get(idx),
        }
    }

    pub(crate) fn gsub(&self) -> &[Lookup] {
        &self.gsub
    }

    pub(crate) fn gpos(&self) -> &[Lookup] {
        &self.gpos
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            gsub: self.gsub.len(),
            gpos: self.gpos.len(),
        }
    }

    /// Discard every lookup added since the checkpoint.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.gsub.truncate(checkpoint.gsub);
        self.gpos.truncate(checkpoint.gpos);
        self.named.retain(|_, id| match id {
            Some(LookupId::Gsub(idx)) => *idx < checkpoint.gsub,
            Some(LookupId::Gpos(idx)) => *idx < checkpoint.gpos,
            None => true,
        });
    }
}
