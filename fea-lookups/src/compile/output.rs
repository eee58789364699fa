//! The result of a compilation pass

use indexmap::IndexMap;

use super::{
    error::{CompilationError, CompilerError},
    lookups::{AllLookups, FeatureKey, LayoutTable, Lookup, LookupId},
};

/// The lookups compiled for a set of features.
///
/// Features that failed to compile are absent, and have an entry in
/// [`errors`](Self::errors) instead. Every lookup listed here was compiled
/// for a feature that succeeded.
#[derive(Clone, Debug, Default)]
pub struct Compilation {
    lookups: AllLookups,
    features: IndexMap<FeatureKey, Vec<LookupId>>,
    errors: Vec<CompilationError>,
}

impl Compilation {
    pub(crate) fn new(
        lookups: AllLookups,
        features: IndexMap<FeatureKey, Vec<LookupId>>,
        errors: Vec<CompilationError>,
    ) -> Self {
        Compilation {
            lookups,
            features,
            errors,
        }
    }

    /// Return the lookup with this id.
    pub fn lookup(&self, id: LookupId) -> Option<&Lookup> {
        self.lookups.get(id)
    }

    /// Return the compiled lookup with this name.
    ///
    /// This includes synthetic lookups. A definition with no rules has no
    /// compiled lookup.
    pub fn lookup_by_name(&self, name: &str) -> Option<&Lookup> {
        self.lookup_index(name).and_then(|id| self.lookup(id))
    }

    /// Return the id of the compiled lookup with this name.
    pub fn lookup_index(&self, name: &str) -> Option<LookupId> {
        self.lookups.compiled(name).flatten()
    }

    /// The lookups used by a feature, in first-reference order.
    ///
    /// Returns `None` if the feature was not compiled for this table.
    pub fn feature_lookups(&self, table: LayoutTable, feature: &str) -> Option<Vec<&Lookup>> {
        let ids = self.features.get(&FeatureKey::new(table, feature))?;
        Some(ids.iter().filter_map(|id| self.lookup(*id)).collect())
    }

    /// Iterate the compiled features and their lookup ids, in compilation order.
    pub fn features(&self) -> impl Iterator<Item = (&FeatureKey, &[LookupId])> + '_ {
        self.features.iter().map(|(key, ids)| (key, ids.as_slice()))
    }

    /// The GSUB lookup list, indexed by [`LookupId::Gsub`].
    pub fn gsub_lookups(&self) -> &[Lookup] {
        self.lookups.gsub()
    }

    /// The GPOS lookup list, indexed by [`LookupId::Gpos`].
    pub fn gpos_lookups(&self) -> &[Lookup] {
        self.lookups.gpos()
    }

    /// Errors for the features that failed to compile.
    pub fn errors(&self) -> &[CompilationError] {
        &self.errors
    }

    /// `true` if every requested feature compiled.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a `Result`, failing if any feature failed.
    pub fn into_result(self) -> Result<Self, CompilerError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(CompilerError::CompilationFail(self.errors))
        }
    }
}
