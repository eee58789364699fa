//! The registry of named definitions

use std::collections::HashSet;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{
    ast::{
        ClassDefinition, FeaRoot, FeatureDefinition, GlyphSetRegExp, LookupDefinition,
        LookupReference, LookupStatement, Statement,
    },
    common::{GlyphId16, LayoutDatabase},
};

use super::{
    compile_ctx::CompilationCtx,
    error::{CompilationErrorKind, RegistryError},
    lookups::LayoutTable,
    opts::Opts,
    output::Compilation,
    resolve::Resolver,
};

/// Named feature, lookup and class definitions, ready to be compiled.
///
/// This is populated once, by whoever builds the AST, and is not modified by
/// compilation. Lookup definitions nested in a feature or lookup are moved
/// into the registry when their container is added, and replaced in place by
/// a reference, so every lookup can be found by name.
#[derive(Clone, Debug, Default)]
pub struct FeaContext {
    lookups: IndexMap<SmolStr, LookupDefinition>,
    features: IndexMap<SmolStr, FeatureDefinition>,
    classes: Vec<ClassDefinition>,
}

/// The features to compile, and the table each is compiled for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureList {
    features: Vec<(LayoutTable, SmolStr)>,
}

impl FeatureList {
    /// Create a new, empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a GSUB feature.
    pub fn gsub(mut self, feature: impl Into<SmolStr>) -> Self {
        self.push(LayoutTable::Gsub, feature);
        self
    }

    /// Add a GPOS feature.
    pub fn gpos(mut self, feature: impl Into<SmolStr>) -> Self {
        self.push(LayoutTable::Gpos, feature);
        self
    }

    /// Add a feature for a table.
    pub fn push(&mut self, table: LayoutTable, feature: impl Into<SmolStr>) {
        self.features.push((table, feature.into()));
    }

    /// Iterate the features, in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = (LayoutTable, &SmolStr)> + '_ {
        self.features.iter().map(|(table, name)| (*table, name))
    }
}

impl FeaContext {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every top-level statement of a program.
    pub fn from_root(root: FeaRoot) -> Result<Self, RegistryError> {
        let mut ctx = Self::new();
        for statement in root.statements {
            ctx.add_statement(statement)?;
        }
        Ok(ctx)
    }

    /// Register a top-level statement.
    ///
    /// Only features, lookups and class definitions may appear at the top
    /// level.
    pub fn add_statement(&mut self, statement: Statement) -> Result<(), RegistryError> {
        match statement {
            Statement::Feature(feature) => self.add_feature(feature),
            Statement::Lookup(LookupStatement::LookupDefinition(lookup)) => self.add_lookup(lookup),
            Statement::Lookup(LookupStatement::ClassDefinition(class)) => {
                self.add_class(class);
                Ok(())
            }
            Statement::Lookup(other) => Err(RegistryError::UnexpectedTopLevel(other.kind_name())),
        }
    }

    /// Register a feature definition.
    ///
    /// Nothing is registered if any name is a duplicate.
    pub fn add_feature(&mut self, mut feature: FeatureDefinition) -> Result<(), RegistryError> {
        if self.features.contains_key(feature.name()) {
            return Err(RegistryError::DuplicateFeature(feature.name().clone()));
        }
        self.check_nested_lookups(feature.statements(), &mut HashSet::new())?;
        self.hoist_lookups(feature.statements_mut());
        log::trace!("registered feature '{}'", feature.name());
        self.features.insert(feature.name().clone(), feature);
        Ok(())
    }

    /// Register a lookup definition.
    ///
    /// Nothing is registered if any name is a duplicate.
    pub fn add_lookup(&mut self, mut lookup: LookupDefinition) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        self.check_lookup_name(lookup.name(), &mut seen)?;
        self.check_nested_lookups(lookup.statements(), &mut seen)?;
        self.hoist_lookups(lookup.statements_mut());
        log::trace!("registered lookup '{}'", lookup.name());
        self.lookups.insert(lookup.name().clone(), lookup);
        Ok(())
    }

    /// Register a top-level class definition.
    ///
    /// Top-level classes are resolved in the order they are added, before
    /// any feature is compiled.
    pub fn add_class(&mut self, class: ClassDefinition) {
        self.classes.push(class);
    }

    fn check_lookup_name(
        &self,
        name: &SmolStr,
        seen: &mut HashSet<SmolStr>,
    ) -> Result<(), RegistryError> {
        if self.lookups.contains_key(name) || !seen.insert(name.clone()) {
            return Err(RegistryError::DuplicateLookup(name.clone()));
        }
        Ok(())
    }

    fn check_nested_lookups(
        &self,
        statements: &[LookupStatement],
        seen: &mut HashSet<SmolStr>,
    ) -> Result<(), RegistryError> {
        for statement in statements {
            if let LookupStatement::LookupDefinition(def) = statement {
                self.check_lookup_name(def.name(), seen)?;
                self.check_nested_lookups(def.statements(), seen)?;
            }
        }
        Ok(())
    }

    // names must already be checked
    fn hoist_lookups(&mut self, statements: &mut [LookupStatement]) {
        for statement in statements.iter_mut() {
            let LookupStatement::LookupDefinition(def) = statement else {
                continue;
            };
            let reference = LookupReference::new(def.name().clone());
            let LookupStatement::LookupDefinition(mut def) =
                std::mem::replace(statement, reference.into())
            else {
                continue;
            };
            self.hoist_lookups(def.statements_mut());
            log::trace!("registered nested lookup '{}'", def.name());
            self.lookups.insert(def.name().clone(), def);
        }
    }

    /// The lookup definition with this name
    pub fn lookup(&self, name: &str) -> Option<&LookupDefinition> {
        self.lookups.get(name)
    }

    /// The feature definition with this name
    pub fn feature(&self, name: &str) -> Option<&FeatureDefinition> {
        self.features.get(name)
    }

    /// Iterate lookup definitions, in registration order.
    pub fn lookups(&self) -> impl Iterator<Item = &LookupDefinition> + '_ {
        self.lookups.values()
    }

    /// Iterate feature definitions, in registration order.
    pub fn features(&self) -> impl Iterator<Item = &FeatureDefinition> + '_ {
        self.features.values()
    }

    pub(crate) fn classes(&self) -> &[ClassDefinition] {
        &self.classes
    }

    /// Compile the requested features.
    ///
    /// Each feature is compiled independently: a feature that fails is
    /// reported in [`Compilation::errors`] and contributes no lookups, and
    /// does not prevent later features from compiling. Lookups shared between
    /// features are compiled once.
    pub fn populate_features(
        &self,
        db: &dyn LayoutDatabase,
        features: &FeatureList,
        opts: &Opts,
    ) -> Compilation {
        let mut ctx = CompilationCtx::new(self, db, opts);
        for (table, feature) in features.iter() {
            if !opts.compiles(table) {
                log::debug!("skipping feature '{feature}', {table} is disabled");
                continue;
            }
            ctx.compile_feature(table, feature);
        }
        ctx.build()
    }

    /// Compile every registered feature for a table, in registration order.
    pub fn populate_all(
        &self,
        db: &dyn LayoutDatabase,
        table: LayoutTable,
        opts: &Opts,
    ) -> Compilation {
        let mut features = FeatureList::new();
        for name in self.features.keys() {
            features.push(table, name.clone());
        }
        self.populate_features(db, &features, opts)
    }

    /// Every concrete glyph sequence an expression denotes.
    ///
    /// Classes resolve against the top-level class definitions and then the
    /// database. Fails if the expansion would exceed `opts`' sequence limit.
    pub fn glyph_sequences(
        &self,
        db: &dyn LayoutDatabase,
        regexp: &GlyphSetRegExp,
        opts: &Opts,
    ) -> Result<Vec<Vec<GlyphId16>>, CompilationErrorKind> {
        Resolver::with_classes(db, &self.classes).glyph_sequences(regexp, opts.max_sequences)
    }
}
