//! The compilation pass
//!
//! [`CompilationCtx`] walks feature definitions, compiling the statements
//! they contain into lookups. Lookups are compiled on demand, the first time
//! they are referenced, and reused afterwards.

use std::collections::HashSet;

use indexmap::IndexMap;
use smol_str::SmolStr;
use write_fonts::tables::layout::LookupFlag;

use crate::{
    ast::{
        combine_flags, ChainingContextualRule, CursiveRule, GlyphSetRegExp, InlineRule,
        LigatureSubstitutionRule, LookupDefinition, LookupFlagRule, LookupStatement,
        Mark2BaseRule, MarkAttachKind, PositionAction, SingleAdjustmentRule,
        SingleSubstitutionRule, SubstTarget,
    },
    common::{Coverage, LayoutDatabase},
};

use super::{
    context::FeaContext,
    error::{CompilationError, CompilationErrorKind},
    lookups::{
        AllLookups, ChainPosition, ChainRule, FeatureKey, LayoutTable, LookupBuilder, LookupId,
        LookupType, MarkClassRecord, Subtable,
    },
    opts::Opts,
    output::Compilation,
    resolve::Resolver,
};

const AUTO_LOOKUP_PREFIX: &str = "auto-lookup-";

/// An error that has not yet been attributed to a feature.
#[derive(Debug)]
struct Failure {
    lookup: Option<SmolStr>,
    kind: CompilationErrorKind,
}

impl Failure {
    // the innermost lookup wins
    fn in_lookup(mut self, name: &SmolStr) -> Self {
        if self.lookup.is_none() {
            self.lookup = Some(name.clone());
        }
        self
    }
}

impl From<CompilationErrorKind> for Failure {
    fn from(kind: CompilationErrorKind) -> Self {
        Failure { lookup: None, kind }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FrameKind {
    /// Rules go into implicit lookups, split as needed
    Feature,
    /// Rules go into a single lookup, which must have one type
    #[default]
    Lookup,
}

/// The lookup being accumulated, and where it will go.
#[derive(Debug, Default)]
struct Frame {
    kind: FrameKind,
    builder: LookupBuilder,
    // lookups already merged into this one
    visited: HashSet<SmolStr>,
}

impl Frame {
    fn feature() -> Self {
        Frame {
            kind: FrameKind::Feature,
            ..Default::default()
        }
    }

    fn lookup(builder: LookupBuilder) -> Self {
        Frame {
            kind: FrameKind::Lookup,
            builder,
            visited: HashSet::new(),
        }
    }
}

pub(crate) struct CompilationCtx<'a> {
    registry: &'a FeaContext,
    opts: &'a Opts,
    resolver: Resolver<'a>,
    lookups: AllLookups,
    features: IndexMap<FeatureKey, Vec<LookupId>>,
    errors: Vec<CompilationError>,
    /// The table of the feature being compiled
    table: LayoutTable,
    /// The feature being compiled
    feature: SmolStr,
    feature_lookups: Vec<LookupId>,
    /// Features being visited, for cycle detection
    feature_stack: Vec<SmolStr>,
    /// Lookups being compiled, for cycle detection
    lookup_stack: Vec<SmolStr>,
    frame: Frame,
    saved_frames: Vec<Frame>,
    next_auto_lookup: usize,
}

impl<'a> CompilationCtx<'a> {
    pub(crate) fn new(
        registry: &'a FeaContext,
        db: &'a dyn LayoutDatabase,
        opts: &'a Opts,
    ) -> Self {
        CompilationCtx {
            registry,
            opts,
            resolver: Resolver::with_classes(db, registry.classes()),
            lookups: Default::default(),
            features: Default::default(),
            errors: Default::default(),
            table: LayoutTable::Gsub,
            feature: Default::default(),
            feature_lookups: Default::default(),
            feature_stack: Default::default(),
            lookup_stack: Default::default(),
            frame: Default::default(),
            saved_frames: Default::default(),
            next_auto_lookup: 0,
        }
    }

    pub(crate) fn build(self) -> Compilation {
        Compilation::new(self.lookups, self.features, self.errors)
    }

    /// Compile a feature for a table.
    ///
    /// On failure, every lookup compiled for this feature is discarded and an
    /// error is recorded; the context remains usable for other features.
    pub(crate) fn compile_feature(&mut self, table: LayoutTable, name: &str) {
        let key = FeatureKey::new(table, name);
        if self.features.contains_key(&key) {
            log::debug!("feature '{name}' is already compiled for {table}");
            return;
        }
        let registry = self.registry;
        let Some(feature) = registry.feature(name) else {
            self.errors.push(CompilationError::new(
                name,
                None,
                CompilationErrorKind::UnresolvedFeature(name.into()),
            ));
            return;
        };

        log::debug!("compiling feature '{name}' for {table}");
        let checkpoint = self.lookups.checkpoint();
        // classes defined in a feature are local to it
        let classes = self.resolver.scope();
        self.table = table;
        self.feature = feature.name().clone();
        self.feature_stack = vec![feature.name().clone()];
        self.lookup_stack.clear();
        self.saved_frames.clear();
        self.frame = Frame::feature();
        self.feature_lookups.clear();

        let result = self
            .statements(feature.statements())
            .and_then(|_| self.finish_implicit_lookup());
        self.resolver.restore_scope(classes);
        match result {
            Ok(()) => {
                let lookups = std::mem::take(&mut self.feature_lookups);
                log::debug!("feature '{name}' uses {} lookups", lookups.len());
                self.features.insert(key, lookups);
            }
            Err(failure) => {
                log::debug!("feature '{name}' failed: {}", failure.kind);
                self.lookups.rollback(checkpoint);
                self.errors.push(CompilationError::new(
                    feature.name().clone(),
                    failure.lookup,
                    failure.kind,
                ));
            }
        }
    }

    fn statements(&mut self, statements: &[LookupStatement]) -> Result<(), Failure> {
        for statement in statements {
            self.statement(statement)?;
        }
        Ok(())
    }

    fn statement(&mut self, statement: &LookupStatement) -> Result<(), Failure> {
        log::trace!("{}: {}", self.feature, statement.kind_name());
        match statement {
            LookupStatement::ClassDefinition(def) => {
                self.resolver.define_class(&def.name, &def.class)?;
                Ok(())
            }
            LookupStatement::LookupFlag(rule) => self.lookup_flag(rule),
            LookupStatement::FeatureReference(reference) => self.feature_reference(&reference.name),
            LookupStatement::LookupReference(reference) => self.lookup_reference(&reference.name),
            // nested definitions are replaced by references when registered
            LookupStatement::LookupDefinition(def) => self.lookup_reference(def.name()),
            LookupStatement::SingleSubstitution(rule) => {
                let subtable = self.single_substitution(rule)?;
                self.add_subtable(LookupType::SingleSubstitution, subtable)
            }
            LookupStatement::LigatureSubstitution(rule) => {
                let subtable = self.ligature_substitution(rule)?;
                self.add_subtable(LookupType::LigatureSubstitution, subtable)
            }
            LookupStatement::SingleAdjustment(rule) => {
                let subtable = self.single_adjustment(rule)?;
                self.add_subtable(LookupType::SinglePositioning, subtable)
            }
            LookupStatement::Cursive(rule) => {
                let subtable = self.cursive(rule)?;
                self.add_subtable(LookupType::CursivePositioning, subtable)
            }
            LookupStatement::Mark2Base(rule) => {
                let (kind, subtable) = self.mark_attachment(rule)?;
                self.add_subtable(kind, subtable)
            }
            LookupStatement::ChainingContextual(rule) => {
                let subtable = self.chaining_rule(rule)?;
                self.add_subtable(LookupType::chaining(self.table), subtable)
            }
        }
    }

    fn add_subtable(&mut self, kind: LookupType, subtable: Subtable) -> Result<(), Failure> {
        let current = self.frame.builder.kind();
        if current != LookupType::None && current != kind {
            match self.frame.kind {
                FrameKind::Feature => self.finish_implicit_lookup()?,
                FrameKind::Lookup => {
                    return Err(CompilationErrorKind::MixedLookupType {
                        expected: current,
                        found: kind,
                    }
                    .into())
                }
            }
        }
        self.frame.builder.push(kind, subtable);
        Ok(())
    }

    fn lookup_flag(&mut self, rule: &LookupFlagRule) -> Result<(), Failure> {
        let mark_set = match rule.mark_filtering_set() {
            Some(set) => Some(self.resolver.glyph_set(set)?),
            None => self.frame.builder.mark_filtering_set().cloned(),
        };
        let flags = combine_flags(self.frame.builder.flags(), rule.flags());
        if !self.frame.builder.is_empty() && !self.frame.builder.has_flags(flags, mark_set.as_ref())
        {
            match self.frame.kind {
                FrameKind::Feature => self.finish_implicit_lookup()?,
                // a named lookup has a single flag word
                FrameKind::Lookup => return Err(CompilationErrorKind::FlagsChangedMidLookup.into()),
            }
        }
        self.frame.builder.set_flags(flags, mark_set);
        Ok(())
    }

    /// Move the rules accumulated at feature level into a new lookup.
    fn finish_implicit_lookup(&mut self) -> Result<(), Failure> {
        if self.frame.kind != FrameKind::Feature || self.frame.builder.is_empty() {
            return Ok(());
        }
        let name = self.next_auto_name();
        let Some(lookup) = self.frame.builder.finish(name.clone()) else {
            return Ok(());
        };
        log::trace!("implicit lookup '{name}' in feature '{}'", self.feature);
        let id = self.lookups.insert(lookup);
        self.add_feature_lookup(id, &name)
    }

    fn add_feature_lookup(&mut self, id: LookupId, name: &SmolStr) -> Result<(), Failure> {
        self.check_table(id, name)?;
        if !self.feature_lookups.contains(&id) {
            self.feature_lookups.push(id);
        }
        Ok(())
    }

    fn check_table(&self, id: LookupId, name: &SmolStr) -> Result<(), Failure> {
        if id.table() != self.table {
            return Err(CompilationErrorKind::TableMismatch {
                lookup: name.clone(),
                table: id.table(),
                expected: self.table,
            }
            .into());
        }
        Ok(())
    }

    fn next_auto_name(&mut self) -> SmolStr {
        loop {
            let name = SmolStr::from(format!("{AUTO_LOOKUP_PREFIX}{}", self.next_auto_lookup));
            self.next_auto_lookup += 1;
            if self.registry.lookup(&name).is_none() {
                return name;
            }
        }
    }

    fn feature_reference(&mut self, name: &SmolStr) -> Result<(), Failure> {
        if self.feature_stack.contains(name) {
            return Err(CompilationErrorKind::CyclicFeature(name.clone()).into());
        }
        let registry = self.registry;
        let feature = registry
            .feature(name)
            .ok_or_else(|| CompilationErrorKind::UnresolvedFeature(name.clone()))?;
        log::trace!("including feature '{name}' in '{}'", self.feature);
        self.feature_stack.push(name.clone());
        let result = self.statements(feature.statements());
        self.feature_stack.pop();
        result
    }

    fn lookup_reference(&mut self, name: &SmolStr) -> Result<(), Failure> {
        match self.frame.kind {
            FrameKind::Feature => {
                self.finish_implicit_lookup()?;
                if let Some(id) = self.named_lookup(name)? {
                    self.add_feature_lookup(id, name)?;
                }
            }
            FrameKind::Lookup => {
                if !self.frame.visited.insert(name.clone()) {
                    log::trace!("lookup '{name}' is already merged");
                    return Ok(());
                }
                let Some(id) = self.named_lookup(name)? else {
                    return Ok(());
                };
                let Some(lookup) = self.lookups.get(id) else {
                    return Ok(());
                };
                let kind = lookup.kind();
                let flags = lookup.flags();
                let mark_set = lookup.mark_filtering_set().cloned();
                let subtables = lookup.subtables().to_vec();
                if !self.frame.builder.has_flags(flags, mark_set.as_ref()) {
                    // a fresh lookup without flags of its own takes the merged ones
                    if self.frame.builder.is_empty()
                        && self.frame.builder.has_flags(LookupFlag::empty(), None)
                    {
                        self.frame.builder.set_flags(flags, mark_set);
                    } else {
                        return Err(CompilationErrorKind::MergedFlagsMismatch(name.clone()).into());
                    }
                }
                for subtable in subtables {
                    self.add_subtable(kind, subtable)?;
                }
            }
        }
        Ok(())
    }

    /// Compile a registered lookup, or reuse it if it is already compiled.
    ///
    /// Returns `None` if the lookup has no rules.
    fn named_lookup(&mut self, name: &SmolStr) -> Result<Option<LookupId>, Failure> {
        if let Some(id) = self.lookups.compiled(name) {
            log::trace!("reusing lookup '{name}'");
            return Ok(id);
        }
        if self.lookup_stack.contains(name) {
            return Err(CompilationErrorKind::CyclicLookup(name.clone()).into());
        }
        let registry = self.registry;
        let def = registry
            .lookup(name)
            .ok_or_else(|| CompilationErrorKind::UnresolvedLookup(name.clone()))?;
        self.compile_lookup(def, LookupBuilder::default())
    }

    fn compile_lookup(
        &mut self,
        def: &LookupDefinition,
        builder: LookupBuilder,
    ) -> Result<Option<LookupId>, Failure> {
        let name = def.name();
        log::debug!("compiling lookup '{name}'");
        let parent = std::mem::replace(&mut self.frame, Frame::lookup(builder));
        self.saved_frames.push(parent);
        self.lookup_stack.push(name.clone());

        let result = self.statements(def.statements());

        self.lookup_stack.pop();
        let parent = self.saved_frames.pop().unwrap_or_default();
        let mut frame = std::mem::replace(&mut self.frame, parent);
        result.map_err(|e| e.in_lookup(name))?;

        match frame.builder.finish(name.clone()) {
            Some(lookup) => Ok(Some(self.lookups.insert(lookup))),
            None => {
                log::debug!("lookup '{name}' has no rules");
                self.lookups.insert_empty(name.clone());
                Ok(None)
            }
        }
    }

    /// Wrap an inline rule in a new lookup, compile it, and return its name.
    ///
    /// The new lookup inherits the flags of the lookup being accumulated.
    fn inline_lookup(&mut self, rule: &InlineRule) -> Result<SmolStr, Failure> {
        let name = self.next_auto_name();
        let statement = match rule {
            InlineRule::SinglePos(rule) => LookupStatement::from(rule.clone()),
            InlineRule::Cursive(rule) => LookupStatement::from(rule.clone()),
        };
        let def = LookupDefinition::new(name.clone(), vec![statement]);
        let builder = LookupBuilder::with_flags(
            self.frame.builder.flags(),
            self.frame.builder.mark_filtering_set().cloned(),
        );
        if let Some(id) = self.compile_lookup(&def, builder)? {
            self.check_table(id, &name)?;
        }
        Ok(name)
    }

    fn check_expansion(&self, count: usize) -> Result<(), Failure> {
        if count > self.opts.max_sequences {
            return Err(CompilationErrorKind::SequenceExplosion {
                count,
                limit: self.opts.max_sequences,
            }
            .into());
        }
        if count > self.opts.sequence_warning_threshold {
            log::warn!(
                "a contextual rule in feature '{}' expands to {count} sequences",
                self.feature
            );
        }
        Ok(())
    }

    fn resolve_sequences(
        &self,
        regexp: &GlyphSetRegExp,
    ) -> Result<Vec<Vec<Coverage>>, Failure> {
        regexp
            .sequences()
            .iter()
            .map(|seq| self.resolver.sequence(seq))
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    fn position_lookup(&mut self, action: &PositionAction) -> Result<Option<SmolStr>, Failure> {
        match action {
            PositionAction::None => Ok(None),
            PositionAction::Lookup(name) => {
                let Some(id) = self.named_lookup(name)? else {
                    log::debug!("lookup '{name}' has no rules, nothing to apply");
                    return Ok(None);
                };
                self.check_table(id, name)?;
                Ok(Some(name.clone()))
            }
            PositionAction::Inline(rule) => self.inline_lookup(rule).map(Some),
        }
    }

    fn chaining_rule(&mut self, rule: &ChainingContextualRule) -> Result<Subtable, Failure> {
        let count = rule.input.iter().fold(
            rule.backtrack
                .count()
                .saturating_mul(rule.lookahead.count()),
            |acc, position| acc.saturating_mul(position.regexp.count()),
        );
        self.check_expansion(count)?;

        let backtrack = self.resolve_sequences(&rule.backtrack)?;
        let lookahead = self.resolve_sequences(&rule.lookahead)?;

        let mut inputs: Vec<Vec<ChainPosition>> = vec![Vec::new()];
        for position in &rule.input {
            let fragments = self.resolve_sequences(&position.regexp)?;
            if position.action != PositionAction::None
                && fragments
                    .iter()
                    .any(|fragment| fragment.is_empty() || fragment.iter().any(Coverage::is_empty))
            {
                return Err(CompilationErrorKind::EmptyInputPosition.into());
            }
            let lookup = self.position_lookup(&position.action)?;

            // the lookup applies at the first glyph of each fragment
            let mut next = Vec::with_capacity(inputs.len() * fragments.len());
            for prefix in &inputs {
                for fragment in &fragments {
                    let mut input = prefix.clone();
                    input.extend(fragment.iter().enumerate().map(|(i, glyphs)| ChainPosition {
                        glyphs: glyphs.clone(),
                        lookup: lookup.clone().filter(|_| i == 0),
                    }));
                    next.push(input);
                }
            }
            inputs = next;
        }
        if inputs.iter().any(Vec::is_empty) {
            return Err(CompilationErrorKind::EmptyInput.into());
        }

        let mut rules = Vec::with_capacity(count);
        for backtrack in &backtrack {
            for input in &inputs {
                for lookahead in &lookahead {
                    rules.push(ChainRule {
                        backtrack: backtrack.clone(),
                        input: input.clone(),
                        lookahead: lookahead.clone(),
                    });
                }
            }
        }
        Ok(Subtable::ChainingContext { rules })
    }

    fn single_substitution(&self, rule: &SingleSubstitutionRule) -> Result<Subtable, Failure> {
        let targets = match &rule.target {
            SubstTarget::Glyph(glyph) => Coverage::from(self.resolver.glyph(glyph)?),
            SubstTarget::Set(set) => self.resolver.glyph_set(set)?,
        };
        let (mapping, expansion) = match &rule.replacement {
            Some(replacement) => {
                let replacement = self.resolver.glyph(replacement)?;
                let expansion = (!rule.expansion.is_empty()).then_some(rule.expansion);
                (targets.iter().map(|gid| (gid, replacement)).collect(), expansion)
            }
            // expansion rules adjust glyphs in place
            None if rule.is_expansion() => {
                (targets.iter().map(|gid| (gid, gid)).collect(), Some(rule.expansion))
            }
            None => {
                let target = match &rule.target {
                    SubstTarget::Glyph(glyph) => glyph.to_string().into(),
                    SubstTarget::Set(_) => SmolStr::new_inline("glyph set"),
                };
                return Err(CompilationErrorKind::MissingReplacement(target).into());
            }
        };
        Ok(Subtable::SingleSubstitution {
            mapping,
            format: rule.format,
            expansion,
            lig_marker: rule.lig_marker,
        })
    }

    fn ligature_substitution(&self, rule: &LigatureSubstitutionRule) -> Result<Subtable, Failure> {
        if rule.components.is_empty() {
            return Err(CompilationErrorKind::EmptyLigature(rule.ligature.to_string().into()).into());
        }
        let components = rule
            .components
            .iter()
            .map(|glyph| self.resolver.glyph(glyph))
            .collect::<Result<Vec<_>, _>>()?;
        let ligature = self.resolver.glyph(&rule.ligature)?;
        Ok(Subtable::LigatureSubstitution {
            components,
            ligature,
        })
    }

    fn single_adjustment(&self, rule: &SingleAdjustmentRule) -> Result<Subtable, Failure> {
        Ok(Subtable::SingleAdjustment {
            glyphs: self.resolver.glyph_set(&rule.glyphs)?,
            value: rule.value,
            color: rule.color,
        })
    }

    fn cursive(&self, rule: &CursiveRule) -> Result<Subtable, Failure> {
        Ok(Subtable::Cursive {
            glyphs: self.resolver.glyph_set(&rule.glyphs)?,
            entry: self.resolver.anchor(&rule.entry)?,
            exit: self.resolver.anchor(&rule.exit)?,
        })
    }

    fn mark_attachment(&self, rule: &Mark2BaseRule) -> Result<(LookupType, Subtable), Failure> {
        let bases = self.resolver.glyph_set(&rule.base)?;
        let classes = rule
            .classes
            .iter()
            .map(|class| -> Result<_, CompilationErrorKind> {
                Ok(MarkClassRecord {
                    class_name: class.class_name.clone(),
                    marks: self.resolver.glyph_set(&class.marks)?,
                    base_anchor: self.resolver.anchor(&class.base_anchor)?,
                    mark_anchor: self.resolver.anchor(&class.mark_anchor)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let kind = match rule.kind {
            MarkAttachKind::Base => LookupType::MarkToBase,
            MarkAttachKind::Mark => LookupType::MarkToMark,
        };
        Ok((kind, Subtable::MarkAttachment { bases, classes }))
    }
}
