//! Pattern registration table.
//!
//! A [`PatternSet`] collects patterns during setup. Freezing it produces a
//! [`FrozenPatternSet`]: an immutable table from operation class to the
//! patterns rooted there, ordered by descending benefit with ties kept in
//! registration order. A frozen set is `Send + Sync` and can be shared by
//! drivers working on independent graphs.

use std::collections::HashMap;

use super::pattern::{PatternBenefit, RewritePattern};
use crate::context::OpClass;

struct Entry {
    benefit: PatternBenefit,
    pattern: Box<dyn RewritePattern>,
}

/// Mutable list of patterns under construction.
#[derive(Default)]
pub struct PatternSet {
    entries: Vec<Entry>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern with the default benefit.
    pub fn add(&mut self, pattern: impl RewritePattern + 'static) -> &mut Self {
        self.add_with_benefit(pattern, PatternBenefit::default())
    }

    /// Register a pattern with an explicit benefit.
    pub fn add_with_benefit(
        &mut self,
        pattern: impl RewritePattern + 'static,
        benefit: PatternBenefit,
    ) -> &mut Self {
        self.entries.push(Entry {
            benefit,
            pattern: Box::new(pattern),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the immutable, class-indexed table.
    pub fn freeze(self) -> FrozenPatternSet {
        let mut by_class: HashMap<OpClass, Vec<Entry>> = HashMap::new();
        for entry in self.entries {
            by_class
                .entry(entry.pattern.root())
                .or_default()
                .push(entry);
        }
        // `sort_by` is stable, so equal benefits keep registration order.
        for list in by_class.values_mut() {
            list.sort_by(|a, b| b.benefit.cmp(&a.benefit));
        }
        FrozenPatternSet { by_class }
    }
}

/// Immutable pattern table keyed by operation class.
pub struct FrozenPatternSet {
    by_class: HashMap<OpClass, Vec<Entry>>,
}

impl FrozenPatternSet {
    /// Patterns rooted at `class`, in the order the driver tries them.
    pub fn patterns_for(&self, class: OpClass) -> impl Iterator<Item = &dyn RewritePattern> {
        self.by_class
            .get(&class)
            .into_iter()
            .flatten()
            .map(|entry| entry.pattern.as_ref())
    }

    /// Total number of registered patterns.
    pub fn len(&self) -> usize {
        self.by_class.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
