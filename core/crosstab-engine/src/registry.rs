//! FILENAME: core/crosstab-engine/src/registry.rs
//! Plugin registry for incrementers, percentage calculators and comparators.
//!
//! The registry is a plain value handed to each accumulator. Plugins are
//! `Send + Sync`, so one registry can be cloned into crosstabs filled on
//! different threads.

use std::fmt;
use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::definition::{GroupSpec, MeasureSpec};
use crate::error::CrosstabError;
use crate::incrementer::{CustomIncrementer, Incrementer};
use crate::ordering::BucketComparator;
use crate::percentage::{CustomPercentageCalculator, PercentageCalculator};

#[derive(Default, Clone)]
pub struct IncrementerRegistry {
    incrementers: FxHashMap<String, Arc<dyn CustomIncrementer>>,
    percentage_calculators: FxHashMap<String, Arc<dyn CustomPercentageCalculator>>,
    comparators: FxHashMap<String, Arc<dyn BucketComparator>>,
}

impl fmt::Debug for IncrementerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut incrementers: Vec<&String> = self.incrementers.keys().collect();
        let mut calculators: Vec<&String> = self.percentage_calculators.keys().collect();
        let mut comparators: Vec<&String> = self.comparators.keys().collect();
        incrementers.sort();
        calculators.sort();
        comparators.sort();
        f.debug_struct("IncrementerRegistry")
            .field("incrementers", &incrementers)
            .field("percentage_calculators", &calculators)
            .field("comparators", &comparators)
            .finish()
    }
}

impl IncrementerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an incrementer, replacing any previous one with the same id.
    pub fn register_incrementer(
        &mut self,
        id: impl Into<String>,
        incrementer: Arc<dyn CustomIncrementer>,
    ) -> &mut Self {
        self.incrementers.insert(id.into(), incrementer);
        self
    }

    pub fn register_percentage_calculator(
        &mut self,
        id: impl Into<String>,
        calculator: Arc<dyn CustomPercentageCalculator>,
    ) -> &mut Self {
        self.percentage_calculators.insert(id.into(), calculator);
        self
    }

    pub fn register_comparator(
        &mut self,
        id: impl Into<String>,
        comparator: Arc<dyn BucketComparator>,
    ) -> &mut Self {
        self.comparators.insert(id.into(), comparator);
        self
    }

    /// The incrementer for a measure. An incrementer id overrides the
    /// measure's calculation kind.
    pub fn resolve_incrementer(&self, measure: &MeasureSpec) -> Result<Incrementer, CrosstabError> {
        if let Some(id) = &measure.incrementer_id {
            let plugin = self.incrementers.get(id).ok_or_else(|| {
                CrosstabError::UnresolvedIncrementer {
                    measure: measure.name.clone(),
                    id: id.clone(),
                }
            })?;
            debug!("measure '{}' uses incrementer '{}'", measure.name, id);
            return Ok(Incrementer::Custom(Arc::clone(plugin)));
        }

        Incrementer::builtin(measure.calculation).ok_or_else(|| CrosstabError::MissingIncrementerId {
            measure: measure.name.clone(),
        })
    }

    /// The registered percentage calculator of a measure, if it names one.
    /// `None` means the calculator is picked from the grand total later.
    pub fn resolve_percentage_calculator(
        &self,
        measure: &MeasureSpec,
    ) -> Result<Option<PercentageCalculator>, CrosstabError> {
        let Some(id) = &measure.percentage_calculator_id else {
            return Ok(None);
        };
        let calculator = self.percentage_calculators.get(id).ok_or_else(|| {
            CrosstabError::UnresolvedPercentageCalculator {
                measure: measure.name.clone(),
                id: id.clone(),
            }
        })?;
        debug!("measure '{}' uses percentage calculator '{}'", measure.name, id);
        Ok(Some(PercentageCalculator::Custom(Arc::clone(calculator))))
    }

    pub fn resolve_comparator(
        &self,
        group: &GroupSpec,
    ) -> Result<Option<Arc<dyn BucketComparator>>, CrosstabError> {
        let Some(id) = &group.bucket.comparator else {
            return Ok(None);
        };
        let comparator = self.comparators.get(id).ok_or_else(|| CrosstabError::UnresolvedComparator {
            group: group.name.clone(),
            id: id.clone(),
        })?;
        debug!("group '{}' uses comparator '{}'", group.name, id);
        Ok(Some(Arc::clone(comparator)))
    }
}
