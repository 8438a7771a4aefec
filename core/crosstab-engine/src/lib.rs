//! FILENAME: core/crosstab-engine/src/lib.rs
//! Crosstab subsystem.
//!
//! This crate cross-tabulates a stream of rows into nested row and column
//! groups, aggregates measures per cell, rolls every subtotal and grand total
//! up from the base cells, and attaches cell content definitions and
//! percentages of the grand total. Expression evaluation and rendering are
//! left to the caller.
//!
//! Layers:
//! - `definition`, `matrix`: Serializable configuration (what the crosstab IS)
//! - `registry`, `incrementer`, `percentage`, `ordering`: Pluggable behavior
//! - `accumulator`, `tree`: Fill engine (HOW we calculate)
//! - `result`, `view`: Finished output for the layout stage (WHAT we display)

pub mod value;
pub mod error;
pub mod definition;
pub mod matrix;
pub mod ordering;
pub mod incrementer;
pub mod percentage;
pub mod registry;
pub mod evaluator;
pub mod tree;
pub mod accumulator;
pub mod result;
pub mod view;

pub use value::{OrderedFloat, Value, ValueKind};
pub use error::{ComparatorFault, CoercionError, CrosstabError, EvaluationError};
pub use definition::*;
pub use matrix::*;
pub use ordering::{natural_cmp, BucketComparator, BucketOrdering};
pub use incrementer::{AggregationCell, AggregationState, CustomIncrementer, Incrementer};
pub use percentage::{CustomPercentageCalculator, Percentage, PercentageCalculator};
pub use registry::IncrementerRegistry;
pub use evaluator::{RecordEvaluator, RowEvaluator};
pub use tree::{AxisIndex, GroupNode, GroupTree, LeafId, NodeId, PathKey};
pub use accumulator::{fill_crosstab, CrosstabAccumulator, FillPhase, RolledUpCrosstab};
pub use result::{CellStatus, CrosstabResult, FillStats, MeasureCell};
pub use view::{AxisEntry, AxisEntryKind, AxisLayout, HeaderCell};
