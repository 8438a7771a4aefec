//! FILENAME: core/crosstab-engine/src/evaluator.rs
//! Row evaluation boundary.
//!
//! The engine never parses expressions. For each row it asks the evaluator
//! for the value of every bucket, order key and measure producer.

use rustc_hash::FxHashMap;

use crate::definition::ValueProducer;
use crate::error::EvaluationError;
use crate::value::Value;

/// Produces values for one row of type `Row`.
pub trait RowEvaluator<Row: ?Sized> {
    fn evaluate(&mut self, row: &Row, producer: &ValueProducer) -> Result<Value, EvaluationError>;
}

impl<Row, F> RowEvaluator<Row> for F
where
    Row: ?Sized,
    F: FnMut(&Row, &ValueProducer) -> Result<Value, EvaluationError>,
{
    fn evaluate(&mut self, row: &Row, producer: &ValueProducer) -> Result<Value, EvaluationError> {
        self(row, producer)
    }
}

/// Evaluates producers as column names of positional records.
#[derive(Debug, Clone, Default)]
pub struct RecordEvaluator {
    columns: FxHashMap<String, usize>,
}

impl RecordEvaluator {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RecordEvaluator {
            columns: columns
                .into_iter()
                .enumerate()
                .map(|(i, name)| (name.into(), i))
                .collect(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }
}

impl RowEvaluator<[Value]> for RecordEvaluator {
    fn evaluate(&mut self, row: &[Value], producer: &ValueProducer) -> Result<Value, EvaluationError> {
        let expression = producer.expression();
        let index = self
            .column_index(expression)
            .ok_or_else(|| EvaluationError::new(expression, "unknown column"))?;
        row.get(index).cloned().ok_or_else(|| {
            EvaluationError::new(
                expression,
                format!("record has {} fields, column is at {}", row.len(), index),
            )
        })
    }
}

impl RowEvaluator<Vec<Value>> for RecordEvaluator {
    fn evaluate(&mut self, row: &Vec<Value>, producer: &ValueProducer) -> Result<Value, EvaluationError> {
        RowEvaluator::<[Value]>::evaluate(self, row.as_slice(), producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lookup() {
        let mut evaluator = RecordEvaluator::new(["country", "year", "amount"]);
        let row = vec![Value::text("US"), Value::Integer(2020), Value::Integer(10)];
        assert_eq!(
            evaluator.evaluate(&row, &ValueProducer::new("amount")),
            Ok(Value::Integer(10))
        );
        assert!(evaluator.evaluate(&row, &ValueProducer::new("city")).is_err());
    }

    #[test]
    fn test_short_record() {
        let mut evaluator = RecordEvaluator::new(["a", "b"]);
        let row = vec![Value::Integer(1)];
        let err = evaluator.evaluate(&row, &ValueProducer::new("b")).unwrap_err();
        assert_eq!(err.expression, "b");
    }

    #[test]
    fn test_closure_evaluator() {
        let mut calls = 0;
        let mut evaluator = |row: &(i64, String), producer: &ValueProducer| -> Result<Value, EvaluationError> {
            calls += 1;
            match producer.expression() {
                "n" => Ok(Value::Integer(row.0)),
                "s" => Ok(Value::text(row.1.clone())),
                other => Err(EvaluationError::new(other, "unknown")),
            }
        };
        let row = (4, "x".to_string());
        assert_eq!(evaluator.evaluate(&row, &ValueProducer::new("n")), Ok(Value::Integer(4)));
        assert_eq!(evaluator.evaluate(&row, &ValueProducer::new("s")), Ok(Value::text("x")));
        drop(evaluator);
        assert_eq!(calls, 2);
    }
}
