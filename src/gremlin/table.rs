//! Tabular query results
//!
//! A tabular query returns one result row holding a list of mappings,
//! e.g. the output of `select(...)` or `valueMap()` over several elements:
//!
//! ```text
//! [[{"name": "Ann", "age": 31}, {"name": "Bo", "age": 28}]]
//! ```
//!
//! Columns are the mapping keys, in sorted order.

use std::collections::BTreeMap;

use crate::errors::{OgmError, Result};
use crate::models::element::GraphValue;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    entries: Vec<(String, GraphValue)>,
}

impl Row {
    fn from_map(map: BTreeMap<String, GraphValue>) -> Self {
        Row {
            entries: map.into_iter().collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&GraphValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &GraphValue> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from a deserialized query result.
    pub fn from_result(result: GraphValue) -> Result<Table> {
        let mut outer = match result {
            GraphValue::List(items) => items,
            other => {
                return Err(OgmError::Shape(format!(
                    "tabular result must be a sequence, got {:?}",
                    other
                )))
            }
        };
        match outer.len() {
            1 => {}
            n => {
                return Err(OgmError::Shape(format!(
                    "tabular result must hold exactly one row, got {}",
                    n
                )))
            }
        }

        let rows = match outer.remove(0) {
            GraphValue::List(rows) => rows,
            other => {
                return Err(OgmError::Shape(format!(
                    "tabular row must be a sequence of mappings, got {:?}",
                    other
                )))
            }
        };

        rows.into_iter()
            .map(|row| match row {
                GraphValue::Map(map) => Ok(Row::from_map(map)),
                other => Err(OgmError::Shape(format!(
                    "tabular entry must be a mapping, got {:?}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(|rows| Table { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Union of the columns of every row, sorted.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self.rows.iter().flat_map(Row::columns).collect();
        columns.sort_unstable();
        columns.dedup();
        columns
    }
}
