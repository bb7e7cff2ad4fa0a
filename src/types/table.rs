//! Tabular results returned by the row-producing shapes.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::{Shape, Value};

/// Column metadata, shared between all rows of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Database type name as reported by the provider (e.g. `INT4`)
    pub type_name: String,
}

impl Column {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_owned(),
            type_name: type_name.to_owned(),
        }
    }
}

pub type Columns = Arc<Vec<Column>>;

/// A single result row, values are in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Columns,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Columns, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Lookup a value by column name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Serialized as an object keyed by column name, in column order.
impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(&column.name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    columns: Columns,
    rows: Vec<Row>,
}

impl DataTable {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns: Arc::new(columns),
            rows: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends a row. Missing trailing values are filled with [`Value::Null`], extra
    /// values are dropped.
    pub fn push_row(&mut self, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(Row::new(self.columns.clone(), values));
    }

    pub fn with_row(mut self, values: Vec<Value>) -> Self {
        self.push_row(values);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, if any.
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.get(0))
    }

    pub fn into_reader(self) -> RowReader {
        RowReader {
            columns: self.columns,
            rows: self.rows.into(),
        }
    }
}

/// Serialized as an array of row objects.
impl Serialize for DataTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(&self.rows)
    }
}

/// Ordered collection of tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct DataSet {
    pub tables: Vec<DataTable>,
}

impl DataSet {
    pub fn new(tables: Vec<DataTable>) -> Self {
        Self { tables }
    }

    pub fn table(&self, index: usize) -> Option<&DataTable> {
        self.tables.get(index)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Forward-only reader over a buffered result.
///
/// The whole result is held in memory once the reader is returned. Rows are consumed as
/// the reader is iterated; a reader cannot be rewound.
#[derive(Debug, Default)]
pub struct RowReader {
    columns: Columns,
    rows: VecDeque<Row>,
}

impl RowReader {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of rows not yet read.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }
}

impl Iterator for RowReader {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.pop_front()
    }
}

/// Result of one dispatched operation, tagged by shape.
#[derive(Debug)]
pub enum Output {
    Table(DataTable),
    Set(DataSet),
    Reader(RowReader),
    Scalar(Value),
    None,
}

impl Output {
    /// Shape this output satisfies.
    pub fn shape(&self) -> Shape {
        match self {
            Self::Table(_) => Shape::Table,
            Self::Set(_) => Shape::Set,
            Self::Reader(_) => Shape::Reader,
            Self::Scalar(_) => Shape::Scalar,
            Self::None => Shape::NonQuery,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
