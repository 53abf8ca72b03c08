//! Column-addressable results table.
//!
//! Headers plus row-major storage. Every row has exactly one value per header
//! and headers are unique; all operations keep it that way and report misuse
//! as a [TableError].
use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::consts::{NA, RANK_COLUMN};
use crate::errors::TableError;

/// One cell of a [ResultsTable].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    NA,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_na(&self) -> bool {
        matches!(self, Value::NA)
    }

    ///
    /// Natural ordering used for sorting: numbers ascending, text
    /// lexicographically, numbers before text, `NA` last.
    ///
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => match (self, other) {
                (Value::Text(a), Value::Text(b)) => a.cmp(b),
                (Value::NA, Value::NA) => Ordering::Equal,
                (Value::NA, _) => Ordering::Greater,
                (_, Value::NA) => Ordering::Less,
                (Value::Text(_), _) => Ordering::Greater,
                (_, Value::Text(_)) => Ordering::Less,
                _ => Ordering::Equal,
            },
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::NA => write!(f, "{}", NA),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            Value::NA => serializer.serialize_str(NA),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::NA)
    }
}

/// Addresses a column by name or by position.
#[derive(Clone, Copy, Debug)]
pub enum ColumnRef<'a> {
    Name(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(value: &'a str) -> Self {
        ColumnRef::Name(value)
    }
}

impl From<usize> for ColumnRef<'_> {
    fn from(value: usize) -> Self {
        ColumnRef::Index(value)
    }
}

/// Where [ResultsTable::add_column] puts a new column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Position {
    At(usize),
    End,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResultsTable {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultsTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        for (i, header) in headers.iter().enumerate() {
            if headers[..i].contains(header) {
                return Err(TableError::DuplicateColumn(header.clone()));
            }
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != headers.len() {
                return Err(TableError::RaggedRow {
                    row,
                    got: values.len(),
                    expected: headers.len(),
                });
            }
        }
        Ok(ResultsTable { headers, rows })
    }

    ///
    /// Build a table from named columns, keeping their order.
    ///
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self, TableError> {
        let mut table = ResultsTable::default();
        for (name, values) in columns {
            table.add_column(&name, values, Position::End)?;
        }
        Ok(table)
    }

    /// Column-oriented view of the table, in header order.
    pub fn to_columns(&self) -> Vec<(String, Vec<Value>)> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                (
                    name.clone(),
                    self.rows.iter().map(|row| row[col].clone()).collect(),
                )
            })
            .collect()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn get_colnum(&self, name: &str) -> Result<usize, TableError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    fn resolve(&self, column: ColumnRef) -> Result<usize, TableError> {
        match column {
            ColumnRef::Name(name) => self.get_colnum(name),
            ColumnRef::Index(i) if i < self.headers.len() => Ok(i),
            ColumnRef::Index(i) => Err(TableError::ColumnOutOfBounds(i)),
        }
    }

    pub fn column(&self, name: &str) -> Result<Vec<&Value>, TableError> {
        let col = self.get_colnum(name)?;
        Ok(self.rows.iter().map(|row| &row[col]).collect())
    }

    fn check_length(&self, name: &str, values: &[Value]) -> Result<(), TableError> {
        // a table without columns takes its row count from the first column added
        if self.headers.is_empty() {
            return Ok(());
        }
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                name: name.to_string(),
                got: values.len(),
                expected: self.rows.len(),
            });
        }
        Ok(())
    }

    ///
    /// Insert a new column at `position`, shifting existing columns right.
    ///
    pub fn add_column(
        &mut self,
        name: &str,
        values: Vec<Value>,
        position: Position,
    ) -> Result<&mut Self, TableError> {
        if self.headers.iter().any(|h| h == name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        self.check_length(name, &values)?;

        if self.headers.is_empty() {
            self.rows = vec![Vec::with_capacity(1); values.len()];
        }

        let col = match position {
            Position::At(i) => i.min(self.headers.len()),
            Position::End => self.headers.len(),
        };

        self.headers.insert(col, name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(col, value);
        }

        Ok(self)
    }

    /// Replace the values of an existing column row-wise.
    pub fn update_column(&mut self, name: &str, values: Vec<Value>) -> Result<&mut Self, TableError> {
        let col = self.get_colnum(name)?;
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                name: name.to_string(),
                got: values.len(),
                expected: self.rows.len(),
            });
        }

        for (row, value) in self.rows.iter_mut().zip(values) {
            row[col] = value;
        }

        Ok(self)
    }

    ///
    /// Stable sort of the rows by one column's natural ordering.
    ///
    /// With `add_rank`, a `Rank` column holding `1..=N` in the new order is
    /// updated if present, otherwise inserted as the first column.
    ///
    pub fn sort_by<'a>(
        &mut self,
        key: impl Into<ColumnRef<'a>>,
        add_rank: bool,
    ) -> Result<&mut Self, TableError> {
        let col = self.resolve(key.into())?;
        self.rows.sort_by(|a, b| a[col].natural_cmp(&b[col]));

        if add_rank {
            let ranks: Vec<Value> = (1..=self.rows.len()).map(Value::from).collect();
            if self.headers.iter().any(|h| h == RANK_COLUMN) {
                self.update_column(RANK_COLUMN, ranks)?;
            } else {
                self.add_column(RANK_COLUMN, ranks, Position::At(0))?;
            }
        }

        Ok(self)
    }

    ///
    /// New table holding only `rows`, in the order given.
    ///
    pub fn subset(&self, rows: &[usize]) -> Result<ResultsTable, TableError> {
        let selected = rows
            .iter()
            .map(|&i| self.rows.get(i).cloned().ok_or(TableError::RowOutOfBounds(i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResultsTable {
            headers: self.headers.clone(),
            rows: selected,
        })
    }

    /// New table holding the rows whose value in `column` satisfies `predicate`.
    pub fn filter_rows<F>(&self, predicate: F, column: &str) -> Result<ResultsTable, TableError>
    where
        F: Fn(&Value) -> bool,
    {
        let col = self.get_colnum(column)?;
        let keep: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| predicate(&row[col]))
            .map(|(i, _)| i)
            .collect();

        self.subset(&keep)
    }

    ///
    /// Header line followed by the first `top_n` rows, tab separated, one
    /// line per row.
    ///
    pub fn to_delimited(&self, top_n: usize) -> String {
        std::iter::once(self.headers.join("\t"))
            .chain(self.rows.iter().take(top_n).map(|row| {
                row.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("\t")
            }))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn write_delimited<P: AsRef<Path>>(&self, path: P, top_n: usize) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", self.to_delimited(top_n))?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn table() -> ResultsTable {
        ResultsTable::from_columns(vec![
            (
                "factor".to_string(),
                vec!["GATA1".into(), "MYC".into(), "SPI1".into(), "TP53".into()],
            ),
            (
                "p_value".to_string(),
                vec![Value::Float(0.5), Value::Float(0.01), Value::Float(0.5), Value::NA],
            ),
        ])
        .unwrap()
    }

    #[rstest]
    fn test_from_columns(table: ResultsTable) {
        assert_eq!(table.headers(), &["factor", "p_value"]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[1], vec![Value::from("MYC"), Value::Float(0.01)]);
    }

    #[rstest]
    fn test_add_column_positions(mut table: ResultsTable) {
        table
            .add_column("first", vec![1usize.into(); 4], Position::At(0))
            .unwrap()
            .add_column("last", vec![Value::NA; 4], Position::End)
            .unwrap();
        assert_eq!(table.headers(), &["first", "factor", "p_value", "last"]);
        assert!(table.rows().iter().all(|r| r.len() == 4));
    }

    #[rstest]
    fn test_add_duplicate_column(mut table: ResultsTable) {
        let err = table
            .add_column("factor", vec![Value::NA; 4], Position::End)
            .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("factor".to_string()));
    }

    #[rstest]
    fn test_add_column_wrong_length(mut table: ResultsTable) {
        let result = table.add_column("short", vec![Value::NA; 2], Position::End);
        assert!(matches!(result, Err(TableError::LengthMismatch { .. })));
        assert_eq!(table.num_columns(), 2);
    }

    #[rstest]
    fn test_update_keeps_shape(mut table: ResultsTable) {
        table
            .add_column("score", vec![Value::Float(0.0); 4], Position::At(1))
            .unwrap();
        let headers = table.headers().to_vec();

        table
            .update_column("score", vec![1.0_f64.into(), 2.0_f64.into(), 3.0_f64.into(), 4.0_f64.into()])
            .unwrap();
        assert_eq!(table.headers(), headers.as_slice());
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[2][1], Value::Float(3.0));
    }

    #[rstest]
    fn test_update_unknown_column(mut table: ResultsTable) {
        let err = table.update_column("missing", vec![]).unwrap_err();
        assert_eq!(err, TableError::UnknownColumn("missing".to_string()));
    }

    #[rstest]
    fn test_sort_is_stable_and_ranked(mut table: ResultsTable) {
        table.sort_by("p_value", true).unwrap();

        let factors: Vec<String> = table
            .column("factor")
            .unwrap()
            .iter()
            .map(|v| v.to_string())
            .collect();
        // equal p-values keep GATA1 before SPI1, NA sorts last
        assert_eq!(factors, vec!["MYC", "GATA1", "SPI1", "TP53"]);
        assert_eq!(table.headers()[0], RANK_COLUMN);

        let ranks: Vec<i64> = table
            .column(RANK_COLUMN)
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap() as i64)
            .collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[rstest]
    fn test_resort_updates_rank(mut table: ResultsTable) {
        table.sort_by("p_value", true).unwrap();
        table.sort_by("factor", true).unwrap();

        assert_eq!(table.num_columns(), 3);
        let first = &table.rows()[0];
        assert_eq!(first[0], Value::Int(1));
        assert_eq!(first[1], Value::from("GATA1"));
    }

    #[rstest]
    fn test_sort_by_index_is_lexicographic(mut table: ResultsTable) {
        table.sort_by(0usize, false).unwrap();
        assert_eq!(table.rows()[0][0], Value::from("GATA1"));
        assert!(table.sort_by(7usize, false).is_err());
    }

    #[rstest]
    fn test_subset_and_filter(table: ResultsTable) {
        let subset = table.subset(&[3, 1]).unwrap();
        assert_eq!(subset.headers(), table.headers());
        assert_eq!(subset.rows()[0][0], Value::from("TP53"));
        assert!(table.subset(&[10]).is_err());

        let significant = table
            .filter_rows(|v| v.as_f64().is_some_and(|p| p < 0.05), "p_value")
            .unwrap();
        assert_eq!(significant.len(), 1);
        assert_eq!(significant.rows()[0][0], Value::from("MYC"));
    }

    #[rstest]
    #[case(2, 3)]
    #[case(4, 5)]
    #[case(200, 5)]
    #[case(0, 1)]
    fn test_to_delimited_line_count(table: ResultsTable, #[case] top_n: usize, #[case] lines: usize) {
        let text = table.to_delimited(top_n);
        assert_eq!(text.lines().count(), lines);
    }

    #[rstest]
    fn test_to_delimited_format(table: ResultsTable) {
        let text = table.to_delimited(4);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "factor\tp_value");
        assert_eq!(lines[2], "MYC\t0.01");
        assert_eq!(lines[4], "TP53\tNA");
    }

    #[rstest]
    fn test_new_rejects_ragged_rows() {
        let result = ResultsTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![Value::NA, Value::NA], vec![Value::NA]],
        );
        assert!(matches!(result, Err(TableError::RaggedRow { row: 1, .. })));
    }

    #[rstest]
    fn test_roundtrip_columns(table: ResultsTable) {
        let rebuilt = ResultsTable::from_columns(table.to_columns()).unwrap();
        assert_eq!(rebuilt, table);
    }
}
