use thiserror::Error;

/// Malformed ragged input handed to the sparse assembler.
#[derive(Error, Debug, PartialEq)]
pub enum ShapeError {
    #[error("Column {column}: {indices} indices but {values} values")]
    RaggedLengthMismatch {
        column: usize,
        indices: usize,
        values: usize,
    },

    #[error("Column {column}: row index {index} is outside [0, {col_length})")]
    IndexOutOfBounds {
        column: usize,
        index: usize,
        col_length: usize,
    },

    #[error("Got {indices} index columns but {values} value columns")]
    ColumnCountMismatch { indices: usize, values: usize },

    #[error("Column {column} is out of bounds for a matrix with {cols} columns")]
    ColumnOutOfBounds { column: usize, cols: usize },

    #[error("Row {row} is out of bounds for a matrix with {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("Precomputed RP matrix has {got} columns but there are {expected} profiles")]
    SampleCountMismatch { expected: usize, got: usize },

    #[error("Can't stack a matrix with {got} rows onto one with {expected}")]
    RowCountMismatch { expected: usize, got: usize },

    #[error("Nothing to stack")]
    EmptyStack,
}

/// Misuse of a [crate::results::ResultsTable].
#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("Column {0} already exists in results table")]
    DuplicateColumn(String),

    #[error("Column {0} not in results table")]
    UnknownColumn(String),

    #[error("Column index {0} is out of bounds")]
    ColumnOutOfBounds(usize),

    #[error("Column {name} got {got} values but the table has {expected} rows")]
    LengthMismatch {
        name: String,
        got: usize,
        expected: usize,
    },

    #[error("Row {row} has {got} values but the table has {expected} columns")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("Row index {0} is out of bounds")]
    RowOutOfBounds(usize),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Duplicate gene location in gene set: {0}")]
    DuplicateLocation(String),

    #[error("Metadata file has no `{0}` column: {1}")]
    MissingColumn(String, String),

    #[error("Error parsing {file} line {line}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("Unknown data technology: {0}")]
    UnknownTechnology(String),

    #[error("No data loaded for technology {0}")]
    MissingTechnology(String),

    #[error("Can't read matrix file {0}: {1}")]
    MatrixRead(String, String),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
