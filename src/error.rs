use thiserror::Error;

/// Errors raised while building or driving the linked correlation views.
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to parse data bundle: {0}")]
    DataParse(#[from] serde_json::Error),
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Correlation matrix is not square: {rows} rows but row {row} has {cols} columns")]
    MatrixShape { rows: usize, row: usize, cols: usize },
    #[error("Matrix cell [{row}][{col}] is not a number, null or \"NaN\": {found}")]
    MatrixCell {
        row: usize,
        col: usize,
        found: String,
    },
    #[error("Matrices disagree in size: pearson is {pearson}x{pearson}, spearman is {spearman}x{spearman}")]
    MatrixSizeMismatch { pearson: usize, spearman: usize },
    #[error("Duplicate phenotype id in axes data: {0}")]
    DuplicateAxis(String),
    #[error("Axis entry {phenotype_id} points at matrix index {index}, but the matrices are {size}x{size}")]
    AxisIndexOutOfBounds {
        phenotype_id: String,
        index: usize,
        size: usize,
    },
    #[error("Scatter series {phenotype_id} has {samples} sample ids but {values} values")]
    SeriesLengthMismatch {
        phenotype_id: String,
        samples: usize,
        values: usize,
    },
    #[error("Overlap record {label_a_id}/{label_b_id} has intersection {c} larger than min({a}, {b})")]
    InvalidOverlap {
        label_a_id: String,
        label_b_id: String,
        a: u64,
        b: u64,
        c: u64,
    },
    #[error("Unknown phenotype id: {0}")]
    UnknownPhenotype(String),
}
