use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlotError;

/// One row/column of the correlation grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisEntry {
    /// Stable phenotype identifier, unique across the bundle.
    pub phenotype_id: String,
    /// Human-readable display label.
    pub label: String,
    /// Row and column position of this phenotype in both matrices.
    pub index: usize,
}

/// Per-phenotype measurement series feeding the scatter panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub phenotype_id: String,
    #[serde(default)]
    pub label: String,
    /// Sample identifiers, parallel to `values`.
    pub sample_ids: Vec<String>,
    #[serde(deserialize_with = "de_value_row")]
    pub values: Vec<f64>,
}

/// Set sizes for one unordered phenotype pair. Field names follow the
/// upstream bundle contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapRecord {
    #[serde(rename = "labelA_id")]
    pub label_a_id: String,
    #[serde(rename = "labelB_id")]
    pub label_b_id: String,
    #[serde(rename = "labelA")]
    pub label_a: String,
    #[serde(rename = "labelB")]
    pub label_b: String,
    #[serde(rename = "A")]
    pub a: u64,
    #[serde(rename = "B")]
    pub b: u64,
    #[serde(rename = "C")]
    pub c: u64,
}

impl OverlapRecord {
    /// The same record with the A and B sides exchanged.
    pub fn swapped(&self) -> OverlapRecord {
        OverlapRecord {
            label_a_id: self.label_b_id.clone(),
            label_b_id: self.label_a_id.clone(),
            label_a: self.label_b.clone(),
            label_b: self.label_a.clone(),
            a: self.b,
            b: self.a,
            c: self.c,
        }
    }
}

/// How a heatmap pair is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderAs {
    /// Sized and tinted circle, below the diagonal.
    Circle,
    /// Two-decimal tinted value label, above the diagonal.
    Label,
}

/// One drawable heatmap entry, derived once from the axes and matrices.
/// `i` is the row (y) index, `j` the column (x) index; the scatter x axis
/// takes the column phenotype and the y axis the row phenotype.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDatum {
    pub i: usize,
    pub j: usize,
    pub x_id: String,
    pub y_id: String,
    pub x_label: String,
    pub y_label: String,
    pub pearson: f64,
    pub spearman: f64,
    pub render_as: RenderAs,
}

/// Parses a correlation matrix from JSON text. Strict JSON has no NaN
/// literal, so `null` and the string `"NaN"` both decode to `f64::NAN`.
pub fn parse_matrix_json(text: &str) -> Result<Vec<Vec<f64>>, PlotError> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(text)?;
    rows_to_matrix(&rows)
}

fn rows_to_matrix(rows: &[Vec<serde_json::Value>]) -> Result<Vec<Vec<f64>>, PlotError> {
    let mut matrix = Vec::with_capacity(rows.len());
    for (row_idx, row) in rows.iter().enumerate() {
        let mut out = Vec::with_capacity(row.len());
        for (col_idx, cell) in row.iter().enumerate() {
            match cell_to_f64(cell) {
                Some(v) => out.push(v),
                None => {
                    return Err(PlotError::MatrixCell {
                        row: row_idx,
                        col: col_idx,
                        found: cell.to_string(),
                    })
                }
            }
        }
        matrix.push(out);
    }
    Ok(matrix)
}

fn cell_to_f64(cell: &serde_json::Value) -> Option<f64> {
    match cell {
        serde_json::Value::Null => Some(f64::NAN),
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) if s == "NaN" => Some(f64::NAN),
        _ => None,
    }
}

fn de_value_row<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let cells = Vec::<serde_json::Value>::deserialize(deserializer)?;
    cells
        .iter()
        .map(|cell| {
            cell_to_f64(cell)
                .ok_or_else(|| D::Error::custom(format!("invalid series value: {}", cell)))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawBundle {
    #[serde(default)]
    axes: Vec<AxisEntry>,
    #[serde(default)]
    pearson: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    spearman: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    scatter: Vec<ScatterSeries>,
    #[serde(default)]
    venn: Vec<OverlapRecord>,
}

/// The full input for one view: axes, both correlation matrices, the
/// scatter series and the overlap records, all over one phenotype-id
/// universe. Supplied once; immutable after the view is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBundle {
    pub axes: Vec<AxisEntry>,
    pub pearson: Vec<Vec<f64>>,
    pub spearman: Vec<Vec<f64>>,
    pub scatter: Vec<ScatterSeries>,
    pub venn: Vec<OverlapRecord>,
}

impl DataBundle {
    pub fn new() -> Self {
        DataBundle::default()
    }

    pub fn axes_data(mut self, axes: Vec<AxisEntry>) -> Self {
        self.axes = axes;
        self
    }

    pub fn data_matrix(mut self, matrix: Vec<Vec<f64>>) -> Self {
        self.pearson = matrix;
        self
    }

    pub fn data_matrix_json(mut self, text: &str) -> Result<Self, PlotError> {
        self.pearson = parse_matrix_json(text)?;
        Ok(self)
    }

    pub fn spear_matrix(mut self, matrix: Vec<Vec<f64>>) -> Self {
        self.spearman = matrix;
        self
    }

    pub fn spear_matrix_json(mut self, text: &str) -> Result<Self, PlotError> {
        self.spearman = parse_matrix_json(text)?;
        Ok(self)
    }

    pub fn data_scatter(mut self, scatter: Vec<ScatterSeries>) -> Self {
        self.scatter = scatter;
        self
    }

    pub fn data_venn(mut self, venn: Vec<OverlapRecord>) -> Self {
        self.venn = venn;
        self
    }

    /// Loads a complete bundle from one JSON document with the keys
    /// `axes`, `pearson`, `spearman`, `scatter`, `venn`.
    pub fn from_json_str(text: &str) -> Result<Self, PlotError> {
        let raw: RawBundle = serde_json::from_str(text)?;
        let mut bundle = DataBundle::new()
            .axes_data(raw.axes)
            .data_scatter(raw.scatter)
            .data_venn(raw.venn);
        bundle.pearson = rows_to_matrix(&raw.pearson)?;
        bundle.spearman = rows_to_matrix(&raw.spearman)?;
        Ok(bundle)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, PlotError> {
        let text = fs::read_to_string(path)?;
        DataBundle::from_json_str(&text)
    }

    /// Checks every structural invariant. Run once when the view is built;
    /// all later operations may assume a valid bundle.
    pub fn validate(&self) -> Result<(), PlotError> {
        let size = self.pearson.len();
        for (row, cols) in self.pearson.iter().enumerate() {
            if cols.len() != size {
                return Err(PlotError::MatrixShape {
                    rows: size,
                    row,
                    cols: cols.len(),
                });
            }
        }
        let spear_size = self.spearman.len();
        for (row, cols) in self.spearman.iter().enumerate() {
            if cols.len() != spear_size {
                return Err(PlotError::MatrixShape {
                    rows: spear_size,
                    row,
                    cols: cols.len(),
                });
            }
        }
        if size != spear_size {
            return Err(PlotError::MatrixSizeMismatch {
                pearson: size,
                spearman: spear_size,
            });
        }
        let mut seen = std::collections::HashSet::new();
        for axis in &self.axes {
            if !seen.insert(axis.phenotype_id.as_str()) {
                return Err(PlotError::DuplicateAxis(axis.phenotype_id.clone()));
            }
            if axis.index >= size {
                return Err(PlotError::AxisIndexOutOfBounds {
                    phenotype_id: axis.phenotype_id.clone(),
                    index: axis.index,
                    size,
                });
            }
        }
        for series in &self.scatter {
            if series.sample_ids.len() != series.values.len() {
                return Err(PlotError::SeriesLengthMismatch {
                    phenotype_id: series.phenotype_id.clone(),
                    samples: series.sample_ids.len(),
                    values: series.values.len(),
                });
            }
        }
        for record in &self.venn {
            if record.c > record.a.min(record.b) {
                return Err(PlotError::InvalidOverlap {
                    label_a_id: record.label_a_id.clone(),
                    label_b_id: record.label_b_id.clone(),
                    a: record.a,
                    b: record.b,
                    c: record.c,
                });
            }
        }
        Ok(())
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn axis_for(&self, phenotype_id: &str) -> Option<&AxisEntry> {
        self.axes.iter().find(|a| a.phenotype_id == phenotype_id)
    }

    pub fn series_for(&self, phenotype_id: &str) -> Option<&ScatterSeries> {
        self.scatter.iter().find(|s| s.phenotype_id == phenotype_id)
    }

    /// Finds the overlap record for a pair in either stored direction.
    /// A reverse match is returned with the sides swapped so that the A
    /// side always corresponds to `x_id`.
    pub fn overlap_for(&self, x_id: &str, y_id: &str) -> Option<OverlapRecord> {
        for record in &self.venn {
            if record.label_a_id == x_id && record.label_b_id == y_id {
                return Some(record.clone());
            }
            if record.label_a_id == y_id && record.label_b_id == x_id {
                return Some(record.swapped());
            }
        }
        None
    }

    /// Derives the drawable pair set: every ordered off-diagonal pair of
    /// axes whose cells are defined in both matrices. A NaN in either
    /// matrix excludes the pair, so the metric toggle is total over the
    /// derived set. Grid coordinates (i, j) are positions in the axes
    /// list; `AxisEntry.index` only addresses the matrix cell. Pairs below
    /// the diagonal render as circles, their mirrors as value labels.
    pub fn derive_pairs(&self) -> Vec<PairDatum> {
        let mut pairs = Vec::new();
        for (i, row_axis) in self.axes.iter().enumerate() {
            for (j, col_axis) in self.axes.iter().enumerate() {
                if i == j {
                    continue;
                }
                let pearson = self.pearson[row_axis.index][col_axis.index];
                let spearman = self.spearman[row_axis.index][col_axis.index];
                if pearson.is_nan() || spearman.is_nan() {
                    continue;
                }
                pairs.push(PairDatum {
                    i,
                    j,
                    x_id: col_axis.phenotype_id.clone(),
                    y_id: row_axis.phenotype_id.clone(),
                    x_label: col_axis.label.clone(),
                    y_label: row_axis.label.clone(),
                    pearson,
                    spearman,
                    render_as: if i > j { RenderAs::Circle } else { RenderAs::Label },
                });
            }
        }
        pairs
    }
}
