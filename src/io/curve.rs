//! Read/write marginal-curve JSON files.
//!
//! The curves file is the portable output of a run: the five curves plus the
//! training diagnostics that produced them. The schema is
//! `domain::CurvesFile`.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurvesFile, MarginalCurve, TrainingSummary};
use crate::error::AppError;

/// Assemble a curves file stamped with the current time.
pub fn curves_file(
    curves: Vec<MarginalCurve>,
    grid_rows: usize,
    training: Option<TrainingSummary>,
) -> CurvesFile {
    CurvesFile {
        tool: "tcurves".to_string(),
        generated_at: Utc::now(),
        grid_rows,
        training,
        curves,
    }
}

/// Write a curves JSON file.
pub fn write_curves_json(path: &Path, curves: &CurvesFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), curves)?;
    Ok(())
}

/// Read a curves JSON file.
pub fn read_curves_json(path: &Path) -> Result<CurvesFile, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let curves: CurvesFile = serde_json::from_reader(file)?;
    if curves.curves.is_empty() {
        return Err(AppError::InvalidData(format!(
            "curves file '{}' holds no curves",
            path.display()
        )));
    }
    Ok(curves)
}
