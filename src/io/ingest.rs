//! Training-table CSV ingest.
//!
//! Turns a CSV of historical articles into a `TrainingSet`:
//! - header names are normalized, so `Content Length` and `content_length`
//!   both resolve to the same column
//! - the label comes from a `top` column when present, otherwise from a raw
//!   `users` column split at the training median
//! - bad rows are skipped and reported with their line number

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{Article, FEATURE_COUNT, Feature, FeatureVector, Label, TrainingSet};
use crate::error::AppError;

/// How article labels were obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelSource {
    /// Read directly from a `top` column.
    Column,
    /// `users >= threshold`, where `threshold` is the median of `users`.
    UsersMedian { threshold: f64 },
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: training table plus what happened while reading it.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub training: TrainingSet,
    pub label_source: LabelSource,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedData {
    pub fn rows_used(&self) -> usize {
        self.training.len()
    }
}

/// Load a training table from a CSV file.
pub fn load_training_csv(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let data = read_training(file)?;
    info!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.rows_used(),
        skipped = data.row_errors.len(),
        "loaded training table"
    );
    Ok(data)
}

/// Parse a training table from any CSV reader.
pub fn read_training<R: Read>(input: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let mut feature_cols = [0usize; FEATURE_COUNT];
    for feature in Feature::ALL {
        feature_cols[feature.index()] = *header_map.get(feature.column_name()).ok_or_else(|| {
            AppError::InvalidData(format!("missing required column '{}'", feature.column_name()))
        })?;
    }

    let label_col = match (header_map.get("top"), header_map.get("users")) {
        (Some(&idx), _) => LabelColumn::Top(idx),
        (None, Some(&idx)) => LabelColumn::Users(idx),
        (None, None) => {
            return Err(AppError::InvalidData(
                "training table needs a 'top' or 'users' column".to_string(),
            ));
        }
    };

    // Second element: the 0/1 flag for `top`, the raw count for `users`.
    let mut parsed: Vec<(FeatureVector, f64)> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, plus the header line.
        let line = idx + 2;
        rows_read += 1;

        let outcome = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, &feature_cols, label_col));
        match outcome {
            Ok(row) => parsed.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for err in row_errors.iter().take(5) {
        warn!(line = err.line, "skipping row: {}", err.message);
    }

    if parsed.is_empty() {
        return Err(AppError::InvalidData(format!(
            "no valid rows in training table ({rows_read} read, {} rejected)",
            row_errors.len()
        )));
    }

    let (training, label_source) = match label_col {
        LabelColumn::Top(_) => {
            let articles = parsed
                .into_iter()
                .map(|(features, flag)| Article {
                    features,
                    label: Label::from_bool(flag != 0.0),
                })
                .collect();
            (TrainingSet::new(articles), LabelSource::Column)
        }
        LabelColumn::Users(_) => {
            let (training, threshold) = label_by_median(parsed);
            (training, LabelSource::UsersMedian { threshold })
        }
    };

    Ok(IngestedData {
        training,
        label_source,
        row_errors,
        rows_read,
    })
}

/// Label each article `Top` when its users count reaches the sample median.
///
/// The median is the linearly interpolated 0.5 quantile. Returns the table
/// and the threshold used.
pub fn label_by_median(rows: Vec<(FeatureVector, f64)>) -> (TrainingSet, f64) {
    let mut users: Vec<f64> = rows.iter().map(|(_, u)| *u).collect();
    users.sort_by(f64::total_cmp);
    let threshold = quantile_sorted(&users, 0.5);

    let articles = rows
        .into_iter()
        .map(|(features, u)| Article {
            features,
            label: Label::from_bool(u >= threshold),
        })
        .collect();
    (TrainingSet::new(articles), threshold)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, Copy)]
enum LabelColumn {
    Top(usize),
    Users(usize),
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

/// Normalize a header: strip a UTF-8 BOM, lowercase, `-`/space to `_`.
fn normalize_header_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn parse_row(
    record: &StringRecord,
    feature_cols: &[usize; FEATURE_COUNT],
    label_col: LabelColumn,
) -> Result<(FeatureVector, f64), String> {
    let mut features = [0.0; FEATURE_COUNT];
    for feature in Feature::ALL {
        let raw = record.get(feature_cols[feature.index()]).unwrap_or("");
        features[feature.index()] = parse_number(raw)
            .ok_or_else(|| format!("invalid {} value '{raw}'", feature.column_name()))?;
    }

    let label = match label_col {
        LabelColumn::Top(idx) => {
            let raw = record.get(idx).unwrap_or("");
            let label = parse_flag(raw).ok_or_else(|| format!("invalid top value '{raw}'"))?;
            label.as_u8() as f64
        }
        LabelColumn::Users(idx) => {
            let raw = record.get(idx).unwrap_or("");
            let users = parse_number(raw).ok_or_else(|| format!("invalid users value '{raw}'"))?;
            if users < 0.0 {
                return Err(format!("negative users value '{raw}'"));
            }
            users
        }
    };

    Ok((features, label))
}

/// Parse a finite number, accepting thousands separators (`"1,234"`).
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|&c| c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_flag(raw: &str) -> Option<Label> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(Label::Top),
        "0" | "false" | "no" | "n" => Some(Label::NotTop),
        other => match other.parse::<f64>() {
            Ok(v) if v == 1.0 => Some(Label::Top),
            Ok(v) if v == 0.0 => Some(Label::NotTop),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_top_column_with_display_headers() {
        let csv = "\u{feff}Content Length,Title Length,Links,Verbosity,Sentiment,Top\n\
                   850,42,3,17.5,0.6,True\n\
                   1200,38,0,21.0,-0.1,false\n";
        let data = read_training(csv.as_bytes()).unwrap();
        assert_eq!(data.label_source, LabelSource::Column);
        assert_eq!(data.rows_used(), 2);
        assert_eq!(data.training.articles[0].features, [850.0, 42.0, 3.0, 17.5, 0.6]);
        assert_eq!(data.training.articles[0].label, Label::Top);
        assert_eq!(data.training.articles[1].label, Label::NotTop);
    }

    #[test]
    fn users_column_splits_at_median() {
        let csv = "content_length,title_length,links,verbosity,sentiment,users\n\
                   500,30,1,12,0.1,\"1,200\"\n\
                   600,31,2,13,0.2,300\n\
                   700,32,3,14,0.3,800\n\
                   800,33,4,15,0.4,50\n";
        let data = read_training(csv.as_bytes()).unwrap();
        // Sorted users: 50, 300, 800, 1200 -> median 550.
        assert_eq!(data.label_source, LabelSource::UsersMedian { threshold: 550.0 });
        let labels: Vec<Label> = data.training.articles.iter().map(|a| a.label).collect();
        assert_eq!(labels, vec![Label::Top, Label::NotTop, Label::Top, Label::NotTop]);
    }

    #[test]
    fn median_row_counts_as_top() {
        let rows = vec![([0.0; FEATURE_COUNT], 10.0), ([0.0; FEATURE_COUNT], 20.0), ([0.0; FEATURE_COUNT], 30.0)];
        let (set, threshold) = label_by_median(rows);
        assert_eq!(threshold, 20.0);
        assert_eq!(set.top_count(), 2);
    }

    #[test]
    fn bad_rows_are_skipped_with_line_numbers() {
        let csv = "content_length,title_length,links,verbosity,sentiment,top\n\
                   500,30,1,12,0.1,1\n\
                   abc,30,1,12,0.1,1\n\
                   600,31,2,13,0.2,maybe\n";
        let data = read_training(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_read, 3);
        assert_eq!(data.rows_used(), 1);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[test]
    fn missing_columns_are_rejected() {
        let no_label = "content_length,title_length,links,verbosity,sentiment\n1,2,3,4,5\n";
        assert!(matches!(read_training(no_label.as_bytes()), Err(AppError::InvalidData(_))));

        let no_feature = "content_length,title_length,links,verbosity,top\n1,2,3,4,1\n";
        assert!(matches!(read_training(no_feature.as_bytes()), Err(AppError::InvalidData(_))));
    }

    #[test]
    fn table_without_valid_rows_is_rejected() {
        let csv = "content_length,title_length,links,verbosity,sentiment,top\nabc,2,3,4,5,1\n";
        assert!(matches!(read_training(csv.as_bytes()), Err(AppError::InvalidData(_))));
    }
}
