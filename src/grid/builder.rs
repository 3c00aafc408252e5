//! Cartesian-product grid construction and row lookup.
//!
//! The grid never materializes its coordinates. Row `id` is a mixed-radix
//! number over the five range lengths (content length most significant,
//! sentiment least), so coordinates are recovered with a division per feature
//! and the rows holding one feature value form a regular strided pattern.
//! Per row we only store the resolution state.
//!
//! A per-feature value index (value -> position in range) is built once here
//! and reused by every sweep.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{FEATURE_COUNT, Feature, FeatureVector, Label, Resolution};
use crate::error::AppError;
use crate::grid::ranges::{FeatureRange, FeatureRanges, value_key};

/// Builds grids, enforcing a cap on their size.
#[derive(Debug, Clone)]
pub struct GridBuilder {
    max_rows: usize,
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl GridBuilder {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    /// Produce the full cartesian product with every row unresolved.
    pub fn build(&self, ranges: FeatureRanges) -> Result<Grid, AppError> {
        for range in ranges.iter() {
            range.validate()?;
        }

        let total = ranges.product_len().ok_or_else(|| AppError::InvalidRange {
            feature: Feature::ContentLength,
            message: "grid size overflows usize".to_string(),
        })?;
        if total > self.max_rows {
            let lengths = ranges.lengths();
            let widest = Feature::ALL
                .into_iter()
                .max_by_key(|f| lengths[f.index()])
                .unwrap_or(Feature::ContentLength);
            return Err(AppError::InvalidRange {
                feature: widest,
                message: format!(
                    "grid would hold {total} rows (ranges {lengths:?}), above the cap of {}; coarsen the discretization",
                    self.max_rows
                ),
            });
        }

        let lengths = ranges.lengths();
        let mut strides = [1usize; FEATURE_COUNT];
        for i in (0..FEATURE_COUNT - 1).rev() {
            strides[i] = strides[i + 1] * lengths[i + 1];
        }

        let index = std::array::from_fn(|i| position_index(ranges.get(Feature::ALL[i])));

        debug!(rows = total, ?lengths, "built feature grid");

        Ok(Grid {
            ranges,
            strides,
            index,
            states: vec![Resolution::Unresolved; total],
            resolved: 0,
        })
    }
}

fn position_index(range: &FeatureRange) -> HashMap<u64, usize> {
    range
        .values()
        .iter()
        .enumerate()
        .map(|(pos, &v)| (value_key(v), pos))
        .collect()
}

/// A materialized view of one grid row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRow {
    pub id: usize,
    pub values: FeatureVector,
    pub resolution: Resolution,
}

/// The synthetic test grid shared by all sweeps.
#[derive(Debug, Clone)]
pub struct Grid {
    ranges: FeatureRanges,
    strides: [usize; FEATURE_COUNT],
    index: [HashMap<u64, usize>; FEATURE_COUNT],
    states: Vec<Resolution>,
    resolved: usize,
}

impl Grid {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn ranges(&self) -> &FeatureRanges {
        &self.ranges
    }

    /// The grid's own range for a feature, reusable as a sweep range.
    pub fn range(&self, feature: Feature) -> &FeatureRange {
        self.ranges.get(feature)
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved
    }

    pub fn unresolved_count(&self) -> usize {
        self.len() - self.resolved
    }

    /// Position of `value` within the feature's range.
    pub fn position_of(&self, feature: Feature, value: f64) -> Option<usize> {
        self.index[feature.index()].get(&value_key(value)).copied()
    }

    /// Range positions of a row's coordinates.
    pub fn positions(&self, id: usize) -> [usize; FEATURE_COUNT] {
        let lengths = self.ranges.lengths();
        std::array::from_fn(|i| (id / self.strides[i]) % lengths[i])
    }

    /// Row id for the given range positions.
    pub fn id_of(&self, positions: [usize; FEATURE_COUNT]) -> usize {
        positions
            .iter()
            .zip(&self.strides)
            .map(|(p, s)| p * s)
            .sum()
    }

    pub fn values(&self, id: usize) -> FeatureVector {
        let positions = self.positions(id);
        std::array::from_fn(|i| self.ranges.get(Feature::ALL[i]).values()[positions[i]])
    }

    pub fn resolution(&self, id: usize) -> Resolution {
        self.states[id]
    }

    pub fn row(&self, id: usize) -> GridRow {
        GridRow {
            id,
            values: self.values(id),
            resolution: self.states[id],
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = GridRow> + '_ {
        (0..self.len()).map(|id| self.row(id))
    }

    /// Ids of all rows whose `feature` coordinate equals `value`.
    ///
    /// Returns `None` when the value is not part of the grid's range.
    pub fn rows_with(&self, feature: Feature, value: f64) -> Option<ValueRows> {
        let position = self.position_of(feature, value)?;
        let i = feature.index();
        let stride = self.strides[i];
        let block = stride * self.ranges.get(feature).len();
        Some(ValueRows {
            stride,
            block,
            start: position * stride,
            blocks: self.len() / block,
            next_block: 0,
            offset: 0,
        })
    }

    /// Record a prediction for an unresolved row.
    ///
    /// Resolution is one-way: a row that already carries a label keeps it and
    /// the call returns `false`.
    pub fn resolve(&mut self, id: usize, label: Label) -> bool {
        match self.states[id] {
            Resolution::Resolved(_) => false,
            Resolution::Unresolved => {
                self.states[id] = Resolution::Resolved(label);
                self.resolved += 1;
                true
            }
        }
    }
}

/// Iterator over the row ids holding one feature value.
///
/// Those rows come in `blocks` runs of `stride` consecutive ids, one run per
/// `block` ids, starting `start` ids into each block.
#[derive(Debug, Clone)]
pub struct ValueRows {
    stride: usize,
    block: usize,
    start: usize,
    blocks: usize,
    next_block: usize,
    offset: usize,
}

impl ValueRows {
    /// Number of rows the iterator yields in total.
    pub fn total(&self) -> usize {
        self.blocks * self.stride
    }
}

impl Iterator for ValueRows {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next_block >= self.blocks {
            return None;
        }
        let id = self.next_block * self.block + self.start + self.offset;
        self.offset += 1;
        if self.offset == self.stride {
            self.offset = 0;
            self.next_block += 1;
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn ranges(lengths: [usize; FEATURE_COUNT]) -> FeatureRanges {
        FeatureRanges::new(std::array::from_fn(|i| {
            FeatureRange::new(Feature::ALL[i], (0..lengths[i]).map(|v| v as f64).collect())
        }))
        .unwrap()
    }

    #[test]
    fn grid_is_full_product_of_distinct_rows() {
        let grid = GridBuilder::default().build(ranges([3, 2, 4, 1, 5])).unwrap();
        assert_eq!(grid.len(), 3 * 2 * 4 * 5);

        let distinct: HashSet<[u64; FEATURE_COUNT]> = grid
            .rows()
            .map(|r| r.values.map(f64::to_bits))
            .collect();
        assert_eq!(distinct.len(), grid.len());
        assert!(grid.rows().all(|r| r.resolution == Resolution::Unresolved));
        assert_eq!(grid.resolved_count(), 0);
    }

    #[test]
    fn row_order_matches_nested_loops() {
        let grid = GridBuilder::default().build(ranges([2, 1, 1, 2, 3])).unwrap();
        assert_eq!(grid.values(0), [0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(grid.values(1), [0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(grid.values(3), [0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(grid.values(6), [1.0, 0.0, 0.0, 0.0, 0.0]);
        for id in 0..grid.len() {
            assert_eq!(grid.id_of(grid.positions(id)), id);
        }
    }

    #[test]
    fn rows_with_matches_linear_scan() {
        let grid = GridBuilder::default().build(ranges([3, 2, 4, 2, 3])).unwrap();
        for feature in Feature::ALL {
            for &v in grid.range(feature).values() {
                let indexed: Vec<usize> = grid.rows_with(feature, v).unwrap().collect();
                let scanned: Vec<usize> = grid
                    .rows()
                    .filter(|r| r.values[feature.index()] == v)
                    .map(|r| r.id)
                    .collect();
                assert_eq!(indexed, scanned, "{feature} = {v}");
            }
        }
        assert!(grid.rows_with(Feature::Links, 99.0).is_none());
    }

    #[test]
    fn empty_range_is_rejected() {
        let mut lengths = [2; FEATURE_COUNT];
        lengths[2] = 0;
        let err = GridBuilder::default().build(ranges(lengths)).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidRange {
                feature: Feature::Links,
                ..
            }
        ));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let err = GridBuilder::new(100).build(ranges([5, 5, 5, 1, 1])).unwrap_err();
        assert!(matches!(err, AppError::InvalidRange { .. }));
    }

    #[test]
    fn resolution_is_one_way() {
        let mut grid = GridBuilder::default().build(ranges([1, 1, 2, 1, 1])).unwrap();
        assert!(grid.resolve(1, Label::NotTop));
        assert!(!grid.resolve(1, Label::Top));
        assert_eq!(grid.resolution(1), Resolution::Resolved(Label::NotTop));
        assert_eq!(grid.resolved_count(), 1);
        assert_eq!(grid.unresolved_count(), 1);
    }
}
