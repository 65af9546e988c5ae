//! Merging of intermittent column defects
//!
//! One electrical fault along a column often shows up as many short bad runs
//! separated by short good runs. Left alone these look like many unrelated
//! small defects, so columns with enough separate runs are collapsed into
//! width-1 boxes spanning each cluster of nearby runs.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::{DefectBox, DefectSet, FindDefectsConfig};

/// Inclusive row interval `[start, end]` within one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Run {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntermittentColumnMerger {
    /// Minimum number of separate bad runs for a column to be merged
    pub bad_on_and_off_threshold: usize,
    /// Largest run of good pixels bridged inside one merged box
    pub good_pixel_gap_threshold: usize,
}

impl IntermittentColumnMerger {
    pub fn new(bad_on_and_off_threshold: usize, good_pixel_gap_threshold: usize) -> Self {
        Self {
            bad_on_and_off_threshold,
            good_pixel_gap_threshold,
        }
    }

    pub fn from_config(config: &FindDefectsConfig) -> Self {
        Self::new(
            config.bad_on_and_off_pixel_column_threshold,
            config.good_pixel_column_gap_threshold,
        )
    }

    /// Build a new set with intermittent columns merged.
    ///
    /// A column qualifies when it holds at least `bad_on_and_off_threshold`
    /// separate runs (overlapping or touching intervals count as one run).
    /// Its runs are grouped into clusters, a new cluster starting wherever
    /// more than `good_pixel_gap_threshold` good pixels separate two runs, and
    /// each cluster becomes one width-1 box. Parts of boxes lying in columns
    /// that do not qualify are kept as they are.
    ///
    /// The result does not depend on the order of boxes in `defects`.
    pub fn merge(&self, defects: &DefectSet) -> DefectSet {
        let columns = column_runs(defects);

        let mut merged = Vec::new();
        let mut qualifying = Vec::new();
        for (&x, runs) in &columns {
            if runs.len() < self.bad_on_and_off_threshold {
                continue;
            }
            let clusters = self.clusters(runs);
            debug!(
                "Column {} has {} bad runs, merged into {} boxes",
                x,
                runs.len(),
                clusters.len()
            );
            merged.extend(
                clusters
                    .into_iter()
                    .map(|run| DefectBox::from_corners(x, run.start, x, run.end)),
            );
            qualifying.push(x);
        }

        if qualifying.is_empty() {
            return defects.clone();
        }
        info!(
            "Merged {} intermittent columns into {} boxes",
            qualifying.len(),
            merged.len()
        );

        let mut boxes = merged;
        for b in defects {
            boxes.extend(unmerged_slices(b, &qualifying));
        }
        DefectSet::from_in_bounds(defects.shape(), boxes)
    }

    fn clusters(&self, runs: &[Run]) -> Vec<Run> {
        let mut clusters: Vec<Run> = Vec::new();
        for &run in runs {
            match clusters.last_mut() {
                Some(last) if run.start - last.end - 1 <= self.good_pixel_gap_threshold => {
                    last.end = run.end;
                }
                _ => clusters.push(run),
            }
        }
        clusters
    }
}

/// Coalesced bad runs of every column touched by a box, sorted by start row.
fn column_runs(defects: &DefectSet) -> BTreeMap<usize, Vec<Run>> {
    let mut columns: BTreeMap<usize, Vec<Run>> = BTreeMap::new();
    for b in defects {
        for x in b.x..=b.max_x() {
            columns.entry(x).or_default().push(Run {
                start: b.y,
                end: b.max_y(),
            });
        }
    }

    for runs in columns.values_mut() {
        runs.sort_unstable();
        let mut coalesced: Vec<Run> = Vec::with_capacity(runs.len());
        for &run in runs.iter() {
            match coalesced.last_mut() {
                Some(last) if run.start <= last.end + 1 => last.end = last.end.max(run.end),
                _ => coalesced.push(run),
            }
        }
        *runs = coalesced;
    }
    columns
}

/// Column slices of `bbox` that avoid every column in `qualifying` (sorted).
fn unmerged_slices(bbox: &DefectBox, qualifying: &[usize]) -> Vec<DefectBox> {
    let mut slices = Vec::new();
    let mut start = None;
    for x in bbox.x..=bbox.max_x() {
        if qualifying.binary_search(&x).is_ok() {
            if let Some(x0) = start.take() {
                slices.push(bbox.column_slice(x0, x - 1));
            }
        } else if start.is_none() {
            start = Some(x);
        }
    }
    if let Some(x0) = start {
        slices.push(bbox.column_slice(x0, bbox.max_x()));
    }
    slices
}
