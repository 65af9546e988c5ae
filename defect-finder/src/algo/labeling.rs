//! Connected-component labeling and rectangle extraction over boolean masks.
//!
//! Labeling is a two-pass scan with a union-find table over 4-connected
//! neighbors (horizontal/vertical only). Box extraction turns each labeled
//! region into [`DefectBox`]es whose union covers exactly the region's pixels.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView2};

use crate::defects::DefectBox;

/// Find the root label in the union-find parent table, compressing the path.
fn find_root(parents: &mut [usize], label: usize) -> usize {
    let mut current = label;
    while current != parents[current] {
        parents[current] = parents[parents[current]];
        current = parents[current];
    }
    current
}

/// Join two label sets, keeping the smaller root as the canonical label.
fn union_labels(parents: &mut [usize], a: usize, b: usize) {
    let root_a = find_root(parents, a);
    let root_b = find_root(parents, b);
    if root_a < root_b {
        parents[root_b] = root_a;
    } else if root_b < root_a {
        parents[root_a] = root_b;
    }
}

/// Label 4-connected regions of `true` pixels.
///
/// # Returns
/// `(labels, count)` where background pixels are 0 and regions are numbered
/// consecutively from 1 in raster order of their first pixel.
pub fn connected_components(mask: &ArrayView2<bool>) -> (Array2<usize>, usize) {
    let (height, width) = mask.dim();
    let mut labels = Array2::<usize>::zeros((height, width));
    // Label 0 is background
    let mut parents = vec![0usize];

    for row in 0..height {
        for col in 0..width {
            if !mask[[row, col]] {
                continue;
            }
            let up = if row > 0 { labels[[row - 1, col]] } else { 0 };
            let left = if col > 0 { labels[[row, col - 1]] } else { 0 };

            labels[[row, col]] = match (up, left) {
                (0, 0) => {
                    let label = parents.len();
                    parents.push(label);
                    label
                }
                (0, l) | (l, 0) => l,
                (u, l) => {
                    union_labels(&mut parents, u, l);
                    u.min(l)
                }
            };
        }
    }

    // Resolve equivalences into consecutive final labels
    let mut relabel = vec![0usize; parents.len()];
    let mut count = 0;
    for label in 1..parents.len() {
        let root = find_root(&mut parents, label);
        if relabel[root] == 0 {
            count += 1;
            relabel[root] = count;
        }
        relabel[label] = relabel[root];
    }

    labels.mapv_inplace(|l| relabel[l]);
    (labels, count)
}

/// Per-label extent and pixel count collected in one pass.
#[derive(Debug, Clone, Copy)]
struct Extent {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
    pixels: usize,
}

impl Extent {
    fn empty() -> Self {
        Self {
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
            pixels: 0,
        }
    }

    fn include(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.pixels += 1;
    }

    fn area(&self) -> usize {
        (self.max_x - self.min_x + 1) * (self.max_y - self.min_y + 1)
    }

    fn to_box(self) -> DefectBox {
        DefectBox::from_corners(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Extract boxes for every labeled region.
///
/// A region that fills its bounding box is emitted as that single box.
/// Irregular regions are decomposed into rectangles built from horizontal
/// pixel runs, merging runs with identical column extent on consecutive rows,
/// so the union of the output boxes is exactly the labeled pixel set.
pub fn component_boxes(labels: &ArrayView2<usize>, count: usize) -> Vec<DefectBox> {
    let mut extents = vec![Extent::empty(); count + 1];
    for ((row, col), &label) in labels.indexed_iter() {
        if label > 0 {
            extents[label].include(col, row);
        }
    }

    let mut boxes = Vec::with_capacity(count);
    let mut irregular = vec![false; count + 1];
    for (label, extent) in extents.iter().enumerate().skip(1) {
        if extent.pixels == extent.area() {
            boxes.push(extent.to_box());
        } else {
            irregular[label] = true;
        }
    }

    if irregular.iter().any(|&flag| flag) {
        boxes.extend(run_boxes(labels, &irregular));
    }
    boxes
}

/// Rectangles from row runs of the flagged labels.
fn run_boxes(labels: &ArrayView2<usize>, selected: &[bool]) -> Vec<DefectBox> {
    let (height, width) = labels.dim();
    let mut boxes = Vec::new();
    // (label, first col, last col) -> first row of the open rectangle
    let mut open: HashMap<(usize, usize, usize), usize> = HashMap::new();

    for row in 0..height {
        let mut next_open = HashMap::with_capacity(open.len());
        let mut col = 0;
        while col < width {
            let label = labels[[row, col]];
            if label == 0 || !selected[label] {
                col += 1;
                continue;
            }
            let start = col;
            while col < width && labels[[row, col]] == label {
                col += 1;
            }
            let key = (label, start, col - 1);
            let first_row = open.remove(&key).unwrap_or(row);
            next_open.insert(key, first_row);
        }

        for ((_, x0, x1), y0) in open.drain() {
            boxes.push(DefectBox::from_corners(x0, y0, x1, row - 1));
        }
        open = next_open;
    }

    for ((_, x0, x1), y0) in open {
        boxes.push(DefectBox::from_corners(x0, y0, x1, height - 1));
    }
    boxes
}

/// Label a boolean mask and extract its covering boxes in one call.
///
/// # Returns
/// `(boxes, regions)` where `regions` is the number of connected components.
pub fn mask_to_boxes(mask: &ArrayView2<bool>) -> (Vec<DefectBox>, usize) {
    let (labels, count) = connected_components(mask);
    (component_boxes(&labels.view(), count), count)
}
