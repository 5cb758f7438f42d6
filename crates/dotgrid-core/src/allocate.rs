//! Proportional allocation of a dot budget across regions.
//!
//! Percentages come from polygon areas rounded to whole numbers, so they
//! rarely sum to exactly 100. [`allocate`] still hands out exactly the
//! requested total using the largest-remainder method.

use serde::{Deserialize, Serialize};

use crate::geometry::polygon_area;
use crate::history::History;
use crate::types::ImageRecord;

/// Split `total` into integer shares proportional to `percentages`.
///
/// Each share starts at `floor(percentage / 100 * total)`. Leftover units
/// go one each to the regions with a non-zero fractional remainder,
/// largest remainder first, ties to the lowest index. Anything still left
/// after that goes to index 0, so all-zero percentages put the whole budget
/// on index 0.
///
/// Percentages summing above 100 can floor to more than `total`. In that
/// case they are rescaled to sum to exactly 100 before flooring. Negative
/// or non-finite percentages count as zero. The result always sums to
/// `total` when `percentages` is non-empty, and is empty otherwise. Work is
/// `O(n log n)` in the number of regions regardless of `total`.
#[must_use = "returns the per-region allocation"]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn allocate(total: usize, percentages: &[f64]) -> Vec<usize> {
    if percentages.is_empty() {
        return Vec::new();
    }

    let weights: Vec<f64> = percentages
        .iter()
        .map(|&p| if p.is_finite() { p.max(0.0) } else { 0.0 })
        .collect();
    let mut raw: Vec<f64> = weights.iter().map(|w| w / 100.0 * total as f64).collect();
    if floor_sum(&raw) > total {
        // Normalize by the peak first so the sum cannot overflow.
        let peak = weights.iter().copied().fold(0.0, f64::max);
        let sum: f64 = weights.iter().map(|w| w / peak).sum();
        raw = weights
            .iter()
            .map(|w| w / peak / sum * total as f64)
            .collect();
    }

    let mut shares: Vec<usize> = raw.iter().map(|r| r.floor() as usize).collect();
    let remainders: Vec<f64> = raw
        .iter()
        .zip(&shares)
        .map(|(r, &s)| r - s as f64)
        .collect();

    // Rounding slack from the rescale is at most a unit or two.
    let mut assigned = floor_sum(&raw);
    while assigned > total {
        let idx = index_of_largest(&shares);
        shares[idx] -= 1;
        assigned -= 1;
    }

    let mut order: Vec<usize> = (0..shares.len()).filter(|&i| remainders[i] > 0.0).collect();
    order.sort_by(|&a, &b| remainders[b].total_cmp(&remainders[a]).then(a.cmp(&b)));
    let leftover = total - assigned;
    for &idx in order.iter().take(leftover) {
        shares[idx] += 1;
    }
    shares[0] += leftover.saturating_sub(order.len());
    shares
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_sum(raw: &[f64]) -> usize {
    raw.iter()
        .fold(0usize, |acc, r| acc.saturating_add(r.floor() as usize))
}

fn index_of_largest(shares: &[usize]) -> usize {
    let mut best = 0;
    for (i, &s) in shares.iter().enumerate().skip(1) {
        if s > shares[best] {
            best = i;
        }
    }
    best
}

/// `round(area / Σareas * 100)`, or 0 when the areas sum to zero.
#[must_use]
pub fn percentage_of(area: f64, total_area: f64) -> f64 {
    if total_area > 0.0 {
        (area / total_area * 100.0).round()
    } else {
        0.0
    }
}

/// One row of an area report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionShare {
    /// Polygon area in square pixels.
    pub area: f64,
    /// Rounded share of the total area, in percent.
    pub percentage: f64,
    /// Dots allocated to this region.
    pub dots: usize,
}

/// Area report over arbitrary regions given by their areas.
#[must_use]
pub fn shares_for_areas(areas: &[f64], total: usize) -> Vec<RegionShare> {
    let sum: f64 = areas.iter().sum();
    let percentages: Vec<f64> = areas.iter().map(|&a| percentage_of(a, sum)).collect();
    let dots = allocate(total, &percentages);
    areas
        .iter()
        .zip(percentages)
        .zip(dots)
        .map(|((&area, percentage), dots)| RegionShare {
            area,
            percentage,
            dots,
        })
        .collect()
}

/// Per-layer report for one image: each layer's lasso area as a share of
/// all layers on that image.
#[must_use]
pub fn layer_shares(history: &History, total: usize) -> Vec<RegionShare> {
    let areas: Vec<f64> = history
        .iter()
        .map(|layer| polygon_area(&layer.settings.points))
        .collect();
    shares_for_areas(&areas, total)
}

/// Per-image report: each image's summed layer area as a share of all
/// images.
#[must_use]
pub fn image_shares(images: &[ImageRecord], total: usize) -> Vec<RegionShare> {
    let areas: Vec<f64> = images
        .iter()
        .map(|image| {
            image
                .edit_history
                .iter()
                .map(|layer| polygon_area(&layer.settings.points))
                .sum()
        })
        .collect();
    shares_for_areas(&areas, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split() {
        assert_eq!(allocate(10, &[50.0, 50.0]), vec![5, 5]);
    }

    #[test]
    fn largest_remainder_wins() {
        let result = allocate(10, &[33.0, 33.0, 34.0]);
        assert_eq!(result.iter().sum::<usize>(), 10);
        assert_eq!(result, vec![3, 3, 4]);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        assert_eq!(allocate(2, &[33.0, 33.0, 33.0]), vec![1, 1, 0]);
    }

    #[test]
    fn all_zero_percentages_go_to_first() {
        assert_eq!(allocate(7, &[0.0, 0.0, 0.0]), vec![7, 0, 0]);
    }

    #[test]
    fn zero_total() {
        assert_eq!(allocate(0, &[25.0, 75.0]), vec![0, 0]);
    }

    #[test]
    fn empty_percentages() {
        assert!(allocate(10, &[]).is_empty());
    }

    #[test]
    fn overshoot_is_trimmed() {
        // 34 + 34 + 34 = 102 percent.
        let result = allocate(100, &[34.0, 34.0, 34.0]);
        assert_eq!(result.iter().sum::<usize>(), 100);
    }

    #[test]
    fn huge_percentages_finish_quickly() {
        assert_eq!(allocate(10, &[1e9, 0.0]), vec![10, 0]);
        assert_eq!(allocate(10, &[1e12, 0.0]), vec![10, 0]);
        assert_eq!(allocate(10, &[f64::MAX, f64::MAX]), vec![5, 5]);
    }

    #[test]
    fn large_total_with_small_percentages() {
        let result = allocate(1_000_000_000, &[1.0, 0.0, 2.5]);
        assert_eq!(result.iter().sum::<usize>(), 1_000_000_000);
        assert_eq!(result[2], 25_000_000);
    }

    #[test]
    fn sum_matches_total_across_inputs() {
        let cases: &[&[f64]] = &[
            &[100.0],
            &[12.5, 87.5],
            &[1.0, 1.0, 1.0, 97.0],
            &[20.0, 20.0, 20.0, 20.0, 20.0],
            &[33.0, 33.0, 33.0],
            &[60.0, 50.0],
            &[-5.0, f64::NAN, 40.0],
            &[150.0, 150.0, 1.0],
            &[1e15, 3.0],
        ];
        for &pcts in cases {
            for total in [0, 1, 2, 3, 7, 10, 99, 1000] {
                let result = allocate(total, pcts);
                assert_eq!(result.len(), pcts.len());
                assert_eq!(result.iter().sum::<usize>(), total, "{pcts:?} / {total}");
            }
        }
    }

    #[test]
    fn percentage_rounds() {
        assert!((percentage_of(1.0, 3.0) - 33.0).abs() < f64::EPSILON);
        assert!((percentage_of(2.0, 3.0) - 67.0).abs() < f64::EPSILON);
        assert!(percentage_of(5.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shares_for_areas_reports_each_region() {
        let shares = shares_for_areas(&[100.0, 300.0], 8);
        assert_eq!(shares.len(), 2);
        assert!((shares[0].percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(shares[0].dots, 2);
        assert_eq!(shares[1].dots, 6);
    }
}
