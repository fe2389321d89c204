//! Row standardization

use super::row::{NeighborRow, NormalizedRow};

/// Divide each weight by the row sum when `row_standardize` is set.
///
/// The raw sum is always recorded. A row whose sum is exactly zero is left
/// untouched, so isolated features pass through unchanged.
pub fn normalize(mut row: NeighborRow, row_standardize: bool) -> NormalizedRow {
    let sum = row.weight_sum();
    if row_standardize && sum != 0.0 {
        for w in row.weights.iter_mut() {
            *w /= sum;
        }
    }
    NormalizedRow {
        row,
        unstandardized_sum: sum,
    }
}

/// Recover raw weights from a standardized row using its stored sum.
pub fn unstandardize(mut normalized: NormalizedRow) -> NeighborRow {
    let sum = normalized.unstandardized_sum;
    if sum != 0.0 {
        for w in normalized.row.weights.iter_mut() {
            *w *= sum;
        }
    }
    normalized.row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize() {
        let row = NeighborRow::from_pairs(1, vec![(2, 1.0), (3, 3.0)]);
        let n = normalize(row, true);
        assert_eq!(n.unstandardized_sum, 4.0);
        assert_eq!(n.row.weights, vec![0.25, 0.75]);
        let raw = unstandardize(n);
        assert_eq!(raw.weights, vec![1.0, 3.0]);
    }

    #[test]
    fn test_raw_keeps_sum() {
        let row = NeighborRow::uniform(1, vec![2, 3, 4], 1.0);
        let n = normalize(row, false);
        assert_eq!(n.unstandardized_sum, 3.0);
        assert_eq!(n.row.weights, vec![1.0; 3]);
    }

    #[test]
    fn test_empty_row() {
        let n = normalize(NeighborRow::new(9), true);
        assert_eq!(n.unstandardized_sum, 0.0);
        assert!(n.row.is_empty());
    }
}
