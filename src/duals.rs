use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::piece::{Piece, PieceId};

/// Dual prices of the covering constraints, keyed by piece.
///
/// Produced by [`RestrictedMaster::dual_prices`](crate::RestrictedMaster::dual_prices) after a
/// relaxed solve and used as knapsack profits during pricing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DualPrices {
    prices: BTreeMap<PieceId, f64>,
}

impl DualPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, piece: PieceId, price: f64) {
        self.prices.insert(piece, price);
    }

    /// Dual price of `piece`, zero if the piece has no covering constraint.
    pub fn get(&self, piece: PieceId) -> f64 {
        self.prices.get(&piece).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PieceId, f64)> + '_ {
        self.prices.iter().map(|(id, price)| (*id, *price))
    }

    /// Sum of the prices of `pieces`.
    pub fn profit<'a>(&self, pieces: impl IntoIterator<Item = &'a Piece>) -> f64 {
        pieces.into_iter().map(|p| self.get(p.id())).sum()
    }

    /// Price per unit of length. Computed on demand so no pricing state ends up on a [`Piece`].
    pub fn attractiveness(&self, piece: &Piece) -> f64 {
        self.get(piece.id()) / f64::from(piece.length())
    }

    /// Orders two pieces by decreasing attractiveness, breaking ties by piece id.
    pub fn compare(&self, a: &Piece, b: &Piece) -> Ordering {
        self.attractiveness(b)
            .total_cmp(&self.attractiveness(a))
            .then_with(|| a.id().cmp(&b.id()))
    }
}

impl FromIterator<(PieceId, f64)> for DualPrices {
    fn from_iter<T: IntoIterator<Item = (PieceId, f64)>>(iter: T) -> Self {
        DualPrices {
            prices: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_piece_has_zero_price() {
        let duals: DualPrices = [(PieceId(0), 0.5)].into_iter().collect();
        assert_eq!(duals.get(PieceId(0)), 0.5);
        assert_eq!(duals.get(PieceId(9)), 0.0);
    }

    #[test]
    fn ordering_by_attractiveness() {
        let a = Piece::new(0, 100);
        let b = Piece::new(1, 50);
        let c = Piece::new(2, 50);
        let duals: DualPrices = [(PieceId(0), 1.0), (PieceId(1), 1.0), (PieceId(2), 1.0)]
            .into_iter()
            .collect();

        let mut pieces = vec![a, c, b];
        pieces.sort_by(|x, y| duals.compare(x, y));
        let ids: Vec<_> = pieces.iter().map(|p| p.id().0).collect();
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn profit_sums_member_prices() {
        let pieces = [Piece::new(0, 10), Piece::new(1, 20)];
        let duals: DualPrices = [(PieceId(0), 0.25), (PieceId(1), 0.5)].into_iter().collect();
        assert!((duals.profit(&pieces) - 0.75).abs() < 1e-12);
    }
}
