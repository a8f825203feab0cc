//! Pricing: finding the pattern with the most negative reduced cost for a set of dual prices.
//!
//! Every pattern costs one rod in the master objective, so the reduced cost of a pattern is
//! `1 - Σ dual(p)` over its pieces. Finding the best pattern is a 0/1 knapsack with profit = dual
//! price and weight = piece length.

use crate::duals::DualPrices;
use crate::error::Error;
use crate::pattern::{Pattern, PatternId};
use crate::piece::Piece;

pub mod greedy;
pub mod guarded;
pub mod knapsack;
pub mod mip;

pub use greedy::GreedyPricer;
pub use guarded::GuardedPricer;
pub use knapsack::KnapsackPricer;
pub use mip::MipPricer;

/// Objective coefficient of every column in the master.
pub const PATTERN_COST: f64 = 1.0;

/// A trait for pricing solvers.
pub trait PricingSolver {
    /// Selects a subset of `pieces` that fits into `capacity` and maximizes the sum of dual
    /// prices. The returned pattern carries `id`.
    ///
    /// If `capacity` is zero or no piece with a positive price fits, the result holds the empty
    /// pattern with objective 0.
    fn price(
        &mut self,
        pieces: &[Piece],
        duals: &DualPrices,
        capacity: u32,
        id: PatternId,
    ) -> Result<PricingResult, Error>;

    /// Whether every result of this solver is an optimal knapsack solution. Only exact results may
    /// be used to prove that no improving pattern exists.
    fn is_exact(&self) -> bool;
}

/// The outcome of one pricing round.
#[derive(Debug, Clone)]
pub struct PricingResult {
    /// The selected pieces. Empty if nothing with a positive price fits.
    pub pattern: Pattern,
    /// Sum of the dual prices of the selected pieces.
    pub objective: f64,
    /// `PATTERN_COST - objective`.
    pub reduced_cost: f64,
    /// Whether `objective` is the proven knapsack optimum.
    pub exact: bool,
}

impl PricingResult {
    /// Builds a result for `pattern`, computing its objective from `duals`.
    pub fn new(pattern: Pattern, duals: &DualPrices, exact: bool) -> Self {
        let objective = duals.profit(pattern.pieces());
        PricingResult {
            pattern,
            objective,
            reduced_cost: PATTERN_COST - objective,
            exact,
        }
    }

    /// Whether adding the pattern would improve the master, i.e. `reduced_cost < -tolerance`.
    pub fn is_improving(&self, tolerance: f64) -> bool {
        self.reduced_cost < -tolerance
    }
}

/// Pieces that can take part in an improving selection: positive price and not longer than the
/// rod.
pub(crate) fn candidates<'a>(
    pieces: &'a [Piece],
    duals: &'a DualPrices,
    capacity: u32,
) -> impl Iterator<Item = &'a Piece> + 'a {
    pieces
        .iter()
        .filter(move |piece| piece.length() <= capacity && duals.get(piece.id()) > 0.0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::piece::PieceId;

    pub(crate) fn pieces(lengths: &[u32]) -> Vec<Piece> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| Piece::new(i as u32, len))
            .collect()
    }

    pub(crate) fn duals(prices: &[f64]) -> DualPrices {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| (PieceId(i as u32), price))
            .collect()
    }

    /// Best knapsack objective by enumerating every subset.
    pub(crate) fn brute_force(pieces: &[Piece], duals: &DualPrices, capacity: u32) -> f64 {
        let n = pieces.len();
        let mut best = 0.0f64;
        for mask in 0u32..(1 << n) {
            let chosen = (0..n).filter(|i| mask & (1 << i) != 0);
            let (length, profit) = chosen.fold((0u64, 0.0), |(length, profit), i| {
                (
                    length + u64::from(pieces[i].length()),
                    profit + duals.get(pieces[i].id()),
                )
            });
            if length <= u64::from(capacity) && profit > best {
                best = profit;
            }
        }
        best
    }

    #[test]
    fn reduced_cost_is_one_minus_objective() {
        let p = pieces(&[40, 60]);
        let d = duals(&[0.5, 0.75]);
        let pattern = Pattern::new(PatternId(0), p.clone(), 100).unwrap();
        let result = PricingResult::new(pattern, &d, true);
        assert!((result.objective - 1.25).abs() < 1e-12);
        assert!((result.reduced_cost + 0.25).abs() < 1e-12);
        assert!(result.is_improving(1e-6));
    }

    #[test]
    fn candidates_skip_unpriced_and_oversized() {
        let p = pieces(&[40, 60, 200, 10]);
        let d = duals(&[0.5, 0.0, 1.0, -0.1]);
        let ids: Vec<_> = candidates(&p, &d, 100).map(|piece| piece.id().0).collect();
        assert_eq!(ids, vec![0]);
    }
}
