use crate::duals::DualPrices;
use crate::error::Error;
use crate::pattern::{Pattern, PatternId};
use crate::piece::Piece;
use crate::pricing::{candidates, PricingResult, PricingSolver};

/// Ratio heuristic: walks the pieces by decreasing dual price per unit of length and keeps every
/// piece that still fits.
///
/// Cheap but not exact, so its results can only ever justify adding a column. Use it behind a
/// [`GuardedPricer`](crate::pricing::GuardedPricer).
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyPricer;

impl GreedyPricer {
    pub fn new() -> Self {
        GreedyPricer
    }
}

impl PricingSolver for GreedyPricer {
    fn price(
        &mut self,
        pieces: &[Piece],
        duals: &DualPrices,
        capacity: u32,
        id: PatternId,
    ) -> Result<PricingResult, Error> {
        let mut order: Vec<Piece> = candidates(pieces, duals, capacity).copied().collect();
        order.sort_by(|a, b| duals.compare(a, b));

        let mut left = capacity;
        let mut chosen = Vec::new();
        for piece in order {
            if piece.length() <= left {
                left -= piece.length();
                chosen.push(piece);
            }
        }

        let pattern = Pattern::new(id, chosen, capacity)?;
        Ok(PricingResult::new(pattern, duals, false))
    }

    fn is_exact(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::tests::{duals, pieces};

    #[test]
    fn fills_by_ratio() {
        let p = pieces(&[100, 60, 50, 40]);
        // ratios: 0.009, 0.0125, 0.01, 0.0125
        let d = duals(&[0.9, 0.75, 0.5, 0.5]);
        let result = GreedyPricer.price(&p, &d, 150, PatternId(0)).unwrap();
        let ids: Vec<_> = result.pattern.pieces().iter().map(|p| p.id().0).collect();
        // 60 and 40 first (tie broken by id), then 50 still fits exactly
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(result.pattern.total_length(), 150);
        assert!((result.objective - 1.75).abs() < 1e-12);
        assert!(!result.exact);
    }

    #[test]
    fn can_miss_the_optimum() {
        let p = pieces(&[60, 100]);
        let d = duals(&[0.7, 1.1]);
        let result = GreedyPricer.price(&p, &d, 100, PatternId(0)).unwrap();
        // the 60 has the better ratio and blocks the 100
        assert!((result.objective - 0.7).abs() < 1e-12);
        assert!(!result.is_improving(1e-6));
    }

    #[test]
    fn empty_when_nothing_priced() {
        let p = pieces(&[10, 20]);
        let d = duals(&[0.0, 0.0]);
        let result = GreedyPricer.price(&p, &d, 100, PatternId(0)).unwrap();
        assert!(result.pattern.is_empty());
        assert_eq!(result.reduced_cost, 1.0);
    }
}
