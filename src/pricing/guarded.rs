use tracing::trace;

use crate::duals::DualPrices;
use crate::error::Error;
use crate::pattern::PatternId;
use crate::piece::Piece;
use crate::pricing::{PricingResult, PricingSolver};

/// Tries a heuristic first and falls back to an exact solver.
///
/// A heuristic result is returned only if its reduced cost is below `-tolerance`; any such column
/// improves the master. Otherwise the exact solver runs, so a non-improving result returned by this
/// pricer is always a proven optimum.
#[derive(Debug, Clone)]
pub struct GuardedPricer<H, X> {
    heuristic: H,
    exact: X,
    tolerance: f64,
}

impl<H: PricingSolver, X: PricingSolver> GuardedPricer<H, X> {
    pub fn new(heuristic: H, exact: X, tolerance: f64) -> Self {
        debug_assert!(exact.is_exact(), "fallback pricer must be exact");
        GuardedPricer {
            heuristic,
            exact,
            tolerance,
        }
    }
}

impl<H: PricingSolver, X: PricingSolver> PricingSolver for GuardedPricer<H, X> {
    fn price(
        &mut self,
        pieces: &[Piece],
        duals: &DualPrices,
        capacity: u32,
        id: PatternId,
    ) -> Result<PricingResult, Error> {
        let guess = self.heuristic.price(pieces, duals, capacity, id)?;
        if guess.is_improving(self.tolerance) {
            trace!(reduced_cost = guess.reduced_cost, "heuristic column accepted");
            return Ok(guess);
        }
        trace!(
            reduced_cost = guess.reduced_cost,
            "heuristic found no improving column, pricing exactly"
        );
        self.exact.price(pieces, duals, capacity, id)
    }

    fn is_exact(&self) -> bool {
        self.exact.is_exact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::tests::{duals, pieces};
    use crate::pricing::{GreedyPricer, KnapsackPricer};

    #[test]
    fn accepts_improving_heuristic_column() {
        let p = pieces(&[60, 70]);
        let d = duals(&[0.6, 0.6]);
        let mut pricer = GuardedPricer::new(GreedyPricer, KnapsackPricer::new(), 1e-6);
        let result = pricer.price(&p, &d, 150, PatternId(2)).unwrap();
        assert!(!result.exact);
        assert!((result.reduced_cost + 0.2).abs() < 1e-12);
        assert_eq!(result.pattern.len(), 2);
    }

    #[test]
    fn falls_back_when_heuristic_misses() {
        let p = pieces(&[60, 100, 50]);
        // greedy takes 60 then 50 (0.4 + 0.5), the optimum is 100 + 50
        let d = duals(&[0.4, 0.6, 0.5]);
        let mut pricer = GuardedPricer::new(GreedyPricer, KnapsackPricer::new(), 1e-6);
        let result = pricer.price(&p, &d, 150, PatternId(3)).unwrap();
        assert!(result.exact);
        assert!((result.objective - 1.1).abs() < 1e-12);
        assert!(result.is_improving(1e-6));
        assert!(pricer.is_exact());
    }

    #[test]
    fn convergence_is_decided_exactly() {
        let p = pieces(&[60, 100]);
        let d = duals(&[0.5, 0.5]);
        let mut pricer = GuardedPricer::new(GreedyPricer, KnapsackPricer::new(), 1e-6);
        let result = pricer.price(&p, &d, 150, PatternId(2)).unwrap();
        assert!(result.exact);
        assert!(!result.is_improving(1e-6));
    }
}
