use std::time::Duration;

use tracing::trace;

use crate::duals::DualPrices;
use crate::engine::{ObjSense, SolverEngine, VarKind};
use crate::error::Error;
use crate::pattern::{Pattern, PatternId};
use crate::piece::Piece;
use crate::pricing::{candidates, PricingResult, PricingSolver};

/// Solves the knapsack as a binary program on a [`SolverEngine`].
///
/// A fresh engine is built for every call, so no state leaks from one pricing round to the next.
/// Slower than [`KnapsackPricer`](crate::pricing::KnapsackPricer) for short rods, but independent
/// of the rod length.
pub struct MipPricer<F> {
    factory: F,
    time_limit: Option<Duration>,
}

impl<E, F> MipPricer<F>
where
    E: SolverEngine,
    F: FnMut() -> Result<E, Error>,
{
    /// `factory` creates an empty engine for each pricing round.
    pub fn new(factory: F) -> Self {
        MipPricer {
            factory,
            time_limit: None,
        }
    }

    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }
}

impl<E, F> PricingSolver for MipPricer<F>
where
    E: SolverEngine,
    F: FnMut() -> Result<E, Error>,
{
    fn price(
        &mut self,
        pieces: &[Piece],
        duals: &DualPrices,
        capacity: u32,
        id: PatternId,
    ) -> Result<PricingResult, Error> {
        let items: Vec<Piece> = candidates(pieces, duals, capacity).copied().collect();
        if items.is_empty() {
            return Ok(PricingResult::new(Pattern::new(id, Vec::new(), capacity)?, duals, true));
        }

        let mut engine = (self.factory)()?;
        engine.set_time_limit(self.time_limit)?;
        let vars = items
            .iter()
            .map(|piece| {
                engine.add_var(
                    &format!("take_{}", piece.id()),
                    0.0,
                    1.0,
                    duals.get(piece.id()),
                    VarKind::Binary,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let weights: Vec<_> = vars
            .iter()
            .zip(&items)
            .map(|(&var, piece)| (var, f64::from(piece.length())))
            .collect();
        engine.add_linear_cons("capacity", &weights, f64::NEG_INFINITY, f64::from(capacity))?;

        let profits: Vec<_> = vars
            .iter()
            .zip(&items)
            .map(|(&var, piece)| (var, duals.get(piece.id())))
            .collect();
        engine.set_objective(&profits, ObjSense::Maximize)?;
        engine.solve()?;

        let mut chosen = Vec::new();
        for (&var, piece) in vars.iter().zip(&items) {
            if engine.var_value(var)? > 0.5 {
                chosen.push(*piece);
            }
        }
        trace!(
            items = items.len(),
            chosen = chosen.len(),
            objective = engine.objective_value()?,
            "knapsack program solved"
        );

        let pattern = Pattern::new(id, chosen, capacity)?;
        Ok(PricingResult::new(pattern, duals, true))
    }

    fn is_exact(&self) -> bool {
        true
    }
}
