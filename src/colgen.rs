//! The column generation loop.
//!
//! [`ColumnGeneration`] alternates between the [`RestrictedMaster`] and a [`PricingSolver`] until
//! no pattern with negative reduced cost is left or the iteration bound is hit. [`solve`] and
//! [`solve_with`] wrap the whole run on a [`ScipEngine`].

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ColumnGenerationConfig, IntegerPolicy, PricingStrategy};
use crate::engine::scip::ScipEngine;
use crate::engine::SolverEngine;
use crate::error::{Error, ModelConstructionError};
use crate::master::RestrictedMaster;
use crate::pattern::{Pattern, PatternId};
use crate::piece::Piece;
use crate::pricing::{
    GreedyPricer, GuardedPricer, KnapsackPricer, MipPricer, PricingResult, PricingSolver,
};

/// Where the controller is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// The initial master is built but was not solved yet.
    Initializing,
    Iterating,
    Converged,
    IterationLimitReached,
    Failed,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationState {
    /// Pricing proved that no improving pattern exists. The LP bound is optimal.
    Converged,
    /// The iteration bound was hit first. The LP objective is a valid upper bound on the LP
    /// optimum, not necessarily the optimum itself.
    IterationLimitReached,
}

/// One pricing round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Relaxed master objective the duals were taken from.
    pub master_objective: f64,
    pub pricing_objective: f64,
    pub reduced_cost: f64,
    /// The pattern added to the master, `None` in the round that proved convergence.
    pub added: Option<Pattern>,
    /// Whether the pricing result came from the heuristic.
    pub heuristic: bool,
}

/// The pieces cut from one rod.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RodCut {
    pub pattern: PatternId,
    pub pieces: Vec<Piece>,
    pub used: u64,
    pub waste: u64,
}

/// Result of the integer post-processing step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegerSolution {
    /// Number of rods.
    pub objective: f64,
    pub selected_patterns: Vec<Pattern>,
}

/// The outcome of a column generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuttingPlan {
    pub rod_length: u32,
    /// Patterns used by the final relaxed master solution.
    pub selected_patterns: Vec<Pattern>,
    /// Objective of the final relaxed master, the LP bound on the number of rods.
    pub objective_value: f64,
    pub termination: TerminationState,
    /// Number of pricing rounds.
    pub iterations: usize,
    /// Every column of the final master, initial ones included.
    pub patterns_generated: usize,
    /// Present only with [`IntegerPolicy::SolveMaster`].
    pub integer: Option<IntegerSolution>,
    pub history: Vec<IterationRecord>,
    /// Rounds in which the heuristic alone produced the added pattern.
    pub heuristic_hits: usize,
}

impl CuttingPlan {
    /// One entry per rod of the integer solution, or per pattern of the relaxed solution when no
    /// integer solution was computed.
    pub fn rods(&self) -> Vec<RodCut> {
        let patterns = match &self.integer {
            Some(integer) => &integer.selected_patterns,
            None => &self.selected_patterns,
        };
        patterns
            .iter()
            .map(|pattern| RodCut {
                pattern: pattern.id(),
                pieces: pattern.pieces().to_vec(),
                used: pattern.total_length(),
                waste: u64::from(self.rod_length).saturating_sub(pattern.total_length()),
            })
            .collect()
    }
}

impl fmt::Display for CuttingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:?} after {} iterations, LP bound {:.4} rods",
            self.termination, self.iterations, self.objective_value
        )?;
        if let Some(integer) = &self.integer {
            writeln!(f, "integer solution: {} rods", integer.objective.round())?;
        }
        for rod in self.rods() {
            write!(f, "pattern {}:", rod.pattern)?;
            for piece in &rod.pieces {
                write!(f, " {piece}")?;
            }
            writeln!(f, " used {} waste {}", rod.used, rod.waste)?;
        }
        Ok(())
    }
}

/// Drives the master/pricing loop for one instance.
///
/// Each instance owns its master, engine and pricer; nothing is shared between instances.
pub struct ColumnGeneration<E: SolverEngine> {
    master: RestrictedMaster<E>,
    pricer: Box<dyn PricingSolver>,
    config: ColumnGenerationConfig,
    rod_length: u32,
    phase: Phase,
    iterations: usize,
    next_id: usize,
    history: Vec<IterationRecord>,
    plan: Option<CuttingPlan>,
}

impl<E: SolverEngine> ColumnGeneration<E> {
    /// Validates the instance and builds the initial master.
    ///
    /// `pricer` has to be exact, possibly behind a [`GuardedPricer`].
    ///
    /// Without `initial_patterns` every piece starts on its own rod. Given patterns must fit the
    /// rod and cover every piece.
    pub fn new(
        mut engine: E,
        pieces: &[Piece],
        rod_length: u32,
        initial_patterns: Option<Vec<Pattern>>,
        pricer: Box<dyn PricingSolver>,
        config: ColumnGenerationConfig,
    ) -> Result<Self, Error> {
        if !pricer.is_exact() {
            return Err(Error::InexactPricer);
        }
        validate(pieces, rod_length)?;
        let patterns = match initial_patterns {
            Some(patterns) => {
                for pattern in &patterns {
                    if !pattern.fits(rod_length) {
                        return Err(ModelConstructionError::PatternTooLong {
                            pattern: pattern.id(),
                            length: pattern.total_length(),
                            capacity: rod_length,
                        }
                        .into());
                    }
                }
                patterns
            }
            None => pieces
                .iter()
                .enumerate()
                .map(|(i, &piece)| Pattern::single(PatternId(i), piece, rod_length))
                .collect::<Result<Vec<_>, _>>()?,
        };
        let next_id = patterns
            .iter()
            .map(|pattern| pattern.id().0 + 1)
            .max()
            .unwrap_or(0);

        engine.set_time_limit(config.time_limit())?;
        let master = RestrictedMaster::new(engine, pieces, patterns)?
            .with_selection_tolerance(config.selection_tolerance);

        Ok(ColumnGeneration {
            master,
            pricer,
            config,
            rod_length,
            phase: Phase::Initializing,
            iterations: 0,
            next_id,
            history: Vec::new(),
            plan: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn master(&self) -> &RestrictedMaster<E> {
        &self.master
    }

    /// Pricing rounds done so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Runs one round: solve the relaxed master, take its duals, price, and either add the new
    /// pattern or stop. Returns the phase afterwards.
    ///
    /// Does nothing once a terminal phase is reached. A failed run cannot be resumed.
    pub fn step(&mut self) -> Result<Phase, Error> {
        match self.phase {
            Phase::Initializing | Phase::Iterating => {}
            Phase::Failed => return Err(Error::StaleState),
            phase => return Ok(phase),
        }
        match self.iterate() {
            Ok(phase) => {
                self.phase = phase;
                Ok(phase)
            }
            Err(err) => {
                warn!(%err, iteration = self.iterations, "column generation failed");
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    /// Iterates until convergence or the iteration bound, then builds the plan.
    pub fn run(&mut self) -> Result<CuttingPlan, Error> {
        if let Some(plan) = &self.plan {
            return Ok(plan.clone());
        }
        info!(
            pieces = self.master.pieces().len(),
            rod_length = self.rod_length,
            max_iterations = self.config.max_iterations,
            pricing = ?self.config.pricing,
            "starting column generation"
        );
        while self.step()? == Phase::Iterating {}

        let plan = self.finish().inspect_err(|err| {
            warn!(%err, "building the cutting plan failed");
            self.phase = Phase::Failed;
        })?;
        info!(
            termination = ?plan.termination,
            objective = plan.objective_value,
            iterations = plan.iterations,
            columns = plan.patterns_generated,
            heuristic_hits = plan.heuristic_hits,
            "column generation finished"
        );
        self.plan = Some(plan.clone());
        Ok(plan)
    }

    fn iterate(&mut self) -> Result<Phase, Error> {
        self.master.solve_relaxed()?;
        let master_objective = self.master.objective_value()?;
        if self.iterations >= self.config.max_iterations {
            return Ok(Phase::IterationLimitReached);
        }

        let duals = self.master.dual_prices()?;
        let PricingResult {
            pattern,
            objective,
            reduced_cost,
            exact,
        } = self.pricer.price(
            self.master.pieces(),
            duals,
            self.rod_length,
            PatternId(self.next_id),
        )?;
        self.iterations += 1;

        let improving = reduced_cost < -self.config.reduced_cost_tolerance;
        debug!(
            iteration = self.iterations,
            master_objective,
            pricing_objective = objective,
            reduced_cost,
            %pattern,
            improving,
            "pricing round"
        );

        let record = IterationRecord {
            iteration: self.iterations,
            master_objective,
            pricing_objective: objective,
            reduced_cost,
            added: improving.then(|| pattern.clone()),
            heuristic: !exact,
        };
        self.history.push(record);

        if !improving {
            if !exact {
                return Err(Error::InexactPricer);
            }
            return Ok(Phase::Converged);
        }
        self.next_id += 1;
        self.master.add_pattern(pattern)?;
        Ok(Phase::Iterating)
    }

    fn finish(&mut self) -> Result<CuttingPlan, Error> {
        let termination = match self.phase {
            Phase::Converged => TerminationState::Converged,
            Phase::IterationLimitReached => TerminationState::IterationLimitReached,
            _ => return Err(Error::NotSolved),
        };
        let objective_value = self.master.objective_value()?;
        let selected_patterns = self
            .master
            .selected_patterns()?
            .into_iter()
            .cloned()
            .collect();

        let integer = match self.config.integer {
            IntegerPolicy::Skip => None,
            IntegerPolicy::SolveMaster => {
                self.master.solve_integer()?;
                let objective = self.master.objective_value()?;
                debug!(objective, "integer master solved");
                Some(IntegerSolution {
                    objective,
                    selected_patterns: self
                        .master
                        .selected_patterns()?
                        .into_iter()
                        .cloned()
                        .collect(),
                })
            }
        };

        Ok(CuttingPlan {
            rod_length: self.rod_length,
            selected_patterns,
            objective_value,
            termination,
            iterations: self.iterations,
            patterns_generated: self.master.n_columns(),
            integer,
            heuristic_hits: self.history.iter().filter(|r| r.heuristic).count(),
            history: self.history.clone(),
        })
    }
}

fn validate(pieces: &[Piece], rod_length: u32) -> Result<(), ModelConstructionError> {
    if pieces.is_empty() {
        return Err(ModelConstructionError::NoPieces);
    }
    if rod_length == 0 {
        return Err(ModelConstructionError::ZeroCapacity);
    }
    for piece in pieces {
        if piece.length() == 0 {
            return Err(ModelConstructionError::ZeroLengthPiece(piece.id()));
        }
        if piece.length() > rod_length {
            return Err(ModelConstructionError::PieceTooLong {
                piece: piece.id(),
                length: piece.length(),
                capacity: rod_length,
            });
        }
    }
    Ok(())
}

/// The pricer `config` asks for. MIP pricing runs on fresh [`ScipEngine`]s.
pub fn pricer_for(config: &ColumnGenerationConfig) -> Box<dyn PricingSolver> {
    match config.pricing {
        PricingStrategy::Exact => Box::new(KnapsackPricer::new()),
        PricingStrategy::HeuristicThenExact => Box::new(GuardedPricer::new(
            GreedyPricer,
            KnapsackPricer::new(),
            config.reduced_cost_tolerance,
        )),
        PricingStrategy::Mip => {
            Box::new(MipPricer::new(ScipEngine::new).with_time_limit(config.time_limit()))
        }
    }
}

/// Computes the LP bound on the number of rods of length `rod_length` needed to cut every piece,
/// with default settings and at most `max_iterations` pricing rounds.
///
/// `initial_patterns` seed the master instead of one rod per piece.
pub fn solve(
    pieces: &[Piece],
    rod_length: u32,
    initial_patterns: Option<Vec<Pattern>>,
    max_iterations: usize,
) -> Result<CuttingPlan, Error> {
    solve_with(
        pieces,
        rod_length,
        initial_patterns,
        ColumnGenerationConfig::new(max_iterations),
    )
}

/// Like [`solve`], with explicit settings.
pub fn solve_with(
    pieces: &[Piece],
    rod_length: u32,
    initial_patterns: Option<Vec<Pattern>>,
    config: ColumnGenerationConfig,
) -> Result<CuttingPlan, Error> {
    let pricer = pricer_for(&config);
    ColumnGeneration::new(
        ScipEngine::new()?,
        pieces,
        rod_length,
        initial_patterns,
        pricer,
        config,
    )?
    .run()
}
