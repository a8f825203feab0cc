use std::collections::HashMap;

use tracing::{debug, trace};

use crate::duals::DualPrices;
use crate::engine::{ConsId, ObjSense, SolverEngine, VarId, VarKind};
use crate::error::{Error, ModelConstructionError};
use crate::pattern::Pattern;
use crate::piece::{Piece, PieceId};

/// Default threshold above which a column value counts as "pattern is used".
pub const DEFAULT_SELECTION_TOLERANCE: f64 = 0.01;

/// How the master was solved most recently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// LP relaxation, `x >= 0`.
    Relaxed,
    /// Binary columns, `x ∈ {0, 1}`.
    Integer,
}

#[derive(Debug)]
struct CoverRow {
    cons: ConsId,
    /// Column indices with a coefficient in this row, in insertion order.
    columns: Vec<usize>,
}

#[derive(Debug)]
struct LastSolve {
    mode: SolveMode,
    objective: f64,
    values: Vec<f64>,
    duals: Option<DualPrices>,
}

/// The restricted master problem: a set-covering program over the patterns generated so far.
///
/// ```text
/// min  Σ_k x_k
/// s.t. Σ_{k : p ∈ pattern_k} x_k >= 1    for every piece p
///      x_k >= 0  (relaxed)  or  x_k ∈ {0, 1}  (integer)
/// ```
///
/// The master owns its engine. Columns are only ever appended, and appending a column only
/// touches the covering rows of the pieces it contains.
#[derive(Debug)]
pub struct RestrictedMaster<E: SolverEngine> {
    engine: E,
    pieces: Vec<Piece>,
    row_of: HashMap<PieceId, usize>,
    rows: Vec<CoverRow>,
    patterns: Vec<Pattern>,
    columns: Vec<VarId>,
    kind: VarKind,
    last: Option<LastSolve>,
    modified: bool,
    selection_tolerance: f64,
}

impl<E: SolverEngine> RestrictedMaster<E> {
    /// Builds one column per pattern and one covering row per piece.
    ///
    /// Fails with [`Error::ModelConstruction`] if a piece id repeats, a pattern contains a piece
    /// that is not in `pieces`, or some piece is not covered by any pattern. Nothing is added to
    /// the engine in that case.
    pub fn new(mut engine: E, pieces: &[Piece], patterns: Vec<Pattern>) -> Result<Self, Error> {
        let mut row_of = HashMap::with_capacity(pieces.len());
        for (i, piece) in pieces.iter().enumerate() {
            if row_of.insert(piece.id(), i).is_some() {
                return Err(ModelConstructionError::DuplicatePiece(piece.id()).into());
            }
        }

        let mut covering: Vec<Vec<usize>> = vec![Vec::new(); pieces.len()];
        for (col, pattern) in patterns.iter().enumerate() {
            for piece in pattern.pieces() {
                let row = *row_of.get(&piece.id()).ok_or(ModelConstructionError::UnknownPiece {
                    pattern: pattern.id(),
                    piece: piece.id(),
                })?;
                covering[row].push(col);
            }
        }
        if let Some(row) = covering.iter().position(|cols| cols.is_empty()) {
            return Err(ModelConstructionError::UncoveredPiece(pieces[row].id()).into());
        }

        let columns = patterns
            .iter()
            .map(|pattern| {
                engine.add_var(
                    &column_name(pattern),
                    0.0,
                    f64::INFINITY,
                    1.0,
                    VarKind::Continuous,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(pieces.len());
        for (piece, cols) in pieces.iter().zip(covering) {
            let terms: Vec<(VarId, f64)> = cols.iter().map(|&col| (columns[col], 1.0)).collect();
            let cons = engine.add_linear_cons(
                &format!("cover_{}", piece.id()),
                &terms,
                1.0,
                f64::INFINITY,
            )?;
            rows.push(CoverRow {
                cons,
                columns: cols,
            });
        }

        let objective: Vec<(VarId, f64)> = columns.iter().map(|&var| (var, 1.0)).collect();
        engine.set_objective(&objective, ObjSense::Minimize)?;

        debug!(
            pieces = pieces.len(),
            patterns = patterns.len(),
            "restricted master initialized"
        );
        Ok(RestrictedMaster {
            engine,
            pieces: pieces.to_vec(),
            row_of,
            rows,
            patterns,
            columns,
            kind: VarKind::Continuous,
            last: None,
            modified: false,
            selection_tolerance: DEFAULT_SELECTION_TOLERANCE,
        })
    }

    /// Sets the value above which [`RestrictedMaster::selected_patterns`] reports a column.
    pub fn with_selection_tolerance(mut self, tolerance: f64) -> Self {
        self.selection_tolerance = tolerance;
        self
    }

    /// Solves the LP relaxation and records objective, column values and dual prices.
    pub fn solve_relaxed(&mut self) -> Result<(), Error> {
        self.set_column_kind(VarKind::Continuous)?;
        self.solve(SolveMode::Relaxed)
    }

    /// Solves the master with binary columns. Dual prices are not available afterwards.
    pub fn solve_integer(&mut self) -> Result<(), Error> {
        self.set_column_kind(VarKind::Binary)?;
        self.solve(SolveMode::Integer)
    }

    /// Objective value of the most recent solve.
    pub fn objective_value(&self) -> Result<f64, Error> {
        self.last
            .as_ref()
            .map(|last| last.objective)
            .ok_or(Error::NotSolved)
    }

    /// Mode of the most recent solve, if any.
    pub fn last_mode(&self) -> Option<SolveMode> {
        self.last.as_ref().map(|last| last.mode)
    }

    /// Dual price of every covering row.
    ///
    /// Only valid right after [`RestrictedMaster::solve_relaxed`]: fails with
    /// [`Error::NotSolved`] before any solve and with [`Error::StaleState`] once a pattern was
    /// added or the last solve was an integer one.
    pub fn dual_prices(&self) -> Result<&DualPrices, Error> {
        let last = self.last.as_ref().ok_or(Error::NotSolved)?;
        if self.modified {
            return Err(Error::StaleState);
        }
        last.duals.as_ref().ok_or(Error::StaleState)
    }

    /// Appends a column for `pattern` and adds its coefficient to the covering rows of exactly
    /// the pieces it contains. Returns the column index.
    pub fn add_pattern(&mut self, pattern: Pattern) -> Result<usize, Error> {
        let rows = pattern
            .pieces()
            .iter()
            .map(|piece| {
                self.row_of
                    .get(&piece.id())
                    .copied()
                    .ok_or(ModelConstructionError::UnknownPiece {
                        pattern: pattern.id(),
                        piece: piece.id(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (lb, ub) = self.column_bounds();
        let var = self
            .engine
            .add_var(&column_name(&pattern), lb, ub, 1.0, self.kind)?;
        let col = self.columns.len();
        self.columns.push(var);
        self.modified = true;

        for row in rows {
            self.engine.add_coefficient(self.rows[row].cons, var, 1.0)?;
            self.rows[row].columns.push(col);
        }

        debug!(column = col, %pattern, "pattern added to master");
        self.patterns.push(pattern);
        Ok(col)
    }

    /// Patterns whose column value exceeds the selection tolerance in the most recent solve.
    ///
    /// Columns added after that solve are never selected.
    pub fn selected_patterns(&self) -> Result<Vec<&Pattern>, Error> {
        let last = self.last.as_ref().ok_or(Error::NotSolved)?;
        Ok(self
            .patterns
            .iter()
            .zip(&last.values)
            .filter(|(_, value)| **value > self.selection_tolerance)
            .map(|(pattern, _)| pattern)
            .collect())
    }

    /// Column values of the most recent solve, in column order.
    pub fn values(&self) -> Result<&[f64], Error> {
        self.last
            .as_ref()
            .map(|last| last.values.as_slice())
            .ok_or(Error::NotSolved)
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// All patterns in column order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column indices on the left-hand side of the covering row of `piece`.
    pub fn covering_columns(&self, piece: PieceId) -> Option<&[usize]> {
        self.row_of
            .get(&piece)
            .map(|&row| self.rows[row].columns.as_slice())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn column_bounds(&self) -> (f64, f64) {
        match self.kind {
            VarKind::Binary => (0.0, 1.0),
            _ => (0.0, f64::INFINITY),
        }
    }

    fn set_column_kind(&mut self, kind: VarKind) -> Result<(), Error> {
        if self.kind == kind {
            return Ok(());
        }
        trace!(?kind, columns = self.columns.len(), "switching column domain");
        self.kind = kind;
        let (lb, ub) = self.column_bounds();
        for &var in &self.columns {
            self.engine.set_var_kind(var, kind, lb, ub)?;
        }
        Ok(())
    }

    fn solve(&mut self, mode: SolveMode) -> Result<(), Error> {
        self.last = None;
        self.engine.solve()?;

        let objective = self.engine.objective_value()?;
        let values = self
            .columns
            .iter()
            .map(|&var| self.engine.var_value(var))
            .collect::<Result<Vec<_>, _>>()?;
        let duals = match mode {
            SolveMode::Relaxed => Some(
                self.pieces
                    .iter()
                    .zip(&self.rows)
                    .map(|(piece, row)| Ok((piece.id(), self.engine.dual_value(row.cons)?)))
                    .collect::<Result<DualPrices, Error>>()?,
            ),
            SolveMode::Integer => None,
        };

        debug!(?mode, objective, columns = values.len(), "master solved");
        self.last = Some(LastSolve {
            mode,
            objective,
            values,
            duals,
        });
        self.modified = false;
        Ok(())
    }
}

fn column_name(pattern: &Pattern) -> String {
    format!("pattern_{}", pattern.id())
}
