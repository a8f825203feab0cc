use std::ffi::CString;
use std::mem::MaybeUninit;
use std::time::Duration;

use tracing::trace;

use crate::engine::{ConsId, ObjSense, SolverEngine, VarId, VarKind};
use crate::error::{Error, SolverError};
use crate::ffi;
use crate::status::Status;

/// A [`SolverEngine`] backed by a single SCIP instance.
///
/// The instance is configured so that a model with only continuous variables is solved as a
/// plain LP whose dual values refer to the constraints as they were added: presolving,
/// propagation, separation and primal heuristics are switched off. Every mutation happens in
/// SCIP's problem stage, so changing a solved model first frees its transformed problem and with
/// it the previous solution.
///
/// The raw pointer keeps this type `!Send`; solve independent instances with one engine each.
#[non_exhaustive]
#[derive(Debug)]
pub struct ScipEngine {
    raw: *mut ffi::SCIP,
    vars: Vec<*mut ffi::SCIP_VAR>,
    conss: Vec<Option<*mut ffi::SCIP_CONS>>,
    time_limit: Option<Duration>,
}

impl ScipEngine {
    /// Creates a SCIP instance with default plugins and an empty problem.
    pub fn new() -> Result<Self, Error> {
        let mut scip_ptr = MaybeUninit::uninit();
        scip_call!(ffi::SCIPcreate(scip_ptr.as_mut_ptr()));
        let engine = ScipEngine {
            raw: unsafe { scip_ptr.assume_init() },
            vars: Vec::new(),
            conss: Vec::new(),
            time_limit: None,
        };

        scip_call!(ffi::SCIPincludeDefaultPlugins(engine.raw));
        let name = engine.c_name("cutstock")?;
        scip_call!(ffi::SCIPcreateProbBasic(engine.raw, name.as_ptr()));

        engine.set_int_param("display/verblevel", 0)?;
        let off = ffi::SCIP_ParamSetting_SCIP_PARAMSETTING_OFF;
        scip_call!(ffi::SCIPsetPresolving(engine.raw, off, true.into()));
        scip_call!(ffi::SCIPsetHeuristics(engine.raw, off, true.into()));
        scip_call!(ffi::SCIPsetSeparating(engine.raw, off, true.into()));
        engine.set_int_param("propagating/maxrounds", 0)?;
        engine.set_int_param("propagating/maxroundsroot", 0)?;
        Ok(engine)
    }

    /// Sets a SCIP integer parameter.
    pub fn set_int_param(&self, param: &str, value: i32) -> Result<(), Error> {
        let param = self.c_name(param)?;
        scip_call!(ffi::SCIPsetIntParam(self.raw, param.as_ptr(), value));
        Ok(())
    }

    /// Sets a SCIP real parameter.
    pub fn set_real_param(&self, param: &str, value: f64) -> Result<(), Error> {
        let param = self.c_name(param)?;
        scip_call!(ffi::SCIPsetRealParam(self.raw, param.as_ptr(), value));
        Ok(())
    }

    /// Sets a SCIP boolean parameter.
    pub fn set_bool_param(&self, param: &str, value: bool) -> Result<(), Error> {
        let param = self.c_name(param)?;
        scip_call!(ffi::SCIPsetBoolParam(self.raw, param.as_ptr(), value.into()));
        Ok(())
    }

    /// Writes the original problem to `path`, the format is picked from the extension `ext`
    /// (e.g. `"lp"`).
    pub fn write(&self, path: &str, ext: &str) -> Result<(), Error> {
        let c_path = self.c_name(path)?;
        let c_ext = self.c_name(ext)?;
        scip_call!(ffi::SCIPwriteOrigProblem(
            self.raw,
            c_path.as_ptr(),
            c_ext.as_ptr(),
            true.into(),
        ));
        Ok(())
    }

    /// Status of the last solve, [`Status::Unknown`] if the model changed since.
    pub fn status(&self) -> Status {
        Status::from(unsafe { ffi::SCIPgetStatus(self.raw) })
    }

    pub fn n_vars(&self) -> usize {
        self.vars.len()
    }

    /// Number of constraints that have not been removed.
    pub fn n_conss(&self) -> usize {
        self.conss.iter().flatten().count()
    }

    fn c_name(&self, name: &str) -> Result<CString, Error> {
        CString::new(name).map_err(|_| SolverError::InvalidName(name.to_string()).into())
    }

    fn var(&self, var: VarId) -> Result<*mut ffi::SCIP_VAR, Error> {
        self.vars
            .get(var.0)
            .copied()
            .ok_or_else(|| SolverError::UnknownVariable(var).into())
    }

    fn cons(&self, cons: ConsId) -> Result<*mut ffi::SCIP_CONS, Error> {
        self.conss
            .get(cons.0)
            .copied()
            .flatten()
            .ok_or_else(|| SolverError::UnknownConstraint(cons).into())
    }

    fn scip_value(&self, value: f64) -> f64 {
        if value.is_infinite() {
            value.signum() * unsafe { ffi::SCIPinfinity(self.raw) }
        } else {
            value
        }
    }

    fn is_solved(&self) -> bool {
        unsafe { ffi::SCIPgetStage(self.raw) == ffi::SCIP_Stage_SCIP_STAGE_SOLVED }
    }

    /// Brings SCIP back to the problem stage so the original problem can be modified.
    fn ensure_problem_stage(&mut self) -> Result<(), Error> {
        let stage = unsafe { ffi::SCIPgetStage(self.raw) };
        if stage != ffi::SCIP_Stage_SCIP_STAGE_PROBLEM {
            trace!("freeing transformed problem before modification");
            scip_call!(ffi::SCIPfreeTransform(self.raw));
        }
        Ok(())
    }

    fn best_sol(&self) -> Result<*mut ffi::SCIP_SOL, Error> {
        if !self.is_solved() || unsafe { ffi::SCIPgetNSols(self.raw) } == 0 {
            return Err(SolverError::NoSolution.into());
        }
        let sol = unsafe { ffi::SCIPgetBestSol(self.raw) };
        if sol.is_null() {
            return Err(SolverError::NoSolution.into());
        }
        Ok(sol)
    }
}

impl From<VarKind> for ffi::SCIP_VARTYPE {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Continuous => ffi::SCIP_Vartype_SCIP_VARTYPE_CONTINUOUS,
            VarKind::Integer => ffi::SCIP_Vartype_SCIP_VARTYPE_INTEGER,
            VarKind::Binary => ffi::SCIP_Vartype_SCIP_VARTYPE_BINARY,
        }
    }
}

impl From<ObjSense> for ffi::SCIP_OBJSENSE {
    fn from(sense: ObjSense) -> Self {
        match sense {
            ObjSense::Minimize => ffi::SCIP_Objsense_SCIP_OBJSENSE_MINIMIZE,
            ObjSense::Maximize => ffi::SCIP_Objsense_SCIP_OBJSENSE_MAXIMIZE,
        }
    }
}

fn clamp_bounds(kind: VarKind, lb: f64, ub: f64) -> (f64, f64) {
    match kind {
        VarKind::Binary => (lb.max(0.0), ub.min(1.0)),
        _ => (lb, ub),
    }
}

impl SolverEngine for ScipEngine {
    fn add_var(
        &mut self,
        name: &str,
        lb: f64,
        ub: f64,
        obj: f64,
        kind: VarKind,
    ) -> Result<VarId, Error> {
        self.ensure_problem_stage()?;
        let c_name = self.c_name(name)?;
        let (lb, ub) = clamp_bounds(kind, lb, ub);
        let mut var_ptr = MaybeUninit::uninit();
        scip_call!(ffi::SCIPcreateVarBasic(
            self.raw,
            var_ptr.as_mut_ptr(),
            c_name.as_ptr(),
            self.scip_value(lb),
            self.scip_value(ub),
            obj,
            kind.into(),
        ));
        let var_ptr = unsafe { var_ptr.assume_init() };
        // keep our reference even if adding fails so that Drop releases it
        self.vars.push(var_ptr);
        scip_call!(ffi::SCIPaddVar(self.raw, var_ptr));
        Ok(VarId(self.vars.len() - 1))
    }

    fn add_linear_cons(
        &mut self,
        name: &str,
        terms: &[(VarId, f64)],
        lhs: f64,
        rhs: f64,
    ) -> Result<ConsId, Error> {
        self.ensure_problem_stage()?;
        let c_name = self.c_name(name)?;
        let vars = terms
            .iter()
            .map(|(var, _)| self.var(*var))
            .collect::<Result<Vec<_>, _>>()?;

        let mut cons_ptr = MaybeUninit::uninit();
        scip_call!(ffi::SCIPcreateConsBasicLinear(
            self.raw,
            cons_ptr.as_mut_ptr(),
            c_name.as_ptr(),
            0,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            self.scip_value(lhs),
            self.scip_value(rhs),
        ));
        let cons_ptr = unsafe { cons_ptr.assume_init() };
        self.conss.push(Some(cons_ptr));
        for (var_ptr, (_, coef)) in vars.into_iter().zip(terms) {
            scip_call!(ffi::SCIPaddCoefLinear(self.raw, cons_ptr, var_ptr, *coef));
        }
        scip_call!(ffi::SCIPaddCons(self.raw, cons_ptr));
        Ok(ConsId(self.conss.len() - 1))
    }

    fn add_coefficient(&mut self, cons: ConsId, var: VarId, coef: f64) -> Result<(), Error> {
        let cons_ptr = self.cons(cons)?;
        let var_ptr = self.var(var)?;
        self.ensure_problem_stage()?;
        scip_call!(ffi::SCIPaddCoefLinear(self.raw, cons_ptr, var_ptr, coef));
        Ok(())
    }

    fn remove_cons(&mut self, cons: ConsId) -> Result<(), Error> {
        let mut cons_ptr = self.cons(cons)?;
        self.ensure_problem_stage()?;
        scip_call!(ffi::SCIPdelCons(self.raw, cons_ptr));
        self.conss[cons.0] = None;
        scip_call!(ffi::SCIPreleaseCons(self.raw, &mut cons_ptr));
        Ok(())
    }

    fn set_var_kind(&mut self, var: VarId, kind: VarKind, lb: f64, ub: f64) -> Result<(), Error> {
        let var_ptr = self.var(var)?;
        self.ensure_problem_stage()?;
        let (lb, ub) = clamp_bounds(kind, lb, ub);
        // binary variables need their bounds inside [0, 1] before the type changes
        let bounds_first = kind == VarKind::Binary;
        if bounds_first {
            scip_call!(ffi::SCIPchgVarLb(self.raw, var_ptr, self.scip_value(lb)));
            scip_call!(ffi::SCIPchgVarUb(self.raw, var_ptr, self.scip_value(ub)));
        }
        let mut infeasible = MaybeUninit::uninit();
        scip_call!(ffi::SCIPchgVarType(
            self.raw,
            var_ptr,
            kind.into(),
            infeasible.as_mut_ptr()
        ));
        if !bounds_first {
            scip_call!(ffi::SCIPchgVarLb(self.raw, var_ptr, self.scip_value(lb)));
            scip_call!(ffi::SCIPchgVarUb(self.raw, var_ptr, self.scip_value(ub)));
        }
        Ok(())
    }

    fn set_objective(&mut self, terms: &[(VarId, f64)], sense: ObjSense) -> Result<(), Error> {
        let mut coefs = vec![0.0; self.vars.len()];
        for (var, coef) in terms {
            self.var(*var)?;
            coefs[var.0] = *coef;
        }
        self.ensure_problem_stage()?;
        for (var_ptr, coef) in self.vars.iter().zip(coefs) {
            scip_call!(ffi::SCIPchgVarObj(self.raw, *var_ptr, coef));
        }
        scip_call!(ffi::SCIPsetObjsense(self.raw, sense.into()));
        Ok(())
    }

    fn set_time_limit(&mut self, limit: Option<Duration>) -> Result<(), Error> {
        let seconds = match limit {
            Some(limit) => limit.as_secs_f64(),
            None => unsafe { ffi::SCIPinfinity(self.raw) },
        };
        self.set_real_param("limits/time", seconds)?;
        self.time_limit = limit;
        Ok(())
    }

    fn solve(&mut self) -> Result<(), Error> {
        self.ensure_problem_stage()?;
        scip_call!(ffi::SCIPsolve(self.raw));
        match self.status() {
            Status::Optimal => Ok(()),
            Status::TimeLimit => Err(Error::SolverTimeout {
                limit: self.time_limit,
            }),
            status => Err(SolverError::NotOptimal(status).into()),
        }
    }

    fn objective_value(&self) -> Result<f64, Error> {
        let sol = self.best_sol()?;
        Ok(unsafe { ffi::SCIPgetSolOrigObj(self.raw, sol) })
    }

    fn var_value(&self, var: VarId) -> Result<f64, Error> {
        let var_ptr = self.var(var)?;
        let sol = self.best_sol()?;
        Ok(unsafe { ffi::SCIPgetSolVal(self.raw, sol, var_ptr) })
    }

    fn dual_value(&self, cons: ConsId) -> Result<f64, Error> {
        let cons_ptr = self.cons(cons)?;
        if !self.is_solved() {
            return Err(SolverError::NoSolution.into());
        }
        // the LP row hangs off the transformed constraint, also for single-variable rows
        let mut transformed = MaybeUninit::<*mut ffi::SCIP_CONS>::uninit();
        scip_call!(ffi::SCIPgetTransformedCons(
            self.raw,
            cons_ptr,
            transformed.as_mut_ptr()
        ));
        let transformed = unsafe { transformed.assume_init() };
        if transformed.is_null() {
            return Err(SolverError::NoSolution.into());
        }
        Ok(unsafe { ffi::SCIPgetDualsolLinear(self.raw, transformed) })
    }
}

impl Drop for ScipEngine {
    fn drop(&mut self) {
        // release our references before SCIP frees the problem
        for var_ptr in self.vars.iter_mut() {
            scip_call_panic!(ffi::SCIPreleaseVar(self.raw, var_ptr));
        }
        for cons_ptr in self.conss.iter_mut().flatten() {
            scip_call_panic!(ffi::SCIPreleaseCons(self.raw, cons_ptr));
        }
        unsafe { ffi::SCIPfree(&mut self.raw) };
    }
}
