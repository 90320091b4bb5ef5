//! # Bounded-Search Constraint Solver
//!
//! An in-crate decision procedure over bit-vector path constraints, so the
//! caching layer is usable and testable without binding an external SMT
//! engine. The procedure is deliberately incomplete: it propagates forced
//! top-level equalities, checks everything those force, and otherwise
//! searches a bounded set of candidate assignments. When the budget runs out
//! it answers [`SolverResult::Unknown`] instead of guessing.
//!
//! The search is deterministic: candidates are tried in a fixed order and
//! the sampling pass draws from a [`ChaCha8Rng`] seeded at construction, so
//! identical constraint sequences produce identical verdicts and models.

use cpu_time::ProcessTime;
use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{
    Duplicate, Solve, SolveScoped, SolveStats, SolverError, SolverResult, SolverState, SolverStats,
};
use crate::types::{
    constraints::width_mask, Assignment, Constraint, RsHashMap, Term, Var,
};

/// Default seed for the sampling pass
const DEFAULT_SEED: u64 = 42;
/// Default number of random samples per solve call
const DEFAULT_SAMPLE_BUDGET: usize = 4096;
/// The exhaustive candidate pass is skipped above this many free variables
const MAX_CANDIDATE_VARS: usize = 6;

#[derive(Clone, Debug)]
struct VarInfo {
    name: String,
    width: u32,
}

/// A constraint together with its resolved evaluation width
#[derive(Clone, Debug)]
struct PathConstr {
    constr: Constraint,
    width: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
enum InternalSolverState {
    #[default]
    Input,
    Sat(Assignment),
    Unsat,
    Unknown,
}

impl InternalSolverState {
    fn to_external(&self) -> SolverState {
        match self {
            InternalSolverState::Input => SolverState::Input,
            InternalSolverState::Sat(_) => SolverState::Sat,
            InternalSolverState::Unsat => SolverState::Unsat,
            InternalSolverState::Unknown => SolverState::Unknown,
        }
    }
}

/// The bounded-search solver type
///
/// Duplication is a plain deep clone of the declarations, the constraint
/// sequence, the scope marks and the sampling state, so its cost grows with
/// the constraint-set size.
#[derive(Clone, Debug)]
pub struct BoundedSearch {
    vars: Vec<VarInfo>,
    constrs: Vec<PathConstr>,
    scopes: Vec<usize>,
    state: InternalSolverState,
    rng: ChaCha8Rng,
    sample_budget: usize,
    stats: SolverStats,
}

impl Default for BoundedSearch {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl BoundedSearch {
    /// Creates a solver whose sampling pass is seeded with `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            vars: Vec::new(),
            constrs: Vec::new(),
            scopes: Vec::new(),
            state: InternalSolverState::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            sample_budget: DEFAULT_SAMPLE_BUDGET,
            stats: SolverStats::default(),
        }
    }

    /// Sets the number of random samples tried per solve call before the
    /// solver answers [`SolverResult::Unknown`]. Resets any previous
    /// verdict.
    pub fn set_sample_budget(&mut self, budget: usize) {
        self.sample_budget = budget;
        self.state = InternalSolverState::Input;
    }

    /// Gets the declared name of a variable
    pub fn var_name(&self, var: Var) -> Option<&str> {
        self.vars.get(var.idx()).map(|info| info.name.as_str())
    }

    /// Values worth trying first for a variable of the given width
    fn preferred_values(width: u32) -> Vec<u64> {
        let mask = width_mask(width);
        let mut vals = vec![mask, 1, 0];
        if width > 1 {
            vals.push(1 << (width - 1));
        }
        vals
    }

    fn satisfies_all(&self, total: &RsHashMap<Var, u64>) -> bool {
        let lookup = |v: Var| total.get(&v).copied().unwrap_or(0);
        self.constrs
            .iter()
            .all(|pc| pc.constr.holds(&lookup, pc.width))
    }

    /// The decision procedure behind [`Solve::solve`]
    fn decide(&mut self) -> InternalSolverState {
        // values forced by top-level equalities against constants
        let mut fixed: RsHashMap<Var, u64> = RsHashMap::default();
        for pc in &self.constrs {
            if let Constraint::Eq(l, r) = &pc.constr {
                let forced = match (l, r) {
                    (Term::Var(v), Term::Const(c)) | (Term::Const(c), Term::Var(v)) => {
                        Some((*v, *c & width_mask(pc.width)))
                    }
                    _ => None,
                };
                if let Some((v, c)) = forced {
                    if let Some(prev) = fixed.insert(v, c) {
                        if prev != c {
                            return InternalSolverState::Unsat;
                        }
                    }
                }
            }
        }

        // a constraint whose variables are all forced is decided; a failing
        // one refutes the whole conjunction
        let lookup = |v: Var| fixed.get(&v).copied().unwrap_or(0);
        for pc in &self.constrs {
            let mut undetermined = false;
            pc.constr.for_each_var(&mut |v| {
                if !fixed.contains_key(&v) {
                    undetermined = true;
                }
            });
            if !undetermined && !pc.constr.holds(&lookup, pc.width) {
                return InternalSolverState::Unsat;
            }
        }

        let free: Vec<Var> = (0..self.vars.len())
            .map(|idx| Var::new(idx as u32))
            .filter(|v| !fixed.contains_key(v))
            .collect();
        if free.is_empty() {
            return InternalSolverState::Sat(fixed.into_iter().collect());
        }
        let free_widths: Vec<u32> = free.iter().map(|v| self.vars[v.idx()].width).collect();

        // deterministic candidate pass
        if free.len() <= MAX_CANDIDATE_VARS {
            let lists: Vec<Vec<u64>> = free_widths
                .iter()
                .map(|&w| Self::preferred_values(w))
                .collect();
            for combo in lists
                .into_iter()
                .map(IntoIterator::into_iter)
                .multi_cartesian_product()
            {
                let mut total = fixed.clone();
                total.extend(free.iter().copied().zip(combo));
                if self.satisfies_all(&total) {
                    return InternalSolverState::Sat(total.into_iter().collect());
                }
            }
        }

        // budgeted sampling pass
        for _ in 0..self.sample_budget {
            let mut total = fixed.clone();
            for (&v, &w) in free.iter().zip(&free_widths) {
                let sample = self.rng.random::<u64>() & width_mask(w);
                let _prev = total.insert(v, sample);
            }
            if self.satisfies_all(&total) {
                return InternalSolverState::Sat(total.into_iter().collect());
            }
        }
        InternalSolverState::Unknown
    }
}

impl Solve for BoundedSearch {
    fn signature(&self) -> &'static str {
        "bounded-search-0.1.0"
    }

    fn new_var(&mut self, name: &str, width: u32) -> Var {
        let var = Var::new(self.vars.len() as u32);
        self.vars.push(VarInfo {
            name: name.to_owned(),
            width,
        });
        var
    }

    fn var_width(&self, var: Var) -> Option<u32> {
        self.vars.get(var.idx()).map(|info| info.width)
    }

    fn add_constr(&mut self, constr: Constraint) -> Result<(), SolverError> {
        // resolve the evaluation width and check declarations as we go
        let mut resolved: Result<Option<u32>, SolverError> = Ok(None);
        constr.for_each_var(&mut |v| {
            let width = match self.vars.get(v.idx()) {
                Some(info) => info.width,
                None => {
                    if resolved.is_ok() {
                        resolved = Err(SolverError::UndeclaredVar(v));
                    }
                    return;
                }
            };
            match resolved {
                Ok(None) => resolved = Ok(Some(width)),
                Ok(Some(w)) if w != width => resolved = Err(SolverError::WidthMismatch(w, width)),
                _ => (),
            }
        });
        // variable-free constraints fold in full 64 bit
        let width = resolved?.unwrap_or(u64::BITS);
        self.constrs.push(PathConstr { constr, width });
        self.state = InternalSolverState::Input;
        Ok(())
    }

    fn solve(&mut self) -> Result<SolverResult, SolverError> {
        // an unchanged constraint set keeps its verdict
        match &self.state {
            InternalSolverState::Input => (),
            InternalSolverState::Sat(_) => return Ok(SolverResult::Sat),
            InternalSolverState::Unsat => return Ok(SolverResult::Unsat),
            InternalSolverState::Unknown => return Ok(SolverResult::Unknown),
        }
        let start = ProcessTime::now();
        self.state = self.decide();
        self.stats.cpu_solve_time += start.elapsed();
        Ok(match self.state {
            InternalSolverState::Sat(_) => {
                self.stats.n_sat += 1;
                SolverResult::Sat
            }
            InternalSolverState::Unsat => {
                self.stats.n_unsat += 1;
                SolverResult::Unsat
            }
            InternalSolverState::Unknown => {
                self.stats.n_unknown += 1;
                SolverResult::Unknown
            }
            InternalSolverState::Input => unreachable!("decide always reaches a verdict"),
        })
    }

    fn var_val(&self, var: Var) -> Result<u64, SolverError> {
        if var.idx() >= self.vars.len() {
            return Err(SolverError::UndeclaredVar(var));
        }
        match &self.state {
            InternalSolverState::Sat(model) => {
                // decide() assigns every declared variable in a model
                model
                    .var_value(var)
                    .ok_or(SolverError::UndeclaredVar(var))
            }
            other => Err(SolverError::State(other.to_external(), SolverState::Sat)),
        }
    }

    fn n_constrs(&self) -> usize {
        self.constrs.len()
    }
}

impl SolveScoped for BoundedSearch {
    fn push(&mut self) {
        self.scopes.push(self.constrs.len());
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        let mark = self.scopes.pop().ok_or(SolverError::ScopeUnderflow)?;
        self.constrs.truncate(mark);
        self.state = InternalSolverState::Input;
        Ok(())
    }
}

impl Duplicate for BoundedSearch {
    fn duplicate(&self) -> Self {
        self.clone()
    }
}

impl SolveStats for BoundedSearch {
    fn stats(&self) -> SolverStats {
        SolverStats {
            n_constrs: self.constrs.len(),
            ..self.stats.clone()
        }
    }
}
