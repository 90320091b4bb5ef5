//! # Path Constraint Sequencer
//!
//! Drives the depth-indexed loop that grows one path of the symbolic
//! execution tree by one step at a time: derive the constraints opening the
//! next depth, probe the partial-assignment cache, then always perform the
//! authoritative assert-and-solve on the primary solver. The cache outcome
//! is telemetry; the primary's verdict alone decides whether the path
//! continues.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::{
    cache::{CacheOutcome, PartialAssignmentCache},
    solvers::{Duplicate, Solve, SolveScoped, SolverError, SolverResult},
    types::{Constraint, Term, Var},
};

/// A path recurrence: given a depth, produce the constraints opening that
/// depth. Implementations may keep state (e.g. rotating the operand pair of
/// a gcd-style recurrence), so taking the constraints is a `&mut`
/// operation and a depth must be queried only once.
pub trait Recurrence {
    /// Produces the constraints that extend the path at `depth`
    fn constrs_at(&mut self, depth: usize) -> Vec<Constraint>;
}

/// The shift-based constraint family: at depth `i` the path demands
/// `(a >> (i + 1)) != 0`. Over a `w`-bit variable the chain stays
/// satisfiable while `i + 1 < w`.
#[derive(Clone, Copy, Debug)]
pub struct ShiftChain {
    var: Var,
}

impl ShiftChain {
    /// Creates the recurrence over the given variable
    pub fn new(var: Var) -> Self {
        Self { var }
    }
}

impl Recurrence for ShiftChain {
    fn constrs_at(&mut self, depth: usize) -> Vec<Constraint> {
        vec![Constraint::ne(
            Term::from(self.var).lshr(depth as u64 + 1),
            0u64,
        )]
    }
}

/// The gcd-style constraint family: at depth `i` the path demands
/// `x % y != 0` and then rotates `(x, y) <- (y, x % y)`, mirroring the
/// recursion structure of a gcd computation. An optional counter variable
/// additionally gets the depth tag `c - (i + 1) != 0` per step.
#[derive(Clone, Debug)]
pub struct ModChain {
    x: Term,
    y: Term,
    counter: Option<Var>,
}

impl ModChain {
    /// Creates the recurrence over the initial operand pair
    pub fn new(x: Var, y: Var) -> Self {
        Self {
            x: Term::from(x),
            y: Term::from(y),
            counter: None,
        }
    }

    /// Additionally tags every depth with `counter - (depth + 1) != 0`
    #[must_use]
    pub fn with_counter(mut self, counter: Var) -> Self {
        self.counter = Some(counter);
        self
    }
}

impl Recurrence for ModChain {
    fn constrs_at(&mut self, depth: usize) -> Vec<Constraint> {
        let mut constrs = vec![Constraint::ne(self.x.clone() % self.y.clone(), 0u64)];
        if let Some(counter) = self.counter {
            constrs.push(Constraint::ne(
                Term::from(counter) - (depth as u64 + 1),
                0u64,
            ));
        }
        let next = self.x.clone() % self.y.clone();
        self.x = std::mem::replace(&mut self.y, next);
        constrs
    }
}

/// Telemetry of one sequencer step
#[derive(Clone, Copy, Debug)]
pub struct Step {
    /// The depth the step ran at
    pub depth: usize,
    /// Whether the speculative probe hit or missed
    pub cache: CacheOutcome,
    /// The authoritative solver verdict
    pub result: SolverResult,
    /// Wall-clock duration of the authoritative solve
    pub solve_time: Duration,
}

/// Sequencer advancing one path by one constraint batch per step.
///
/// Owns the primary solver state exclusively; duplication through the cache
/// probe is the only sanctioned way the live context branches. The
/// speculative probe of a step is fully resolved before the authoritative
/// check runs, and the authoritative check always runs.
#[derive(Clone, Debug)]
pub struct PathSequencer<S, R> {
    primary: S,
    cache: PartialAssignmentCache,
    recurrence: R,
    depth: usize,
    terminated: bool,
}

impl<S, R> PathSequencer<S, R>
where
    S: Solve + SolveScoped + Duplicate,
    R: Recurrence,
{
    /// Creates a sequencer over a fresh primary solver.
    ///
    /// Asserts the path's root constraints and performs the initial solve.
    /// A satisfiable root seeds the cache with the first carry assignment;
    /// an unsatisfiable root yields a sequencer that is already terminated;
    /// an undecided root merely starts with a cold cache.
    ///
    /// # Errors
    ///
    /// Forwards solver usage errors from asserting or solving.
    pub fn new(
        mut primary: S,
        root_constrs: Vec<Constraint>,
        carry_vars: Vec<Var>,
        recurrence: R,
    ) -> Result<Self, SolverError> {
        for constr in root_constrs {
            primary.add_constr(constr)?;
        }
        let mut cache = PartialAssignmentCache::new(carry_vars);
        let mut terminated = false;
        match primary.solve()? {
            SolverResult::Sat => {
                let model = primary.solution(cache.carry())?;
                cache.update(&model, 0);
            }
            SolverResult::Unsat => terminated = true,
            SolverResult::Unknown => {
                warn!("root constraints undecided; starting with a cold cache");
            }
        }
        Ok(Self {
            primary,
            cache,
            recurrence,
            depth: 0,
            terminated,
        })
    }

    /// Advances the path by one step.
    ///
    /// Returns `None` once the path has reached an unsatisfiable dead end;
    /// that is a normal terminal state, not an error. Otherwise the step
    /// telemetry is returned: the speculative outcome, the authoritative
    /// verdict and the time the authoritative solve took. On a satisfiable
    /// step the cache is updated with the new carry projection; an
    /// undecided step writes nothing to the cache and is surfaced unchanged
    /// for the caller to act on.
    ///
    /// # Errors
    ///
    /// Forwards solver usage errors; these are fatal and never retried.
    pub fn step(&mut self) -> Result<Option<Step>, SolverError> {
        if self.terminated {
            return Ok(None);
        }
        let depth = self.depth;
        let constrs = self.recurrence.constrs_at(depth);
        let cache_outcome = self.cache.try_speculative(&self.primary, &constrs)?;
        // the authoritative path is always advanced, independent of the
        // speculative outcome
        for constr in constrs {
            self.primary.add_constr(constr)?;
        }
        let start = Instant::now();
        let result = self.primary.solve()?;
        let solve_time = start.elapsed();
        match result {
            SolverResult::Sat => {
                let model = self.primary.solution(self.cache.carry())?;
                self.cache.update(&model, depth);
                self.depth += 1;
            }
            SolverResult::Unsat => {
                debug!("path unsatisfiable at depth {depth}");
                self.terminated = true;
            }
            SolverResult::Unknown => {
                warn!("solver undecided at depth {depth}; cache left untouched");
                self.depth += 1;
            }
        }
        Ok(Some(Step {
            depth,
            cache: cache_outcome,
            result,
            solve_time,
        }))
    }

    /// Gets the depth the next step will run at
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Checks whether the path has reached an unsatisfiable dead end
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Gets the partial-assignment cache
    pub fn cache(&self) -> &PartialAssignmentCache {
        &self.cache
    }

    /// Gets mutable access to the cache. Mainly useful for instrumentation
    /// and tests; the sequencer keeps the cache consistent on its own.
    pub fn cache_mut(&mut self) -> &mut PartialAssignmentCache {
        &mut self.cache
    }

    /// Gets the primary solver
    pub fn solver(&self) -> &S {
        &self.primary
    }
}

#[cfg(test)]
mod tests {
    use super::{ModChain, Recurrence, ShiftChain};
    use crate::{types::Constraint, var};

    #[test]
    fn shift_chain_constrs() {
        let mut rec = ShiftChain::new(var![0]);
        let constrs = rec.constrs_at(2);
        assert_eq!(constrs.len(), 1);
        assert_eq!(format!("{}", constrs[0]), "(v0 >> 3) != 0");
    }

    #[test]
    fn mod_chain_rotates() {
        let mut rec = ModChain::new(var![0], var![1]);
        assert_eq!(format!("{}", rec.constrs_at(0)[0]), "(v0 % v1) != 0");
        // (x, y) <- (y, x % y)
        assert_eq!(
            format!("{}", rec.constrs_at(1)[0]),
            "(v1 % (v0 % v1)) != 0"
        );
    }

    #[test]
    fn mod_chain_counter_tag() {
        let mut rec = ModChain::new(var![0], var![1]).with_counter(var![2]);
        let constrs = rec.constrs_at(0);
        assert_eq!(constrs.len(), 2);
        assert_eq!(constrs[1], Constraint::ne(crate::types::Term::from(var![2]) - 1u64, 0u64));
    }
}
