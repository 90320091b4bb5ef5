//! # Interfaces to Constraint Solvers
//!
//! This module holds the capability traits that the caching layer is built
//! on. The central element is the [`Solve`] trait: an incremental handle
//! that accepts constraint assertions, decides satisfiability, and hands out
//! variable bindings from a satisfying model. Scoped assertion frames and
//! independent context duplication are split into the [`SolveScoped`] and
//! [`Duplicate`] capability traits, so a backend only advertises what it
//! actually supports.
//!
//! The crate ships one backend, the bounded-search engine in
//! [`bounded::BoundedSearch`]. External engines (an SMT solver binding, a
//! process-forking wrapper, ...) can participate in the caching protocol by
//! implementing these traits.

use core::time::Duration;
use std::fmt;

use thiserror::Error;

use crate::types::{Assignment, Constraint, Var};

pub mod bounded;
pub use bounded::BoundedSearch;

/// Trait for all constraint solvers in this library.
/// Solvers outside of this library can also implement this trait to be able
/// to use them with this library.
pub trait Solve {
    /// Gets a signature of the solver implementation
    fn signature(&self) -> &'static str;
    /// Declares a fresh bit-vector variable of the given width in this
    /// context
    fn new_var(&mut self, name: &str, width: u32) -> Var;
    /// Gets the declared width of a variable, or `None` if the variable is
    /// not declared in this context
    fn var_width(&self, var: Var) -> Option<u32>;
    /// Appends a constraint to the live state. If the solver was in the
    /// satisfied or unsatisfied state before, it is in the input state
    /// afterwards and any previously extracted model is invalidated.
    ///
    /// # Errors
    ///
    /// - [`SolverError::UndeclaredVar`] if the constraint references a
    ///   variable not declared in this context
    /// - [`SolverError::WidthMismatch`] if the constraint mixes variables of
    ///   different widths
    fn add_constr(&mut self, constr: Constraint) -> Result<(), SolverError>;
    /// Runs the decision procedure on the accumulated constraints.
    /// [`SolverResult::Unknown`] signals resource exhaustion or
    /// incompleteness and must be treated as a forced fallback by callers,
    /// never as either outcome.
    fn solve(&mut self) -> Result<SolverResult, SolverError>;
    /// Gets the binding of a variable in the found model.
    ///
    /// # Errors
    ///
    /// - [`SolverError::State`] if the solver is not in the satisfied state
    /// - [`SolverError::UndeclaredVar`] if the variable is not declared
    fn var_val(&self, var: Var) -> Result<u64, SolverError>;
    /// Extracts the model bindings for a set of variables, typically a carry
    /// set. Valid only while the solver remains in the satisfied state.
    ///
    /// # Errors
    ///
    /// Same as [`Solve::var_val`].
    fn solution(&self, vars: &[Var]) -> Result<Assignment, SolverError> {
        let mut assignment = Assignment::default();
        for &var in vars {
            assignment.assign_var(var, self.var_val(var)?);
        }
        Ok(assignment)
    }
    /// Gets the number of constraints in the live state
    fn n_constrs(&self) -> usize;
}

/// Trait for solvers supporting stack-discipline assertion frames.
///
/// A pop restores exactly the assertions present at the matching push with
/// O(1) amortized bookkeeping; it never re-solves. Nesting depth is tracked
/// by the caller.
pub trait SolveScoped: Solve {
    /// Opens an assertion frame
    fn push(&mut self);
    /// Closes the innermost assertion frame, retracting every constraint
    /// asserted since the matching [`SolveScoped::push`]
    ///
    /// # Errors
    ///
    /// [`SolverError::ScopeUnderflow`] if no frame is open. This is a usage
    /// error and fatal to the run; it is never retried.
    fn pop(&mut self) -> Result<(), SolverError>;
}

/// Trait for solvers that can duplicate their live context.
pub trait Duplicate: Solve + Sized {
    /// Produces an independent handle denoting the same variables and
    /// carrying the same constraint sequence, with disjoint mutable state
    /// thereafter. Mutations of the duplicate never affect the original and
    /// vice versa.
    ///
    /// Duplication costs time and memory proportional to the current
    /// constraint-set size. It is not free, which is exactly why a
    /// speculative duplicate should only be created when it can save a more
    /// expensive full solve.
    #[must_use]
    fn duplicate(&self) -> Self;
}

/// Solver statistics
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct SolverStats {
    /// The number of satisfiable queries executed
    pub n_sat: usize,
    /// The number of unsatisfiable queries executed
    pub n_unsat: usize,
    /// The number of queries that ended undecided
    pub n_unknown: usize,
    /// The number of constraints in the live state
    pub n_constrs: usize,
    /// The total CPU time spent solving
    pub cpu_solve_time: Duration,
}

/// Trait for solvers that track certain statistics.
pub trait SolveStats {
    /// Gets the available statistics from the solver
    fn stats(&self) -> SolverStats;
    /// Gets the number of satisfiable queries executed.
    fn n_sat_solves(&self) -> usize {
        self.stats().n_sat
    }
    /// Gets the number of unsatisfiable queries executed.
    fn n_unsat_solves(&self) -> usize {
        self.stats().n_unsat
    }
    /// Gets the number of queries that ended undecided.
    fn n_unknown_solves(&self) -> usize {
        self.stats().n_unknown
    }
    /// Gets the total number of queries executed.
    fn n_solves(&self) -> usize {
        self.n_sat_solves() + self.n_unsat_solves() + self.n_unknown_solves()
    }
    /// Gets the total CPU time spent solving.
    fn cpu_solve_time(&self) -> Duration {
        self.stats().cpu_solve_time
    }
}

/// States that the solver can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// Input state, while constraints are being added
    Input,
    /// The query was found satisfiable and a model is available
    Sat,
    /// The query was found unsatisfiable
    Unsat,
    /// The query ended undecided
    Unknown,
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverState::Input => write!(f, "INPUT"),
            SolverState::Sat => write!(f, "SAT"),
            SolverState::Unsat => write!(f, "UNSAT"),
            SolverState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Return value for solving queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverResult {
    /// The query was found satisfiable.
    Sat,
    /// The query was found unsatisfiable.
    Unsat,
    /// The decision procedure gave up within its resource budget.
    Unknown,
}

impl fmt::Display for SolverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverResult::Sat => write!(f, "SAT"),
            SolverResult::Unsat => write!(f, "UNSAT"),
            SolverResult::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Type representing solver errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// A constraint references a variable not declared in this context
    #[error("constraint references undeclared variable {0}")]
    UndeclaredVar(Var),
    /// A constraint mixes variables of different widths
    #[error("constraint mixes operand widths {0} and {1}")]
    WidthMismatch(u32, u32),
    /// `pop` was called with no open assertion frame
    #[error("pop without a matching push")]
    ScopeUnderflow,
    /// The solver was expected to be in the second [`SolverState`], but it
    /// is in the first.
    #[error("solver needs to be in state {1} but was in state {0}")]
    State(SolverState, SolverState),
}
