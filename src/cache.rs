//! # Partial-Assignment Cache
//!
//! The cache remembers the last satisfying bindings of a designated carry
//! set of variables and offers a speculative satisfiability probe for the
//! next path constraint. The probe runs entirely on a disposable duplicate
//! of the live solver: the cached carry values are re-asserted inside a
//! scope on the duplicate and a single solve decides hit or miss. The
//! authoritative solver is never touched, so a miss cannot leak constraints
//! into the state the caller depends on.
//!
//! A hit only establishes that _some_ assignment consistent with the cached
//! carry values satisfies the extended path. It is a cost-avoidance signal,
//! not an authoritative verdict; the caller still advances its primary
//! solver separately (see [`crate::sequencer`]).

use log::debug;

use crate::{
    solvers::{Duplicate, Solve, SolveScoped, SolverError, SolverResult},
    types::{Assignment, Constraint, Var},
};

/// A carry-set assignment together with the depth at which it was captured
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CacheEntry {
    assignment: Assignment,
    depth: usize,
}

impl CacheEntry {
    /// Gets the cached carry-set assignment
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Gets the step depth at which the assignment was captured
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Outcome of a speculative probe. An observable statistic only; it never
/// decides the path's fate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The cached carry values extend to the new constraints
    Hit,
    /// They do not, or there was nothing cached to try
    Miss,
}

impl std::fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheOutcome::Hit => write!(f, "hit"),
            CacheOutcome::Miss => write!(f, "miss"),
        }
    }
}

/// Cache of the last known satisfying bindings for a fixed carry set.
///
/// The carry set is fixed at construction and is meant to be a strict subset
/// of the path's declared variables; validating only a projection of the
/// model is what makes the probe cheap. At most one entry is live at a time
/// and it is overwritten after every full satisfiable solve, never after a
/// speculative hit alone. There is no explicit invalidation: a stale entry
/// simply tends to miss as constraints accumulate, which costs one wasted
/// duplication rather than bookkeeping.
#[derive(Clone, Debug)]
pub struct PartialAssignmentCache {
    carry: Vec<Var>,
    current: Option<CacheEntry>,
}

impl PartialAssignmentCache {
    /// Creates an empty cache over the given carry variables
    pub fn new(carry: impl IntoIterator<Item = Var>) -> Self {
        let mut carry: Vec<Var> = carry.into_iter().collect();
        carry.sort_unstable();
        carry.dedup();
        Self {
            carry,
            current: None,
        }
    }

    /// Gets the carry set, sorted by variable index
    pub fn carry(&self) -> &[Var] {
        &self.carry
    }

    /// Gets the live entry, if any full solve has populated the cache yet
    pub fn current(&self) -> Option<&CacheEntry> {
        self.current.as_ref()
    }

    /// Probes whether the cached carry values extend to `new_constrs`.
    ///
    /// With an empty cache this is an immediate [`CacheOutcome::Miss`]
    /// without duplicating the solver or issuing any query. Otherwise the
    /// primary is duplicated, the new constraints plus one equality per
    /// cached carry value are asserted inside a scope on the duplicate, and
    /// one solve decides the outcome. Anything but satisfiable, including
    /// [`SolverResult::Unknown`], is a miss. The duplicate is discarded
    /// either way and `primary` is never mutated.
    ///
    /// The step may open with more than one constraint (a recurrence
    /// constraint plus a depth tag), hence the slice.
    ///
    /// # Errors
    ///
    /// Forwards solver usage errors from asserting or solving on the
    /// duplicate.
    pub fn try_speculative<S>(
        &self,
        primary: &S,
        new_constrs: &[Constraint],
    ) -> Result<CacheOutcome, SolverError>
    where
        S: Solve + SolveScoped + Duplicate,
    {
        let Some(entry) = &self.current else {
            return Ok(CacheOutcome::Miss);
        };
        let mut probe = primary.duplicate();
        probe.push();
        for constr in new_constrs {
            probe.add_constr(constr.clone())?;
        }
        for &var in &self.carry {
            if let Some(val) = entry.assignment.var_value(var) {
                probe.add_constr(Constraint::eq(var, val))?;
            }
        }
        let res = probe.solve()?;
        // the probe is dropped here; popping its scope would be moot
        let outcome = match res {
            SolverResult::Sat => CacheOutcome::Hit,
            SolverResult::Unsat | SolverResult::Unknown => CacheOutcome::Miss,
        };
        debug!(
            "speculative probe against entry from depth {}: {}",
            entry.depth, outcome
        );
        Ok(outcome)
    }

    /// Overwrites the live entry with the carry-set projection of `model`,
    /// tagged with the depth of the step that produced it. Called after
    /// every full solve that yields a model, regardless of the preceding
    /// speculative outcome.
    pub fn update(&mut self, model: &Assignment, depth: usize) {
        self.current = Some(CacheEntry {
            assignment: model.restrict(&self.carry),
            depth,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheOutcome, PartialAssignmentCache};
    use crate::{
        solvers::{BoundedSearch, Solve, SolveStats, SolverResult},
        types::{Assignment, Constraint},
    };

    #[test]
    fn empty_cache_misses_without_solving() {
        let mut primary = BoundedSearch::default();
        let a = primary.new_var("a", 32);
        primary.add_constr(Constraint::ne(a, 0u64)).unwrap();
        let cache = PartialAssignmentCache::new([a]);
        let outcome = cache
            .try_speculative(&primary, &[Constraint::ne(a, 1u64)])
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
        // nothing was solved anywhere on the way
        assert_eq!(primary.n_solves(), 0);
        assert_eq!(primary.n_constrs(), 1);
    }

    #[test]
    fn hit_leaves_primary_untouched() {
        let mut primary = BoundedSearch::default();
        let a = primary.new_var("a", 32);
        primary.add_constr(Constraint::ne(a, 0u64)).unwrap();
        assert_eq!(primary.solve().unwrap(), SolverResult::Sat);
        let model = primary.solution(&[a]).unwrap();

        let mut cache = PartialAssignmentCache::new([a]);
        cache.update(&model, 0);
        let before = primary.n_constrs();
        let outcome = cache
            .try_speculative(&primary, &[Constraint::ne(a, 0u64)])
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);
        assert_eq!(primary.n_constrs(), before);
        // the primary's model is still valid
        assert!(primary.var_val(a).is_ok());
    }

    #[test]
    fn contradicting_carry_misses() {
        let mut primary = BoundedSearch::default();
        let a = primary.new_var("a", 32);
        primary.add_constr(Constraint::ne(a, 0u64)).unwrap();

        let mut cache = PartialAssignmentCache::new([a]);
        let stale: Assignment = [(a, 0u64)].into_iter().collect();
        cache.update(&stale, 3);
        // cached a=0 contradicts the path constraint a != 0
        let outcome = cache
            .try_speculative(&primary, &[Constraint::ne(a, 7u64)])
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
        assert_eq!(primary.n_constrs(), 1);
    }

    #[test]
    fn update_restricts_to_carry() {
        let mut primary = BoundedSearch::default();
        let a = primary.new_var("a", 32);
        let b = primary.new_var("b", 32);
        let mut cache = PartialAssignmentCache::new([b]);
        let model: Assignment = [(a, 1), (b, 2)].into_iter().collect();
        cache.update(&model, 4);
        let entry = cache.current().unwrap();
        assert_eq!(entry.depth(), 4);
        assert_eq!(entry.assignment().var_value(b), Some(2));
        assert!(!entry.assignment().contains(a));
    }

    #[test]
    fn update_is_last_writer_wins() {
        let mut primary = BoundedSearch::default();
        let a = primary.new_var("a", 32);
        let mut cache = PartialAssignmentCache::new([a]);
        cache.update(&[(a, 1)].into_iter().collect(), 0);
        cache.update(&[(a, 2)].into_iter().collect(), 1);
        let entry = cache.current().unwrap();
        assert_eq!(entry.depth(), 1);
        assert_eq!(entry.assignment().var_value(a), Some(2));
    }
}
