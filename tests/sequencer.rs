use pathsat::{
    cache::CacheOutcome,
    sequencer::{ModChain, PathSequencer, Recurrence, ShiftChain, Step},
    solvers::{BoundedSearch, Solve, SolverResult},
    types::{Constraint, Term, Var},
};

fn shift_sequencer(seed: u64) -> PathSequencer<BoundedSearch, ShiftChain> {
    let mut solver = BoundedSearch::with_seed(seed);
    let a = solver.new_var("a", 32);
    PathSequencer::new(
        solver,
        vec![Constraint::ne(a, 0u64)],
        vec![a],
        ShiftChain::new(a),
    )
    .unwrap()
}

#[test]
fn shift_chain_five_reps_all_sat() {
    let mut seq = shift_sequencer(42);
    let a = Var::new(0);
    for i in 0..5 {
        let step = seq.step().unwrap().expect("path must not terminate");
        assert_eq!(step.depth, i);
        assert_eq!(step.result, SolverResult::Sat);
        // monotonic carry update: the entry captures this step's model
        let entry = seq.cache().current().unwrap();
        assert_eq!(entry.depth(), i);
        assert_eq!(
            entry.assignment().var_value(a),
            Some(seq.solver().var_val(a).unwrap())
        );
    }
    assert!(!seq.is_terminated());
    assert_eq!(seq.depth(), 5);
}

#[test]
fn shift_chain_trace_is_deterministic() {
    let trace = |seed| -> Vec<(CacheOutcome, SolverResult)> {
        let mut seq = shift_sequencer(seed);
        (0..5)
            .map(|_| {
                let step = seq.step().unwrap().unwrap();
                (step.cache, step.result)
            })
            .collect()
    };
    assert_eq!(trace(42), trace(42));
}

/// Asserts the negation of an already-forced equality at a chosen depth
struct ContradictAt {
    var: Var,
    val: u64,
    at: usize,
}

impl Recurrence for ContradictAt {
    fn constrs_at(&mut self, depth: usize) -> Vec<Constraint> {
        if depth == self.at {
            vec![Constraint::ne(self.var, self.val)]
        } else {
            vec![Constraint::ne(self.var, self.val.wrapping_add(depth as u64 + 1))]
        }
    }
}

#[test]
fn contradiction_terminates_without_error() {
    let mut solver = BoundedSearch::default();
    let x = solver.new_var("x", 32);
    let mut seq = PathSequencer::new(
        solver,
        vec![Constraint::eq(x, 7u64)],
        vec![x],
        ContradictAt {
            var: x,
            val: 7,
            at: 2,
        },
    )
    .unwrap();

    for i in 0..2 {
        let step = seq.step().unwrap().unwrap();
        assert_eq!(step.depth, i);
        assert_eq!(step.result, SolverResult::Sat);
    }
    // depth 2 asserts x != 7 against the forced x == 7
    let step = seq.step().unwrap().unwrap();
    assert_eq!(step.result, SolverResult::Unsat);
    assert!(seq.is_terminated());
    // a dead end is terminal, not an error
    assert!(seq.step().unwrap().is_none());
    assert!(seq.step().unwrap().is_none());
}

#[test]
fn poisoned_cache_never_changes_path_decisions() {
    let run = |poison: bool| -> Vec<(SolverResult, bool)> {
        let mut seq = shift_sequencer(42);
        if poison {
            // a == 0 contradicts the root constraint; every probe of this
            // entry must miss, and nothing else may change
            let wrong = [(Var::new(0), 0u64)].into_iter().collect();
            seq.cache_mut().update(&wrong, 0);
        }
        (0..5)
            .map(|_| {
                let step = seq.step().unwrap().unwrap();
                (step.result, seq.is_terminated())
            })
            .collect()
    };
    assert_eq!(run(false), run(true));
}

#[test]
fn poisoned_cache_probe_misses() {
    let mut seq = shift_sequencer(42);
    let wrong = [(Var::new(0), 0u64)].into_iter().collect();
    seq.cache_mut().update(&wrong, 0);
    let step = seq.step().unwrap().unwrap();
    assert_eq!(step.cache, CacheOutcome::Miss);
    // the authoritative solve is unaffected and refreshes the cache
    assert_eq!(step.result, SolverResult::Sat);
    assert_ne!(
        seq.cache().current().unwrap().assignment().var_value(Var::new(0)),
        Some(0)
    );
}

#[test]
fn gcd_chain_with_counter_tag() {
    let mut solver = BoundedSearch::default();
    let a = solver.new_var("a", 32);
    let b = solver.new_var("b", 32);
    let c = solver.new_var("c", 32);
    let mut seq = PathSequencer::new(
        solver,
        vec![
            Constraint::ne(a, 0u64),
            Constraint::ne(b, 0u64),
            Constraint::ne(c, 0u64),
        ],
        // carry a strict subset of the declared variables: b and c but not a
        vec![b, c],
        ModChain::new(a, b).with_counter(c),
    )
    .unwrap();

    for i in 0..3 {
        let step = seq.step().unwrap().expect("gcd chain must stay satisfiable");
        assert_eq!(step.depth, i);
        assert_eq!(step.result, SolverResult::Sat);
        let entry = seq.cache().current().unwrap();
        assert_eq!(entry.depth(), i);
        assert!(entry.assignment().contains(b));
        assert!(entry.assignment().contains(c));
        assert!(!entry.assignment().contains(a));
    }
}

/// Injects a constraint the bounded engine cannot decide
struct Needle {
    var: Var,
}

impl Recurrence for Needle {
    fn constrs_at(&mut self, _depth: usize) -> Vec<Constraint> {
        vec![Constraint::eq(Term::from(self.var) ^ 0xDEAD_BEEFu64, 0u64)]
    }
}

#[test]
fn unknown_step_writes_nothing_and_does_not_terminate() {
    let mut solver = BoundedSearch::default();
    let x = solver.new_var("x", 32);
    let mut seq = PathSequencer::new(
        solver,
        vec![Constraint::ne(x, 0u64)],
        vec![x],
        Needle { var: x },
    )
    .unwrap();
    let seeded = seq.cache().current().cloned().unwrap();

    let step = seq.step().unwrap().unwrap();
    assert_eq!(step.result, SolverResult::Unknown);
    assert!(!seq.is_terminated());
    // an indeterminate verdict must not poison the cache
    assert_eq!(seq.cache().current(), Some(&seeded));
    // the caller may keep stepping
    assert!(seq.step().unwrap().is_some());
}

#[test]
fn step_reports_solve_duration() {
    let mut seq = shift_sequencer(42);
    let Step { solve_time, .. } = seq.step().unwrap().unwrap();
    // wall clock may be arbitrarily small, but it is reported
    let _ = solve_time;
}
