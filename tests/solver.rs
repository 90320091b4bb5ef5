use pathsat::{
    solvers::{BoundedSearch, Duplicate, Solve, SolveScoped, SolverResult},
    types::{Constraint, Term},
};

/// Mutating a duplicate must leave the original behaving exactly like a
/// handle that never had the duplicate created.
fn isolation<S: Solve + SolveScoped + Duplicate>(mut solver: S, mut witness: S) {
    let a = solver.new_var("a", 32);
    let w_a = witness.new_var("a", 32);
    assert_eq!(a, w_a);
    solver.add_constr(Constraint::ne(a, 0u64)).unwrap();
    witness.add_constr(Constraint::ne(a, 0u64)).unwrap();

    let mut dup = solver.duplicate();
    dup.add_constr(Constraint::eq(a, 0u64)).unwrap();
    dup.push();
    dup.add_constr(Constraint::ne(a, 1u64)).unwrap();
    assert_eq!(dup.solve().unwrap(), SolverResult::Unsat);
    dup.pop().unwrap();
    drop(dup);

    let res = solver.solve().unwrap();
    assert_eq!(res, witness.solve().unwrap());
    assert_eq!(res, SolverResult::Sat);
    assert_eq!(solver.var_val(a).unwrap(), witness.var_val(a).unwrap());
    assert_eq!(solver.n_constrs(), witness.n_constrs());
}

/// push / assert / pop must leave every later verdict identical to never
/// having asserted.
fn scope_integrity<S: Solve + SolveScoped>(mut solver: S) {
    let x = solver.new_var("x", 32);
    solver.add_constr(Constraint::eq(x, 9u64)).unwrap();
    assert_eq!(solver.solve().unwrap(), SolverResult::Sat);

    solver.push();
    solver.add_constr(Constraint::ne(x, 9u64)).unwrap();
    assert_eq!(solver.solve().unwrap(), SolverResult::Unsat);
    solver.pop().unwrap();

    assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
    assert_eq!(solver.var_val(x).unwrap(), 9);
}

fn nested_scopes<S: Solve + SolveScoped>(mut solver: S) {
    let x = solver.new_var("x", 32);
    solver.add_constr(Constraint::ne(x, 0u64)).unwrap();
    solver.push();
    solver.add_constr(Constraint::eq(x, 3u64)).unwrap();
    solver.push();
    solver.add_constr(Constraint::ne(x, 3u64)).unwrap();
    assert_eq!(solver.solve().unwrap(), SolverResult::Unsat);
    solver.pop().unwrap();
    assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
    assert_eq!(solver.var_val(x).unwrap(), 3);
    solver.pop().unwrap();
    assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
    assert_eq!(solver.n_constrs(), 1);
}

/// The recurrence algebra decided through the solver end to end
fn shift_and_mod_semantics<S: Solve>(mut solver: S) {
    let a = solver.new_var("a", 32);
    let b = solver.new_var("b", 32);
    solver.add_constr(Constraint::eq(a, 0xF0u64)).unwrap();
    solver.add_constr(Constraint::eq(b, 7u64)).unwrap();
    solver
        .add_constr(Constraint::eq(Term::from(a).lshr(4u64), 0xFu64))
        .unwrap();
    solver
        .add_constr(Constraint::eq(Term::from(a) % b, 2u64))
        .unwrap();
    assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
}

#[test]
fn bounded_isolation() {
    isolation(BoundedSearch::default(), BoundedSearch::default());
}

#[test]
fn bounded_scope_integrity() {
    scope_integrity(BoundedSearch::default());
}

#[test]
fn bounded_nested_scopes() {
    nested_scopes(BoundedSearch::default());
}

#[test]
fn bounded_semantics() {
    shift_and_mod_semantics(BoundedSearch::default());
}

#[test]
fn bounded_deterministic_models() {
    let run = || {
        let mut solver = BoundedSearch::with_seed(7);
        let a = solver.new_var("a", 32);
        let b = solver.new_var("b", 32);
        solver.add_constr(Constraint::ne(a, 0u64)).unwrap();
        solver
            .add_constr(Constraint::ne(Term::from(a) % b, 0u64))
            .unwrap();
        assert_eq!(solver.solve().unwrap(), SolverResult::Sat);
        (solver.var_val(a).unwrap(), solver.var_val(b).unwrap())
    };
    assert_eq!(run(), run());
}
