//! # pathsat - Partial-Assignment Caching for Path Constraint Solving
//!
//! `pathsat` is a collection of interfaces and utilities for accelerating
//! repeated satisfiability checks along a sequentially growing chain of path
//! constraints, as produced by a symbolic execution engine walking one
//! control flow path of a branching program.
//!
//! The core idea is the partial-assignment cache: remember the last
//! satisfying values of a designated subset of variables (the _carry set_),
//! and when a new branch constraint arrives, probe a disposable duplicate of
//! the live solver with those values re-asserted. If the probe is
//! satisfiable, the full solve can be skipped or cheapened; if not, nothing
//! has leaked into the authoritative solver state and a regular solve runs.
//!
//! ## Features
//!
//! | Feature name | Description |
//! | --- | --- |
//! | `fxhash` | Use the faster firefox hash function from `rustc-hash` in `pathsat`. |

pub mod cache;
pub mod sequencer;
pub mod solvers;
pub mod types;
