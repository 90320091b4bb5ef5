//! # Common Types for Path Constraint Solving
//!
//! Common types used throughout the library to guarantee type safety.

use std::fmt;

use thiserror::Error;

pub mod constraints;
pub use constraints::{Constraint, Term};

/// The hash map to use throughout the library
#[cfg(feature = "fxhash")]
pub type RsHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fxhash"))]
pub type RsHashMap<K, V> = std::collections::HashMap<K, V>;

/// The hash set to use throughout the library
#[cfg(feature = "fxhash")]
pub type RsHashSet<V> = rustc_hash::FxHashSet<V>;
#[cfg(not(feature = "fxhash"))]
pub type RsHashSet<V> = std::collections::HashSet<V>;

/// Type representing a declared bit-vector variable. Variable indexing in
/// pathsat starts from 0. A variable is an identifier only; its name and bit
/// width are recorded by the solver context that declared it. The identifier
/// denotes the same logical variable across duplicated solver contexts, since
/// a duplicate carries over its origin's declarations. The memory
/// representation of variables is `u32`.
#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Var {
    idx: u32,
}

impl Var {
    /// The maximum index that can be represented.
    pub const MAX_IDX: u32 = u32::MAX - 1;

    /// Creates a new variable with a given index.
    /// Indices start from 0.
    /// Panics if `idx > Var::MAX_IDX`.
    pub fn new(idx: u32) -> Var {
        if idx > Var::MAX_IDX {
            panic!("variable index too high")
        }
        Var { idx }
    }

    /// Creates a new variable with a given index.
    /// Indices start from 0.
    /// Returns `Err(TypeError::IdxTooHigh(idx, Var::MAX_IDX))` if
    /// `idx > Var::MAX_IDX`.
    pub fn new_with_error(idx: u32) -> Result<Var, TypeError> {
        if idx > Var::MAX_IDX {
            return Err(TypeError::IdxTooHigh(idx, Var::MAX_IDX));
        }
        Ok(Var { idx })
    }

    /// Returns the index of the variable. This is a `usize` to enable easier
    /// indexing of data structures like vectors, even though the internal
    /// representation of a variable is `u32`. For the 32 bit index use
    /// [`Var::idx32`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pathsat::types::Var;
    ///
    /// let var = Var::new(5);
    ///
    /// assert_eq!(5, var.idx());
    /// ```
    #[inline]
    pub fn idx(&self) -> usize {
        self.idx as usize
    }

    /// Returns the 32 bit index of the variable.
    #[inline]
    pub fn idx32(&self) -> u32 {
        self.idx
    }
}

/// Variables can be printed with the [`Display`](std::fmt::Display) trait
impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.idx)
    }
}

/// More easily creates variables. Mainly used in tests.
///
/// # Examples
///
/// ```
/// use pathsat::{var, types::Var};
///
/// assert_eq!(var![42], Var::new(42));
/// ```
#[macro_export]
macro_rules! var {
    ($v:expr) => {
        $crate::types::Var::new($v)
    };
}

/// Type representing an assignment of concrete bit-vector values to a subset
/// of the declared variables.
///
/// An assignment is a snapshot: extracting one from a satisfying model and
/// restricting it to a carry set yields an immutable record that stays valid
/// even after the solver that produced it has moved on. Values are stored as
/// `u64` already masked to the width of their variable.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
#[repr(transparent)]
pub struct Assignment {
    values: RsHashMap<Var, u64>,
}

impl Assignment {
    /// Gets the value assigned to a variable, or `None` if the variable is
    /// not part of this assignment.
    pub fn var_value(&self, var: Var) -> Option<u64> {
        self.values.get(&var).copied()
    }

    /// Assigns a value to a variable, overwriting any previous value.
    pub fn assign_var(&mut self, var: Var, val: u64) {
        let _prev = self.values.insert(var, val);
    }

    /// Checks whether a variable is assigned.
    pub fn contains(&self, var: Var) -> bool {
        self.values.contains_key(&var)
    }

    /// Gets the number of assigned variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks whether no variable is assigned.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Projects the assignment onto a set of variables. Variables in `vars`
    /// that are not assigned here are simply absent from the result.
    ///
    /// # Examples
    ///
    /// ```
    /// use pathsat::{var, types::Assignment};
    ///
    /// let full: Assignment = [(var![0], 3), (var![1], 7)].into_iter().collect();
    /// let part = full.restrict(&[var![1]]);
    /// assert_eq!(part.var_value(var![1]), Some(7));
    /// assert_eq!(part.var_value(var![0]), None);
    /// ```
    pub fn restrict(&self, vars: &[Var]) -> Assignment {
        vars.iter()
            .filter_map(|&v| self.values.get(&v).map(|&val| (v, val)))
            .collect()
    }

    /// Iterates over the assigned `(variable, value)` pairs in an
    /// unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (Var, u64)> + '_ {
        self.values.iter().map(|(&v, &val)| (v, val))
    }
}

/// Assignments can be printed with the [`Display`](std::fmt::Display) trait.
/// Entries are sorted by variable index for a stable rendering.
impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.values.iter().collect();
        entries.sort_unstable_by_key(|(v, _)| **v);
        let mut first = true;
        for (v, val) in entries {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}={}", v, val)?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(Var, u64)> for Assignment {
    fn from_iter<T: IntoIterator<Item = (Var, u64)>>(iter: T) -> Self {
        Assignment {
            values: iter.into_iter().collect(),
        }
    }
}

impl Extend<(Var, u64)> for Assignment {
    fn extend<T: IntoIterator<Item = (Var, u64)>>(&mut self, iter: T) {
        self.values.extend(iter)
    }
}

/// Errors related to types
#[derive(Error, Debug)]
pub enum TypeError {
    /// The requested index is too high.
    /// Contains the requested and the maximum index.
    #[error("index {0} is too high (maximum {1})")]
    IdxTooHigh(u32, u32),
}
