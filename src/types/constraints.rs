//! # Constraint Types
//!
//! Bit-vector terms and the propositions over them that make up path
//! constraints. Constraints are immutable once built; within a path they are
//! append-only and only ever retracted wholesale through scoped pop or by
//! discarding a duplicated solver context.

use std::{fmt, ops};

use super::Var;

/// Returns the bit mask selecting the low `width` bits of a `u64`.
#[inline]
#[must_use]
pub fn width_mask(width: u32) -> u64 {
    if width >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// A bit-vector expression over declared variables and constants.
///
/// The operator set is the algebra needed to express path recurrences:
/// unsigned remainder, logical shift right, wrapping subtraction, and the
/// bitwise connectives. Terms are built with the constructors below or with
/// the overloaded `%`, `-`, `&`, `|` and `^` operators.
///
/// # Examples
///
/// ```
/// use pathsat::{var, types::Term};
///
/// let gcd_step = Term::from(var![0]) % Term::from(var![1]);
/// assert_eq!(format!("{}", gcd_step), "(v0 % v1)");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Term {
    /// A declared variable
    Var(Var),
    /// A constant, masked to the evaluation width when evaluated
    Const(u64),
    /// Unsigned remainder with `bvurem` semantics: `x % 0 == x`
    Urem(Box<Term>, Box<Term>),
    /// Logical shift right; shifting by the width or more yields 0
    Lshr(Box<Term>, Box<Term>),
    /// Wrapping subtraction in the evaluation width
    Sub(Box<Term>, Box<Term>),
    /// Bitwise and
    And(Box<Term>, Box<Term>),
    /// Bitwise or
    Or(Box<Term>, Box<Term>),
    /// Bitwise xor
    Xor(Box<Term>, Box<Term>),
}

impl Term {
    /// Builds a logical shift right term.
    #[must_use]
    pub fn lshr(self, shift: impl Into<Term>) -> Term {
        Term::Lshr(Box::new(self), Box::new(shift.into()))
    }

    /// Evaluates the term in the given bit width under a total assignment of
    /// the variables it mentions.
    ///
    /// `val` must return an already width-masked value for every variable in
    /// the term. All intermediate results are masked to `width`.
    pub fn eval<F>(&self, val: &F, width: u32) -> u64
    where
        F: Fn(Var) -> u64,
    {
        let mask = width_mask(width);
        match self {
            Term::Var(v) => val(*v) & mask,
            Term::Const(c) => c & mask,
            Term::Urem(l, r) => {
                let l = l.eval(val, width);
                let r = r.eval(val, width);
                if r == 0 {
                    l
                } else {
                    l % r
                }
            }
            Term::Lshr(l, r) => {
                let l = l.eval(val, width);
                let shift = r.eval(val, width);
                if shift >= u64::from(width) {
                    0
                } else {
                    (l >> shift) & mask
                }
            }
            Term::Sub(l, r) => l.eval(val, width).wrapping_sub(r.eval(val, width)) & mask,
            Term::And(l, r) => l.eval(val, width) & r.eval(val, width),
            Term::Or(l, r) => (l.eval(val, width) | r.eval(val, width)) & mask,
            Term::Xor(l, r) => (l.eval(val, width) ^ r.eval(val, width)) & mask,
        }
    }

    /// Calls `f` for every variable occurrence in the term.
    pub fn for_each_var<F>(&self, f: &mut F)
    where
        F: FnMut(Var),
    {
        match self {
            Term::Var(v) => f(*v),
            Term::Const(_) => (),
            Term::Urem(l, r)
            | Term::Lshr(l, r)
            | Term::Sub(l, r)
            | Term::And(l, r)
            | Term::Or(l, r)
            | Term::Xor(l, r) => {
                l.for_each_var(f);
                r.for_each_var(f);
            }
        }
    }
}

impl From<Var> for Term {
    fn from(v: Var) -> Self {
        Term::Var(v)
    }
}

impl From<u64> for Term {
    fn from(c: u64) -> Self {
        Term::Const(c)
    }
}

/// Unsigned remainder on terms via the `%` operator
impl<R: Into<Term>> ops::Rem<R> for Term {
    type Output = Term;

    fn rem(self, rhs: R) -> Term {
        Term::Urem(Box::new(self), Box::new(rhs.into()))
    }
}

/// Wrapping subtraction on terms via the `-` operator
impl<R: Into<Term>> ops::Sub<R> for Term {
    type Output = Term;

    fn sub(self, rhs: R) -> Term {
        Term::Sub(Box::new(self), Box::new(rhs.into()))
    }
}

/// Bitwise and on terms via the `&` operator
impl<R: Into<Term>> ops::BitAnd<R> for Term {
    type Output = Term;

    fn bitand(self, rhs: R) -> Term {
        Term::And(Box::new(self), Box::new(rhs.into()))
    }
}

/// Bitwise or on terms via the `|` operator
impl<R: Into<Term>> ops::BitOr<R> for Term {
    type Output = Term;

    fn bitor(self, rhs: R) -> Term {
        Term::Or(Box::new(self), Box::new(rhs.into()))
    }
}

/// Bitwise xor on terms via the `^` operator
impl<R: Into<Term>> ops::BitXor<R> for Term {
    type Output = Term;

    fn bitxor(self, rhs: R) -> Term {
        Term::Xor(Box::new(self), Box::new(rhs.into()))
    }
}

/// Terms can be printed with the [`Display`](std::fmt::Display) trait
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{}", v),
            Term::Const(c) => write!(f, "{}", c),
            Term::Urem(l, r) => write!(f, "({} % {})", l, r),
            Term::Lshr(l, r) => write!(f, "({} >> {})", l, r),
            Term::Sub(l, r) => write!(f, "({} - {})", l, r),
            Term::And(l, r) => write!(f, "({} & {})", l, r),
            Term::Or(l, r) => write!(f, "({} | {})", l, r),
            Term::Xor(l, r) => write!(f, "({} ^ {})", l, r),
        }
    }
}

/// An immutable proposition over bit-vector terms.
///
/// Only equality and inequality are needed at the top level; richer
/// relations are expressed through the term algebra (`x % y != 0`,
/// `(a >> 4) == 0`, ...).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Constraint {
    /// The two terms evaluate to the same value
    Eq(Term, Term),
    /// The two terms evaluate to different values
    Ne(Term, Term),
}

impl Constraint {
    /// Builds an equality constraint.
    pub fn eq(lhs: impl Into<Term>, rhs: impl Into<Term>) -> Constraint {
        Constraint::Eq(lhs.into(), rhs.into())
    }

    /// Builds an inequality constraint.
    pub fn ne(lhs: impl Into<Term>, rhs: impl Into<Term>) -> Constraint {
        Constraint::Ne(lhs.into(), rhs.into())
    }

    /// Checks whether the constraint holds in the given bit width under a
    /// total assignment of the variables it mentions.
    pub fn holds<F>(&self, val: &F, width: u32) -> bool
    where
        F: Fn(Var) -> u64,
    {
        match self {
            Constraint::Eq(l, r) => l.eval(val, width) == r.eval(val, width),
            Constraint::Ne(l, r) => l.eval(val, width) != r.eval(val, width),
        }
    }

    /// Calls `f` for every variable occurrence in the constraint.
    pub fn for_each_var<F>(&self, f: &mut F)
    where
        F: FnMut(Var),
    {
        match self {
            Constraint::Eq(l, r) | Constraint::Ne(l, r) => {
                l.for_each_var(f);
                r.for_each_var(f);
            }
        }
    }
}

/// Constraints can be printed with the [`Display`](std::fmt::Display) trait
impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Eq(l, r) => write!(f, "{} == {}", l, r),
            Constraint::Ne(l, r) => write!(f, "{} != {}", l, r),
        }
    }
}
