//! `pbcnf` is a collection of encoders to transform cardinality and
//! pseudo-Boolean (PB) constraints into conjunctive normal form (CNF). PB
//! constraints are in the form ∑ aᵢ·lᵢ ≷ k, where the aᵢ's and k are integer
//! constants, the lᵢ's are Boolean literals, and ≷ is one of ≤, =, or ≥.
//! Constraints where all coefficients are one are *cardinality* constraints,
//! and the ones with a right hand side of one are *At Most One (AMO)* or
//! *Exactly One* constraints. Specialised encodings are used when these cases
//! are detected.
//!
//! Besides the encoders, the crate offers a CNF formula type ([`Cnf`]) that
//! separates caller-defined variables from encoder-introduced auxiliary
//! variables, and a bound search driver ([`BoundSearch`]) that minimises an
//! objective by re-encoding `objective ≤ bound` inside the push/pop scopes of
//! a solver.

use std::{
	error::Error,
	fmt::{self, Display},
	num::NonZeroI32,
	ops::Not,
};

mod cardinality;
mod cardinality_one;
mod cnf;
pub(crate) mod helpers;
mod linear;
mod search;
pub mod solver;
pub(crate) mod trace;
mod vars;

pub use cardinality::{Cardinality, SequentialEncoder};
pub use cardinality_one::{CardinalityOne, CommanderEncoder, LimitComp, PairwiseEncoder};
pub use cnf::{Cnf, CnfIterator};
pub use linear::{
	AdderEncoder, Coeff, Comparator, ConstraintError, LinExp, LinVariant, Linear,
	LinearConstraint, LinearEncoder, Normalized, PosCoeff, SwcEncoder,
};
pub use search::{BoundSearch, Model, SearchResult, SearchStrategy};
#[cfg(feature = "trace")]
pub use trace::{FlushGuard, Tracer};
pub use vars::{Label, Namespace, Scoped, VarAllocator, VarFactory, VarRange};

/// Type representing a Boolean variable in a [`ClauseDatabase`].
///
/// Variables are strictly positive and handed out densely, starting at one,
/// by a [`VarFactory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(pub(crate) NonZeroI32);

impl Var {
	fn next_var(&self) -> Option<Var> {
		self.0.get().checked_add(1).and_then(NonZeroI32::new).map(Var)
	}

	/// Position of the variable in the dense numbering, starting at zero.
	pub fn index(&self) -> usize {
		self.0.get() as usize - 1
	}
}

impl Not for Var {
	type Output = Lit;
	fn not(self) -> Self::Output {
		!Lit::from(self)
	}
}
impl Not for &Var {
	type Output = Lit;
	fn not(self) -> Self::Output {
		!*self
	}
}

impl Display for Var {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "x{}", self.0)
	}
}

impl From<Var> for NonZeroI32 {
	fn from(val: Var) -> Self {
		val.0
	}
}
impl From<Var> for i32 {
	fn from(val: Var) -> Self {
		val.0.get()
	}
}

/// Literal is type that can be use to represent Boolean decision variables and
/// their negations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Lit(pub(crate) NonZeroI32);

impl Lit {
	/// The variable underlying the literal
	pub fn var(&self) -> Var {
		Var(self.0.abs())
	}
	/// Returns `true` when the literal is the negation of its variable
	pub fn is_negated(&self) -> bool {
		self.0.is_negative()
	}
	/// Returns `true` when `other` is the complement of `self`
	pub fn is_complement(&self, other: &Lit) -> bool {
		self.0.get() == -other.0.get()
	}
}

impl Not for Lit {
	type Output = Lit;
	fn not(self) -> Self::Output {
		Lit(-self.0)
	}
}
impl Not for &Lit {
	type Output = Lit;
	fn not(self) -> Self::Output {
		!(*self)
	}
}

impl PartialOrd for Lit {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for Lit {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		match self.var().cmp(&other.var()) {
			std::cmp::Ordering::Equal => (self.is_negated()).cmp(&other.is_negated()),
			r => r,
		}
	}
}

impl From<Var> for Lit {
	fn from(value: Var) -> Self {
		Lit(value.0)
	}
}
impl From<Lit> for NonZeroI32 {
	fn from(val: Lit) -> Self {
		val.0
	}
}
impl From<Lit> for i32 {
	fn from(val: Lit) -> Self {
		val.0.get()
	}
}

impl Display for Lit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}{}",
			if self.is_negated() { "¬" } else { "" },
			self.var()
		)
	}
}

/// Unsatisfiable is an error type returned when the problem being encoded is
/// found to be inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Unsatisfiable;
impl Error for Unsatisfiable {}
impl Display for Unsatisfiable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Problem inconsistency detected")
	}
}

/// Result is a type alias for [`std::result::Result`] that by default returns
/// an empty value, or the [`Unsatisfiable`] error type.
pub type Result<T = (), E = Unsatisfiable> = std::result::Result<T, E>;

/// A function that gives the valuation/truth-value for a given literal in the
/// current solution/model.
///
/// Note that the function can return `None` if the model/solution is
/// independent of the given literal.
pub trait Valuation: Fn(Lit) -> Option<bool> {}
impl<F: Fn(Lit) -> Option<bool>> Valuation for F {}

/// Checker is a trait implemented by types that represent constraints. The
/// [`Checker::check`] method is used to check whether a given solution
/// satisfies the constraint.
pub trait Checker {
	/// Check whether the constraint represented by the object is violated.
	///
	/// - The method returns [`Result::Ok`] when the assignment satisfies the
	///   constraint,
	/// - it returns [`CheckError::Unsatisfiable`] when the assignment violates
	///   the constraint,
	/// - and it returns [`CheckError::Fail`] when the valuation leaves a
	///   relevant literal unassigned.
	fn check<F: Valuation + ?Sized>(&self, value: &F) -> Result<(), CheckError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
	Unsatisfiable(Unsatisfiable),
	Fail(String),
}
impl Error for CheckError {}
impl Display for CheckError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CheckError::Fail(err) => err.fmt(f),
			CheckError::Unsatisfiable(err) => err.fmt(f),
		}
	}
}

/// Look up the value of `lit`, failing when the valuation leaves it open.
pub(crate) fn value_of<F: Valuation + ?Sized>(value: &F, lit: Lit) -> Result<bool, CheckError> {
	value(lit).ok_or_else(|| CheckError::Fail(format!("Unassigned literal {lit}")))
}

/// The `ClauseDatabase` trait is the common trait implemented by types that
/// are used to manage the encoding of constraints and contain their output.
/// This trait can be used for all encoding methods in this library.
///
/// Variables returned by [`Self::new_var`] are the caller's decision
/// variables, variables returned by [`Self::new_aux_var`] are introduced by
/// encoders and carry no meaning outside of the encoding.
pub trait ClauseDatabase {
	/// Method to be used to receive a new Boolean variable
	fn new_var(&mut self) -> Lit;

	/// Method used by encoders to receive a new auxiliary Boolean variable.
	/// The namespace only serves diagnostic purposes: two calls never return
	/// the same variable.
	fn new_aux_var(&mut self, ns: &Namespace) -> Lit {
		let _ = ns;
		self.new_var()
	}

	/// Add a clause to the `ClauseDatabase`. The database is allowed to return
	/// [`Unsatisfiable`] when the collection of clauses has been *proven* to be
	/// unsatisfiable. This is used as a signal to the encoder that any
	/// subsequent encoding effort can be abandoned.
	fn add_clause<I: IntoIterator<Item = Lit>>(&mut self, cl: I) -> Result;

	/// Encode `con` into the database using the encoder `enc`
	fn encode<C, E: Encoder<Self, C>>(&mut self, con: &C, enc: &E) -> Result
	where
		Self: Sized,
	{
		enc.encode(self, con)
	}
}

/// Types that implement `Encoder` are able to add the clauses representing
/// `Constraint` to a [`ClauseDatabase`].
pub trait Encoder<DB: ClauseDatabase, Constraint> {
	fn encode(&self, db: &mut DB, con: &Constraint) -> Result;
}
