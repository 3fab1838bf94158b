use std::fmt::{self, Display};

use crate::{
	trace::emit_clause, value_of, CheckError, Checker, ClauseDatabase, Lit, Result,
	Unsatisfiable, Valuation,
};

mod commander;
mod pairwise;

pub use commander::CommanderEncoder;
pub use pairwise::PairwiseEncoder;

/// Comparison used by constraints that limit the number of true literals from
/// above: either at most, or exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LimitComp {
	LessEq,
	Equal,
}

impl Display for LimitComp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LimitComp::LessEq => write!(f, "≤"),
			LimitComp::Equal => write!(f, "="),
		}
	}
}

/// The constraint that at most one (`LessEq`) or exactly one (`Equal`) of the
/// literals is true.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardinalityOne {
	pub(crate) lits: Vec<Lit>,
	pub(crate) cmp: LimitComp,
}

impl CardinalityOne {
	pub fn new(lits: Vec<Lit>, cmp: LimitComp) -> Self {
		Self { lits, cmp }
	}

	pub fn lits(&self) -> &[Lit] {
		&self.lits
	}

	pub fn cmp(&self) -> LimitComp {
		self.cmp
	}

	#[cfg(feature = "trace")]
	pub(crate) fn trace_print(&self) -> String {
		use crate::trace::trace_print_lit;

		let x = itertools::join(self.lits.iter().map(trace_print_lit), " + ");
		format!("{x} {} 1", self.cmp)
	}
}

impl Checker for CardinalityOne {
	fn check<F: Valuation + ?Sized>(&self, value: &F) -> Result<(), CheckError> {
		let mut count = 0;
		for lit in &self.lits {
			if value_of(value, *lit)? {
				count += 1;
			}
		}
		if match self.cmp {
			LimitComp::LessEq => count <= 1,
			LimitComp::Equal => count == 1,
		} {
			Ok(())
		} else {
			Err(CheckError::Unsatisfiable(Unsatisfiable))
		}
	}
}

pub(crate) fn at_least_one_clause<DB: ClauseDatabase>(
	db: &mut DB,
	card1: &CardinalityOne,
) -> Result {
	debug_assert_eq!(card1.cmp, LimitComp::Equal);
	emit_clause!(db, &card1.lits)
}
