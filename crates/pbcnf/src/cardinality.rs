use crate::{
	value_of, CardinalityOne, CheckError, Checker, Coeff, Comparator, ConstraintError, LimitComp,
	Lit, PosCoeff, Result, Unsatisfiable, Valuation,
};

mod sequential;
pub use sequential::SequentialEncoder;

/// The constraint that the number of true literals is at most, exactly, or at
/// least `k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cardinality {
	pub(crate) lits: Vec<Lit>,
	pub(crate) cmp: Comparator,
	pub(crate) k: PosCoeff,
}

impl From<CardinalityOne> for Cardinality {
	fn from(card1: CardinalityOne) -> Self {
		Self {
			lits: card1.lits,
			cmp: match card1.cmp {
				LimitComp::LessEq => Comparator::LessEq,
				LimitComp::Equal => Comparator::Equal,
			},
			k: PosCoeff::new(1),
		}
	}
}

impl Cardinality {
	pub fn new(lits: Vec<Lit>, cmp: Comparator, k: Coeff) -> Result<Self, ConstraintError> {
		if k < 0 {
			return Err(ConstraintError::NegativeBound(k));
		}
		Ok(Self {
			lits,
			cmp,
			k: PosCoeff::new(k),
		})
	}

	pub fn lits(&self) -> &[Lit] {
		&self.lits
	}

	pub fn cmp(&self) -> Comparator {
		self.cmp
	}

	pub fn k(&self) -> PosCoeff {
		self.k
	}

	/// Express the constraint as one or two "at most" constraints: at least k
	/// of the literals is at most n - k of their negations.
	///
	/// Returns [`Unsatisfiable`] when more literals are required than exist.
	pub(crate) fn at_most_sides(&self) -> Result<Vec<(Vec<Lit>, usize)>> {
		let n = self.lits.len();
		let k = usize::try_from(*self.k).unwrap_or(usize::MAX);
		let at_least = || {
			if k > n {
				Err(Unsatisfiable)
			} else {
				Ok((self.lits.iter().map(|l| !l).collect(), n - k))
			}
		};
		Ok(match self.cmp {
			Comparator::LessEq => vec![(self.lits.clone(), k)],
			Comparator::GreaterEq => vec![at_least()?],
			Comparator::Equal => vec![(self.lits.clone(), k), at_least()?],
		})
	}

	#[cfg(feature = "trace")]
	pub(crate) fn trace_print(&self) -> String {
		use crate::trace::trace_print_lit;

		let x = itertools::join(self.lits.iter().map(trace_print_lit), " + ");
		format!("{x} {} {}", self.cmp, *self.k)
	}
}

impl Checker for Cardinality {
	fn check<F: Valuation + ?Sized>(&self, value: &F) -> Result<(), CheckError> {
		let mut count = 0;
		for lit in &self.lits {
			if value_of(value, *lit)? {
				count += 1;
			}
		}
		if match self.cmp {
			Comparator::LessEq => count <= *self.k,
			Comparator::Equal => count == *self.k,
			Comparator::GreaterEq => count >= *self.k,
		} {
			Ok(())
		} else {
			Err(CheckError::Unsatisfiable(Unsatisfiable))
		}
	}
}
