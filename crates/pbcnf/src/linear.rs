use std::{
	error::Error,
	fmt::{self, Display},
	ops::{Add, Deref},
};

use num::Integer;
use rustc_hash::FxHashMap;

use crate::{
	trace::emit_clause, value_of, Cardinality, CardinalityOne, CheckError, Checker,
	ClauseDatabase, Encoder, LimitComp, Lit, Result, SequentialEncoder, Unsatisfiable, Valuation,
	Var,
};

mod adder;
mod swc;

pub use adder::AdderEncoder;
pub use swc::SwcEncoder;

/// Integer coefficients and bounds of linear constraints
pub type Coeff = i64;

/// A coefficient that is known to be non-negative
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PosCoeff(Coeff);

impl PosCoeff {
	pub fn new(c: Coeff) -> Self {
		if c < 0 {
			panic!("cannot create a PosCoeff with a negative value")
		}
		Self(c)
	}
}

impl Deref for PosCoeff {
	type Target = Coeff;
	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl From<PosCoeff> for Coeff {
	fn from(val: PosCoeff) -> Self {
		val.0
	}
}

impl Display for PosCoeff {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparator {
	LessEq,
	Equal,
	GreaterEq,
}

impl Display for Comparator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Comparator::LessEq => write!(f, "≤"),
			Comparator::Equal => write!(f, "="),
			Comparator::GreaterEq => write!(f, "≥"),
		}
	}
}

/// Errors for constraints that violate the construction contract, reported
/// before any clause is emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintError {
	/// The number of literals and coefficients differ
	LengthMismatch { lits: usize, coefs: usize },
	/// The right hand side of a constraint is negative
	NegativeBound(Coeff),
	/// The sum of the magnitudes of the coefficients and the bound does not
	/// fit in a [`Coeff`]
	Overflow,
}

impl Error for ConstraintError {}
impl Display for ConstraintError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConstraintError::LengthMismatch { lits, coefs } => write!(
				f,
				"Expected as many coefficients as literals, but found {coefs} coefficients for {lits} literals"
			),
			ConstraintError::NegativeBound(k) => {
				write!(f, "Constraint bound must be non-negative, but found {k}")
			}
			ConstraintError::Overflow => write!(f, "Constraint coefficients overflow"),
		}
	}
}

/// A weighted sum of literals ∑ aᵢ·lᵢ
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinExp {
	terms: Vec<(Lit, Coeff)>,
}

impl LinExp {
	pub fn from_slices(lits: &[Lit], coefs: &[Coeff]) -> Result<Self, ConstraintError> {
		if lits.len() != coefs.len() {
			return Err(ConstraintError::LengthMismatch {
				lits: lits.len(),
				coefs: coefs.len(),
			});
		}
		Ok(Self::from_terms(
			lits.iter().copied().zip(coefs.iter().copied()),
		))
	}

	pub fn from_terms<I: IntoIterator<Item = (Lit, Coeff)>>(terms: I) -> Self {
		Self {
			terms: terms.into_iter().collect(),
		}
	}

	pub fn terms(&self) -> impl Iterator<Item = (Lit, Coeff)> + '_ {
		self.terms.iter().copied()
	}

	pub fn len(&self) -> usize {
		self.terms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}

	/// The value of the expression under the given assignment
	pub fn value<F: Valuation + ?Sized>(&self, value: &F) -> Result<Coeff, CheckError> {
		let mut acc: Coeff = 0;
		for (lit, coef) in &self.terms {
			if value_of(value, *lit)? {
				acc = acc
					.checked_add(*coef)
					.ok_or_else(|| CheckError::Fail(ConstraintError::Overflow.to_string()))?;
			}
		}
		Ok(acc)
	}

	/// The smallest and largest value the expression can take
	pub fn bounds(&self) -> Result<(Coeff, Coeff), ConstraintError> {
		self.terms
			.iter()
			.try_fold((0 as Coeff, 0 as Coeff), |(lb, ub), (_, c)| {
				if *c < 0 {
					Some((lb.checked_add(*c)?, ub))
				} else {
					Some((lb, ub.checked_add(*c)?))
				}
			})
			.ok_or(ConstraintError::Overflow)
	}

	/// The variables occurring in the expression
	pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
		self.terms.iter().map(|(l, _)| l.var())
	}

	#[cfg(feature = "trace")]
	pub(crate) fn trace_print(&self) -> String {
		crate::trace::trace_print_terms(self.terms.iter().map(|(l, c)| (l, *c)))
	}
}

impl From<Lit> for LinExp {
	fn from(lit: Lit) -> Self {
		Self {
			terms: vec![(lit, 1)],
		}
	}
}

impl From<(Lit, Coeff)> for LinExp {
	fn from(term: (Lit, Coeff)) -> Self {
		Self { terms: vec![term] }
	}
}

impl Add<(Lit, Coeff)> for LinExp {
	type Output = LinExp;
	fn add(mut self, rhs: (Lit, Coeff)) -> Self::Output {
		self.terms.push(rhs);
		self
	}
}

impl Display for LinExp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.terms.is_empty() {
			return write!(f, "0");
		}
		for (i, (l, c)) in self.terms.iter().enumerate() {
			match (i, *c < 0) {
				(0, true) => write!(f, "-{}·{l}", -c)?,
				(0, false) => write!(f, "{c}·{l}")?,
				(_, true) => write!(f, " - {}·{l}", -c)?,
				(_, false) => write!(f, " + {c}·{l}")?,
			}
		}
		Ok(())
	}
}

/// A pseudo-Boolean constraint ∑ aᵢ·lᵢ ≷ k
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearConstraint {
	exp: LinExp,
	cmp: Comparator,
	k: Coeff,
}

impl LinearConstraint {
	pub fn new(exp: LinExp, cmp: Comparator, k: Coeff) -> Result<Self, ConstraintError> {
		if k < 0 {
			return Err(ConstraintError::NegativeBound(k));
		}
		exp.terms
			.iter()
			.map(|(_, c)| *c)
			.chain([k])
			.try_fold(0 as Coeff, |acc, c| acc.checked_add(c.checked_abs()?))
			.ok_or(ConstraintError::Overflow)?;
		Ok(Self { exp, cmp, k })
	}

	pub fn exp(&self) -> &LinExp {
		&self.exp
	}

	pub fn cmp(&self) -> Comparator {
		self.cmp
	}

	pub fn k(&self) -> Coeff {
		self.k
	}

	/// Rewrite the constraint into canonical ≤-constraints: one for ≤ and ≥,
	/// two for =.
	pub fn normalize(&self) -> Result<Vec<Normalized>> {
		let negated = || self.exp.terms().map(|(l, c)| (l, -c));
		match self.cmp {
			Comparator::LessEq => Ok(vec![normalize_le(self.exp.terms(), self.k)?]),
			Comparator::GreaterEq => Ok(vec![normalize_le(negated(), -self.k)?]),
			Comparator::Equal => Ok(vec![
				normalize_le(self.exp.terms(), self.k)?,
				normalize_le(negated(), -self.k)?,
			]),
		}
	}

	#[cfg(feature = "trace")]
	pub(crate) fn trace_print(&self) -> String {
		format!("{} {} {}", self.exp.trace_print(), self.cmp, self.k)
	}
}

impl Display for LinearConstraint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} {}", self.exp, self.cmp, self.k)
	}
}

impl Checker for LinearConstraint {
	fn check<F: Valuation + ?Sized>(&self, value: &F) -> Result<(), CheckError> {
		let lhs = self.exp.value(value)?;
		if match self.cmp {
			Comparator::LessEq => lhs <= self.k,
			Comparator::Equal => lhs == self.k,
			Comparator::GreaterEq => lhs >= self.k,
		} {
			Ok(())
		} else {
			Err(CheckError::Unsatisfiable(Unsatisfiable))
		}
	}
}

/// Bring ∑ terms ≤ k into canonical form
fn normalize_le(terms: impl Iterator<Item = (Lit, Coeff)>, mut k: Coeff) -> Result<Normalized> {
	// Aggregate the coefficients per variable, rewriting a·¬x into a - a·x
	let mut agg = FxHashMap::<Var, Coeff>::default();
	for (lit, c) in terms {
		let coef = agg.entry(lit.var()).or_default();
		if lit.is_negated() {
			k -= c;
			*coef -= c;
		} else {
			*coef += c;
		}
	}

	// Complement negative coefficients: c·x with c < 0 becomes -c·¬x
	let mut terms = agg
		.into_iter()
		.filter(|(_, c)| *c != 0)
		.map(|(var, c)| {
			if c < 0 {
				k -= c;
				(!var, -c)
			} else {
				(Lit::from(var), c)
			}
		})
		.collect::<Vec<_>>();

	if k < 0 {
		return Err(Unsatisfiable);
	}
	terms.sort_by(|(l1, c1), (l2, c2)| c1.cmp(c2).then(l1.cmp(l2)));

	let mut falsified = Vec::new();
	if k == 0 {
		falsified.extend(terms.drain(..).map(|(l, _)| l));
	}

	// Terms that exceed the bound on their own can never be true
	let fits = terms.partition_point(|(_, c)| *c <= k);
	falsified.extend(terms.drain(fits..).map(|(l, _)| l));

	let gcd = terms.iter().fold(0, |g, (_, c)| g.gcd(c));
	if gcd > 1 {
		for (_, c) in terms.iter_mut() {
			*c /= gcd;
		}
		k = k.div_floor(&gcd);
	}

	Ok(Normalized {
		lin: Linear {
			terms: terms.into_iter().map(|(l, c)| (l, PosCoeff(c))).collect(),
			k: PosCoeff(k),
		},
		falsified,
	})
}

/// The result of normalising one side of a constraint: the canonical
/// ≤-constraint, and the literals that have to be false for it to hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalized {
	pub(crate) lin: Linear,
	pub(crate) falsified: Vec<Lit>,
}

impl Normalized {
	pub fn linear(&self) -> &Linear {
		&self.lin
	}

	pub fn falsified(&self) -> &[Lit] {
		&self.falsified
	}

	pub fn variant(&self) -> LinVariant {
		self.lin.variant()
	}

	/// Emit the unit clauses for the falsified literals
	pub(crate) fn encode_falsified<DB: ClauseDatabase>(&self, db: &mut DB) -> Result {
		for lit in &self.falsified {
			emit_clause!(db, [!lit])?;
		}
		Ok(())
	}
}

/// A canonical constraint ∑ aᵢ·lᵢ ≤ k, where all literals have distinct
/// variables, the terms are sorted by coefficient, every 1 ≤ aᵢ ≤ k, and the
/// coefficients have no common divisor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Linear {
	pub(crate) terms: Vec<(Lit, PosCoeff)>,
	pub(crate) k: PosCoeff,
}

impl Linear {
	pub fn terms(&self) -> &[(Lit, PosCoeff)] {
		&self.terms
	}

	pub fn k(&self) -> PosCoeff {
		self.k
	}

	pub fn len(&self) -> usize {
		self.terms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}

	/// Normalise the constraint again. For a `Linear` produced by
	/// normalisation, this returns the same constraint.
	pub fn normalize(&self) -> Result<Normalized> {
		normalize_le(self.terms.iter().map(|(l, c)| (*l, **c)), *self.k)
	}

	/// Classify the constraint by the encoder family that suits it best
	pub fn variant(&self) -> LinVariant {
		let sum = self.terms.iter().map(|(_, c)| **c).sum::<Coeff>();
		if self.terms.is_empty() || sum <= *self.k {
			LinVariant::Trivial
		} else if self.terms.iter().all(|(_, c)| **c == 1) {
			let lits = self.terms.iter().map(|(l, _)| *l).collect();
			if *self.k == 1 {
				LinVariant::CardinalityOne(CardinalityOne {
					lits,
					cmp: LimitComp::LessEq,
				})
			} else {
				LinVariant::Cardinality(Cardinality {
					lits,
					cmp: Comparator::LessEq,
					k: self.k,
				})
			}
		} else {
			LinVariant::Linear(self.clone())
		}
	}

	#[cfg(feature = "trace")]
	pub(crate) fn trace_print(&self) -> String {
		format!(
			"{} ≤ {}",
			crate::trace::trace_print_terms(self.terms.iter().map(|(l, c)| (l, **c))),
			self.k
		)
	}
}

impl Checker for Linear {
	fn check<F: Valuation + ?Sized>(&self, value: &F) -> Result<(), CheckError> {
		let mut lhs = 0;
		for (lit, coef) in &self.terms {
			if value_of(value, *lit)? {
				lhs += **coef;
			}
		}
		if lhs <= *self.k {
			Ok(())
		} else {
			Err(CheckError::Unsatisfiable(Unsatisfiable))
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinVariant {
	Linear(Linear),
	Cardinality(Cardinality),
	CardinalityOne(CardinalityOne),
	Trivial,
}

/// An encoder for [`LinearConstraint`]s that normalises the constraint and
/// dispatches each side to the encoder of its variant.
#[derive(Clone, Debug, Default)]
pub struct LinearEncoder<
	Lin = AdderEncoder,
	Card = SequentialEncoder,
	Amo = SequentialEncoder,
> {
	lin: Lin,
	card: Card,
	amo: Amo,
}

impl<Lin, Card, Amo> LinearEncoder<Lin, Card, Amo> {
	pub fn new(lin: Lin, card: Card, amo: Amo) -> Self {
		Self { lin, card, amo }
	}

	/// Use `lin` for constraints with arbitrary coefficients
	pub fn with_linear<L>(self, lin: L) -> LinearEncoder<L, Card, Amo> {
		LinearEncoder {
			lin,
			card: self.card,
			amo: self.amo,
		}
	}

	/// Use `card` for cardinality constraints
	pub fn with_cardinality<C>(self, card: C) -> LinearEncoder<Lin, C, Amo> {
		LinearEncoder {
			lin: self.lin,
			card,
			amo: self.amo,
		}
	}

	/// Use `amo` for at most one constraints
	pub fn with_amo<A>(self, amo: A) -> LinearEncoder<Lin, Card, A> {
		LinearEncoder {
			lin: self.lin,
			card: self.card,
			amo,
		}
	}
}

impl<DB, Lin, Card, Amo> Encoder<DB, LinearConstraint> for LinearEncoder<Lin, Card, Amo>
where
	DB: ClauseDatabase,
	Lin: Encoder<DB, Linear>,
	Card: Encoder<DB, Cardinality>,
	Amo: Encoder<DB, CardinalityOne>,
{
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "linear_encoder", skip_all, fields(constraint = lin.trace_print()))
	)]
	fn encode(&self, db: &mut DB, lin: &LinearConstraint) -> Result {
		for side in lin.normalize()? {
			side.encode_falsified(db)?;
			match side.variant() {
				LinVariant::Linear(lin) => self.lin.encode(db, &lin)?,
				LinVariant::Cardinality(card) => self.card.encode(db, &card)?,
				LinVariant::CardinalityOne(amo) => self.amo.encode(db, &amo)?,
				LinVariant::Trivial => {}
			}
		}
		Ok(())
	}
}

/// Normalise `con`, then encode every side with an encoder for canonical
/// constraints.
pub(crate) fn encode_sides<DB: ClauseDatabase, E: Encoder<DB, Linear>>(
	enc: &E,
	db: &mut DB,
	con: &LinearConstraint,
) -> Result {
	for side in con.normalize()? {
		side.encode_falsified(db)?;
		if !side.lin.is_empty() {
			enc.encode(db, &side.lin)?;
		}
	}
	Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
	use itertools::Itertools;
	use rand::{rngs::StdRng, Rng, SeedableRng};

	#[cfg(feature = "trace")]
	use traced_test::test;

	use super::*;
	use crate::{
		helpers::tests::{assert_sol, lits, TestDB},
		PairwiseEncoder,
	};

	/// Build a linear constraint over the literals `1..=n` (negative numbers
	/// for negated literals)
	pub(crate) fn lin(terms: &[(i32, Coeff)], cmp: Comparator, k: Coeff) -> LinearConstraint {
		let lits = terms.iter().map(|(l, _)| lits![*l][0]).collect_vec();
		let coefs = terms.iter().map(|(_, c)| *c).collect_vec();
		LinearConstraint::new(LinExp::from_slices(&lits, &coefs).unwrap(), cmp, k).unwrap()
	}

	/// Random constraints over at most `max_var` variables, with repeated and
	/// negated literals, and negative coefficients.
	pub(crate) fn random_constraints(seed: u64, count: usize, max_var: i32) -> Vec<LinearConstraint> {
		let mut rng = StdRng::seed_from_u64(seed);
		(0..count)
			.map(|_| {
				let n = rng.gen_range(1..=max_var as usize + 1);
				let terms = (0..n)
					.map(|_| {
						let v = rng.gen_range(1..=max_var);
						let l = if rng.gen_bool(0.3) { -v } else { v };
						let c = if rng.gen_bool(0.2) {
							-rng.gen_range(1..=6)
						} else {
							rng.gen_range(1..=9)
						};
						(l, c)
					})
					.collect_vec();
				let cmp = match rng.gen_range(0..4) {
					0 => Comparator::GreaterEq,
					1 => Comparator::Equal,
					_ => Comparator::LessEq,
				};
				let k = rng.gen_range(0..=15);
				lin(&terms, cmp, k)
			})
			.collect()
	}

	macro_rules! linear_test_suite {
		($encoder:expr) => {
			#[test]
			fn test_small_le_1() {
				assert_sol!(
					$encoder,
					3,
					&$crate::linear::tests::lin(&[(1, 2), (2, 3), (3, 5)], $crate::Comparator::LessEq, 4)
					=> vec![
						lits![-1, -2, -3],
						lits![1, -2, -3],
						lits![-1, 2, -3],
					]
				);
			}

			#[test]
			fn test_small_le_2() {
				assert_sol!(
					$encoder,
					3,
					&$crate::linear::tests::lin(&[(1, 2), (2, 3), (3, 5)], $crate::Comparator::LessEq, 6)
					=> vec![
						lits![-1, -2, -3],
						lits![1, -2, -3],
						lits![-1, 2, -3],
						lits![1, 2, -3],
						lits![-1, -2, 3],
					]
				);
			}

			#[test]
			fn test_small_le_neg_lits() {
				assert_sol!(
					$encoder,
					3,
					&$crate::linear::tests::lin(&[(-1, 2), (2, 3), (-3, 5)], $crate::Comparator::LessEq, 4)
				);
			}

			#[test]
			fn test_small_le_neg_coefs() {
				assert_sol!(
					$encoder,
					3,
					&$crate::linear::tests::lin(&[(1, 2), (2, -3), (3, 5)], $crate::Comparator::LessEq, 4)
				);
			}

			#[test]
			fn test_small_le_repeated() {
				assert_sol!(
					$encoder,
					3,
					&$crate::linear::tests::lin(&[(1, 2), (2, 3), (-1, 1), (3, 4), (2, 2)], $crate::Comparator::LessEq, 6)
				);
			}

			#[test]
			fn test_small_ge() {
				assert_sol!(
					$encoder,
					4,
					&$crate::linear::tests::lin(&[(1, 3), (2, 2), (3, 4), (4, 1)], $crate::Comparator::GreaterEq, 6)
				);
			}

			#[test]
			fn test_small_eq() {
				assert_sol!(
					$encoder,
					4,
					&$crate::linear::tests::lin(&[(1, 1), (2, 2), (3, 3), (4, 4)], $crate::Comparator::Equal, 5)
					=> vec![
						lits![1, -2, -3, 4],
						lits![-1, 2, 3, -4],
					]
				);
			}

			#[test]
			fn test_zero_bound() {
				assert_sol!(
					$encoder,
					3,
					&$crate::linear::tests::lin(&[(1, 4), (2, 1), (-3, 2)], $crate::Comparator::LessEq, 0)
					=> vec![lits![-1, -2, 3]]
				);
			}

			#[test]
			fn test_gcd() {
				assert_sol!(
					$encoder,
					4,
					&$crate::linear::tests::lin(&[(1, 4), (2, 6), (3, 2), (4, 8)], $crate::Comparator::LessEq, 11)
				);
			}

			#[test]
			fn test_large_coefs() {
				assert_sol!(
					$encoder,
					5,
					&$crate::linear::tests::lin(&[(1, 100), (2, 250), (3, 37), (4, 412), (5, 199)], $crate::Comparator::LessEq, 500)
				);
			}

			#[test]
			fn test_ge_unsat() {
				$crate::helpers::tests::assert_unsat!(
					$encoder,
					2,
					&$crate::linear::tests::lin(&[(1, 2), (2, 3)], $crate::Comparator::GreaterEq, 6)
				);
			}

			#[test]
			fn test_random_equisatisfiable() {
				for con in $crate::linear::tests::random_constraints(42, 40, 6) {
					let mut tdb = $crate::helpers::tests::TestDB::new(6);
					match $crate::Encoder::encode(&$encoder, &mut tdb, &con) {
						Ok(()) => tdb.check_with(|value| $crate::Checker::check(&con, value).is_ok()),
						Err($crate::Unsatisfiable) => {
							tdb.skip_check();
							// Encoders may only give up when no assignment satisfies the constraint
							let unsat = $crate::helpers::tests::TestDB::new(6);
							assert!(
								$crate::linear::tests::brute_force(&unsat, &con).is_empty(),
								"{con} was reported unsatisfiable"
							);
						}
					}
				}
			}
		};
	}
	pub(crate) use linear_test_suite;

	/// The assignments to the input variables of `tdb` that satisfy `con`
	pub(crate) fn brute_force(tdb: &TestDB, con: &LinearConstraint) -> Vec<Vec<Lit>> {
		tdb.assignments_satisfying(|value| con.check(value).is_ok())
	}

	linear_test_suite!(LinearEncoder::<AdderEncoder>::default());

	mod swc_dispatch {
		#[cfg(feature = "trace")]
		use traced_test::test;

		use super::*;
		use crate::SwcEncoder;

		linear_test_suite!(LinearEncoder::new(
			SwcEncoder::default(),
			PairwiseEncoder::default(),
			PairwiseEncoder::default()
		));
	}

	#[test]
	fn test_construction_errors() {
		assert_eq!(
			LinExp::from_slices(&lits![1, 2], &[1]),
			Err(ConstraintError::LengthMismatch { lits: 2, coefs: 1 })
		);
		let exp = LinExp::from_slices(&lits![1, 2], &[3, 4]).unwrap();
		assert_eq!(
			LinearConstraint::new(exp.clone(), Comparator::LessEq, -1),
			Err(ConstraintError::NegativeBound(-1))
		);
		assert_eq!(
			LinearConstraint::new(exp.clone() + (lits![3][0], Coeff::MAX), Comparator::LessEq, 1),
			Err(ConstraintError::Overflow)
		);
		assert_eq!(
			LinearConstraint::new(
				LinExp::from((lits![1][0], Coeff::MIN)),
				Comparator::LessEq,
				0
			),
			Err(ConstraintError::Overflow)
		);
		assert!(LinearConstraint::new(exp, Comparator::GreaterEq, 0).is_ok());
	}

	#[test]
	fn test_exp_overflow() {
		let exp = LinExp::from_slices(&lits![1, 2, 3], &[2, -3, 4]).unwrap();
		assert_eq!(exp.bounds(), Ok((-3, 6)));

		let exp = LinExp::from_slices(&lits![1, 2], &[Coeff::MAX, 1]).unwrap();
		assert_eq!(exp.bounds(), Err(ConstraintError::Overflow));
		let all_true = |_: Lit| Some(true);
		assert!(matches!(exp.value(&all_true), Err(CheckError::Fail(_))));
		assert_eq!(exp.value(&|l: Lit| Some(l == lits![1][0])), Ok(Coeff::MAX));

		let exp = LinExp::from_slices(&lits![1, 2], &[Coeff::MIN + 1, -2]).unwrap();
		assert_eq!(exp.bounds(), Err(ConstraintError::Overflow));
	}

	#[test]
	fn test_normalize_aggregation() {
		// 1·x1 + 2·x1 + 1·x2 + 2·x3 ≤ 3 aggregates x1
		let norm = lin(&[(1, 1), (1, 2), (2, 1), (3, 2)], Comparator::LessEq, 3)
			.normalize()
			.unwrap();
		assert_eq!(norm.len(), 1);
		assert_eq!(
			norm[0].linear().terms(),
			&[
				(lits![2][0], PosCoeff(1)),
				(lits![3][0], PosCoeff(2)),
				(lits![1][0], PosCoeff(3)),
			]
		);
		assert_eq!(norm[0].linear().k(), PosCoeff(3));

		// x1 + ¬x1 cancels into a constant
		let norm = lin(&[(1, 2), (-1, 2), (2, 1)], Comparator::LessEq, 3)
			.normalize()
			.unwrap();
		assert_eq!(norm[0].linear().terms(), &[(lits![2][0], PosCoeff(1))]);
		assert_eq!(norm[0].linear().k(), PosCoeff(1));
	}

	#[test]
	fn test_normalize_negative_coefs() {
		// 2·x1 - 3·x2 ≤ 1  ⇔  2·x1 + 3·¬x2 ≤ 4
		let norm = lin(&[(1, 2), (2, -3)], Comparator::LessEq, 1)
			.normalize()
			.unwrap();
		assert_eq!(
			norm[0].linear().terms(),
			&[(lits![1][0], PosCoeff(2)), (lits![-2][0], PosCoeff(3))]
		);
		assert_eq!(norm[0].linear().k(), PosCoeff(4));
		assert!(norm[0].falsified().is_empty());
	}

	#[test]
	fn test_normalize_ge_and_eq() {
		// 2·x1 + 3·x2 ≥ 2  ⇔  2·¬x1 + 3·¬x2 ≤ 3
		let norm = lin(&[(1, 2), (2, 3)], Comparator::GreaterEq, 2)
			.normalize()
			.unwrap();
		assert_eq!(
			norm[0].linear().terms(),
			&[(lits![-1][0], PosCoeff(2)), (lits![-2][0], PosCoeff(3))]
		);
		assert_eq!(norm[0].linear().k(), PosCoeff(3));

		let norm = lin(&[(1, 2), (2, 3)], Comparator::Equal, 3)
			.normalize()
			.unwrap();
		assert_eq!(norm.len(), 2);
		// 2·¬x1 + 3·¬x2 ≤ 2: ¬x2 is falsified and 2·¬x1 ≤ 2 reduces to ¬x1 ≤ 1
		assert_eq!(norm[1].falsified(), lits![-2].as_slice());
		assert_eq!(norm[1].linear().terms(), &[(lits![-1][0], PosCoeff(1))]);
		assert_eq!(norm[1].linear().k(), PosCoeff(1));

		// No assignment reaches 6
		assert_eq!(
			lin(&[(1, 2), (2, 3)], Comparator::GreaterEq, 6).normalize(),
			Err(Unsatisfiable)
		);
	}

	#[test]
	fn test_normalize_bound() {
		// Coefficients above the bound falsify their literal
		let norm = lin(&[(1, 2), (2, 3), (3, 5)], Comparator::LessEq, 4)
			.normalize()
			.unwrap();
		assert_eq!(norm[0].falsified(), lits![3].as_slice());
		assert_eq!(
			norm[0].linear().terms(),
			&[(lits![1][0], PosCoeff(2)), (lits![2][0], PosCoeff(3))]
		);

		// A zero bound falsifies every literal
		let norm = lin(&[(1, 2), (-2, 3)], Comparator::LessEq, 0)
			.normalize()
			.unwrap();
		assert_eq!(norm[0].falsified(), lits![1, -2].as_slice());
		assert!(norm[0].linear().is_empty());
	}

	#[test]
	fn test_normalize_gcd() {
		// 4·x1 + 6·x2 ≤ 9  ⇔  2·x1 + 3·x2 ≤ 4
		let norm = lin(&[(1, 4), (2, 6)], Comparator::LessEq, 9)
			.normalize()
			.unwrap();
		assert_eq!(
			norm[0].linear().terms(),
			&[(lits![1][0], PosCoeff(2)), (lits![2][0], PosCoeff(3))]
		);
		assert_eq!(norm[0].linear().k(), PosCoeff(4));
	}

	#[test]
	fn test_normalize_idempotent() {
		for con in random_constraints(7, 200, 8) {
			let Ok(sides) = con.normalize() else {
				continue;
			};
			for side in sides {
				let again = side.linear().normalize().unwrap();
				assert_eq!(again.linear(), side.linear(), "{con}");
				assert!(again.falsified().is_empty());
			}
		}
	}

	#[test]
	fn test_variant_detection() {
		let variant = |terms: &[(i32, Coeff)], k| {
			lin(terms, Comparator::LessEq, k).normalize().unwrap()[0].variant()
		};
		assert_eq!(variant(&[(1, 1), (2, 2)], 3), LinVariant::Trivial);
		assert_eq!(variant(&[], 3), LinVariant::Trivial);
		assert_eq!(
			variant(&[(1, 2), (2, 2), (3, 2)], 3),
			LinVariant::CardinalityOne(CardinalityOne {
				lits: lits![1, 2, 3],
				cmp: LimitComp::LessEq
			})
		);
		assert_eq!(
			variant(&[(1, 3), (2, 3), (3, 3)], 7),
			LinVariant::Cardinality(Cardinality {
				lits: lits![1, 2, 3],
				cmp: Comparator::LessEq,
				k: PosCoeff(2),
			})
		);
		assert!(matches!(
			variant(&[(1, 1), (2, 2), (3, 3)], 3),
			LinVariant::Linear(_)
		));
	}

	#[test]
	fn test_monotone_in_k() {
		// Every solution of ∑ ≤ k is also a solution of ∑ ≤ k + 1
		let terms = [(1, 3), (2, 5), (3, 2), (4, 7), (5, 4)];
		let mut prev = Vec::new();
		for k in 0..=21 {
			let mut tdb = TestDB::new(5);
			LinearEncoder::<AdderEncoder>::default()
				.encode(&mut tdb, &lin(&terms, Comparator::LessEq, k))
				.unwrap();
			let mut sols = tdb.enumerate();
			tdb.skip_check();
			sols.sort();
			assert!(
				prev.iter().all(|sol| sols.contains(sol)),
				"a solution for k = {} is rejected for k = {k}",
				k - 1
			);
			prev = sols;
		}
		assert_eq!(prev.len(), 32);
	}

	#[test]
	fn test_swc_and_adder_agree() {
		for con in random_constraints(1234, 60, 5) {
			let mut solutions = Vec::new();
			for swc in [true, false] {
				let mut tdb = TestDB::new(5);
				let res = if swc {
					SwcEncoder::default().encode(&mut tdb, &con)
				} else {
					AdderEncoder::default().encode(&mut tdb, &con)
				};
				let mut sols = match res {
					Ok(()) => tdb.enumerate(),
					Err(Unsatisfiable) => Vec::new(),
				};
				tdb.skip_check();
				sols.sort();
				solutions.push(sols);
			}
			assert_eq!(solutions[0], solutions[1], "{con}");
		}
	}

	#[test]
	fn test_linear_encoder_dispatch() {
		// The sides of = are classified separately
		let mut tdb = TestDB::new(3);
		assert_sol!(
			tdb => LinearEncoder::<AdderEncoder>::default(),
			&lin(&[(1, 1), (2, 1), (3, 1)], Comparator::Equal, 1)
			=> vec![lits![1, -2, -3], lits![-1, 2, -3], lits![-1, -2, 3]]
		);
	}
}
