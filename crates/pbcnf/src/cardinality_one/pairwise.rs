use itertools::Itertools;

use super::at_least_one_clause;
use crate::{
	trace::emit_clause, Cardinality, CardinalityOne, ClauseDatabase, Encoder, LimitComp, Result,
};

/// An encoder for an At Most One constraints that for every pair of literals
/// states that one of the literals has to be `false`.
///
/// For cardinality constraints ∑ litsᵢ ≤ k the encoder generalises to the
/// binomial encoding: every subset of k + 1 literals contains a false literal.
#[derive(Clone, Debug, Default)]
pub struct PairwiseEncoder {}

impl<DB: ClauseDatabase> Encoder<DB, CardinalityOne> for PairwiseEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "pairwise_encoder", skip_all, fields(constraint = card1.trace_print()))
	)]
	fn encode(&self, db: &mut DB, card1: &CardinalityOne) -> Result {
		// Add clause to ensure "at least one" literal holds
		if card1.cmp == LimitComp::Equal {
			at_least_one_clause(db, card1)?
		}
		// For every pair of literals (i, j) add "¬i ∨ ¬j"
		for (a, b) in card1.lits.iter().tuple_combinations() {
			emit_clause!(db, [!a, !b])?
		}
		Ok(())
	}
}

impl<DB: ClauseDatabase> Encoder<DB, Cardinality> for PairwiseEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "binomial_encoder", skip_all, fields(constraint = card.trace_print()))
	)]
	fn encode(&self, db: &mut DB, card: &Cardinality) -> Result {
		for (lits, k) in card.at_most_sides()? {
			if k >= lits.len() {
				continue;
			}
			for subset in lits.iter().combinations(k + 1) {
				emit_clause!(db, subset.into_iter().map(|l| !l).collect_vec())?
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	#[cfg(feature = "trace")]
	use traced_test::test;

	use super::*;
	use crate::{
		cardinality::tests::card_test_suite,
		cardinality_one::tests::card1_test_suite,
		helpers::tests::{assert_enc_sol, assert_sol, assert_unsat, lits},
		Comparator,
	};

	mod card1 {
		#[cfg(feature = "trace")]
		use traced_test::test;

		use super::*;

		card1_test_suite!(PairwiseEncoder::default());
	}

	mod card {
		#[cfg(feature = "trace")]
		use traced_test::test;

		use super::*;

		card_test_suite!(PairwiseEncoder::default());
	}

	#[test]
	fn test_amo_pairwise() {
		// AMO on two literals
		assert_enc_sol!(
			PairwiseEncoder::default(),
			2,
			&CardinalityOne::new(lits![1, 2], LimitComp::LessEq)
			=> vec![lits![-1, -2]],
			vec![lits![-1, -2], lits![1, -2], lits![-1, 2]]
		);
		// AMO on a negated literals
		assert_enc_sol!(
			PairwiseEncoder::default(),
			2,
			&CardinalityOne::new(lits![-1, 2], LimitComp::LessEq)
			=> vec![lits![1, -2]],
			vec![lits![1, -2], lits![-1, -2], lits![1, 2]]
		);
		// EO on three literals
		assert_enc_sol!(
			PairwiseEncoder::default(),
			3,
			&CardinalityOne::new(lits![1, 2, 3], LimitComp::Equal)
			=> vec![lits![1, 2, 3], lits![-1, -2], lits![-1, -3], lits![-2, -3]],
			vec![lits![1, -2, -3], lits![-1, 2, -3], lits![-1, -2, 3]]
		);
	}

	#[test]
	fn test_binomial_at_most() {
		// Every triple has a false literal
		assert_enc_sol!(
			PairwiseEncoder::default(),
			4,
			&Cardinality::new(lits![1, 2, 3, 4], Comparator::LessEq, 2).unwrap()
			=> vec![
				lits![-1, -2, -3],
				lits![-1, -2, -4],
				lits![-1, -3, -4],
				lits![-2, -3, -4],
			],
			vec![
				lits![-1, -2, -3, -4],
				lits![1, -2, -3, -4],
				lits![-1, 2, -3, -4],
				lits![-1, -2, 3, -4],
				lits![-1, -2, -3, 4],
				lits![1, 2, -3, -4],
				lits![1, -2, 3, -4],
				lits![1, -2, -3, 4],
				lits![-1, 2, 3, -4],
				lits![-1, 2, -3, 4],
				lits![-1, -2, 3, 4],
			]
		);
	}

	#[test]
	fn test_binomial_at_least() {
		// At least 2 of 3: every pair has a true literal
		assert_enc_sol!(
			PairwiseEncoder::default(),
			3,
			&Cardinality::new(lits![1, 2, 3], Comparator::GreaterEq, 2).unwrap()
			=> vec![lits![1, 2], lits![1, 3], lits![2, 3]],
			vec![lits![1, 2, -3], lits![1, -2, 3], lits![-1, 2, 3], lits![1, 2, 3]]
		);
		assert_unsat!(
			PairwiseEncoder::default(),
			2,
			&Cardinality::new(lits![1, 2], Comparator::GreaterEq, 3).unwrap()
		);
		assert_sol!(
			PairwiseEncoder::default(),
			3,
			&Cardinality::new(lits![1, -2, 3], Comparator::Equal, 2).unwrap()
		);
	}
}
