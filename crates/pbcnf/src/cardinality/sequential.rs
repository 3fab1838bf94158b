use crate::{
	cardinality_one::at_least_one_clause,
	trace::{emit_clause, new_var},
	Cardinality, CardinalityOne, ClauseDatabase, Comparator, Encoder, LimitComp, Lit, Namespace,
	Result,
};

/// Encoder using a sequential counter (Sinz, 2005).
///
/// For at most one constraints, the counter is a chain of n - 1 auxiliary
/// variables where sᵢ holds when one of the first i literals is true. For
/// cardinality constraints every prefix gets a unary register of k bits.
#[derive(Clone, Debug, Default)]
pub struct SequentialEncoder {}

impl<DB: ClauseDatabase> Encoder<DB, CardinalityOne> for SequentialEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "sequential_encoder", skip_all, fields(constraint = card1.trace_print()))
	)]
	fn encode(&self, db: &mut DB, card1: &CardinalityOne) -> Result {
		if card1.cmp == LimitComp::Equal {
			at_least_one_clause(db, card1)?
		}
		let xs = &card1.lits;
		let n = xs.len();
		if n < 2 {
			return Ok(());
		}
		let ns = Namespace::new("seq_amo");
		let s = (1..n).map(|_| new_var!(db, ns)).collect::<Vec<_>>();

		emit_clause!(db, [!xs[0], s[0]])?;
		for i in 1..n - 1 {
			emit_clause!(db, [!xs[i], s[i]])?;
			emit_clause!(db, [!s[i - 1], s[i]])?;
			emit_clause!(db, [!xs[i], !s[i - 1]])?;
		}
		emit_clause!(db, [!xs[n - 1], !s[n - 2]])
	}
}

impl<DB: ClauseDatabase> Encoder<DB, Cardinality> for SequentialEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "sequential_encoder", skip_all, fields(constraint = card.trace_print()))
	)]
	fn encode(&self, db: &mut DB, card: &Cardinality) -> Result {
		let sides = card.at_most_sides()?;
		let names: &[&str] = match card.cmp {
			Comparator::LessEq => &["at_most"],
			Comparator::GreaterEq => &["at_least"],
			Comparator::Equal => &["at_most", "at_least"],
		};
		for ((lits, k), name) in sides.iter().zip(names) {
			at_most_k(db, lits, *k, &Namespace::new("seq").child(name))?;
		}
		Ok(())
	}
}

/// Sequential counter for ∑ xs ≤ k, where register s[i][j] holds when at
/// least j + 1 of the first i + 1 literals are true.
fn at_most_k<DB: ClauseDatabase>(db: &mut DB, xs: &[Lit], k: usize, ns: &Namespace) -> Result {
	let n = xs.len();
	if k >= n {
		return Ok(());
	}
	if k == 0 {
		for x in xs {
			emit_clause!(db, [!x])?;
		}
		return Ok(());
	}
	let s = (0..n - 1)
		.map(|i| {
			let row = ns.child(i);
			(0..k).map(|_| new_var!(db, row)).collect::<Vec<_>>()
		})
		.collect::<Vec<_>>();

	emit_clause!(db, [!xs[0], s[0][0]])?;
	for j in 1..k {
		emit_clause!(db, [!s[0][j]])?;
	}
	for i in 1..n - 1 {
		emit_clause!(db, [!xs[i], s[i][0]])?;
		emit_clause!(db, [!s[i - 1][0], s[i][0]])?;
		for j in 1..k {
			emit_clause!(db, [!xs[i], !s[i - 1][j - 1], s[i][j]])?;
			emit_clause!(db, [!s[i - 1][j], s[i][j]])?;
		}
		emit_clause!(db, [!xs[i], !s[i - 1][k - 1]])?;
	}
	emit_clause!(db, [!xs[n - 1], !s[n - 2][k - 1]])
}
