use std::collections::VecDeque;

use crate::{
	helpers::{as_binary, bit_length},
	linear::{encode_sides, PosCoeff},
	trace::{emit_clause, new_var},
	ClauseDatabase, Encoder, Linear, LinearConstraint, Lit, Namespace, Result,
};

/// Encoder for the linear constraints that ∑ coeffᵢ·litsᵢ ≤ k using a binary
/// adder network.
///
/// Every literal is placed in the bucket of each bit that is set in its
/// coefficient. The buckets are then reduced, lowest bit first, using full
/// and half adders until every bucket holds a single digit. The digits are
/// finally compared against the binary representation of k.
#[derive(Clone, Debug, Default)]
pub struct AdderEncoder {}

impl<DB: ClauseDatabase> Encoder<DB, Linear> for AdderEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "adder_encoder", skip_all, fields(constraint = lin.trace_print()))
	)]
	fn encode(&self, db: &mut DB, lin: &Linear) -> Result {
		let ns = Namespace::new("adder");
		let bits = bit_length(*lin.k);
		let mut net = Network::default();

		let inputs = lin
			.terms
			.iter()
			.map(|(lit, coef)| (net.input(*lit), *coef))
			.collect::<Vec<_>>();
		let mut buckets = (0..bits)
			.map(|b| {
				inputs
					.iter()
					.filter(|(_, coef)| **coef & (1 << b) != 0)
					.map(|(node, _)| *node)
					.collect::<VecDeque<_>>()
			})
			.collect::<Vec<_>>();

		// Reduce each bucket to a single digit, sums stay in the bucket and
		// carries move to the next one
		let mut digits: Vec<Option<Lit>> = vec![None; bits];
		let mut b = 0;
		while b < buckets.len() {
			if buckets[b].is_empty() {
				b += 1;
				continue;
			}
			if b == buckets.len() - 1 && buckets[b].len() >= 2 {
				buckets.push(VecDeque::new());
				digits.push(None);
			}
			let bit_ns = ns.child(b);
			while buckets[b].len() >= 3 {
				let input = [buckets[b][0], buckets[b][1], buckets[b][2]];
				let _ = buckets[b].drain(..3);
				let (sum, carry) = net.full_adder(db, &bit_ns, input)?;
				buckets[b].push_back(sum);
				buckets[b + 1].push_back(carry);
			}
			if buckets[b].len() == 2 {
				let input = [buckets[b][0], buckets[b][1]];
				buckets[b].clear();
				let (sum, carry) = net.half_adder(db, &bit_ns, input)?;
				buckets[b].push_back(sum);
				buckets[b + 1].push_back(carry);
			}
			digits[b] = buckets[b].pop_front().map(|n| net.lit(n));
			b += 1;
		}
		tracing::debug!(
			full_adders = net.count(|g| matches!(g, Gate::FullSum(_))),
			half_adders = net.count(|g| matches!(g, Gate::HalfSum(_))),
			depth = net.depth(),
			digits = digits.len(),
			"adder network"
		);

		lex_leq_const(db, &digits, lin.k, digits.len())
	}
}

impl<DB: ClauseDatabase> Encoder<DB, LinearConstraint> for AdderEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "adder_encoder", skip_all, fields(constraint = con.trace_print()))
	)]
	fn encode(&self, db: &mut DB, con: &LinearConstraint) -> Result {
		encode_sides(self, db, con)
	}
}

/// The kind of a node in the adder network, referring to its inputs by index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
	Input,
	FullSum([usize; 3]),
	FullCarry([usize; 3]),
	HalfSum([usize; 2]),
	HalfCarry([usize; 2]),
}

/// Arena of the nodes of an adder network, each with the literal that holds
/// its value
#[derive(Debug, Default)]
struct Network {
	nodes: Vec<(Gate, Lit)>,
}

impl Network {
	fn push(&mut self, gate: Gate, lit: Lit) -> usize {
		self.nodes.push((gate, lit));
		self.nodes.len() - 1
	}

	fn input(&mut self, lit: Lit) -> usize {
		self.push(Gate::Input, lit)
	}

	fn lit(&self, node: usize) -> Lit {
		self.nodes[node].1
	}

	fn count(&self, pred: impl Fn(&Gate) -> bool) -> usize {
		self.nodes.iter().filter(|(g, _)| pred(g)).count()
	}

	/// The largest number of gates on a path from an input to an output
	fn depth(&self) -> usize {
		// Gates only refer to earlier nodes
		let mut depth = Vec::with_capacity(self.nodes.len());
		for (gate, _) in &self.nodes {
			let inputs: &[usize] = match gate {
				Gate::Input => &[],
				Gate::FullSum(i) | Gate::FullCarry(i) => i,
				Gate::HalfSum(i) | Gate::HalfCarry(i) => i,
			};
			let d = inputs.iter().map(|n| depth[*n] + 1).max().unwrap_or(0);
			depth.push(d);
		}
		depth.into_iter().max().unwrap_or(0)
	}

	/// Add a full adder over three nodes, returning its sum and carry nodes
	fn full_adder<DB: ClauseDatabase>(
		&mut self,
		db: &mut DB,
		ns: &Namespace,
		input: [usize; 3],
	) -> Result<(usize, usize)> {
		let [a, b, c] = input.map(|n| self.lit(n));
		let sum = new_var!(db, ns.child("sum"));
		let carry = new_var!(db, ns.child("carry"));
		sum_circuit(db, &[a, b, c], sum)?;
		carry_circuit(db, &[a, b, c], carry)?;

		// The sum and carry are both true iff all inputs are, and both false iff
		// no input is
		for x in [a, b, c] {
			emit_clause!(db, [!carry, !sum, x])?;
		}
		for x in [a, b, c] {
			emit_clause!(db, [carry, sum, !x])?;
		}
		Ok((
			self.push(Gate::FullSum(input), sum),
			self.push(Gate::FullCarry(input), carry),
		))
	}

	/// Add a half adder over two nodes, returning its sum and carry nodes
	fn half_adder<DB: ClauseDatabase>(
		&mut self,
		db: &mut DB,
		ns: &Namespace,
		input: [usize; 2],
	) -> Result<(usize, usize)> {
		let [a, b] = input.map(|n| self.lit(n));
		let sum = new_var!(db, ns.child("sum"));
		let carry = new_var!(db, ns.child("carry"));
		sum_circuit(db, &[a, b], sum)?;
		carry_circuit(db, &[a, b], carry)?;
		Ok((
			self.push(Gate::HalfSum(input), sum),
			self.push(Gate::HalfCarry(input), carry),
		))
	}
}

/// Encode the adder sum circuit
///
/// This function accepts either 2 literals as `input` (half adder) or 3
/// literals (full adder).
#[cfg_attr(feature = "trace", tracing::instrument(name = "sum_circuit", skip_all, fields(constraint = trace_print_circuit(input, &sum, " ⊻ "))))]
fn sum_circuit<DB: ClauseDatabase>(db: &mut DB, input: &[Lit], sum: Lit) -> Result {
	match *input {
		[a, b] => {
			emit_clause!(db, [!a, !b, !sum])?;
			emit_clause!(db, [a, b, !sum])?;
			emit_clause!(db, [!a, b, sum])?;
			emit_clause!(db, [a, !b, sum])
		}
		[a, b, c] => {
			emit_clause!(db, [a, b, c, !sum])?;
			emit_clause!(db, [a, !b, !c, !sum])?;
			emit_clause!(db, [!a, b, !c, !sum])?;
			emit_clause!(db, [!a, !b, c, !sum])?;

			emit_clause!(db, [!a, !b, !c, sum])?;
			emit_clause!(db, [!a, b, c, sum])?;
			emit_clause!(db, [a, !b, c, sum])?;
			emit_clause!(db, [a, b, !c, sum])
		}
		_ => unreachable!(),
	}
}

/// Encode the adder carry circuit
///
/// This function accepts either 2 literals as `input` (half adder) or 3
/// literals (full adder).
#[cfg_attr(feature = "trace", tracing::instrument(name = "carry_circuit", skip_all, fields(constraint = trace_print_circuit(input, &carry, " + "))))]
fn carry_circuit<DB: ClauseDatabase>(db: &mut DB, input: &[Lit], carry: Lit) -> Result {
	match *input {
		[a, b] => {
			emit_clause!(db, [a, !carry])?;
			emit_clause!(db, [b, !carry])?;
			emit_clause!(db, [!a, !b, carry])
		}
		[a, b, c] => {
			emit_clause!(db, [b, c, !carry])?;
			emit_clause!(db, [a, c, !carry])?;
			emit_clause!(db, [a, b, !carry])?;

			emit_clause!(db, [!b, !c, carry])?;
			emit_clause!(db, [!a, !c, carry])?;
			emit_clause!(db, [!a, !b, carry])
		}
		_ => unreachable!(),
	}
}

#[cfg(feature = "trace")]
fn trace_print_circuit(input: &[Lit], output: &Lit, op: &str) -> String {
	use crate::trace::trace_print_lit;
	format!(
		"{} ≡ {}",
		trace_print_lit(output),
		itertools::join(input.iter().map(trace_print_lit), op)
	)
}

/// Uses lexicographic constraint to constrain x:B ≦ k
///
/// Digits that are `None` are known to be zero.
#[cfg_attr(
	feature = "trace",
	tracing::instrument(name = "lex_lesseq_const", skip_all)
)]
pub(crate) fn lex_leq_const<DB: ClauseDatabase>(
	db: &mut DB,
	x: &[Option<Lit>],
	k: PosCoeff,
	bits: usize,
) -> Result {
	// For every zero bit in k:
	// - either the `x` bit is also zero, or
	// - a higher `x` bit is zero that was one in k.
	let k = as_binary(k, Some(bits));
	for i in (0..bits).filter(|i| !k[*i]) {
		// A clause containing a known zero digit is satisfied
		let clause = (i..bits)
			.filter(|j| *j == i || k[*j])
			.map(|j| x[j].map(|l| !l))
			.collect::<Option<Vec<_>>>();
		if let Some(clause) = clause {
			emit_clause!(db, clause)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	#[cfg(feature = "trace")]
	use traced_test::test;

	use super::*;
	use crate::{
		helpers::tests::{assert_enc_sol, assert_sol, lits, TestDB},
		linear::tests::{lin, linear_test_suite},
		Cnf, Comparator,
	};

	linear_test_suite!(AdderEncoder::default());

	#[test]
	fn test_lex_leq_const() {
		// x₀ + 2·x₁ + 4·x₂ ≤ 5 excludes 6 and 7
		let mut tdb = TestDB::new(3)
			.expect_clauses(vec![lits![-2, -3]])
			.expect_solutions(vec![
				lits![-1, -2, -3],
				lits![1, -2, -3],
				lits![-1, 2, -3],
				lits![1, 2, -3],
				lits![-1, -2, 3],
				lits![1, -2, 3],
			]);
		let x = lits![1, 2, 3].into_iter().map(Some).collect::<Vec<_>>();
		lex_leq_const(&mut tdb, &x, PosCoeff::new(5), 3).unwrap();
		tdb.check_complete();
	}

	#[test]
	fn test_lex_leq_const_zero_digits() {
		// A higher zero digit where k has a one satisfies the clause of a lower
		// zero bit of k
		let mut tdb = TestDB::new(2).expect_clauses(vec![lits![-2]]);
		let x = vec![Some(lits![1][0]), None, Some(lits![2][0])];
		// k = 0b010
		lex_leq_const(&mut tdb, &x, PosCoeff::new(2), 3).unwrap();
		tdb.check_complete();
	}

	#[test]
	fn test_full_adder_network() {
		// x1 + x2 + x3 ≤ 2 is reduced by a single full adder
		let side = lin(&[(1, 1), (2, 1), (3, 1)], Comparator::LessEq, 2)
			.normalize()
			.unwrap()
			.remove(0);
		let mut cnf = Cnf::default();
		let _ = cnf.new_var_range(3);
		AdderEncoder::default()
			.encode(&mut cnf, side.linear())
			.unwrap();
		assert_eq!(cnf.auxiliary_vars().count(), 2);
		// 8 sum, 6 carry and 6 linking clauses, and one comparison clause
		assert_eq!(cnf.clauses(), 8 + 6 + 6 + 1);
	}

	#[test]
	fn test_network_depth() {
		let mut net = Network::default();
		let x = lits![1, 2, 3, 4];
		let inputs = x.iter().map(|l| net.input(*l)).collect::<Vec<_>>();
		assert_eq!(net.depth(), 0);
		let mut cnf = Cnf::default();
		let _ = cnf.new_var_range(4);
		let ns = Namespace::new("adder");
		let (sum, _) = net
			.full_adder(&mut cnf, &ns, [inputs[0], inputs[1], inputs[2]])
			.unwrap();
		let (_, carry) = net.half_adder(&mut cnf, &ns, [sum, inputs[3]]).unwrap();
		assert_eq!(net.depth(), 2);
		assert_eq!(net.count(|g| *g == Gate::HalfCarry([sum, inputs[3]])), 1);
		assert_eq!(net.lit(carry), lits![8][0]);
	}

	#[test]
	fn test_half_adder_overflow() {
		// 3·x1 + 3·x2 ≤ 3 is normalised to x1 + x2 ≤ 1, whose bucket overflows
		// into a new top digit
		assert_sol!(
			AdderEncoder::default(),
			2,
			&lin(&[(1, 3), (2, 3)], Comparator::LessEq, 3)
			=> vec![lits![-1, -2], lits![1, -2], lits![-1, 2]]
		);
	}

	#[test]
	fn test_pb_encode() {
		// 2·x4 exceeds the bound and is fixed to false
		assert_sol!(
			AdderEncoder::default(),
			4,
			&lin(&[(1, 1), (2, 1), (3, 1), (4, 2)], Comparator::LessEq, 1)
			=> vec![
				lits![-1, -2, -3, -4],
				lits![-1, -2, 3, -4],
				lits![-1, 2, -3, -4],
				lits![1, -2, -3, -4],
			]
		);
	}

	#[test]
	fn test_half_adder_clauses() {
		// x1 + x2 ≤ 1: a half adder into sum x3 and carry x4, and the top digit
		// (the carry) is forced false
		assert_enc_sol!(
			AdderEncoder::default(),
			2,
			&lin(&[(1, 1), (2, 1)], Comparator::LessEq, 1)
			=> vec![
				lits![-1, -2, -3],
				lits![1, 2, -3],
				lits![-1, 2, 3],
				lits![1, -2, 3],
				lits![1, -4],
				lits![2, -4],
				lits![-1, -2, 4],
				lits![-4],
			],
			vec![lits![-1, -2], lits![1, -2], lits![-1, 2]]
		);
	}
}
