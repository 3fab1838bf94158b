use crate::{
	linear::encode_sides,
	trace::{emit_clause, new_var},
	ClauseDatabase, Encoder, Linear, LinearConstraint, Lit, Namespace, Result,
};

/// Encode the constraint that ∑ coeffᵢ·litsᵢ ≤ k using a Sequential Weight
/// Counter (SWC).
///
/// The counter introduces a register s[i][j] for every prefix of the first i
/// literals and every value 1 ≤ j ≤ k, which is forced to be true when the
/// weight of the true literals in the prefix reaches j.
#[derive(Clone, Debug, Default)]
pub struct SwcEncoder {}

impl<DB: ClauseDatabase> Encoder<DB, Linear> for SwcEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "swc_encoder", skip_all, fields(constraint = lin.trace_print()))
	)]
	fn encode(&self, db: &mut DB, lin: &Linear) -> Result {
		let k = *lin.k as usize;
		let n = lin.terms.len();
		let ns = Namespace::new("swc");

		// Registers of the previous prefix; prev[j] is forced when the prefix
		// reaches value j + 1. Values above the prefix sum are never reached,
		// so their registers are left out.
		let mut prev: Vec<Lit> = Vec::new();
		let mut sum = 0;
		for (i, (x, w)) in lin.terms.iter().enumerate() {
			let w = **w as usize;
			debug_assert!(1 <= w && w <= k);
			// The prefix cannot exceed k once x is added
			if let Some(s) = prev.get(k - w) {
				emit_clause!(db, [!s, !x])?;
			}
			if i == n - 1 {
				break;
			}
			sum += w;
			let row = ns.child(i + 1);
			let cur = (0..sum.min(k))
				.map(|_| new_var!(db, row))
				.collect::<Vec<_>>();
			for (j, s) in cur.iter().enumerate() {
				if let Some(p) = prev.get(j) {
					emit_clause!(db, [!p, *s])?;
				}
				if j < w {
					emit_clause!(db, [!x, *s])?;
				}
			}
			for (j, p) in prev.iter().enumerate() {
				if let Some(s) = cur.get(j + w) {
					emit_clause!(db, [!p, !x, *s])?;
				}
			}
			prev = cur;
		}
		Ok(())
	}
}

impl<DB: ClauseDatabase> Encoder<DB, LinearConstraint> for SwcEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "swc_encoder", skip_all, fields(constraint = con.trace_print()))
	)]
	fn encode(&self, db: &mut DB, con: &LinearConstraint) -> Result {
		encode_sides(self, db, con)
	}
}
