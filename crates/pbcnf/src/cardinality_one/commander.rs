use std::collections::VecDeque;

use itertools::Itertools;

use super::at_least_one_clause;
use crate::{
	trace::{emit_clause, new_var},
	CardinalityOne, ClauseDatabase, Encoder, LimitComp, Namespace, Result,
};

/// An encoder for At Most One constraints using commander variables (Klieber
/// and Kwon, 2007), in the variant of Heule.
///
/// While more than four literals remain, the first three literals and a fresh
/// commander y are constrained pairwise, and ¬y takes the place of the three
/// literals for the remainder.
#[derive(Clone, Debug, Default)]
pub struct CommanderEncoder {}

impl<DB: ClauseDatabase> Encoder<DB, CardinalityOne> for CommanderEncoder {
	#[cfg_attr(
		feature = "trace",
		tracing::instrument(name = "commander_encoder", skip_all, fields(constraint = card1.trace_print()))
	)]
	fn encode(&self, db: &mut DB, card1: &CardinalityOne) -> Result {
		if card1.cmp == LimitComp::Equal {
			at_least_one_clause(db, card1)?
		}
		let ns = Namespace::new("commander");
		let mut queue = card1.lits.iter().copied().collect::<VecDeque<_>>();
		while queue.len() > 4 {
			let y = new_var!(db, ns);
			let group = queue.drain(..3).chain([y]).collect_vec();
			for (a, b) in group.iter().tuple_combinations() {
				emit_clause!(db, [!a, !b])?
			}
			queue.push_back(!y);
		}
		for (a, b) in queue.iter().tuple_combinations() {
			emit_clause!(db, [!a, !b])?
		}
		Ok(())
	}
}
