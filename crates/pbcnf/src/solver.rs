use std::time::Duration;

use crate::{ClauseDatabase, Valuation};

#[cfg(any(feature = "splr", test))]
pub mod splr;

pub trait Solver: ClauseDatabase {
	/// Return the name and the version of SAT solver.
	fn signature(&self) -> &str;

	/// Solve the formula with specified clauses.
	///
	/// When the formula is satisfiable, `on_sol` is called with the valuation
	/// of the found solution before the function returns.
	fn solve<SolCb: FnOnce(&dyn Valuation)>(&mut self, on_sol: SolCb) -> SolveResult;
}

#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
pub enum SolveResult {
	Sat,
	Unsat,
	/// The search was interrupted before an answer was found, e.g. because the
	/// time limit was reached
	Unknown,
	/// The solver gave up because of an internal failure
	Failed,
}

/// Solvers that can retract clauses: every clause added after a
/// [`SolveScoped::push`] is removed again by the matching
/// [`SolveScoped::pop`].
pub trait SolveScoped: Solver {
	/// Open a new scope
	fn push(&mut self);

	/// Close the innermost scope, removing the clauses added within it.
	///
	/// Variables created within the scope stay allocated. Popping without an
	/// open scope has no effect.
	fn pop(&mut self);

	/// Number of currently open scopes
	fn scopes(&self) -> usize;
}

pub trait TimeLimit: Solver {
	/// Limit the time spent by subsequent calls to [`Solver::solve`], `None`
	/// removes the limit
	fn set_time_limit(&mut self, limit: Option<Duration>);
}
