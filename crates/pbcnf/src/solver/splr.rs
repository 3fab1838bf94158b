use std::{num::NonZeroI32, time::Duration};

use splr::{
	types::{CNFDescription, Instantiate},
	Certificate, Config, SatSolverIF, SolveIF, SolverError, VERSION,
};

use super::{SolveResult, SolveScoped, Solver, TimeLimit};
use crate::{ClauseDatabase, Cnf, Lit, Namespace, Result, Valuation};

/// A scoped solving context backed by the splr solver.
///
/// The clauses are kept in a [`Cnf`], and every call to [`Solver::solve`]
/// starts a fresh splr instance on the clauses of the currently open scopes.
#[derive(Debug)]
pub struct SplrContext {
	cnf: Cnf,
	/// Number of clauses at every [`SolveScoped::push`]
	marks: Vec<usize>,
	time_limit: Option<Duration>,
	signature: String,
}

impl SplrContext {
	pub fn new() -> Self {
		Self::from(Cnf::default())
	}

	/// The clauses of the open scopes
	pub fn cnf(&self) -> &Cnf {
		&self.cnf
	}

	fn solver(&self) -> std::result::Result<splr::Solver, SolverError> {
		let mut config = Config::default();
		if let Some(limit) = self.time_limit {
			config.c_timeout = limit.as_secs_f64();
		}
		let mut slv = splr::Solver::instantiate(
			&config,
			&CNFDescription {
				num_of_variables: self.cnf.variables(),
				..CNFDescription::default()
			},
		);
		for cl in self.cnf.iter() {
			let cl = cl.iter().map(|&l| i32::from(l)).collect::<Vec<_>>();
			let _ = SatSolverIF::add_clause(&mut slv, cl)?;
		}
		Ok(slv)
	}
}

impl Default for SplrContext {
	fn default() -> Self {
		Self::new()
	}
}

impl From<Cnf> for SplrContext {
	fn from(cnf: Cnf) -> Self {
		Self {
			cnf,
			marks: Vec::new(),
			time_limit: None,
			signature: format!("SPLR-{VERSION}"),
		}
	}
}

impl ClauseDatabase for SplrContext {
	fn new_var(&mut self) -> Lit {
		self.cnf.new_var()
	}

	fn new_aux_var(&mut self, ns: &Namespace) -> Lit {
		self.cnf.new_aux_var(ns)
	}

	fn add_clause<I: IntoIterator<Item = Lit>>(&mut self, cl: I) -> Result {
		self.cnf.add_clause(cl)
	}
}

fn solve_error(e: SolverError) -> SolveResult {
	use SolverError::*;
	match e {
		RootLevelConflict(_) | EmptyClause | Inconsistent => SolveResult::Unsat,
		TimeOut => SolveResult::Unknown,
		InvalidLiteral => panic!("clause referenced a non-existing variable"),
		e @ (SolverBug | UndescribedError | IOError | OutOfMemory) => {
			tracing::warn!(error = %e, "splr failed");
			SolveResult::Failed
		}
	}
}

impl Solver for SplrContext {
	fn signature(&self) -> &str {
		&self.signature
	}

	fn solve<SolCb: FnOnce(&dyn Valuation)>(&mut self, on_sol: SolCb) -> SolveResult {
		if self.cnf.iter().any(|cl| cl.is_empty()) {
			return SolveResult::Unsat;
		}
		if self.cnf.variables() == 0 {
			on_sol(&|_: Lit| None);
			return SolveResult::Sat;
		}
		let mut slv = match self.solver() {
			Ok(slv) => slv,
			Err(e) => return solve_error(e),
		};
		match SolveIF::solve(&mut slv) {
			Ok(Certificate::UNSAT) => SolveResult::Unsat,
			Ok(Certificate::SAT(sol)) => {
				let value = |l: Lit| {
					let v = l.var().index();
					sol.get(v).map(|&x| {
						debug_assert_eq!(NonZeroI32::new(x.abs()), Some(l.var().into()));
						(x > 0) != l.is_negated()
					})
				};
				on_sol(&value);
				SolveResult::Sat
			}
			Err(e) => solve_error(e),
		}
	}
}

impl SolveScoped for SplrContext {
	fn push(&mut self) {
		self.marks.push(self.cnf.clauses());
	}

	fn pop(&mut self) {
		if let Some(mark) = self.marks.pop() {
			self.cnf.truncate(mark);
		}
	}

	fn scopes(&self) -> usize {
		self.marks.len()
	}
}

impl TimeLimit for SplrContext {
	fn set_time_limit(&mut self, limit: Option<Duration>) {
		self.time_limit = limit;
	}
}

#[cfg(test)]
mod tests {
	#[cfg(feature = "trace")]
	use traced_test::test;

	use super::*;
	use crate::{CardinalityOne, Encoder, LimitComp, PairwiseEncoder};

	#[test]
	fn test_splr() {
		let mut slv = SplrContext::default();
		let a = slv.new_var();
		let b = slv.new_var();
		PairwiseEncoder::default()
			.encode(&mut slv, &CardinalityOne::new(vec![a, b], LimitComp::Equal))
			.unwrap();
		let res = Solver::solve(&mut slv, |value| {
			assert!(
				(value(!a).unwrap() && value(b).unwrap())
					|| (value(a).unwrap() && value(!b).unwrap()),
			)
		});
		assert_eq!(res, SolveResult::Sat);
		assert!(slv.signature().starts_with("SPLR-"));
	}

	#[test]
	fn test_push_pop() {
		let mut slv = SplrContext::default();
		let a = slv.new_var();
		let b = slv.new_var();
		slv.add_clause([a, b]).unwrap();
		assert_eq!(slv.solve(|_| {}), SolveResult::Sat);

		slv.push();
		slv.add_clause([!a]).unwrap();
		slv.add_clause([!b]).unwrap();
		assert_eq!(slv.scopes(), 1);
		assert_eq!(slv.solve(|_| {}), SolveResult::Unsat);
		slv.pop();

		assert_eq!(slv.scopes(), 0);
		assert_eq!(slv.cnf().clauses(), 1);
		let mut found = false;
		assert_eq!(
			slv.solve(|value| found = value(a) == Some(true) || value(b) == Some(true)),
			SolveResult::Sat
		);
		assert!(found);

		// Popping without an open scope keeps the clauses
		slv.pop();
		assert_eq!(slv.cnf().clauses(), 1);
	}

	#[test]
	fn test_empty_clause_in_scope() {
		let mut slv = SplrContext::default();
		let a = slv.new_var();
		slv.push();
		let v = slv.new_var();
		slv.add_clause([v]).unwrap();
		assert_eq!(slv.add_clause(Vec::<Lit>::new()), Err(crate::Unsatisfiable));
		assert_eq!(slv.solve(|_| {}), SolveResult::Unsat);
		slv.pop();
		// Variables created in the scope remain
		assert_eq!(slv.cnf().variables(), 2);
		assert_eq!(slv.solve(|value| assert!(value(a).is_some())), SolveResult::Sat);
	}

	#[test]
	fn test_no_variables() {
		let mut slv = SplrContext::default();
		slv.set_time_limit(Some(Duration::from_secs(1)));
		assert_eq!(slv.solve(|_| {}), SolveResult::Sat);
	}
}
