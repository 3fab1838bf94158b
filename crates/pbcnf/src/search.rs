use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::{
	solver::{SolveResult, SolveScoped, TimeLimit},
	Coeff, Comparator, ConstraintError, Encoder, LinExp, LinearConstraint, LinearEncoder, Lit,
	Result, Unsatisfiable, Valuation, Var,
};

/// How the next bound is chosen after a probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
	/// Probe the middle of the remaining interval
	#[default]
	Binary,
	/// Probe just below the best value found so far
	Linear,
}

/// The values of the objective and the observed variables in a solution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Model {
	values: FxHashMap<Var, bool>,
}

impl Model {
	fn record<F: Valuation + ?Sized>(vars: impl IntoIterator<Item = Var>, value: &F) -> Self {
		let values = vars
			.into_iter()
			.map(|v| (v, value(v.into()).unwrap_or(false)))
			.collect();
		Self { values }
	}

	/// The value of `lit`, `None` when its variable was not recorded
	pub fn value(&self, lit: Lit) -> Option<bool> {
		self.values
			.get(&lit.var())
			.map(|&b| b != lit.is_negated())
	}

	/// The recorded variables that are true
	pub fn true_vars(&self) -> impl Iterator<Item = Var> + '_ {
		self.values.iter().filter(|(_, b)| **b).map(|(v, _)| *v)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

/// Outcome of a [`BoundSearch`].
///
/// A search that runs out of time is not considered to be unsatisfiable: it
/// reports the best solution found so far and the interval that remained open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchResult {
	/// The interval closed with a solution of value `value`
	Optimal { value: Coeff, model: Model },
	/// The interval closed without any solution
	Unsat,
	/// The time limit was reached before the interval closed
	Timeout {
		best: Option<(Coeff, Model)>,
		low: Coeff,
		high: Coeff,
	},
	/// The solver failed before the interval closed
	Failed {
		best: Option<(Coeff, Model)>,
		low: Coeff,
		high: Coeff,
	},
}

/// Driver minimising the maximum of a set of weighted sums over the
/// constraints of a scoped solver.
///
/// Every probe opens a scope, encodes `objective[i] ≤ bound` for every sum,
/// solves, and closes the scope again. The constraints already present in the
/// solver are never retracted.
///
/// ```
/// # use pbcnf::{solver::splr::SplrContext, BoundSearch, ClauseDatabase, LinExp, SearchResult};
/// let mut slv = SplrContext::default();
/// let (a, b) = (slv.new_var(), slv.new_var());
/// slv.add_clause([a, b]).unwrap();
/// let objective = LinExp::from_slices(&[a, b], &[3, 2]).unwrap();
/// let res = BoundSearch::new(vec![objective]).unwrap().solve(&mut slv);
/// assert!(matches!(res, SearchResult::Optimal { value: 2, .. }));
/// ```
#[derive(Clone, Debug)]
pub struct BoundSearch<Enc = LinearEncoder> {
	objective: Vec<LinExp>,
	/// The values the objective can take
	range: (Coeff, Coeff),
	strategy: SearchStrategy,
	timeout: Option<Duration>,
	bounds: Option<(Coeff, Coeff)>,
	observed: Vec<Var>,
	encoder: Enc,
}

impl BoundSearch {
	/// Create a search minimising the largest of the sums in `objective`.
	///
	/// Fails with [`ConstraintError::Overflow`] when the sums, or the bound
	/// constraints placed on them, do not fit in a [`Coeff`].
	pub fn new(objective: Vec<LinExp>) -> Result<Self, ConstraintError> {
		let mut range = (0, 0);
		for exp in &objective {
			let (lb, ub) = exp.bounds()?;
			range = (range.0.max(lb), range.1.max(ub));
		}
		for exp in &objective {
			let _ = LinearConstraint::new(exp.clone(), Comparator::LessEq, range.1)?;
		}
		Ok(Self {
			objective,
			range,
			strategy: SearchStrategy::default(),
			timeout: None,
			bounds: None,
			observed: Vec::new(),
			encoder: LinearEncoder::default(),
		})
	}
}

/// The result of a single probe
#[derive(Debug)]
enum Probe {
	Sat(Coeff, Model),
	Unsat,
	Unknown,
	Failed,
}

impl<Enc> BoundSearch<Enc> {
	pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
		self.strategy = strategy;
		self
	}

	/// Stop searching once `timeout` has passed since the start of
	/// [`BoundSearch::solve`]
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	/// Search within `[low, high]`, intersected with the range of the
	/// objective
	pub fn with_bounds(mut self, low: Coeff, high: Coeff) -> Self {
		self.bounds = Some((low, high));
		self
	}

	/// Record the values of `vars` in every found model
	pub fn observe<I: IntoIterator<Item = Var>>(mut self, vars: I) -> Self {
		self.observed.extend(vars);
		self
	}

	/// Encode the bounds on the objective using `encoder`
	pub fn with_encoder<E>(self, encoder: E) -> BoundSearch<E> {
		BoundSearch {
			objective: self.objective,
			range: self.range,
			strategy: self.strategy,
			timeout: self.timeout,
			bounds: self.bounds,
			observed: self.observed,
			encoder,
		}
	}

	/// The interval of candidate objective values
	fn interval(&self) -> (Coeff, Coeff) {
		match self.bounds {
			Some((low, high)) => (low.max(self.range.0), high.min(self.range.1)),
			None => self.range,
		}
	}

	/// The value of the objective: the largest of the sums, where unassigned
	/// variables are false
	fn evaluate<F: Valuation + ?Sized>(&self, value: &F) -> Coeff {
		let total = |l: Lit| Some(value(l).unwrap_or(l.is_negated()));
		self.objective
			.iter()
			.filter_map(|exp| exp.value(&total).ok())
			.max()
			.unwrap_or(0)
	}

	/// Minimise the objective over the clauses of `slv`
	pub fn solve<S>(&self, slv: &mut S) -> SearchResult
	where
		S: SolveScoped + TimeLimit,
		Enc: Encoder<S, LinearConstraint>,
	{
		let start = Instant::now();
		let deadline = self.timeout.map(|t| start + t);
		let (mut low, mut high) = self.interval();
		let mut best: Option<(Coeff, Model)> = None;
		let mut probes = 0;

		while low <= high {
			let mid = match self.strategy {
				SearchStrategy::Binary => low + (high - low) / 2,
				SearchStrategy::Linear => high,
			};
			let budget = match deadline {
				Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
					Some(left) if !left.is_zero() => Some(left),
					_ => {
						tracing::info!(low, high, probes, "bound search timed out");
						return SearchResult::Timeout { best, low, high };
					}
				},
				None => None,
			};
			tracing::debug!(low, high, mid, ?budget, "probing bound");
			probes += 1;

			slv.push();
			let probe = self.probe(slv, mid, budget);
			slv.pop();

			match probe {
				Probe::Sat(value, model) => {
					debug_assert!(value <= mid);
					tracing::debug!(mid, value, "bound satisfiable");
					high = value - 1;
					best = Some((value, model));
				}
				Probe::Unsat => {
					tracing::debug!(mid, "bound unsatisfiable");
					low = mid + 1;
				}
				Probe::Unknown => {
					tracing::info!(low, high, probes, "bound search timed out");
					return SearchResult::Timeout { best, low, high };
				}
				Probe::Failed => {
					tracing::warn!(low, high, probes, "bound search failed");
					return SearchResult::Failed { best, low, high };
				}
			}
		}

		match best {
			Some((value, model)) => {
				tracing::info!(value, probes, elapsed = ?start.elapsed(), "optimal solution found");
				SearchResult::Optimal { value, model }
			}
			None => {
				tracing::info!(probes, elapsed = ?start.elapsed(), "no solution within bounds");
				SearchResult::Unsat
			}
		}
	}

	fn probe<S>(&self, slv: &mut S, bound: Coeff, budget: Option<Duration>) -> Probe
	where
		S: SolveScoped + TimeLimit,
		Enc: Encoder<S, LinearConstraint>,
	{
		match self.encode_bound(slv, bound) {
			Ok(Ok(())) => {}
			Ok(Err(Unsatisfiable)) => return Probe::Unsat,
			Err(err) => {
				tracing::warn!(%err, bound, "invalid objective bound");
				return Probe::Failed;
			}
		}
		slv.set_time_limit(budget);
		let mut found = None;
		let res = slv.solve(|value| {
			let vars = self
				.objective
				.iter()
				.flat_map(LinExp::vars)
				.chain(self.observed.iter().copied());
			found = Some((self.evaluate(value), Model::record(vars, value)));
		});
		match (res, found) {
			(SolveResult::Sat, Some((value, model))) => Probe::Sat(value, model),
			(SolveResult::Sat, None) | (SolveResult::Failed, _) => Probe::Failed,
			(SolveResult::Unsat, _) => Probe::Unsat,
			(SolveResult::Unknown, _) => Probe::Unknown,
		}
	}

	/// Encode `objective[i] ≤ bound` for every sum
	fn encode_bound<S>(
		&self,
		slv: &mut S,
		bound: Coeff,
	) -> std::result::Result<Result, ConstraintError>
	where
		S: SolveScoped + TimeLimit,
		Enc: Encoder<S, LinearConstraint>,
	{
		for exp in &self.objective {
			let con = LinearConstraint::new(exp.clone(), Comparator::LessEq, bound)?;
			if let Err(err) = self.encoder.encode(slv, &con) {
				return Ok(Err(err));
			}
		}
		Ok(Ok(()))
	}
}
