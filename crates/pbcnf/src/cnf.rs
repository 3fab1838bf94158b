use std::{
	fmt::{self, Display},
	fs::File,
	io::{self, BufRead, BufReader, BufWriter, Write},
	num::NonZeroI32,
	path::Path,
};

use crate::{
	ClauseDatabase, Label, Lit, Namespace, Result, Unsatisfiable, Var, VarAllocator, VarRange,
};

/// A formula in conjunctive normal form.
///
/// Clauses are stored flattened: `lits` holds all literals back to back and
/// `size` the length of every clause.
#[derive(Clone, Debug, Default)]
pub struct Cnf {
	vars: VarAllocator,
	lits: Vec<Lit>,
	size: Vec<usize>,
}

impl Cnf {
	/// Reserve a range of new original variables
	pub fn new_var_range(&mut self, size: usize) -> VarRange {
		self.vars.next_original_range(size)
	}

	/// Number of variables issued so far (original and auxiliary)
	pub fn variables(&self) -> usize {
		self.vars.emited_vars()
	}

	/// Number of stored clauses
	pub fn clauses(&self) -> usize {
		self.size.len()
	}

	/// Total number of literal occurrences over all clauses
	pub fn literals(&self) -> usize {
		self.lits.len()
	}

	pub fn iter(&self) -> CnfIterator<'_> {
		CnfIterator {
			lits: &self.lits,
			size: self.size.iter(),
			index: 0,
		}
	}

	pub fn is_auxiliary(&self, var: Var) -> bool {
		self.vars.is_auxiliary(var)
	}

	/// Diagnostic label of an auxiliary variable
	pub fn label(&self, var: Var) -> Option<&Label> {
		self.vars.label(var)
	}

	pub fn original_vars(&self) -> impl Iterator<Item = Var> + '_ {
		self.all_vars().filter(|v| !self.is_auxiliary(*v))
	}

	pub fn auxiliary_vars(&self) -> impl Iterator<Item = Var> + '_ {
		self.all_vars().filter(|v| self.is_auxiliary(*v))
	}

	fn all_vars(&self) -> impl Iterator<Item = Var> {
		(1..=self.variables() as i32)
			.filter_map(NonZeroI32::new)
			.map(Var)
	}

	/// Remove every clause after the first `clauses`
	pub(crate) fn truncate(&mut self, clauses: usize) {
		if clauses >= self.size.len() {
			return;
		}
		let lits = self.size[..clauses].iter().sum();
		self.size.truncate(clauses);
		self.lits.truncate(lits);
	}

	/// Write the formula in DIMACS CNF format
	pub fn to_dimacs<W: Write>(&self, out: &mut W) -> io::Result<()> {
		writeln!(out, "p cnf {} {}", self.variables(), self.clauses())?;
		for cl in self.iter() {
			for lit in cl {
				write!(out, "{} ", i32::from(*lit))?;
			}
			writeln!(out, "0")?;
		}
		Ok(())
	}

	/// Read a formula in DIMACS CNF format. All variables are original
	/// variables of the resulting formula.
	pub fn from_dimacs<R: BufRead>(input: R) -> io::Result<Cnf> {
		let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidData, msg);

		let mut cnf = Cnf::default();
		let mut header: Option<(usize, usize)> = None;
		let mut cl = Vec::new();
		for line in input.lines() {
			let line = line?;
			let line = line.trim();
			if line.is_empty() || line.starts_with('c') || line.starts_with('%') {
				continue;
			}
			if let Some(rest) = line.strip_prefix('p') {
				let fields = rest.split_whitespace().collect::<Vec<_>>();
				if header.is_some() {
					return Err(invalid("duplicate problem line".to_owned()));
				}
				match fields.as_slice() {
					["cnf", vars, clauses] => {
						let vars = vars
							.parse::<usize>()
							.map_err(|e| invalid(format!("invalid variable count: {e}")))?;
						if vars > i32::MAX as usize {
							return Err(invalid(format!(
								"variable count {vars} exceeds the supported {}",
								i32::MAX
							)));
						}
						let clauses = clauses
							.parse::<usize>()
							.map_err(|e| invalid(format!("invalid clause count: {e}")))?;
						let _ = cnf.new_var_range(vars);
						header = Some((vars, clauses));
					}
					_ => return Err(invalid(format!("unsupported problem line `{line}`"))),
				}
				continue;
			}
			let Some((vars, _)) = header else {
				return Err(invalid("clause before problem line".to_owned()));
			};
			for tok in line.split_whitespace() {
				let lit = tok
					.parse::<i32>()
					.map_err(|e| invalid(format!("invalid literal `{tok}`: {e}")))?;
				match NonZeroI32::new(lit) {
					None => {
						// Clauses that turn out unsatisfiable are still stored
						let _ = cnf.add_clause(cl.drain(..));
					}
					Some(lit) => {
						if lit.unsigned_abs().get() as usize > vars {
							return Err(invalid(format!(
								"literal {lit} exceeds the declared {vars} variables"
							)));
						}
						cl.push(Lit(lit));
					}
				}
			}
		}
		if !cl.is_empty() {
			let _ = cnf.add_clause(cl);
		}
		match header {
			Some((_, clauses)) if clauses != cnf.clauses() => {
				tracing::warn!(
					declared = clauses,
					found = cnf.clauses(),
					"clause count does not match the problem line"
				);
			}
			None => return Err(invalid("missing problem line".to_owned())),
			_ => {}
		}
		Ok(cnf)
	}

	pub fn to_file(&self, path: &Path) -> io::Result<()> {
		let mut out = BufWriter::new(File::create(path)?);
		self.to_dimacs(&mut out)?;
		out.flush()
	}

	pub fn from_file(path: &Path) -> io::Result<Cnf> {
		Cnf::from_dimacs(BufReader::new(File::open(path)?))
	}
}

impl ClauseDatabase for Cnf {
	fn new_var(&mut self) -> Lit {
		self.vars.next_original().into()
	}

	fn new_aux_var(&mut self, ns: &Namespace) -> Lit {
		self.vars.fresh(ns).into()
	}

	fn add_clause<I: IntoIterator<Item = Lit>>(&mut self, cl: I) -> Result {
		let mut cl = cl.into_iter().collect::<Vec<_>>();
		cl.sort();
		cl.dedup();
		// Sorted by variable, so complementary literals are neighbours
		if cl.windows(2).any(|w| w[0].var() == w[1].var()) {
			return Ok(());
		}
		debug_assert!(cl.iter().all(|l| l.var().index() < self.variables()));
		let size = cl.len();
		self.lits.extend(cl);
		self.size.push(size);
		if size == 0 {
			Err(Unsatisfiable)
		} else {
			Ok(())
		}
	}
}

impl Display for Cnf {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut buf = Vec::new();
		self.to_dimacs(&mut buf).map_err(|_| fmt::Error)?;
		write!(f, "{}", String::from_utf8_lossy(&buf))
	}
}

/// Iterator over the clauses of a [`Cnf`]
#[derive(Debug)]
pub struct CnfIterator<'a> {
	lits: &'a [Lit],
	size: std::slice::Iter<'a, usize>,
	index: usize,
}

impl<'a> Iterator for CnfIterator<'a> {
	type Item = &'a [Lit];

	fn next(&mut self) -> Option<Self::Item> {
		let size = *self.size.next()?;
		let start = self.index;
		self.index += size;
		Some(&self.lits[start..self.index])
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.size.size_hint()
	}
}
