use std::{fmt, num::NonZeroI32, ops::RangeInclusive};

use rustc_hash::FxHashMap;

use crate::{ClauseDatabase, Lit, Result, Var};

/// Monotone source of fresh [`Var`]s.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VarFactory {
	pub(crate) next_var: Option<Var>,
}

impl VarFactory {
	const MAX_VARS: usize = NonZeroI32::MAX.get() as usize;

	/// Number of variables that have been handed out
	pub fn emited_vars(&self) -> usize {
		if let Some(x) = self.next_var {
			x.0.get() as usize - 1
		} else {
			Self::MAX_VARS
		}
	}

	/// Reserve `size` consecutive variables, or `None` when the pool cannot
	/// provide them.
	pub fn next_range(&mut self, size: usize) -> Option<VarRange> {
		let start = self.next_var?;
		if size == 0 {
			return Some(VarRange::empty());
		}
		let last = i32::try_from(size - 1)
			.ok()
			.and_then(|s| start.0.get().checked_add(s))
			.and_then(NonZeroI32::new)
			.map(Var)?;
		self.next_var = last.next_var();
		Some(VarRange::new(start, last))
	}
}

impl Default for VarFactory {
	fn default() -> Self {
		Self {
			next_var: Some(Var(NonZeroI32::new(1).expect("1 is non-zero"))),
		}
	}
}

impl Iterator for VarFactory {
	type Item = Var;

	fn next(&mut self) -> Option<Self::Item> {
		let var = self.next_var;
		if let Some(var) = var {
			self.next_var = var.next_var();
		}
		var
	}
}

/// A contiguous range of variables
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VarRange {
	start: Var,
	end: Var,
}

impl VarRange {
	fn new(start: Var, end: Var) -> Self {
		Self { start, end }
	}

	fn empty() -> Self {
		Self {
			start: Var(NonZeroI32::new(2).expect("2 is non-zero")),
			end: Var(NonZeroI32::new(1).expect("1 is non-zero")),
		}
	}

	pub fn len(&self) -> usize {
		let len = self.end.0.get() - self.start.0.get() + 1;
		len.max(0) as usize
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn iter_vars(&self) -> impl Iterator<Item = Var> {
		RangeInclusive::new(self.start.0.get(), self.end.0.get())
			.filter_map(NonZeroI32::new)
			.map(Var)
	}

	pub fn iter_lits(&self) -> impl Iterator<Item = Lit> {
		self.iter_vars().map(Lit::from)
	}
}

/// A hierarchical tag for auxiliary variables, displayed as `a/b/c`.
///
/// Namespaces are purely diagnostic: they tell which constraint (and which
/// position within its encoding) introduced a variable.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace {
	segments: Vec<String>,
}

impl Namespace {
	pub fn new(root: impl fmt::Display) -> Self {
		Self {
			segments: vec![root.to_string()],
		}
	}

	/// A namespace nested within `self`
	pub fn child(&self, segment: impl fmt::Display) -> Self {
		let mut segments = self.segments.clone();
		segments.push(segment.to_string());
		Self { segments }
	}

	/// Place all of `other`'s segments below `self`
	pub fn join(&self, other: &Namespace) -> Self {
		let mut segments = self.segments.clone();
		segments.extend(other.segments.iter().cloned());
		Self { segments }
	}

	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.segments.iter().map(String::as_str)
	}
}

impl fmt::Display for Namespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.segments.join("/"))
	}
}

/// The diagnostic name of an auxiliary variable: its namespace and its
/// position among the variables issued in that namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label {
	pub namespace: Namespace,
	pub index: u32,
}

impl fmt::Display for Label {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.namespace, self.index)
	}
}

/// Issues variables for a formula, tracking which ones are auxiliary.
#[derive(Clone, Debug, Default)]
pub struct VarAllocator {
	factory: VarFactory,
	counters: FxHashMap<Namespace, u32>,
	labels: FxHashMap<Var, Label>,
}

impl VarAllocator {
	/// A fresh original (caller-owned) variable
	pub fn next_original(&mut self) -> Var {
		self.factory.next().expect("exhausted variable pool")
	}

	/// A range of fresh original variables
	pub fn next_original_range(&mut self, size: usize) -> VarRange {
		self.factory
			.next_range(size)
			.expect("exhausted variable pool")
	}

	/// A fresh auxiliary variable labelled within `ns`
	pub fn fresh(&mut self, ns: &Namespace) -> Var {
		let var = self.factory.next().expect("exhausted variable pool");
		let counter = self.counters.entry(ns.clone()).or_default();
		let index = *counter;
		*counter += 1;
		let _ = self.labels.insert(
			var,
			Label {
				namespace: ns.clone(),
				index,
			},
		);
		var
	}

	pub fn emited_vars(&self) -> usize {
		self.factory.emited_vars()
	}

	pub fn is_auxiliary(&self, var: Var) -> bool {
		self.labels.contains_key(&var)
	}

	pub fn label(&self, var: Var) -> Option<&Label> {
		self.labels.get(&var)
	}

	/// Make sure that all variables up to and including `var` count as issued
	pub(crate) fn reserve_up_to(&mut self, var: Var) {
		while self.emited_vars() < var.0.get() as usize {
			let _ = self.next_original();
		}
	}
}

/// A [`ClauseDatabase`] adaptor that places the auxiliary variables of every
/// encoding run through it below a common namespace.
///
/// ```
/// # use pbcnf::{ClauseDatabase, Cnf, CardinalityOne, LimitComp, SequentialEncoder, Scoped};
/// let mut cnf = Cnf::default();
/// let xs = cnf.new_var_range(3).iter_lits().collect::<Vec<_>>();
/// let mut db = Scoped::new(&mut cnf, "assign_item_0");
/// db.encode(&CardinalityOne::new(xs, LimitComp::Equal), &SequentialEncoder::default())
/// 	.unwrap();
/// let aux = cnf.auxiliary_vars().next().unwrap();
/// assert!(cnf.label(aux).unwrap().to_string().starts_with("assign_item_0/"));
/// ```
#[derive(Debug)]
pub struct Scoped<'a, DB: ClauseDatabase> {
	db: &'a mut DB,
	prefix: Namespace,
}

impl<'a, DB: ClauseDatabase> Scoped<'a, DB> {
	pub fn new(db: &'a mut DB, scope: impl fmt::Display) -> Self {
		Self {
			db,
			prefix: Namespace::new(scope),
		}
	}
}

impl<'a, DB: ClauseDatabase> ClauseDatabase for Scoped<'a, DB> {
	fn new_var(&mut self) -> Lit {
		self.db.new_var()
	}
	fn new_aux_var(&mut self, ns: &Namespace) -> Lit {
		self.db.new_aux_var(&self.prefix.join(ns))
	}
	fn add_clause<I: IntoIterator<Item = Lit>>(&mut self, cl: I) -> Result {
		self.db.add_clause(cl)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_var_factory() {
		let mut factory = VarFactory::default();
		assert_eq!(factory.emited_vars(), 0);
		let range = factory.next_range(3).unwrap();
		assert_eq!(range.len(), 3);
		assert_eq!(
			range.iter_lits().map(i32::from).collect::<Vec<_>>(),
			vec![1, 2, 3]
		);
		assert_eq!(factory.next().map(i32::from), Some(4));
		assert_eq!(factory.emited_vars(), 4);
		assert!(factory.next_range(0).unwrap().is_empty());
		assert_eq!(factory.emited_vars(), 4);
	}

	#[test]
	fn test_fresh_never_collides() {
		let mut alloc = VarAllocator::default();
		let ns = Namespace::new("amo").child(0);
		let a = alloc.fresh(&ns);
		let b = alloc.fresh(&ns);
		let c = alloc.fresh(&Namespace::new("amo").child(0));
		assert_ne!(a, b);
		assert_ne!(b, c);
		assert_eq!(alloc.label(a).unwrap().to_string(), "amo/0#0");
		assert_eq!(alloc.label(b).unwrap().index, 1);
		assert_eq!(alloc.label(c).unwrap().index, 2);
		assert!(alloc.is_auxiliary(a));

		let x = alloc.next_original();
		assert!(!alloc.is_auxiliary(x));
		assert_eq!(alloc.label(x), None);
	}

	#[test]
	fn test_namespace_join() {
		let ns = Namespace::new("load_courier_0").join(&Namespace::new("swc").child(2));
		assert_eq!(ns.to_string(), "load_courier_0/swc/2");
		assert_eq!(ns.segments().count(), 3);
	}
}
