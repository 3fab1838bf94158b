/// Helper macro to create a new auxiliary variable within an Encoder
macro_rules! new_var {
	($db:expr, $ns:expr) => {{
		let ns: &$crate::Namespace = &$ns;
		let var = $db.new_aux_var(ns);
		tracing::trace!(var = ?var, label = %ns, "new variable");
		var
	}};
}
pub(crate) use new_var;

/// Helper macro to emit a clause from within an encoder
macro_rules! emit_clause {
	($db:expr, $cl:expr) => {{
		let slice = $cl;
		let res = $db.add_clause(slice.iter().copied());
		tracing::trace!(clause = ?slice, fail = matches!(res, Err($crate::Unsatisfiable)), "emit clause");
		res
	}};
}
pub(crate) use emit_clause;

#[cfg(feature = "trace")]
mod subscriber {
	use std::{
		fmt,
		io::{stderr, BufWriter, Stderr, Write},
		sync::{
			atomic::{AtomicU64, Ordering},
			Arc, Mutex, MutexGuard,
		},
		time::Instant,
	};

	use itertools::join;
	use rustc_hash::FxHashMap;
	use tracing::{
		field::{Field, Visit},
		metadata::LevelFilter,
		span::{Attributes, Record},
		Event, Id, Metadata, Subscriber,
	};

	use super::subscript_number;

	/// A [`Subscriber`] that prints the encoding of every instrumented
	/// constraint as an indented tree of spans, ending each span with the
	/// number of variables and clauses it produced.
	#[derive(Debug)]
	pub struct Tracer {
		var_names: Mutex<FxHashMap<String, String>>,
		next_span_id: AtomicU64,
		stack: Mutex<Vec<SpanVisitor>>,
		out: Arc<Mutex<BufWriter<Stderr>>>,
	}

	impl Tracer {
		pub fn new() -> (Self, FlushGuard) {
			let tracer = Self {
				next_span_id: 1.into(),
				var_names: Default::default(),
				stack: Vec::new().into(),
				out: Arc::new(BufWriter::new(stderr()).into()),
			};
			let guard = tracer.flush_on_drop();
			(tracer, guard)
		}

		/// Returns a `FlushGuard` which will flush the `Tracer`'s writers when
		/// it is dropped, or when `flush` is manually invoked on the guard.
		pub fn flush_on_drop(&self) -> FlushGuard {
			FlushGuard {
				out: self.out.clone(),
			}
		}

		fn indented_output(&self, indent: usize, line: &str) {
			let mut out = lock(&self.out);
			// Output is best effort
			let _ = writeln!(out, "{}{line}", "│ ".repeat(indent));
		}
	}

	fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
		m.lock().unwrap_or_else(|e| e.into_inner())
	}

	#[derive(Debug)]
	pub struct FlushGuard {
		out: Arc<Mutex<BufWriter<Stderr>>>,
	}
	impl FlushGuard {
		pub fn flush(&self) {
			let _ = lock(&self.out).flush();
		}
	}

	impl Drop for FlushGuard {
		fn drop(&mut self) {
			self.flush();
		}
	}

	impl Subscriber for Tracer {
		fn enabled(&self, metadata: &Metadata<'_>) -> bool {
			if metadata.is_event() {
				let names = metadata.fields().iter().map(|f| f.name()).collect::<Vec<_>>();
				names.contains(&"message")
					&& (names.contains(&"var") || names.contains(&"clause"))
			} else {
				metadata.fields().field("constraint").is_some()
			}
		}

		fn new_span(&self, span: &Attributes<'_>) -> Id {
			let res = self.next_span_id.fetch_add(1, Ordering::Relaxed);
			let ident = Id::from_u64(res);
			let mut visitor = SpanVisitor::new(ident.clone(), span.metadata().name().into());
			span.record(&mut visitor);
			lock(&self.stack).push(visitor);
			ident
		}

		fn record(&self, _span: &Id, _values: &Record<'_>) {}

		fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

		fn event(&self, event: &Event<'_>) {
			let mut visitor = EventVisitor::default();
			event.record(&mut visitor);
			let Some(event) = visitor.recorded_event() else {
				return;
			};
			let mut stack = lock(&self.stack);
			let indent = stack.len();
			let Some(frame) = stack.last_mut() else {
				return;
			};
			match event {
				RecordedEvent::NewVar(var, name) => {
					frame.vars += 1;
					let _ = lock(&self.var_names).insert(var, name);
				}
				RecordedEvent::Clause(cl, fail) => {
					frame.clauses += 1;
					let var_names = lock(&self.var_names);
					let clause = join(
						cl.into_iter().map(|(neg, var)| {
							let mut label = var_names
								.get(&var)
								.cloned()
								.unwrap_or_else(|| pretty_print_var(&var));
							if neg {
								label.insert(0, '¬')
							};
							label
						}),
						" ∨ ",
					);
					drop(var_names);
					self.indented_output(indent, &clause);
					if fail {
						self.indented_output(indent, "├ UNSAT");
					}
				}
			}
		}

		fn enter(&self, span: &Id) {
			let mut stack = lock(&self.stack);
			let indent = stack.len().saturating_sub(1);
			let Some(visitor) = stack.iter_mut().rev().find(|v| &v.ident == span) else {
				return;
			};
			visitor.start = Some(Instant::now());
			let line = format!(
				"╭─╴{} {}",
				visitor.name,
				visitor.constraint.as_deref().unwrap_or_default()
			);
			drop(stack);
			self.indented_output(indent, &line);
		}

		fn exit(&self, span: &Id) {
			let mut stack = lock(&self.stack);
			let Some(pos) = stack.iter().rposition(|v| &v.ident == span) else {
				return;
			};
			let visitor = stack.remove(pos);
			let indent = stack.len();
			if let Some(parent) = stack.last_mut() {
				parent.vars += visitor.vars;
				parent.clauses += visitor.clauses;
			}
			drop(stack);
			if let Some(start) = visitor.start {
				self.indented_output(
					indent,
					&format!(
						"╰─╴time: {:?} vars: {} clauses: {}",
						start.elapsed(),
						visitor.vars,
						visitor.clauses
					),
				)
			}
		}

		fn max_level_hint(&self) -> Option<LevelFilter> {
			Some(LevelFilter::TRACE)
		}
	}

	#[derive(Debug, Default)]
	struct EventVisitor {
		kind: Option<EventKind>,
		var: Option<String>,
		label: Option<String>,
		clause: Option<String>,
		fail: Option<bool>,
	}

	#[derive(Debug)]
	enum EventKind {
		NewVar,
		Clause,
	}

	/// Debug output of a `Lit` is `Lit(5)`, print it as `x₅`
	fn pretty_print_var(var: &str) -> String {
		let digits = var.trim_start_matches("Lit(").trim_end_matches(')');
		match digits.parse::<usize>() {
			Ok(x) => std::iter::once('x').chain(subscript_number(x)).collect(),
			Err(_) => String::from(var),
		}
	}

	impl EventVisitor {
		fn recorded_event(self) -> Option<RecordedEvent> {
			match (self.kind?, self.var, self.clause) {
				(EventKind::NewVar, Some(var), _) => {
					let name = self.label.unwrap_or_else(|| pretty_print_var(&var));
					Some(RecordedEvent::NewVar(var, name))
				}
				(EventKind::Clause, _, Some(clause)) => {
					let braces: &[_] = &['[', ']'];
					let names = clause
						.trim_matches(braces)
						.split(',')
						.map(str::trim)
						.filter(|s| !s.is_empty())
						.map(|s| {
							let x = s.trim_start_matches("Lit(").trim_end_matches(')');
							let var = x.trim_start_matches('-');
							(var != x, format!("Lit({var})"))
						})
						.collect();
					Some(RecordedEvent::Clause(names, self.fail.unwrap_or(false)))
				}
				_ => None,
			}
		}
	}

	impl Visit for EventVisitor {
		fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
			let value = format!("{value:?}");
			match field.name() {
				"message" => match value.as_str() {
					"new variable" => self.kind = Some(EventKind::NewVar),
					"emit clause" => self.kind = Some(EventKind::Clause),
					_ => {}
				},
				"var" => self.var = Some(value),
				"label" => self.label = Some(value),
				"clause" => self.clause = Some(value),
				_ => {}
			}
		}
		fn record_bool(&mut self, field: &Field, value: bool) {
			if field.name() == "fail" {
				self.fail = Some(value)
			}
		}
	}

	enum RecordedEvent {
		NewVar(String, String),
		Clause(Vec<(bool, String)>, bool),
	}

	#[derive(Debug)]
	struct SpanVisitor {
		ident: Id,
		name: String,
		start: Option<Instant>,
		constraint: Option<String>,
		vars: usize,
		clauses: usize,
	}

	impl SpanVisitor {
		fn new(ident: Id, name: String) -> Self {
			Self {
				ident,
				name,
				start: None,
				constraint: None,
				vars: 0,
				clauses: 0,
			}
		}
	}

	impl Visit for SpanVisitor {
		fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
			if field.name() == "constraint" {
				self.constraint = Some(format!("{value:?}"))
			}
		}
		fn record_str(&mut self, field: &Field, value: &str) {
			if field.name() == "constraint" {
				self.constraint = Some(value.to_owned())
			}
		}
	}
}
#[cfg(feature = "trace")]
pub use subscriber::{FlushGuard, Tracer};

#[cfg(feature = "trace")]
pub(crate) fn subscript_number(num: usize) -> impl Iterator<Item = char> {
	num.to_string()
		.chars()
		.filter_map(|d| d.to_digit(10))
		.filter_map(|d| char::from_u32(0x2080 + d))
		.collect::<Vec<_>>()
		.into_iter()
}

/// Render a sum of weighted literals as `a·x₁ + b·x₂`
#[cfg(feature = "trace")]
pub(crate) fn trace_print_terms<'a>(
	terms: impl IntoIterator<Item = (&'a crate::Lit, crate::Coeff)>,
) -> String {
	itertools::join(
		terms.into_iter().map(|(l, c)| {
			if c == 1 {
				trace_print_lit(l)
			} else {
				format!("{c}·{}", trace_print_lit(l))
			}
		}),
		" + ",
	)
}

#[cfg(feature = "trace")]
pub(crate) fn trace_print_lit(l: &crate::Lit) -> String {
	format!(
		"{}x{}",
		if l.is_negated() { "¬" } else { "" },
		subscript_number(l.var().index() + 1).collect::<String>()
	)
}
