use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Replacement for the `#[test]` attribute that runs the test body with the
/// pbcnf `Tracer` installed as the default subscriber, printing the tree of
/// encoders, variables and clauses the test produces.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
	let ItemFn {
		attrs,
		vis,
		sig,
		block,
	} = parse_macro_input!(item as ItemFn);
	quote! {
		#[::core::prelude::v1::test]
		#(#attrs)*
		#vis #sig {
			let (tracer, _guard) = crate::trace::Tracer::new();
			tracing::subscriber::with_default(tracer, || #block)
		}
	}
	.into()
}
