use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Error, Ident, LitStr, Result, Token, parse_macro_input};

struct CatalogInput {
	entries: Vec<ActionEntry>,
}

struct ActionEntry {
	variant: Ident,
	wire: LitStr,
	tool: LitStr,
	description: LitStr,
}

impl Parse for CatalogInput {
	fn parse(input: ParseStream<'_>) -> Result<Self> {
		let mut entries = Vec::new();
		while !input.is_empty() {
			entries.push(input.parse::<ActionEntry>()?);
			if input.peek(Token![;]) {
				input.parse::<Token![;]>()?;
			}
		}

		if entries.is_empty() {
			return Err(Error::new(proc_macro2::Span::call_site(), "action_catalog! requires at least one entry"));
		}

		Ok(Self { entries })
	}
}

impl Parse for ActionEntry {
	fn parse(input: ParseStream<'_>) -> Result<Self> {
		let variant: Ident = input.parse()?;
		input.parse::<Token![=>]>()?;

		let mut wire: Option<LitStr> = None;
		let mut tool: Option<LitStr> = None;
		let mut description: Option<LitStr> = None;

		loop {
			let key: Ident = input.parse()?;
			input.parse::<Token![:]>()?;

			match key.to_string().as_str() {
				"wire" => {
					if wire.is_some() {
						return Err(Error::new(key.span(), "duplicate 'wire' field"));
					}
					wire = Some(input.parse()?);
				}
				"tool" => {
					if tool.is_some() {
						return Err(Error::new(key.span(), "duplicate 'tool' field"));
					}
					tool = Some(input.parse()?);
				}
				"description" => {
					if description.is_some() {
						return Err(Error::new(key.span(), "duplicate 'description' field"));
					}
					description = Some(input.parse()?);
				}
				other => {
					return Err(Error::new(key.span(), format!("unsupported action field '{other}', expected wire/tool/description")));
				}
			}

			if input.peek(Token![,]) {
				input.parse::<Token![,]>()?;
			} else {
				break;
			}
		}

		let wire = wire.ok_or_else(|| Error::new(variant.span(), "missing required field 'wire'"))?;
		let tool = tool.ok_or_else(|| Error::new(variant.span(), "missing required field 'tool'"))?;
		let description = description.ok_or_else(|| Error::new(variant.span(), "missing required field 'description'"))?;

		Ok(Self { variant, wire, tool, description })
	}
}

/// Expands a fixed action vocabulary into an `Action` enum plus the total
/// tool-name -> action mapping table described by spec note "Dynamic
/// dispatch on `action`": a tagged variant with a declared per-variant
/// schema, rejecting unknown tags at the boundary.
#[proc_macro]
pub fn action_catalog(input: TokenStream) -> TokenStream {
	let catalog = parse_macro_input!(input as CatalogInput);

	let variants = catalog.entries.iter().map(|e| &e.variant);

	let wire_arms = catalog.entries.iter().map(|e| {
		let variant = &e.variant;
		let wire = &e.wire;
		quote! { Action::#variant => #wire }
	});

	let from_wire_arms = catalog.entries.iter().map(|e| {
		let variant = &e.variant;
		let wire = &e.wire;
		quote! { #wire => Some(Action::#variant) }
	});

	let tool_arms = catalog.entries.iter().map(|e| {
		let variant = &e.variant;
		let tool = &e.tool;
		quote! { Action::#variant => #tool }
	});

	let action_for_tool_arms = catalog.entries.iter().map(|e| {
		let variant = &e.variant;
		let tool = &e.tool;
		quote! { #tool => Some(Action::#variant) }
	});

	let spec_rows = catalog.entries.iter().map(|e| {
		let variant = &e.variant;
		let wire = &e.wire;
		let tool = &e.tool;
		let description = &e.description;
		quote! {
			ActionSpec {
				action: Action::#variant,
				wire: #wire,
				tool: #tool,
				description: #description,
			}
		}
	});

	TokenStream::from(quote! {
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
		pub enum Action {
			#(#variants),*
		}

		#[derive(Debug, Clone, Copy)]
		pub struct ActionSpec {
			pub action: Action,
			pub wire: &'static str,
			pub tool: &'static str,
			pub description: &'static str,
		}

		pub const ACTION_CATALOG: &[ActionSpec] = &[
			#(#spec_rows),*
		];

		impl Action {
			/// The wire-form string carried in REQUEST.action (spec §3).
			pub fn wire_name(self) -> &'static str {
				match self {
					#(#wire_arms),*
				}
			}

			/// Parse a wire-form action string. Unknown strings are a
			/// structured error at the boundary, never a panic (spec §9).
			pub fn from_wire(s: &str) -> Option<Action> {
				match s {
					#(#from_wire_arms,)*
					_ => None,
				}
			}

			/// The MCP tool name this action is reached through.
			pub fn tool_name(self) -> &'static str {
				match self {
					#(#tool_arms),*
				}
			}

			/// The helper's name -> action translation table (spec §4.4):
			/// total, fixed, compile-time.
			pub fn for_tool(tool_name: &str) -> Option<Action> {
				match tool_name {
					#(#action_for_tool_arms,)*
					_ => None,
				}
			}
		}

		pub fn all_actions() -> &'static [ActionSpec] {
			ACTION_CATALOG
		}

		impl serde::Serialize for Action {
			fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
			where
				S: serde::Serializer,
			{
				serializer.serialize_str(self.wire_name())
			}
		}

		impl<'de> serde::Deserialize<'de> for Action {
			fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
			where
				D: serde::Deserializer<'de>,
			{
				let raw = String::deserialize(deserializer)?;
				Action::from_wire(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown action '{raw}'")))
			}
		}
	})
}
