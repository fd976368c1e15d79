/*!
# Streaming XML 1.0 parsing with DTD processing

This crate reads XML 1.0 documents from byte streams and reports what it
finds, as it goes, to a [`Handler`] implementation: a callback interface in
the spirit of SAX.

## Features

* Encoding detection from byte order marks and the XML declaration, for
  UTF-8, UTF-16 (both byte orders), UCS-4 (all four byte orders),
  ISO-8859-1 and US-ASCII
* Internal and external DTD subsets, including conditional sections
* Expansion of general and parameter entities, internal and external
* Attribute defaulting and normalization according to the DTD
* Detailed reporting of declarations and content models
* Entity resolution through the handler
* Validity problems are reported, but do not stop the parse
* XML 1.0 only

Validation is not performed; the parser only reports the validity
constraints it needs to check anyway.

## Example

```
use rsax::{Handler, InputSource, Result};

#[derive(Default)]
struct Collect {
	names: Vec<String>,
	text: String,
}

impl Handler for Collect {
	fn start_element(&mut self, name: &str) -> Result<()> {
		self.names.push(name.to_string());
		Ok(())
	}

	fn characters(&mut self, text: &str) -> Result<()> {
		self.text.push_str(text);
		Ok(())
	}
}

let doc = "<!DOCTYPE hello [<!ENTITY who 'World'>]><hello>&who;!</hello>";
let mut handler = Collect::default();
rsax::parse(InputSource::from_str(doc), &mut handler).unwrap();
assert_eq!(handler.names, vec!["hello".to_string()]);
assert_eq!(handler.text, "World!");
```

## Entities and input sources

Every entity is read from an [`InputSource`]. When the document refers to an
external entity, [`Handler::resolve_entity`] decides where it is read from;
the default implementation opens `file:` URIs and plain paths. Returning
`None` skips the entity, which is then reported through
[`Handler::skipped_entity`].

## Errors

Fatal errors are reported to [`Handler::fatal_error`] and returned from
[`Parser::parse`]. Warnings and validity errors go to [`Handler::warning`]
and [`Handler::validity_error`]; the parse continues after them unless the
handler returns an error itself.
*/
pub mod dtd;
pub mod encoding;
mod errctx;
pub mod error;
pub mod handler;
mod input;
mod lexer;
pub mod parser;
pub mod symbols;
pub mod uri;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use dtd::{AttributeDecl, AttributeType, ContentType, DefaultMode, Dtd, ElementDecl, EntityDecl, EntityKind, ExternalId};
#[doc(inline)]
pub use encoding::Encoding;
#[doc(inline)]
pub use error::{Error, Location, Result, WFError};
#[doc(inline)]
pub use handler::{Attribute, Handler, InputSource, Occurrence};
#[doc(inline)]
pub use parser::{Parser, ParserOptions};
pub use symbols::{Sym, SymbolTable};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// Parse a single document with default options.
///
/// This is a shorthand for creating a [`Parser`] and calling
/// [`Parser::parse`] once.
pub fn parse<H: Handler + ?Sized>(source: InputSource, handler: &mut H) -> Result<()> {
	Parser::new(handler).parse(source)
}
