/*!
# Recursive-descent XML 1.0 parser

[`Parser`] reads a document entity (and every entity it references) and
reports what it finds to a [`Handler`]. The grammar productions live in the
submodules:

* `stack`: opening, entering and leaving entities, encoding declarations
* `prolog`: document structure, XML and text declarations, the DOCTYPE and
  the markup declarations dispatch, comments and processing instructions
* `decl`: element, attribute-list, entity and notation declarations
* `content`: elements, attributes, character data and references
*/
use log::debug;

use crate::dtd::{ContentType, Dtd, EntityDecl, EntityKind};
use crate::encoding::Encoding;
use crate::error::{Location, Result};
use crate::handler::{Handler, InputSource};
use crate::input::{EntityBoundary, Frame};
use crate::lexer::Scratchpad;
use crate::symbols::{Sym, SymbolTable};

mod content;
mod decl;
mod prolog;
mod stack;

/// Name under which the document entity is reported.
pub const DOCUMENT_ENTITY: &'static str = "[document]";
/// Name under which the external DTD subset is reported.
pub const DTD_ENTITY: &'static str = "[dtd]";

const PREDECLARED: &'static [(&'static str, &'static str)] = &[
	("amp", "&#38;"),
	("lt", "&#60;"),
	("gt", "&#62;"),
	("apos", "&#39;"),
	("quot", "&#34;"),
];

/// Hold options to configure a [`Parser`].
///
/// See also [`Parser::with_options()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
	/// Namespace processing is done by the handler; duplicate attribute
	/// names are then left for it to detect, since only expanded names must
	/// be unique.
	pub namespaces: bool,
	/// Accept names with leading or multiple colons.
	pub xml_names: bool,
	/// Report system identifiers in declarations absolutized against the
	/// base URI of the declaring entity.
	pub resolve_dtd_uris: bool,
	/// Number of bytes requested from a reader at once.
	pub read_buffer_size: usize,
}

impl ParserOptions {
	/// Set the [`ParserOptions::namespaces`] value.
	///
	/// # Example
	///
	/// ```
	/// use rsax::{Handler, Parser, ParserOptions};
	/// struct Nop;
	/// impl Handler for Nop {}
	/// let mut h = Nop;
	/// let parser = Parser::with_options(&mut h, ParserOptions::default().namespaces(true));
	/// ```
	pub fn namespaces(mut self, v: bool) -> ParserOptions {
		self.namespaces = v;
		self
	}

	/// Set the [`ParserOptions::xml_names`] value.
	pub fn xml_names(mut self, v: bool) -> ParserOptions {
		self.xml_names = v;
		self
	}

	/// Set the [`ParserOptions::resolve_dtd_uris`] value.
	pub fn resolve_dtd_uris(mut self, v: bool) -> ParserOptions {
		self.resolve_dtd_uris = v;
		self
	}

	/// Set the [`ParserOptions::read_buffer_size`] value.
	pub fn read_buffer_size(mut self, v: usize) -> ParserOptions {
		self.read_buffer_size = v.max(1);
		self
	}
}

impl Default for ParserOptions {
	fn default() -> Self {
		Self{
			namespaces: false,
			xml_names: false,
			resolve_dtd_uris: true,
			read_buffer_size: 16384,
		}
	}
}

/**
# XML 1.0 parser with DTD processing

The parser borrows its [`Handler`] for its whole lifetime. It can be used for
any number of documents in sequence; all per-document state (symbols, DTD,
input stack) is reset at the start of [`Parser::parse`].

After a parse, successful or not, the queries ([`Parser::dtd`],
[`Parser::encoding`], ...) describe the document that was read last.
*/
pub struct Parser<'h, H: Handler + ?Sized> {
	pub(crate) handler: &'h mut H,
	pub(crate) opts: ParserOptions,
	pub(crate) symbols: SymbolTable,
	pub(crate) dtd: Dtd,

	/// Active input frame.
	pub(crate) cur: Frame,
	/// Suspended frames, innermost last.
	pub(crate) stack: Vec<Frame>,
	pub(crate) next_frame_id: u64,

	/// Pending character data, literal values and comment/PI text.
	pub(crate) data: Scratchpad,
	pub(crate) name_buf: Scratchpad,

	pub(crate) boundary: EntityBoundary,
	pub(crate) expand_pe: bool,
	pub(crate) do_report: bool,
	pub(crate) in_literal: bool,
	pub(crate) in_cdata: bool,
	pub(crate) allow_colon: bool,
	/// An external entity (other than the document) was entered or skipped.
	pub(crate) has_ext_entity: bool,

	pub(crate) standalone: Option<bool>,
	pub(crate) xml_version: Option<String>,
	pub(crate) declared_encoding: Option<String>,
	pub(crate) document_encoding: Option<Encoding>,

	pub(crate) current_element: Option<Sym>,
	pub(crate) current_content: ContentType,
	/// Names of the attributes specified on the current start tag.
	pub(crate) tag_attributes: Vec<Sym>,
}

impl<'h, H: Handler + ?Sized> Parser<'h, H> {
	/// Create a parser with default options.
	pub fn new(handler: &'h mut H) -> Self {
		Self::with_options(handler, ParserOptions::default())
	}

	pub fn with_options(handler: &'h mut H, options: ParserOptions) -> Self {
		Self{
			handler,
			opts: options,
			symbols: SymbolTable::new(),
			dtd: Dtd::new(),
			cur: Frame::empty(),
			stack: Vec::new(),
			next_frame_id: 1,
			data: Scratchpad::with_capacity(1024),
			name_buf: Scratchpad::with_capacity(64),
			boundary: EntityBoundary::Enabled,
			expand_pe: false,
			do_report: true,
			in_literal: false,
			in_cdata: false,
			allow_colon: true,
			has_ext_entity: false,
			standalone: None,
			xml_version: None,
			declared_encoding: None,
			document_encoding: None,
			current_element: None,
			current_content: ContentType::Undeclared,
			tag_attributes: Vec::new(),
		}
	}

	pub fn options(&self) -> &ParserOptions {
		&self.opts
	}

	/// Declarations of the document read last.
	pub fn dtd(&self) -> &Dtd {
		&self.dtd
	}

	/// Names behind the [`Sym`] handles in [`Parser::dtd`].
	pub fn symbols(&self) -> &SymbolTable {
		&self.symbols
	}

	/// Declared content type of an element type, by name.
	pub fn content_type(&self, element: &str) -> ContentType {
		match self.symbols.lookup(element) {
			Some(sym) => self.dtd.content_type(sym),
			None => ContentType::Undeclared,
		}
	}

	/// The encoding declared by the document, or else the detected one.
	pub fn encoding(&self) -> Option<&str> {
		match self.declared_encoding.as_ref() {
			Some(label) => Some(label.as_str()),
			None => self.document_encoding.map(|e| e.name()),
		}
	}

	pub fn xml_version(&self) -> &str {
		self.xml_version.as_deref().unwrap_or("1.0")
	}

	/// True if the XML declaration says `standalone='yes'`.
	pub fn is_standalone(&self) -> bool {
		self.standalone.unwrap_or(false)
	}

	/// System identifier of the innermost external entity being read.
	pub(crate) fn base_uri(&self) -> Option<&str> {
		if let Some(id) = self.cur.system_id.as_ref() {
			return Some(id.as_str())
		}
		self.stack.iter().rev().find_map(|f| f.system_id.as_deref())
	}

	/// Current position in the active entity.
	pub fn location(&self) -> Location {
		Location{
			system_id: self.base_uri().map(String::from),
			line: self.cur.line,
			column: self.cur.column,
		}
	}

	pub(crate) fn warning(&mut self, msg: &str) -> Result<()> {
		let loc = self.location();
		self.handler.warning(msg, &loc)
	}

	pub(crate) fn validity_error(&mut self, msg: &str) -> Result<()> {
		let loc = self.location();
		self.handler.validity_error(msg, &loc)
	}

	/// Report pending character data. Literal values are never reported.
	pub(crate) fn flush_data(&mut self) -> Result<()> {
		if self.data.is_empty() || self.in_literal {
			return Ok(())
		}
		if self.current_content == ContentType::Elements && !self.in_cdata {
			let text = self.data.take_from(0);
			if text.chars().all(rsax_validation::is_space) {
				self.handler.ignorable_whitespace(&text)
			} else {
				self.handler.characters(&text)
			}
		} else if self.current_element.is_some() {
			let text = self.data.take_from(0);
			self.handler.characters(&text)
		} else {
			Ok(())
		}
	}

	fn reset(&mut self) {
		self.symbols.clear();
		self.dtd.clear();
		self.cur = Frame::empty();
		self.stack.clear();
		self.data.clear();
		self.name_buf.clear();
		self.boundary = EntityBoundary::Enabled;
		self.expand_pe = false;
		self.do_report = true;
		self.in_literal = false;
		self.in_cdata = false;
		self.allow_colon = true;
		self.has_ext_entity = false;
		self.standalone = None;
		self.xml_version = None;
		self.declared_encoding = None;
		self.document_encoding = None;
		self.current_element = None;
		self.current_content = ContentType::Undeclared;
		self.tag_attributes.clear();
	}

	fn predeclare_entities(&mut self) {
		for (name, value) in PREDECLARED.iter() {
			let sym = self.symbols.intern_str(name);
			self.dtd.declare_entity(sym, EntityDecl{
				kind: EntityKind::Internal((*value).to_string()),
				declared_externally: false,
			});
		}
	}

	fn parse_document_entity(&mut self, source: InputSource) -> Result<()> {
		self.predeclare_entities();
		let name = self.symbols.intern_str(DOCUMENT_ENTITY);
		let id = crate::dtd::ExternalId{
			public_id: source.public_id.clone(),
			system_id: source.system_id.clone(),
			base_uri: None,
		};
		self.push_external(false, name, &id, Some(source))?;
		self.parse_document()?;
		self.handler.end_document()
	}

	/**
	Parse one document.

	On failure, the error (annotated with the position where it occured)
	is first passed to [`Handler::fatal_error`] and then returned. Every
	entity opened during the parse is closed before this returns.
	*/
	pub fn parse(&mut self, source: InputSource) -> Result<()> {
		self.reset();
		debug!("parsing {}", source.system_id.as_deref().unwrap_or("<anonymous>"));
		let result = self.parse_document_entity(source);
		let result = match result {
			Ok(()) => Ok(()),
			Err(e) => {
				let e = e.at(self.location());
				self.handler.fatal_error(&e);
				Err(e)
			}
		};
		// drops (and thereby closes) whatever is still open
		self.cur = Frame::empty();
		self.stack.clear();
		result
	}
}
