/*!
# Event handler interface

The parser reports everything it sees to a [`Handler`]. All methods have
no-op default implementations, so an implementation only needs to override
the events it is interested in.

Every callback returns a [`Result`]. Returning an error (typically
[`Error::aborted`](crate::Error::aborted)) stops the parse: the error is
propagated to the caller of [`Parser::parse`](crate::Parser::parse)
unchanged, apart from the position annotation.
*/
use std::fmt;
use std::io;

use crate::dtd::ExternalId;
use crate::error::{Error, Location, Result};
use crate::uri;

/// Occurrence indicator of a content particle or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
	/// No indicator.
	Once,
	/// `?`
	Optional,
	/// `*`
	ZeroOrMore,
	/// `+`
	OneOrMore,
}

impl Occurrence {
	pub fn from_char(c: char) -> Option<Occurrence> {
		match c {
			'?' => Some(Self::Optional),
			'*' => Some(Self::ZeroOrMore),
			'+' => Some(Self::OneOrMore),
			_ => None,
		}
	}

	pub fn as_char(&self) -> Option<char> {
		match self {
			Self::Once => None,
			Self::Optional => Some('?'),
			Self::ZeroOrMore => Some('*'),
			Self::OneOrMore => Some('+'),
		}
	}
}

/// An attribute of an element, as passed to [`Handler::attribute`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<'a> {
	pub name: &'a str,
	/// Value after entity expansion and normalization.
	pub value: &'a str,
	/// False if the value comes from a default in the DTD.
	pub specified: bool,
	/// True if the attribute was declared with type `ID`.
	pub is_id: bool,
	/// Line and column of the attribute name, for specified attributes.
	pub position: Option<(u64, u64)>,
}

enum Body {
	None,
	Bytes(Box<dyn io::Read>),
	Text(Box<dyn io::Read>),
}

/**
# Source of an entity

Either a byte stream (the encoding is detected), a character stream (UTF-8
text; encoding declarations are parsed but ignored), or neither, in which
case the parser opens the system identifier itself.
*/
pub struct InputSource {
	pub system_id: Option<String>,
	pub public_id: Option<String>,
	/// Encoding hint from outside the document, e.g. a MIME charset.
	pub encoding: Option<String>,
	body: Body,
}

impl InputSource {
	fn with_body(body: Body) -> InputSource {
		InputSource{
			system_id: None,
			public_id: None,
			encoding: None,
			body,
		}
	}

	/// Read bytes from `r`, detecting their encoding.
	pub fn from_reader<R: io::Read + 'static>(r: R) -> InputSource {
		Self::with_body(Body::Bytes(Box::new(r)))
	}

	/// Read UTF-8 text from `r` without encoding detection.
	pub fn from_text_reader<R: io::Read + 'static>(r: R) -> InputSource {
		Self::with_body(Body::Text(Box::new(r)))
	}

	/// Parse an in-memory byte buffer.
	pub fn from_bytes<T: Into<Vec<u8>>>(bytes: T) -> InputSource {
		Self::from_reader(io::Cursor::new(bytes.into()))
	}

	/// Parse an in-memory string.
	pub fn from_str(s: &str) -> InputSource {
		Self::from_text_reader(io::Cursor::new(s.as_bytes().to_vec()))
	}

	/// Open the given system identifier when parsing starts.
	pub fn from_system_id<T: Into<String>>(system_id: T) -> InputSource {
		Self::with_body(Body::None).with_system_id(system_id)
	}

	/// Refer to an external identifier (used by the default entity
	/// resolver).
	pub fn from_external_id(id: &ExternalId) -> InputSource {
		let mut src = Self::with_body(Body::None);
		src.system_id = id.system_id.clone();
		src.public_id = id.public_id.clone();
		src
	}

	pub fn with_system_id<T: Into<String>>(mut self, system_id: T) -> InputSource {
		self.system_id = Some(system_id.into());
		self
	}

	pub fn with_public_id<T: Into<String>>(mut self, public_id: T) -> InputSource {
		self.public_id = Some(public_id.into());
		self
	}

	pub fn with_encoding<T: Into<String>>(mut self, encoding: T) -> InputSource {
		self.encoding = Some(encoding.into());
		self
	}

	/// Take the reader out of the source, opening the system identifier if
	/// no reader was supplied. The boolean is true for character streams.
	pub(crate) fn open(self) -> Result<(Box<dyn io::Read>, bool, Option<String>, Option<String>)> {
		let InputSource{system_id, encoding, body, ..} = self;
		match body {
			Body::Bytes(r) => Ok((r, false, system_id, encoding)),
			Body::Text(r) => Ok((r, true, system_id, encoding)),
			Body::None => {
				let id = match system_id.as_ref() {
					Some(id) => id,
					None => return Err(Error::io(io::Error::new(
						io::ErrorKind::InvalidInput,
						"input source has neither a reader nor a system identifier",
					))),
				};
				let path = match uri::to_file_path(id) {
					Some(p) => p,
					None => return Err(Error::io(io::Error::new(
						io::ErrorKind::Unsupported,
						format!("cannot open {}: only file system identifiers are supported", id),
					))),
				};
				let f = std::fs::File::open(path)?;
				Ok((Box::new(io::BufReader::new(f)), false, system_id, encoding))
			}
		}
	}
}

impl fmt::Debug for InputSource {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		let body = match self.body {
			Body::None => "none",
			Body::Bytes(_) => "bytes",
			Body::Text(_) => "text",
		};
		f.debug_struct("InputSource")
			.field("system_id", &self.system_id)
			.field("public_id", &self.public_id)
			.field("encoding", &self.encoding)
			.field("body", &body)
			.finish()
	}
}

/**
# Receiver of parse events

Events arrive in document order. Entity names are reported as written in the
DTD, with parameter entities prefixed by `%`. The pseudo-entities
`[document]` and `[dtd]` stand for the document entity and the external
subset.
*/
#[allow(unused_variables)]
pub trait Handler {
	fn start_document(&mut self) -> Result<()> {
		Ok(())
	}

	/// Only reported after a successful parse.
	fn end_document(&mut self) -> Result<()> {
		Ok(())
	}

	fn xml_declaration(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) -> Result<()> {
		Ok(())
	}

	fn doctype_decl(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Result<()> {
		Ok(())
	}

	fn end_doctype(&mut self) -> Result<()> {
		Ok(())
	}

	/// Called before the start of an element is reported.
	fn push_context(&mut self) -> Result<()> {
		Ok(())
	}

	/// Called after the matching [`Handler::end_element`].
	fn pop_context(&mut self) -> Result<()> {
		Ok(())
	}

	/// Called once the whole start tag has been read. The specified and
	/// defaulted attributes of the element follow through
	/// [`Handler::attribute`].
	fn start_element(&mut self, name: &str) -> Result<()> {
		Ok(())
	}

	fn end_element(&mut self, name: &str) -> Result<()> {
		Ok(())
	}

	fn attribute(&mut self, attr: &Attribute<'_>) -> Result<()> {
		Ok(())
	}

	/// Character data. A run of text may be split over several calls.
	fn characters(&mut self, text: &str) -> Result<()> {
		Ok(())
	}

	/// Whitespace in element-only content.
	fn ignorable_whitespace(&mut self, text: &str) -> Result<()> {
		Ok(())
	}

	fn start_cdata(&mut self) -> Result<()> {
		Ok(())
	}

	fn end_cdata(&mut self) -> Result<()> {
		Ok(())
	}

	fn comment(&mut self, text: &str) -> Result<()> {
		Ok(())
	}

	fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
		Ok(())
	}

	fn element_decl(&mut self, name: &str, model: &str) -> Result<()> {
		Ok(())
	}

	/// `mode` is one of `#IMPLIED`, `#REQUIRED`, `#FIXED` or `None` for a
	/// plain default.
	fn attribute_decl(&mut self, element: &str, name: &str, ty: &str, mode: Option<&str>, value: Option<&str>) -> Result<()> {
		Ok(())
	}

	fn internal_entity_decl(&mut self, name: &str, value: &str) -> Result<()> {
		Ok(())
	}

	fn external_entity_decl(&mut self, name: &str, id: &ExternalId) -> Result<()> {
		Ok(())
	}

	fn unparsed_entity_decl(&mut self, name: &str, id: &ExternalId, notation: &str) -> Result<()> {
		Ok(())
	}

	fn notation_decl(&mut self, name: &str, id: &ExternalId) -> Result<()> {
		Ok(())
	}

	fn start_content_model(&mut self, name: &str) -> Result<()> {
		Ok(())
	}

	fn end_content_model(&mut self) -> Result<()> {
		Ok(())
	}

	fn content_model_empty(&mut self) -> Result<()> {
		Ok(())
	}

	fn content_model_any(&mut self) -> Result<()> {
		Ok(())
	}

	fn content_model_start_group(&mut self) -> Result<()> {
		Ok(())
	}

	fn content_model_end_group(&mut self, occurrence: Occurrence) -> Result<()> {
		Ok(())
	}

	fn content_model_sequence(&mut self) -> Result<()> {
		Ok(())
	}

	fn content_model_choice(&mut self) -> Result<()> {
		Ok(())
	}

	fn content_model_mixed(&mut self) -> Result<()> {
		Ok(())
	}

	fn content_model_particle(&mut self, name: &str, occurrence: Occurrence) -> Result<()> {
		Ok(())
	}

	fn start_external_entity(&mut self, name: &str, system_id: Option<&str>, is_document: bool) -> Result<()> {
		Ok(())
	}

	fn end_external_entity(&mut self, name: &str) -> Result<()> {
		Ok(())
	}

	fn start_internal_entity(&mut self, name: &str) -> Result<()> {
		Ok(())
	}

	fn end_internal_entity(&mut self, name: &str) -> Result<()> {
		Ok(())
	}

	fn skipped_entity(&mut self, name: &str) -> Result<()> {
		Ok(())
	}

	/**
	Provide the source for an external entity.

	`id` carries the identifiers with the system id already absolutized.
	Returning `Ok(None)` skips the entity: the parser warns, reports
	[`Handler::skipped_entity`] and carries on without it.

	The default opens the system identifier.
	*/
	fn resolve_entity(&mut self, is_parameter_entity: bool, name: &str, id: &ExternalId, base_uri: Option<&str>) -> Result<Option<InputSource>> {
		Ok(Some(InputSource::from_external_id(id)))
	}

	/// Provide an external subset for a document which has none.
	fn get_external_subset(&mut self, root: &str, base_uri: Option<&str>) -> Result<Option<InputSource>> {
		Ok(None)
	}

	/// Resolve a system identifier against a base URI.
	///
	/// `mandatory` is true where an unresolvable identifier makes the
	/// reference unusable.
	fn absolutize(&mut self, base_uri: Option<&str>, system_id: &str, mandatory: bool) -> Result<String> {
		Ok(uri::resolve(base_uri, system_id))
	}

	fn warning(&mut self, message: &str, location: &Location) -> Result<()> {
		Ok(())
	}

	/// A validity constraint was violated; parsing continues.
	fn validity_error(&mut self, message: &str, location: &Location) -> Result<()> {
		Ok(())
	}

	/// The parse is about to fail with `error`.
	fn fatal_error(&mut self, error: &Error) {}
}
