/*!
# Error types

This module holds the error types returned by the parser and passed to
[`Handler::fatal_error`](crate::Handler::fatal_error).
*/
use std::error;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::sync::Arc;

use rsax_validation::Error as ValidationError;

pub use crate::errctx::*;

/// Violation of a well-formedness constraint or the XML 1.0 grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum WFError {
	/// End-of-file encountered during a construct where more data was
	/// expected.
	///
	/// The contents are implementation details.
	InvalidEof(&'static str),

	/// Unicode codepoint which is not allowed in XML 1.0 encountered.
	///
	/// The boolean is true if the codepoint was produced by a character
	/// reference.
	InvalidChar(&'static str, u32, bool),

	/// Unicode codepoint which was not expected at that point in the
	/// grammar, optionally with the text which was expected instead.
	UnexpectedChar(&'static str, char, Option<&'static str>),

	/// Generalized invalid syntactic construct which does not fit into any
	/// of the other categories.
	InvalidSyntax(&'static str),

	/// Reference to a general entity which has not been declared.
	UndeclaredEntity(String),

	/// An entity refers to itself, directly or indirectly.
	RecursiveEntity(String),

	/// Reference to an unparsed (`NDATA`) entity in content.
	UnparsedEntityReference(String),

	/// Reference to an external parsed entity inside an attribute value.
	ExternalEntityInAttribute(String),

	/// A standalone document relies on an externally declared entity.
	StandaloneViolation(String),

	/// A construct which must be contained in a single entity crossed an
	/// entity boundary. The string names the interrupted production.
	EntityBoundary(&'static str),

	/// An entity's replacement text ended while one of the elements it
	/// started was still open.
	UnbalancedEntity(String),

	/// An entity's replacement text closed an element it did not open.
	UnbalancedEndTag,

	/// Attribute was specified multiple times in the same element.
	DuplicateAttribute(String),

	/// Ending tag name does not match opening tag (expected, found).
	ElementMismatch(String, String),

	/// The XML declaration names a version other than 1.0.
	UnsupportedVersion(String),

	/// The encoding declaration does not match the EncName production.
	InvalidEncodingName(String),

	/// The declared encoding cannot be used for the detected byte layout.
	InvalidEncodingSwitch(&'static str, String),

	/// The standalone declaration is neither `yes` nor `no`.
	InvalidStandalone(String),

	/// Processing instruction target which is reserved (`xml` in any case).
	ReservedTarget(String),

	/// Character which is not a PubidChar inside a public identifier.
	InvalidPubidChar(char),
}

impl error::Error for WFError {}

impl fmt::Display for WFError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			WFError::InvalidEof(ctx) => write!(f, "invalid eof {}", ctx),
			WFError::InvalidChar(ctx, cp, false) => {
				write!(f, "invalid codepoint U+{:04x} {}", cp, ctx)
			}
			WFError::InvalidChar(ctx, cp, true) => write!(
				f,
				"character reference expanded to invalid codepoint U+{:04x} {}",
				cp, ctx
			),
			WFError::UnexpectedChar(ctx, ch, Some(expected)) => write!(
				f,
				"U+{:04x} not allowed {} (found {:?}, expected {:?})",
				*ch as u32, ctx, ch, expected
			),
			WFError::UnexpectedChar(ctx, ch, None) => {
				write!(f, "U+{:04x} not allowed {} (found {:?})", *ch as u32, ctx, ch)
			}
			WFError::InvalidSyntax(msg) => write!(f, "invalid syntax: {}", msg),
			WFError::UndeclaredEntity(name) => {
				write!(f, "reference to undeclared general entity {}", name)
			}
			WFError::RecursiveEntity(name) => write!(f, "recursive reference to entity {}", name),
			WFError::UnparsedEntityReference(name) => {
				write!(f, "reference to unparsed entity {}", name)
			}
			WFError::ExternalEntityInAttribute(name) => {
				write!(f, "reference to external entity {} in attribute value", name)
			}
			WFError::StandaloneViolation(name) => write!(
				f,
				"standalone document refers to externally declared entity {}",
				name
			),
			WFError::EntityBoundary(production) => write!(
				f,
				"entity boundary crossed during the parse of {}",
				production
			),
			WFError::UnbalancedEntity(name) => {
				write!(f, "end of entity {} encountered before end tag", name)
			}
			WFError::UnbalancedEndTag => f.write_str("entity begins with end tag"),
			WFError::DuplicateAttribute(name) => write!(f, "duplicate attribute {}", name),
			WFError::ElementMismatch(expected, found) => write!(
				f,
				"start and end tag do not match (found {:?}, expected {:?})",
				found, expected
			),
			WFError::UnsupportedVersion(v) => write!(f, "only XML 1.0 is supported, not {:?}", v),
			WFError::InvalidEncodingName(name) => write!(f, "illegal encoding name {:?}", name),
			WFError::InvalidEncodingSwitch(detected, declared) => write!(
				f,
				"invalid encoding switch from detected {} to declared {:?}",
				detected, declared
			),
			WFError::InvalidStandalone(v) => {
				write!(f, "standalone flag must be 'yes' or 'no', not {:?}", v)
			}
			WFError::ReservedTarget(target) => {
				write!(f, "illegal processing instruction target name {:?}", target)
			}
			WFError::InvalidPubidChar(ch) => {
				write!(f, "illegal PUBLIC id character U+{:04x}", *ch as u32)
			}
		}
	}
}

impl From<ValidationError> for WFError {
	fn from(other: ValidationError) -> Self {
		match other {
			ValidationError::EmptyName => Self::InvalidSyntax("name expected"),
			ValidationError::InvalidChar(ch) => Self::UnexpectedChar(ERRCTX_UNKNOWN, ch, None),
		}
	}
}

/// Malformed input for the encoding in use.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodingError {
	/// Invalid UTF-8 sequence. The string describes the defect, the number
	/// is the (partially) decoded value.
	InvalidUtf8(&'static str, u32),

	/// Input ended in the middle of a multi-byte sequence.
	TruncatedSequence(&'static str),

	/// Byte with the high bit set in an ASCII entity.
	NonAscii(u8),

	/// Four-byte value outside the Unicode range.
	OutOfRange(&'static str, u32),

	/// Surrogate code unit without its partner.
	UnpairedSurrogate(&'static str, u32),

	/// UTF-16 input without a byte order mark.
	MissingByteOrderMark,
}

impl error::Error for EncodingError {}

impl fmt::Display for EncodingError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::InvalidUtf8(what, code) => {
				write!(f, "{} (character code: 0x{:04x})", what, code)
			}
			Self::TruncatedSequence(enc) => {
				write!(f, "unfinished multi-byte {} sequence at EOF", enc)
			}
			Self::NonAscii(b) => write!(f, "non-ASCII character U+{:04x}", b),
			Self::OutOfRange(enc, code) => {
				write!(f, "{} value out of range for Unicode (character code: 0x{:04x})", enc, code)
			}
			Self::UnpairedSurrogate(enc, code) => {
				write!(f, "unpaired surrogate in {} input (character code: 0x{:04x})", enc, code)
			}
			Self::MissingByteOrderMark => f.write_str("no byte-order mark for UCS-2 entity"),
		}
	}
}

/// [`std::sync::Arc`]-based around [`std::io::Error`] to allow cloning.
#[derive(Clone)]
pub struct IOErrorWrapper(Arc<io::Error>);

impl IOErrorWrapper {
	fn wrap(e: io::Error) -> IOErrorWrapper {
		IOErrorWrapper(Arc::new(e))
	}
}

impl fmt::Debug for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

impl fmt::Display for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&**self, f)
	}
}

impl PartialEq for IOErrorWrapper {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl AsRef<io::Error> for IOErrorWrapper {
	fn as_ref(&self) -> &io::Error {
		&*self.0
	}
}

impl Deref for IOErrorWrapper {
	type Target = io::Error;

	fn deref(&self) -> &io::Error {
		&*self.0
	}
}

/// Position of the parser inside the currently active entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
	/// System identifier of the enclosing external entity, if known.
	pub system_id: Option<String>,
	/// One-based line number.
	pub line: u64,
	/// Column within the line, counted in characters.
	pub column: u64,
}

impl fmt::Display for Location {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self.system_id.as_ref() {
			Some(id) => write!(f, "{}:{}:{}", id, self.line, self.column),
			None => write!(f, "line {}, column {}", self.line, self.column),
		}
	}
}

/// Error types which may be returned from the parser.
///
/// All errors are fatal: the parse is aborted and every input source opened
/// so far is closed before the error is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// An I/O error was encountered while reading an entity.
	///
	/// **Note:** When an unexpected end-of-file situation is encountered
	/// during parsing, that is signalled using [`Error::NotWellFormed`]
	/// instead of a [`std::io::ErrorKind::UnexpectedEof`] error.
	IO(IOErrorWrapper),

	/// The input is not valid in the encoding it is read with.
	Encoding(EncodingError),

	/// The document declares (or the caller hinted) an encoding which is not
	/// supported.
	UnsupportedEncoding(String),

	/// A violation of the XML 1.0 grammar or a well-formedness constraint was
	/// encountered.
	NotWellFormed(WFError),

	/// A handler callback requested that the parse be stopped.
	Aborted(String),

	/// Another error, annotated with the position at which it occured.
	Positioned(Location, Box<Error>),
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
	pub fn io(e: io::Error) -> Error {
		Error::IO(IOErrorWrapper::wrap(e))
	}

	/// Construct the error a handler returns to stop the parse.
	pub fn aborted<T: Into<String>>(msg: T) -> Error {
		Error::Aborted(msg.into())
	}

	pub(crate) fn wfeof(ctx: &'static str) -> Error {
		Error::NotWellFormed(WFError::InvalidEof(ctx))
	}

	/// Strip any position annotations.
	pub fn root(&self) -> &Error {
		match self {
			Error::Positioned(_, inner) => inner.root(),
			other => other,
		}
	}

	/// Return the position annotation, if any.
	pub fn location(&self) -> Option<&Location> {
		match self {
			Error::Positioned(loc, _) => Some(loc),
			_ => None,
		}
	}

	pub(crate) fn at(self, loc: Location) -> Error {
		match self {
			Error::Positioned(..) => self,
			other => Error::Positioned(loc, Box::new(other)),
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::io(e)
	}
}

impl From<WFError> for Error {
	fn from(e: WFError) -> Error {
		Error::NotWellFormed(e)
	}
}

impl From<EncodingError> for Error {
	fn from(e: EncodingError) -> Error {
		Error::Encoding(e)
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::NotWellFormed(e) => write!(f, "not-well-formed: {}", e),
			Error::Encoding(e) => write!(f, "encoding error: {}", e),
			Error::UnsupportedEncoding(name) => write!(f, "unsupported text encoding: {}", name),
			Error::Aborted(msg) => write!(f, "aborted by handler: {}", msg),
			Error::IO(e) => write!(f, "I/O error: {}", e),
			Error::Positioned(loc, e) => write!(f, "{}: {}", loc, e),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::IO(e) => Some(&**e),
			Error::Encoding(e) => Some(e),
			Error::NotWellFormed(e) => Some(e),
			Error::Positioned(_, e) => Some(&**e),
			Error::UnsupportedEncoding(_) | Error::Aborted(_) => None,
		}
	}
}
