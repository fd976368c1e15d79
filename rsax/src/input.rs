/*!
# Input frames

Every entity the parser reads from (the document, the external subset,
external and internal entities, and short synthetic buffers of pushed back
characters) is represented by a [`Frame`]. The parser keeps the active frame
separately and the suspended ones on a stack.

Stream frames pull raw bytes from a reader, decode them with the encoding in
effect and fold line endings before the characters are handed to the lexer.
*/
use std::fmt;
use std::io;

use bytes::{Buf, BytesMut};

use crate::encoding::{decode, fold_line_endings, Encoding};
use crate::errctx::ERRCTX_XML_DECL;
use crate::error::{Error, Result};
use crate::symbols::Sym;

/// The kind of entity a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
	None,
	Document,
	/// External general entity.
	ExtGe,
	/// External parameter entity (including the external subset).
	ExtPe,
}

/// Productions which must start and end in the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityBoundary {
	Enabled,
	Disabled,
	StartTag,
	EndTag,
	EmptyElement,
	Comment,
	Pi,
	EntityRef,
	CharRef,
	CdataSection,
}

impl EntityBoundary {
	/// Name of the production for error messages.
	pub fn production(&self) -> &'static str {
		match self {
			Self::Enabled => "markup",
			Self::Disabled => "a content construct",
			Self::StartTag => "a start tag",
			Self::EndTag => "an end tag",
			Self::EmptyElement => "an empty-element tag",
			Self::Comment => "a comment",
			Self::Pi => "a processing instruction",
			Self::EntityRef => "an entity reference",
			Self::CharRef => "a character reference",
			Self::CdataSection => "a CDATA section",
		}
	}
}

/// Scanner flags which are saved and restored together with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
	pub in_internal_subset: bool,
	pub in_declaration: bool,
	/// The frame was entered through a parameter entity reference between
	/// markup declarations.
	pub in_pe_ref_between_decls: bool,
	/// Start tags minus end tags seen while this frame was active.
	pub entity_balance: i32,
	pub entity_type: EntityType,
}

impl Default for FrameContext {
	fn default() -> Self {
		Self{
			in_internal_subset: false,
			in_declaration: false,
			in_pe_ref_between_decls: false,
			entity_balance: 0,
			entity_type: EntityType::None,
		}
	}
}

/// Decoding state of an entity read from a reader.
pub struct StreamSource {
	reader: Box<dyn io::Read>,
	raw: BytesMut,
	eof: bool,
	after_cr: bool,
	pub encoding: Encoding,
	/// False once a byte order mark or an outside hint fixed the encoding.
	pub switchable: bool,
}

impl StreamSource {
	pub fn new(reader: Box<dyn io::Read>) -> StreamSource {
		StreamSource{
			reader,
			raw: BytesMut::new(),
			eof: false,
			after_cr: false,
			encoding: Encoding::Utf8,
			switchable: true,
		}
	}

	/// Undecoded bytes read so far.
	pub fn raw(&self) -> &[u8] {
		&self.raw[..]
	}

	pub fn skip_raw(&mut self, n: usize) {
		self.raw.advance(n.min(self.raw.len()));
	}

	/// Read one more chunk of up to `chunk` bytes. Returns false at end of
	/// input.
	fn read_more(&mut self, chunk: usize) -> Result<bool> {
		if self.eof {
			return Ok(false)
		}
		let start = self.raw.len();
		self.raw.resize(start + chunk.max(1), 0);
		let n = loop {
			match self.reader.read(&mut self.raw[start..]) {
				Ok(n) => break n,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => {
					self.raw.truncate(start);
					return Err(Error::io(e))
				}
			}
		};
		self.raw.truncate(start + n);
		if n == 0 {
			self.eof = true;
		}
		Ok(n > 0)
	}

	/// Make sure at least `n` raw bytes are buffered, unless the input is
	/// shorter than that.
	pub fn fill_raw(&mut self, n: usize, chunk: usize) -> Result<()> {
		while self.raw.len() < n {
			if !self.read_more(chunk)? {
				break
			}
		}
		Ok(())
	}

	/**
	Decode the next batch of characters into `out`.

	Returns false if the input is exhausted and nothing was decoded.
	*/
	pub fn fill(&mut self, out: &mut Vec<char>, chunk: usize) -> Result<bool> {
		loop {
			let start = out.len();
			if self.raw.len() > 0 {
				let n = decode(self.encoding, &self.raw[..], self.eof, out)?;
				self.raw.advance(n);
				fold_line_endings(out, start, &mut self.after_cr);
				if out.len() > start {
					return Ok(true)
				}
			} else if self.eof {
				return Ok(false)
			}
			if !self.read_more(chunk)? && self.raw.len() == 0 {
				return Ok(false)
			}
		}
	}

	/**
	Decode the XML declaration up to its closing `>` as ASCII.

	Used when the entity starts with `<?xm` in an ASCII-compatible
	encoding, so that an `encoding` pseudo-attribute can still switch the
	decoder for the remainder of the entity. Returns false and leaves the
	input alone if the entity starts with some other PI, such as
	`<?xml-stylesheet`.
	*/
	pub fn prefetch_declaration(&mut self, out: &mut Vec<char>, chunk: usize) -> Result<bool> {
		self.fill_raw(6, chunk)?;
		let is_decl = self.raw.len() >= 6
			&& &self.raw[..5] == b"<?xml"
			&& matches!(self.raw[5], b' ' | b'\t' | b'\r' | b'\n');
		if !is_decl {
			return Ok(false)
		}
		let mut scanned = 0;
		let end = loop {
			if let Some(i) = self.raw[scanned..].iter().position(|b| *b == b'>') {
				break scanned + i + 1
			}
			scanned = self.raw.len();
			if !self.read_more(chunk)? {
				return Err(Error::wfeof(ERRCTX_XML_DECL))
			}
		};
		let start = out.len();
		out.extend(self.raw[..end].iter().map(|b| *b as char));
		self.raw.advance(end);
		fold_line_endings(out, start, &mut self.after_cr);
		Ok(true)
	}
}

impl fmt::Debug for StreamSource {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("StreamSource")
			.field("encoding", &self.encoding)
			.field("buffered", &self.raw.len())
			.field("eof", &self.eof)
			.finish()
	}
}

#[derive(Debug)]
pub enum Source {
	/// Placeholder before the document is opened and after it is closed.
	None,
	/// The whole text is in the frame buffer.
	Internal,
	Stream(StreamSource),
}

/// One entry of the input stack.
#[derive(Debug)]
pub struct Frame {
	/// Identity used to check that delimiters and declarations start and end
	/// in the same entity. Pushback frames share the id of their parent.
	pub id: u64,
	/// Entity name; `None` for synthetic frames.
	pub name: Option<Sym>,
	pub source: Source,
	pub buf: Vec<char>,
	pub pos: usize,
	pub line: u64,
	pub column: u64,
	pub system_id: Option<String>,
	pub ctx: FrameContext,
	/// Holds characters which were read from the parent and put back.
	pub pushback: bool,
}

impl Frame {
	pub fn empty() -> Frame {
		Frame{
			id: 0,
			name: None,
			source: Source::None,
			buf: Vec::new(),
			pos: 0,
			line: 1,
			column: 0,
			system_id: None,
			ctx: FrameContext::default(),
			pushback: false,
		}
	}

	pub fn encoding(&self) -> Option<Encoding> {
		match self.source {
			Source::Stream(ref s) => Some(s.encoding),
			_ => None,
		}
	}

	/// Characters not consumed yet.
	pub fn remaining(&self) -> &[char] {
		&self.buf[self.pos..]
	}
}
