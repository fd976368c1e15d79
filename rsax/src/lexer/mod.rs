/*!
# Character-level scanning

The primitives the grammar productions are built from: reading and pushing
back single characters, whitespace, names, quoted literals and delimited
runs. They operate on the active input frame of a [`Parser`] and fall back to
character-by-character reading whenever a buffer boundary, an entity
boundary or a parameter entity reference is in the way.
*/
use std::ops::BitOr;

mod ranges;
mod read;

use rsax_validation::selectors::*;
use rsax_validation::{is_space, is_xml_char};

use crate::errctx::*;
use crate::error::{Error, Result, WFError};
use crate::handler::Handler;
use crate::input::{EntityBoundary, Frame};
use crate::parser::Parser;
use crate::symbols::Sym;

use ranges::{DelimOrNonchar, NAME_DELIMITERS, TEXT_DELIMITERS};
use read::{advance_position, scan_until, skip_matching, Endchar};

pub(crate) fn handle_eof<T>(v: Option<T>, ctx: &'static str) -> Result<T> {
	v.ok_or_else(|| {
		Error::wfeof(ctx)
	})
}

/// Modifiers for [`Parser::read_literal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LiteralFlags(u8);

impl LiteralFlags {
	pub const NONE: LiteralFlags = LiteralFlags(0);
	/// Trim and collapse runs of spaces.
	pub const NORMALIZE: LiteralFlags = LiteralFlags(1);
	/// Expand general entity references.
	pub const ENTITY_REF: LiteralFlags = LiteralFlags(2);
	/// Attribute value: whitespace becomes space, `<` is forbidden.
	pub const ATTRIBUTE: LiteralFlags = LiteralFlags(4);
	pub const DISABLE_PE: LiteralFlags = LiteralFlags(8);
	pub const DISABLE_CREF: LiteralFlags = LiteralFlags(16);
	pub const DISABLE_EREF: LiteralFlags = LiteralFlags(32);
	/// Public identifier: line breaks become space.
	pub const PUBID: LiteralFlags = LiteralFlags(64);

	pub fn contains(self, other: LiteralFlags) -> bool {
		self.0 & other.0 == other.0
	}
}

impl BitOr for LiteralFlags {
	type Output = LiteralFlags;

	fn bitor(self, rhs: LiteralFlags) -> LiteralFlags {
		LiteralFlags(self.0 | rhs.0)
	}
}

/**
Growable character buffer for names and data.

Grows by doubling its capacity, or to the exact size needed if doubling is
not enough.
*/
#[derive(Debug, Clone, Default)]
pub(crate) struct Scratchpad {
	chars: Vec<char>,
}

impl Scratchpad {
	pub fn with_capacity(n: usize) -> Scratchpad {
		Scratchpad{chars: Vec::with_capacity(n)}
	}

	fn reserve(&mut self, extra: usize) {
		let need = self.chars.len() + extra;
		let cap = self.chars.capacity();
		if need > cap {
			let target = (cap * 2).max(need);
			self.chars.reserve_exact(target - self.chars.len());
		}
	}

	pub fn push(&mut self, c: char) {
		self.reserve(1);
		self.chars.push(c);
	}

	pub fn extend_from_slice(&mut self, s: &[char]) {
		self.reserve(s.len());
		self.chars.extend_from_slice(s);
	}

	pub fn push_str(&mut self, s: &str) {
		for c in s.chars() {
			self.push(c);
		}
	}

	pub fn len(&self) -> usize {
		self.chars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chars.is_empty()
	}

	pub fn clear(&mut self) {
		self.chars.clear();
	}

	pub fn as_slice(&self) -> &[char] {
		&self.chars[..]
	}

	/// Remove and return everything from `start` on.
	pub fn take_from(&mut self, start: usize) -> String {
		let s = self.chars[start..].iter().collect();
		self.chars.truncate(start);
		s
	}

	/// Trim spaces from `start` on and collapse runs of them.
	pub fn normalize_from(&mut self, start: usize) {
		let mut w = start;
		let mut pending_space = false;
		for r in start..self.chars.len() {
			let c = self.chars[r];
			if c == ' ' {
				pending_space = w > start;
				continue
			}
			if pending_space {
				self.chars[w] = ' ';
				w += 1;
				pending_space = false;
			}
			self.chars[w] = c;
			w += 1;
		}
		self.chars.truncate(w);
	}
}

fn check_name_char(c: char, first: bool, is_name: bool, xml_names: bool, allow_colon: bool, colons: &mut u32) -> Result<()> {
	if c == ':' {
		if first && is_name && !xml_names {
			return Err(WFError::UnexpectedChar(ERRCTX_NAMESTART, c, None).into())
		}
		if !allow_colon {
			return Err(WFError::UnexpectedChar(ERRCTX_NAME, c, None).into())
		}
		if *colons > 0 && !xml_names {
			return Err(WFError::InvalidSyntax("names may contain at most one colon").into())
		}
		*colons += 1;
		return Ok(())
	}
	if first && is_name {
		if !CLASS_XML_NAMESTART.select(c) {
			return Err(WFError::UnexpectedChar(ERRCTX_NAMESTART, c, None).into())
		}
	} else if !CLASS_XML_NAME.select(c) {
		return Err(WFError::UnexpectedChar(ERRCTX_NAME, c, None).into())
	}
	Ok(())
}

impl<'h, H: Handler + ?Sized> Parser<'h, H> {
	/**
	Read the next character of the input.

	Exhausted frames are refilled or popped on the way. A `%` is expanded as
	a parameter entity reference while PE expansion is on. Returns `None`
	once the document entity is exhausted.
	*/
	pub(crate) fn read_char(&mut self) -> Result<Option<char>> {
		while self.cur.pos >= self.cur.buf.len() {
			if !self.refill()? {
				return Ok(None)
			}
		}
		let c = self.cur.buf[self.cur.pos];
		self.cur.pos += 1;
		if c == '\n' {
			self.cur.line += 1;
			self.cur.column = 0;
			return Ok(Some(c))
		}
		if !is_xml_char(c) {
			return Err(WFError::InvalidChar(ERRCTX_UNKNOWN, c as u32, false).into())
		}
		if c == '%' && self.expand_pe {
			if self.cur.ctx.in_declaration && self.cur.ctx.in_internal_subset {
				return Err(WFError::InvalidSyntax(
					"parameter entity reference within a declaration in the internal subset"
				).into())
			}
			self.parse_pe_reference()?;
			let between = !self.cur.ctx.in_declaration;
			self.cur.ctx.in_pe_ref_between_decls = between;
			return self.read_char()
		}
		self.cur.column += 1;
		Ok(Some(c))
	}

	pub(crate) fn next_char(&mut self, ctx: &'static str) -> Result<char> {
		handle_eof(self.read_char()?, ctx)
	}

	/// Push a character back so that it is read next.
	pub(crate) fn unread(&mut self, c: char) {
		if c == '\n' {
			self.cur.line = self.cur.line.saturating_sub(1);
			self.cur.column = 0;
		} else {
			self.cur.column = self.cur.column.saturating_sub(1);
		}
		if self.cur.pos > 0 {
			self.cur.pos -= 1;
			self.cur.buf[self.cur.pos] = c;
		} else {
			self.push_pushback(vec![c]);
		}
	}

	pub(crate) fn unread_span(&mut self, chars: &[char]) {
		if chars.is_empty() {
			return
		}
		for c in chars.iter() {
			if *c == '\n' {
				self.cur.line = self.cur.line.saturating_sub(1);
				self.cur.column = 0;
			} else {
				self.cur.column = self.cur.column.saturating_sub(1);
			}
		}
		let n = chars.len();
		if self.cur.pos >= n {
			let start = self.cur.pos - n;
			self.cur.buf[start..self.cur.pos].copy_from_slice(chars);
			self.cur.pos = start;
		} else {
			self.push_pushback(chars.to_vec());
		}
	}

	pub(crate) fn peek_char(&mut self) -> Result<Option<char>> {
		let c = self.read_char()?;
		if let Some(c) = c {
			self.unread(c);
		}
		Ok(c)
	}

	pub(crate) fn try_read(&mut self, expected: char) -> Result<bool> {
		match self.read_char()? {
			Some(c) if c == expected => Ok(true),
			Some(c) => {
				self.unread(c);
				Ok(false)
			}
			None => Ok(false),
		}
	}

	/// Consume `s` if the input continues with it.
	pub(crate) fn try_read_str(&mut self, s: &str) -> Result<bool> {
		let n = s.chars().count();
		{
			let rem = self.cur.remaining();
			if rem.len() >= n && (!self.expand_pe || !rem[..n].contains(&'%')) {
				if rem[..n].iter().copied().eq(s.chars()) {
					self.cur.pos += n;
					self.cur.column += n as u64;
					return Ok(true)
				}
				return Ok(false)
			}
		}
		let mut got = Vec::with_capacity(n);
		for expected in s.chars() {
			match self.read_char()? {
				Some(c) if c == expected => got.push(c),
				Some(c) => {
					self.unread(c);
					self.unread_span(&got);
					return Ok(false)
				}
				None => {
					self.unread_span(&got);
					return Ok(false)
				}
			}
		}
		Ok(true)
	}

	pub(crate) fn require(&mut self, expected: char, ctx: &'static str) -> Result<()> {
		match self.next_char(ctx)? {
			c if c == expected => Ok(()),
			c => Err(WFError::UnexpectedChar(ctx, c, Some(expected_str(expected))).into()),
		}
	}

	pub(crate) fn require_str(&mut self, s: &'static str, ctx: &'static str) -> Result<()> {
		if self.try_read_str(s)? {
			return Ok(())
		}
		match self.read_char()? {
			Some(c) => Err(WFError::UnexpectedChar(ctx, c, Some(s)).into()),
			None => Err(Error::wfeof(ctx)),
		}
	}

	/// Skip any amount of whitespace, including none.
	pub(crate) fn skip_whitespace(&mut self) -> Result<()> {
		loop {
			let end = {
				let Frame{buf, pos, line, column, ..} = &mut self.cur;
				let mut r = &buf[*pos..];
				let (n, end) = skip_matching(&mut r, &CLASS_XML_SPACE);
				advance_position(&buf[*pos..*pos + n], line, column);
				*pos += n;
				end
			};
			match end {
				Endchar::Delimiter('%') if self.expand_pe => (),
				Endchar::Delimiter(_) => return Ok(()),
				Endchar::Eof => (),
			}
			match self.read_char()? {
				None => return Ok(()),
				Some(c) if is_space(c) => (),
				Some(c) => {
					self.unread(c);
					return Ok(())
				}
			}
		}
	}

	/// Skip whitespace and return whether there was any.
	pub(crate) fn try_whitespace(&mut self) -> Result<bool> {
		match self.read_char()? {
			Some(c) if is_space(c) => {
				self.skip_whitespace()?;
				Ok(true)
			}
			Some(c) => {
				self.unread(c);
				Ok(false)
			}
			None => Ok(false),
		}
	}

	pub(crate) fn require_whitespace(&mut self, ctx: &'static str) -> Result<()> {
		match self.next_char(ctx)? {
			c if is_space(c) => self.skip_whitespace(),
			c => Err(WFError::UnexpectedChar(ctx, c, Some("whitespace")).into()),
		}
	}

	/**
	Read a Name (`is_name`) or an Nmtoken and intern it.

	A colon is only accepted while colons are allowed at all, never at the
	start of a Name and at most once, unless the legacy XML-names mode is on.
	*/
	pub(crate) fn read_name(&mut self, is_name: bool) -> Result<Sym> {
		let xml_names = self.opts.xml_names;
		let allow_colon = self.allow_colon;
		let expand_pe = self.expand_pe;
		{
			let Frame{buf, pos, column, ..} = &mut self.cur;
			let mut r = &buf[*pos..];
			let (n, end) = scan_until(&mut r, &NAME_DELIMITERS);
			match end {
				Endchar::Delimiter('%') if expand_pe => (),
				Endchar::Delimiter(delim) => {
					if n == 0 {
						let ctx = if is_name { ERRCTX_NAMESTART } else { ERRCTX_NAME };
						return Err(WFError::UnexpectedChar(ctx, delim, None).into())
					}
					let span = &buf[*pos..*pos + n];
					let mut colons = 0;
					for (i, c) in span.iter().enumerate() {
						check_name_char(*c, i == 0, is_name, xml_names, allow_colon, &mut colons)?;
					}
					let sym = self.symbols.intern(span);
					*pos += n;
					*column += n as u64;
					return Ok(sym)
				}
				Endchar::Eof => (),
			}
		}

		self.name_buf.clear();
		let mut colons = 0;
		let delim = loop {
			let c = match self.read_char()? {
				Some(c) => c,
				None => break None,
			};
			if NAME_DELIMITERS.select(c) {
				self.unread(c);
				break Some(c)
			}
			check_name_char(c, self.name_buf.is_empty(), is_name, xml_names, allow_colon, &mut colons)?;
			self.name_buf.push(c);
		};
		if self.name_buf.is_empty() {
			return match delim {
				Some(c) => Err(WFError::UnexpectedChar(ERRCTX_NAMESTART, c, None).into()),
				None => Err(Error::wfeof(ERRCTX_NAMESTART)),
			}
		}
		Ok(self.symbols.intern(self.name_buf.as_slice()))
	}

	/**
	Read a quoted literal and return its (possibly expanded and normalized)
	value.

	The closing quote only counts if it comes from the entity the opening
	quote came from.
	*/
	pub(crate) fn read_literal(&mut self, flags: LiteralFlags) -> Result<String> {
		let delim = self.next_char(ERRCTX_LITERAL)?;
		if delim != '"' && delim != '\'' {
			return Err(WFError::UnexpectedChar(ERRCTX_LITERAL, delim, Some("quote")).into())
		}
		let saved_expand_pe = self.expand_pe;
		let saved_report = self.do_report;
		let saved_boundary = self.boundary;
		if flags.contains(LiteralFlags::DISABLE_PE) {
			self.expand_pe = false;
		}
		self.do_report = false;
		self.in_literal = true;
		self.boundary = EntityBoundary::Enabled;
		let ours = self.cur.id;
		let start = self.data.len();

		loop {
			let c = self.next_char(ERRCTX_LITERAL)?;
			if c == delim && self.cur.id == ours {
				break
			}
			match c {
				'\n' | '\r' if flags.contains(LiteralFlags::ATTRIBUTE) || flags.contains(LiteralFlags::PUBID) => {
					self.data.push(' ');
				}
				'\t' if flags.contains(LiteralFlags::ATTRIBUTE) => self.data.push(' '),
				'&' => {
					let next = self.next_char(ERRCTX_LITERAL)?;
					if next == '#' {
						if flags.contains(LiteralFlags::DISABLE_CREF) {
							self.data.push('&');
							self.data.push('#');
						} else {
							self.parse_char_ref()?;
						}
						continue
					}
					self.unread(next);
					if flags.contains(LiteralFlags::ENTITY_REF) {
						self.parse_entity_ref(false)?;
					} else if flags.contains(LiteralFlags::DISABLE_EREF) {
						self.data.push('&');
					} else {
						let name = self.read_name(true)?;
						self.require(';', ERRCTX_REF)?;
						self.data.push('&');
						self.data.push_str(self.symbols.resolve(name));
						self.data.push(';');
					}
				}
				'<' if flags.contains(LiteralFlags::ATTRIBUTE) => {
					return Err(WFError::UnexpectedChar(ERRCTX_ATTVAL, c, None).into())
				}
				c => self.data.push(c),
			}
		}

		self.in_literal = false;
		self.expand_pe = saved_expand_pe;
		self.do_report = saved_report;
		self.boundary = saved_boundary;
		if flags.contains(LiteralFlags::NORMALIZE) {
			self.data.normalize_from(start);
		}
		Ok(self.data.take_from(start))
	}

	/// Move a run of plain character data from the active frame into the
	/// data buffer. Returns the number of characters moved.
	pub(crate) fn scan_text(&mut self) -> usize {
		let stop = DelimOrNonchar(TEXT_DELIMITERS);
		let Frame{buf, pos, line, column, ..} = &mut self.cur;
		let mut r = &buf[*pos..];
		let (n, _) = scan_until(&mut r, &stop);
		let span = &buf[*pos..*pos + n];
		advance_position(span, line, column);
		self.data.extend_from_slice(span);
		*pos += n;
		n
	}

	/// Append everything up to `delim` to the data buffer and consume the
	/// delimiter.
	pub(crate) fn parse_until(&mut self, delim: &str, ctx: &'static str) -> Result<()> {
		let first = match delim.chars().next() {
			Some(c) => [c],
			None => return Ok(()),
		};
		let stop = DelimOrNonchar(&first[..]);
		loop {
			if !self.expand_pe {
				let Frame{buf, pos, line, column, ..} = &mut self.cur;
				let mut r = &buf[*pos..];
				let (n, _) = scan_until(&mut r, &stop);
				let span = &buf[*pos..*pos + n];
				advance_position(span, line, column);
				self.data.extend_from_slice(span);
				*pos += n;
			}
			if self.try_read_str(delim)? {
				return Ok(())
			}
			let c = self.next_char(ctx)?;
			self.data.push(c);
		}
	}
}

fn expected_str(c: char) -> &'static str {
	match c {
		'<' => "'<'",
		'>' => "'>'",
		'=' => "'='",
		';' => "';'",
		'(' => "'('",
		')' => "')'",
		'[' => "'['",
		'|' => "'|'",
		'*' => "'*'",
		'-' => "'-'",
		_ => "another character",
	}
}
