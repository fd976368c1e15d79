/*!
Elements, attributes, character data and references.
*/
use rsax_validation::is_xml_char;

use crate::dtd::{AttributeType, ContentType, EntityKind};
use crate::errctx::*;
use crate::error::{Error, Result, WFError};
use crate::handler::{Attribute, Handler};
use crate::input::EntityBoundary;
use crate::lexer::LiteralFlags;
use crate::symbols::Sym;

use super::Parser;

/// An attribute which was read from a start tag (or defaulted from the
/// DTD) and is reported once the tag is complete.
struct PendingAttribute {
	name: Sym,
	value: String,
	specified: bool,
	is_id: bool,
	position: Option<(u64, u64)>,
}

impl<'h, H: Handler + ?Sized> Parser<'h, H> {
	/**
	An element, after its `<`.

	`maybe_get_subset` is set for the root element of a document without a
	DOCTYPE; the handler then gets the chance to supply a DTD.
	*/
	pub(crate) fn parse_element(&mut self, maybe_get_subset: bool) -> Result<()> {
		let saved_element = self.current_element;
		let saved_content = self.current_content;

		self.boundary = EntityBoundary::StartTag;
		let name = self.read_name(true)?;
		if maybe_get_subset {
			self.boundary = EntityBoundary::Enabled;
			self.get_subset_for_root(name)?;
			self.boundary = EntityBoundary::StartTag;
		}
		self.tag_attributes.clear();
		self.current_element = Some(name);
		self.current_content = match self.dtd.content_type(name) {
			ContentType::Undeclared => ContentType::Any,
			other => other,
		};
		self.handler.push_context()?;

		let mut attributes = Vec::new();
		let mut white = self.try_whitespace()?;
		let empty = loop {
			match self.next_char(ERRCTX_ELEMENT)? {
				'>' => break false,
				'/' => {
					self.boundary = EntityBoundary::EmptyElement;
					self.require('>', ERRCTX_ELEMENT)?;
					break true
				}
				c => {
					self.unread(c);
					if !white {
						return Err(WFError::InvalidSyntax("need whitespace between attributes").into())
					}
					attributes.push(self.parse_attribute(name)?);
					white = self.try_whitespace()?;
				}
			}
		};
		self.boundary = EntityBoundary::Enabled;
		self.default_attributes(name, &mut attributes);

		if !empty {
			self.cur.ctx.entity_balance += 1;
		}
		self.handler.start_element(self.symbols.resolve(name))?;
		for attr in attributes.iter() {
			self.handler.attribute(&Attribute{
				name: self.symbols.resolve(attr.name),
				value: &attr.value,
				specified: attr.specified,
				is_id: attr.is_id,
				position: attr.position,
			})?;
		}
		if empty {
			self.handler.end_element(self.symbols.resolve(name))?;
		} else {
			self.parse_content(name)?;
		}
		self.handler.pop_context()?;

		self.current_element = saved_element;
		self.current_content = saved_content;
		Ok(())
	}

	fn parse_attribute(&mut self, element: Sym) -> Result<PendingAttribute> {
		let position = (self.cur.line, self.cur.column + 1);
		let name = self.read_name(true)?;
		if !self.opts.namespaces && self.tag_attributes.contains(&name) {
			return Err(WFError::DuplicateAttribute(self.symbols.resolve(name).to_string()).into())
		}
		self.tag_attributes.push(name);
		self.parse_eq(ERRCTX_ATTVAL)?;

		let ty = self.dtd.attribute(element, name).map(|decl| decl.ty);
		let mut flags = LiteralFlags::ATTRIBUTE | LiteralFlags::ENTITY_REF;
		if ty.map(|ty| ty != AttributeType::Cdata).unwrap_or(false) {
			flags = flags | LiteralFlags::NORMALIZE;
		}
		let value = self.read_literal(flags)?;
		Ok(PendingAttribute{
			name,
			value,
			specified: true,
			is_id: ty == Some(AttributeType::Id),
			position: Some(position),
		})
	}

	/// Append the declared defaults of attributes the start tag left out.
	fn default_attributes(&self, element: Sym, out: &mut Vec<PendingAttribute>) {
		let decl = match self.dtd.element(element) {
			Some(decl) => decl,
			None => return,
		};
		for attr in decl.attributes.iter() {
			let value = match attr.default.as_ref() {
				Some(value) => value,
				None => continue,
			};
			if self.tag_attributes.contains(&attr.name) {
				continue
			}
			out.push(PendingAttribute{
				name: attr.name,
				value: value.clone(),
				specified: false,
				is_id: attr.ty == AttributeType::Id,
				position: None,
			});
		}
	}

	/// Content of `element` up to and including its end tag.
	fn parse_content(&mut self, element: Sym) -> Result<()> {
		loop {
			match self.read_char()? {
				None => return Err(Error::wfeof(ERRCTX_TEXT)),
				Some('<') => {
					self.flush_data()?;
					if self.parse_content_markup(element)? {
						return Ok(())
					}
				}
				Some('&') => {
					self.boundary = EntityBoundary::EntityRef;
					if self.try_read('#')? {
						self.boundary = EntityBoundary::CharRef;
						self.parse_char_ref()?;
					} else {
						self.parse_entity_ref(true)?;
					}
				}
				Some(c) => {
					self.unread(c);
					self.parse_char_data()?;
				}
			}
		}
	}

	/// Markup in content, after `<`. Returns true once the end tag of
	/// `element` was read.
	fn parse_content_markup(&mut self, element: Sym) -> Result<bool> {
		self.boundary = EntityBoundary::Disabled;
		if self.try_read('/')? {
			self.parse_etag(element)?;
			return Ok(true)
		}
		if self.try_read('?')? {
			self.boundary = EntityBoundary::Pi;
			self.parse_pi()?;
		} else if self.try_read('!')? {
			if self.try_read_str("--")? {
				self.boundary = EntityBoundary::Comment;
				self.parse_comment()?;
			} else if self.try_read_str("[CDATA[")? {
				self.boundary = EntityBoundary::CdataSection;
				self.parse_cdata()?;
			} else {
				let c = self.next_char(ERRCTX_TEXT)?;
				return Err(WFError::UnexpectedChar(ERRCTX_TEXT, c, Some("comment or CDATA section")).into())
			}
		} else {
			self.parse_element(false)?;
		}
		self.boundary = EntityBoundary::Enabled;
		Ok(false)
	}

	/// A CDATA section, after `<![CDATA[`.
	fn parse_cdata(&mut self) -> Result<()> {
		self.handler.start_cdata()?;
		self.in_cdata = true;
		self.parse_until("]]>", ERRCTX_CDATA_SECTION)?;
		self.flush_data()?;
		self.in_cdata = false;
		self.handler.end_cdata()
	}

	/// An end tag, after `</`.
	fn parse_etag(&mut self, element: Sym) -> Result<()> {
		self.boundary = EntityBoundary::EndTag;
		let name = self.read_name(true)?;
		if name != element {
			return Err(WFError::ElementMismatch(
				self.symbols.resolve(element).to_string(),
				self.symbols.resolve(name).to_string(),
			).into())
		}
		self.skip_whitespace()?;
		self.require('>', ERRCTX_ELEMENT_FOOT)?;
		self.boundary = EntityBoundary::Enabled;

		self.cur.ctx.entity_balance -= 1;
		if self.cur.ctx.entity_balance < 0 {
			return Err(WFError::UnbalancedEndTag.into())
		}
		self.handler.end_element(self.symbols.resolve(element))
	}

	/// Plain text up to the next markup or reference.
	fn parse_char_data(&mut self) -> Result<()> {
		let mut brackets = 0u32;
		loop {
			if self.scan_text() > 0 {
				brackets = 0;
			}
			let c = match self.read_char()? {
				Some(c) => c,
				None => return Ok(()),
			};
			match c {
				'<' | '&' => {
					self.unread(c);
					return Ok(())
				}
				']' => brackets += 1,
				'>' if brackets >= 2 => {
					return Err(WFError::InvalidSyntax("']]>' is not allowed in character data").into())
				}
				_ => brackets = 0,
			}
			self.data.push(c);
		}
	}

	/// A character reference, after `&#`. The character is appended to the
	/// data buffer.
	pub(crate) fn parse_char_ref(&mut self) -> Result<()> {
		let radix = if self.try_read('x')? { 16 } else { 10 };
		let mut value: u32 = 0;
		let mut digits = 0;
		loop {
			let c = self.next_char(ERRCTX_CHARREF)?;
			if c == ';' {
				break
			}
			let digit = match c.to_digit(radix) {
				Some(d) => d,
				None => return Err(WFError::UnexpectedChar(ERRCTX_CHARREF, c, Some("digit or ';'")).into()),
			};
			// anything past 0x10ffff is rejected below anyway
			value = (value * radix + digit).min(0x110000);
			digits += 1;
		}
		if digits == 0 {
			return Err(WFError::InvalidSyntax("character reference without digits").into())
		}
		match char::from_u32(value) {
			Some(c) if is_xml_char(c) => self.data.push(c),
			_ => return Err(WFError::InvalidChar(ERRCTX_CHARREF, value, true).into()),
		}
		self.boundary = EntityBoundary::Enabled;
		Ok(())
	}

	/**
	A general entity reference, after `&`.

	Internal entities are expanded in place. External parsed entities are
	only allowed where `external_allowed` is set, i.e. in content.
	*/
	pub(crate) fn parse_entity_ref(&mut self, external_allowed: bool) -> Result<()> {
		let name = self.read_name(true)?;
		self.require(';', ERRCTX_REF)?;
		self.boundary = EntityBoundary::Enabled;
		let decl = match self.dtd.entity(name) {
			Some(decl) => decl.clone(),
			None => return self.undeclared_entity(name),
		};
		let standalone_violation = self.standalone == Some(true) && decl.declared_externally;
		match decl.kind {
			EntityKind::Internal(text) => {
				if standalone_violation {
					return Err(WFError::StandaloneViolation(self.symbols.resolve(name).to_string()).into())
				}
				self.push_internal(Some(name), text.chars().collect())
			}
			EntityKind::Text(ids) => {
				if !external_allowed {
					return Err(WFError::ExternalEntityInAttribute(self.symbols.resolve(name).to_string()).into())
				}
				if standalone_violation {
					return Err(WFError::StandaloneViolation(self.symbols.resolve(name).to_string()).into())
				}
				self.push_external(false, name, &ids, None)
			}
			EntityKind::Unparsed(..) => {
				Err(WFError::UnparsedEntityReference(self.symbols.resolve(name).to_string()).into())
			}
		}
	}

	fn undeclared_entity(&mut self, name: Sym) -> Result<()> {
		let text = self.symbols.resolve(name).to_string();
		let permissive = self.has_ext_entity || self.dtd.skipped_pe;
		if self.standalone == Some(true) || !permissive {
			return Err(WFError::UndeclaredEntity(text).into())
		}
		self.validity_error(&format!("reference to undeclared general entity {}", text))?;
		if !self.in_literal {
			self.flush_data()?;
			self.handler.skipped_entity(&text)?;
		}
		Ok(())
	}

	/**
	A parameter entity reference, after `%`.

	Outside of literals the replacement text is padded with a space on both
	sides.
	*/
	pub(crate) fn parse_pe_reference(&mut self) -> Result<()> {
		let saved_expand_pe = self.expand_pe;
		self.expand_pe = false;
		let name = self.read_name(true);
		self.expand_pe = saved_expand_pe;
		let name = name?;
		self.require(';', ERRCTX_PEREF)?;

		let text = format!("%{}", self.symbols.resolve(name));
		let key = self.symbols.intern_str(&text);
		let kind = match self.dtd.entity(key) {
			Some(decl) => decl.kind.clone(),
			None => {
				let msg = format!("reference to undeclared parameter entity {}", text);
				return self.validity_error(&msg)
			}
		};
		let padded = !self.in_literal;
		match kind {
			EntityKind::Internal(value) => {
				let mut chars = Vec::with_capacity(value.len() + 2);
				if padded {
					chars.push(' ');
				}
				chars.extend(value.chars());
				if padded {
					chars.push(' ');
				}
				self.push_internal(Some(key), chars)
			}
			EntityKind::Text(ids) => {
				if padded {
					self.push_internal(None, vec![' '])?;
				}
				self.push_external(true, key, &ids, None)?;
				if padded {
					self.push_internal(None, vec![' '])?;
				}
				Ok(())
			}
			EntityKind::Unparsed(..) => Err(WFError::InvalidSyntax("parameter entities cannot be unparsed").into()),
		}
	}
}
