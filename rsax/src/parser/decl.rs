/*!
Element type, attribute-list, entity and notation declarations.
*/
use crate::dtd::{AttributeDecl, AttributeType, ContentType, Declared, DefaultMode, EntityDecl, EntityKind, ExternalId};
use crate::errctx::*;
use crate::error::{Result, WFError};
use crate::handler::{Handler, Occurrence};
use crate::lexer::LiteralFlags;
use crate::symbols::Sym;

use super::Parser;

impl<'h, H: Handler + ?Sized> Parser<'h, H> {
	/// Apply `resolve_dtd_uris` to identifiers about to be reported.
	fn reported_ids(&mut self, ids: &ExternalId) -> Result<ExternalId> {
		let mut out = ids.clone();
		if self.opts.resolve_dtd_uris {
			if let Some(sys) = ids.system_id.as_ref() {
				out.system_id = Some(self.handler.absolutize(ids.base_uri.as_deref(), sys, false)?);
			}
		}
		Ok(out)
	}

	/// elementdecl, after `<!ELEMENT`.
	pub(crate) fn parse_element_decl(&mut self) -> Result<()> {
		self.require_whitespace(ERRCTX_ELEMENTDECL)?;
		let name = self.read_name(true)?;
		self.require_whitespace(ERRCTX_ELEMENTDECL)?;
		self.parse_contentspec(name)?;
		self.skip_whitespace()?;
		self.require('>', ERRCTX_ELEMENTDECL)
	}

	fn parse_contentspec(&mut self, name: Sym) -> Result<()> {
		self.handler.start_content_model(self.symbols.resolve(name))?;
		if self.try_read_str("EMPTY")? {
			self.handler.content_model_empty()?;
			self.declare_element(name, ContentType::Empty, "EMPTY")?;
		} else if self.try_read_str("ANY")? {
			self.handler.content_model_any()?;
			self.declare_element(name, ContentType::Any, "ANY")?;
		} else {
			self.require('(', ERRCTX_CONTENTSPEC)?;
			let start = self.cur.id;
			let mut model = String::from("(");
			self.skip_whitespace()?;
			self.handler.content_model_start_group()?;
			if self.try_read_str("#PCDATA")? {
				model.push_str("#PCDATA");
				self.parse_mixed(start, &mut model)?;
				self.declare_element(name, ContentType::Mixed, &model)?;
			} else {
				self.parse_elements(start, &mut model)?;
				self.declare_element(name, ContentType::Elements, &model)?;
			}
		}
		self.handler.end_content_model()
	}

	fn declare_element(&mut self, name: Sym, content_type: ContentType, model: &str) -> Result<()> {
		let stored = match content_type {
			ContentType::Mixed | ContentType::Elements => Some(model.to_string()),
			_ => None,
		};
		match self.dtd.declare_element(name, content_type, stored) {
			Declared::Suppressed => return Ok(()),
			Declared::Duplicate => {
				let msg = format!("multiple declarations for element type: {}", self.symbols.resolve(name));
				self.validity_error(&msg)?;
			}
			Declared::New => (),
		}
		self.handler.element_decl(self.symbols.resolve(name), model)
	}

	fn read_occurrence(&mut self, model: &mut String) -> Result<Occurrence> {
		match self.read_char()? {
			Some(c) => match Occurrence::from_char(c) {
				Some(occ) => {
					model.push(c);
					Ok(occ)
				}
				None => {
					self.unread(c);
					Ok(Occurrence::Once)
				}
			},
			None => Ok(Occurrence::Once),
		}
	}

	fn check_group_nesting(&mut self, start: u64) -> Result<()> {
		if self.cur.id != start {
			self.validity_error("Illegal Group/PE nesting")?;
		}
		Ok(())
	}

	/// children content model, after the opening parenthesis.
	fn parse_elements(&mut self, start: u64, model: &mut String) -> Result<()> {
		self.skip_whitespace()?;
		self.parse_cp(model)?;
		self.skip_whitespace()?;
		let sep = match self.next_char(ERRCTX_CONTENTSPEC)? {
			')' => {
				self.check_group_nesting(start)?;
				model.push(')');
				let occ = self.read_occurrence(model)?;
				return self.handler.content_model_end_group(occ)
			}
			',' => {
				self.handler.content_model_sequence()?;
				','
			}
			'|' => {
				self.handler.content_model_choice()?;
				'|'
			}
			c => return Err(WFError::UnexpectedChar(ERRCTX_CONTENTSPEC, c, Some("',', '|' or ')'")).into()),
		};
		model.push(sep);

		loop {
			self.skip_whitespace()?;
			self.parse_cp(model)?;
			self.skip_whitespace()?;
			match self.next_char(ERRCTX_CONTENTSPEC)? {
				')' => {
					self.check_group_nesting(start)?;
					model.push(')');
					break
				}
				c if c == sep => model.push(c),
				',' | '|' => return Err(WFError::InvalidSyntax("bad separator in content model").into()),
				c => return Err(WFError::UnexpectedChar(ERRCTX_CONTENTSPEC, c, Some("separator or ')'")).into()),
			}
		}
		let occ = self.read_occurrence(model)?;
		self.handler.content_model_end_group(occ)
	}

	/// A content particle: a nested group or a name with its occurrence.
	fn parse_cp(&mut self, model: &mut String) -> Result<()> {
		if self.try_read('(')? {
			let start = self.cur.id;
			model.push('(');
			self.handler.content_model_start_group()?;
			return self.parse_elements(start, model)
		}
		let name = self.read_name(true)?;
		model.push_str(self.symbols.resolve(name));
		let occ = self.read_occurrence(model)?;
		self.handler.content_model_particle(self.symbols.resolve(name), occ)
	}

	/// Mixed content model, after `(#PCDATA`.
	fn parse_mixed(&mut self, start: u64, model: &mut String) -> Result<()> {
		self.handler.content_model_mixed()?;
		self.skip_whitespace()?;
		if self.try_read(')')? {
			self.check_group_nesting(start)?;
			model.push_str(")*");
			self.try_read('*')?;
			return self.handler.content_model_end_group(Occurrence::ZeroOrMore)
		}
		while !self.try_read(')')? {
			self.require('|', ERRCTX_CONTENTSPEC)?;
			model.push('|');
			self.skip_whitespace()?;
			let name = self.read_name(true)?;
			model.push_str(self.symbols.resolve(name));
			self.handler.content_model_particle(self.symbols.resolve(name), Occurrence::Once)?;
			self.skip_whitespace()?;
		}
		self.check_group_nesting(start)?;
		self.require('*', ERRCTX_CONTENTSPEC)?;
		model.push_str(")*");
		self.handler.content_model_end_group(Occurrence::ZeroOrMore)
	}

	/// AttlistDecl, after `<!ATTLIST`.
	pub(crate) fn parse_attlist_decl(&mut self) -> Result<()> {
		self.require_whitespace(ERRCTX_ATTLISTDECL)?;
		let element = self.read_name(true)?;
		let mut white = self.try_whitespace()?;
		while !self.try_read('>')? {
			if !white {
				return Err(WFError::InvalidSyntax("whitespace required before attribute definition").into())
			}
			self.parse_att_def(element)?;
			white = self.try_whitespace()?;
		}
		Ok(())
	}

	fn parse_att_def(&mut self, element: Sym) -> Result<()> {
		let name = self.read_name(true)?;
		self.require_whitespace(ERRCTX_ATTLISTDECL)?;
		let (ty, enumeration) = if self.try_read('(')? {
			(AttributeType::Enumeration, Some(self.parse_enumeration(false)?))
		} else {
			let keyword = self.read_name(true)?;
			match AttributeType::from_keyword(self.symbols.resolve(keyword)) {
				Some(AttributeType::Notation) => {
					self.require_whitespace(ERRCTX_ATTLISTDECL)?;
					self.require('(', ERRCTX_ATTLISTDECL)?;
					(AttributeType::Notation, Some(self.parse_enumeration(true)?))
				}
				Some(ty) => (ty, None),
				None => return Err(WFError::InvalidSyntax("illegal attribute type").into()),
			}
		};
		self.require_whitespace(ERRCTX_ATTLISTDECL)?;
		self.parse_default(element, name, ty, enumeration)
	}

	/// Enumeration or NotationType after the opening parenthesis; returns
	/// the canonical `(a|b)` form.
	fn parse_enumeration(&mut self, is_names: bool) -> Result<String> {
		let mut out = String::from("(");
		loop {
			self.skip_whitespace()?;
			let token = self.read_name(is_names)?;
			out.push_str(self.symbols.resolve(token));
			self.skip_whitespace()?;
			match self.next_char(ERRCTX_ATTLISTDECL)? {
				')' => break,
				'|' => out.push('|'),
				c => return Err(WFError::UnexpectedChar(ERRCTX_ATTLISTDECL, c, Some("'|' or ')'")).into()),
			}
		}
		out.push(')');
		Ok(out)
	}

	fn parse_default(&mut self, element: Sym, name: Sym, ty: AttributeType, enumeration: Option<String>) -> Result<()> {
		let mut flags = LiteralFlags::ATTRIBUTE;
		if !self.dtd.skipped_pe {
			flags = flags | LiteralFlags::ENTITY_REF;
			if ty != AttributeType::Cdata {
				flags = flags | LiteralFlags::NORMALIZE;
			}
		}
		let saved_expand_pe = self.expand_pe;
		self.expand_pe = false;
		let (mode, value) = if self.try_read('#')? {
			if self.try_read_str("FIXED")? {
				self.require_whitespace(ERRCTX_ATTLISTDECL)?;
				(DefaultMode::Fixed, Some(self.read_literal(flags)?))
			} else if self.try_read_str("REQUIRED")? {
				(DefaultMode::Required, None)
			} else if self.try_read_str("IMPLIED")? {
				(DefaultMode::Implied, None)
			} else {
				return Err(WFError::InvalidSyntax("illegal keyword for attribute default value").into())
			}
		} else {
			(DefaultMode::Specified, Some(self.read_literal(flags)?))
		};
		self.expand_pe = saved_expand_pe;

		let type_text = match (ty, enumeration.as_ref()) {
			(AttributeType::Enumeration, Some(e)) => e.clone(),
			(AttributeType::Notation, Some(e)) => format!("NOTATION {}", e),
			_ => ty.keyword().to_string(),
		};
		let decl = AttributeDecl{
			name,
			ty,
			enumeration,
			mode,
			default: value.clone(),
		};
		if self.dtd.declare_attribute(element, decl) == Declared::Suppressed {
			return Ok(())
		}
		self.handler.attribute_decl(
			self.symbols.resolve(element),
			self.symbols.resolve(name),
			&type_text,
			mode.keyword(),
			value.as_deref(),
		)
	}

	/// EntityDecl, after `<!ENTITY`.
	pub(crate) fn parse_entity_decl(&mut self) -> Result<()> {
		self.expand_pe = false;
		self.require_whitespace(ERRCTX_ENTITYDECL)?;
		let is_pe = if self.try_read('%')? {
			self.require_whitespace(ERRCTX_ENTITYDECL)?;
			true
		} else {
			false
		};
		self.expand_pe = true;

		let saved_colon = self.allow_colon;
		self.allow_colon = false;
		let name = self.read_name(true);
		self.allow_colon = saved_colon;
		let name = name?;
		let key = if is_pe {
			let text = format!("%{}", self.symbols.resolve(name));
			self.symbols.intern_str(&text)
		} else {
			name
		};
		self.require_whitespace(ERRCTX_ENTITYDECL)?;
		let declared_externally = self.declaring_externally();

		if matches!(self.peek_char()?, Some('"') | Some('\'')) {
			let value = self.read_literal(LiteralFlags::NONE)?;
			let decl = EntityDecl{
				kind: EntityKind::Internal(value.clone()),
				declared_externally,
			};
			if self.declare_entity(key, decl)? {
				self.handler.internal_entity_decl(self.symbols.resolve(key), &value)?;
			}
		} else {
			let ids = self.read_external_ids(false, false)?;
			let white = self.try_whitespace()?;
			if !is_pe && self.try_read_str("NDATA")? {
				if !white {
					return Err(WFError::InvalidSyntax("whitespace required before NDATA").into())
				}
				self.require_whitespace(ERRCTX_ENTITYDECL)?;
				let notation = self.read_name(true)?;
				let decl = EntityDecl{
					kind: EntityKind::Unparsed(ids.clone(), notation),
					declared_externally,
				};
				if self.declare_entity(key, decl)? {
					let reported = self.reported_ids(&ids)?;
					self.handler.unparsed_entity_decl(
						self.symbols.resolve(key),
						&reported,
						self.symbols.resolve(notation),
					)?;
				}
			} else {
				let decl = EntityDecl{
					kind: EntityKind::Text(ids.clone()),
					declared_externally,
				};
				if self.declare_entity(key, decl)? {
					let reported = self.reported_ids(&ids)?;
					self.handler.external_entity_decl(self.symbols.resolve(key), &reported)?;
				}
			}
		}
		self.skip_whitespace()?;
		self.require('>', ERRCTX_ENTITYDECL)
	}

	/// Declarations from the external subset or from inside a parameter
	/// entity count as external for the standalone checks.
	fn declaring_externally(&self) -> bool {
		if !self.cur.ctx.in_internal_subset {
			return true
		}
		let symbols = &self.symbols;
		std::iter::once(&self.cur)
			.chain(self.stack.iter())
			.filter_map(|frame| frame.name)
			.any(|name| symbols.resolve(name).starts_with('%'))
	}

	/// Record an entity; returns whether to report it.
	fn declare_entity(&mut self, name: Sym, decl: EntityDecl) -> Result<bool> {
		match self.dtd.declare_entity(name, decl) {
			Declared::New => Ok(true),
			Declared::Suppressed => Ok(false),
			Declared::Duplicate => {
				let msg = format!(
					"entity {} declared more than once; the first declaration is binding",
					self.symbols.resolve(name),
				);
				self.warning(&msg)?;
				Ok(true)
			}
		}
	}

	/// NotationDecl, after `<!NOTATION`.
	pub(crate) fn parse_notation_decl(&mut self) -> Result<()> {
		self.require_whitespace(ERRCTX_NOTATIONDECL)?;
		let saved_colon = self.allow_colon;
		self.allow_colon = false;
		let name = self.read_name(true);
		self.allow_colon = saved_colon;
		let name = name?;
		self.require_whitespace(ERRCTX_NOTATIONDECL)?;
		let ids = self.read_external_ids(true, false)?;
		match self.dtd.declare_notation(name, ids.clone()) {
			Declared::Suppressed => (),
			declared => {
				if declared == Declared::Duplicate {
					let msg = format!("Duplicate notation name decl: {}", self.symbols.resolve(name));
					self.validity_error(&msg)?;
				}
				let reported = self.reported_ids(&ids)?;
				self.handler.notation_decl(self.symbols.resolve(name), &reported)?;
			}
		}
		self.skip_whitespace()?;
		self.require('>', ERRCTX_NOTATIONDECL)
	}
}
