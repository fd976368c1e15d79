/*!
Document structure, declarations and the DTD.
*/
use rsax_validation::validate_encoding_name;

use crate::dtd::ExternalId;
use crate::errctx::*;
use crate::error::{Result, WFError};
use crate::handler::{Handler, InputSource};
use crate::lexer::LiteralFlags;
use crate::symbols::Sym;

use super::{Parser, DTD_ENTITY};

impl<'h, H: Handler + ?Sized> Parser<'h, H> {
	/// document ::= prolog element Misc*
	pub(crate) fn parse_document(&mut self) -> Result<()> {
		let saw_doctype = self.parse_prolog()?;
		self.require('<', ERRCTX_DOCBEGIN)?;
		self.parse_element(!saw_doctype)?;
		self.parse_misc()?;
		match self.read_char()? {
			None => Ok(()),
			Some(c) => Err(WFError::UnexpectedChar(ERRCTX_DOCEND, c, None).into()),
		}
	}

	/// Comments, processing instructions and whitespace.
	fn parse_misc(&mut self) -> Result<()> {
		loop {
			self.skip_whitespace()?;
			if self.try_read_str("<?")? {
				self.parse_pi()?;
			} else if self.try_read_str("<!--")? {
				self.parse_comment()?;
			} else {
				return Ok(())
			}
		}
	}

	/// Returns true if a document type declaration was found.
	fn parse_prolog(&mut self) -> Result<bool> {
		self.parse_misc()?;
		if self.try_read_str("<!DOCTYPE")? {
			self.parse_doctypedecl()?;
			self.parse_misc()?;
			return Ok(true)
		}
		Ok(false)
	}

	pub(crate) fn parse_eq(&mut self, ctx: &'static str) -> Result<()> {
		self.skip_whitespace()?;
		self.require('=', ctx)?;
		self.skip_whitespace()
	}

	fn read_encoding_decl(&mut self, ignore_declared: bool, ctx: &'static str) -> Result<String> {
		self.parse_eq(ctx)?;
		let flags = LiteralFlags::DISABLE_CREF | LiteralFlags::DISABLE_PE | LiteralFlags::DISABLE_EREF;
		let label = self.read_literal(flags)?;
		if validate_encoding_name(&label).is_err() {
			return Err(WFError::InvalidEncodingName(label).into())
		}
		if !ignore_declared {
			self.switch_encoding(&label)?;
		}
		Ok(label)
	}

	fn read_version(&mut self, ctx: &'static str) -> Result<String> {
		self.parse_eq(ctx)?;
		let flags = LiteralFlags::DISABLE_CREF | LiteralFlags::DISABLE_PE | LiteralFlags::DISABLE_EREF;
		let version = self.read_literal(flags)?;
		if version != "1.0" {
			return Err(WFError::UnsupportedVersion(version).into())
		}
		Ok(version)
	}

	/// The XML declaration, after `<?xml` and whitespace.
	pub(crate) fn parse_xml_decl(&mut self, ignore_declared: bool) -> Result<()> {
		self.require_str("version", ERRCTX_XML_DECL)?;
		let version = self.read_version(ERRCTX_XML_DECL)?;

		let mut white = self.try_whitespace()?;
		let mut encoding = None;
		if self.try_read_str("encoding")? {
			if !white {
				return Err(WFError::InvalidSyntax("whitespace required before 'encoding='").into())
			}
			encoding = Some(self.read_encoding_decl(ignore_declared, ERRCTX_XML_DECL)?);
			white = self.try_whitespace()?;
		}

		let mut standalone = None;
		if self.try_read_str("standalone")? {
			if !white {
				return Err(WFError::InvalidSyntax("whitespace required before 'standalone='").into())
			}
			self.parse_eq(ERRCTX_XML_DECL)?;
			let flags = LiteralFlags::DISABLE_CREF | LiteralFlags::DISABLE_PE | LiteralFlags::DISABLE_EREF;
			let value = self.read_literal(flags)?;
			standalone = match value.as_str() {
				"yes" => Some(true),
				"no" => Some(false),
				_ => return Err(WFError::InvalidStandalone(value).into()),
			};
		}

		self.skip_whitespace()?;
		self.require_str("?>", ERRCTX_XML_DECL)?;

		self.standalone = standalone;
		self.xml_version = Some(version.clone());
		self.declared_encoding = encoding.clone();
		self.handler.xml_declaration(&version, encoding.as_deref(), standalone)
	}

	/// The text declaration of an external entity, after `<?xml` and
	/// whitespace.
	pub(crate) fn parse_text_decl(&mut self, ignore_declared: bool) -> Result<()> {
		if self.try_read_str("version")? {
			self.read_version(ERRCTX_TEXT_DECL)?;
			self.require_whitespace(ERRCTX_TEXT_DECL)?;
		}
		self.require_str("encoding", ERRCTX_TEXT_DECL)?;
		self.read_encoding_decl(ignore_declared, ERRCTX_TEXT_DECL)?;
		self.skip_whitespace()?;
		self.require_str("?>", ERRCTX_TEXT_DECL)
	}

	/// A processing instruction, after `<?`.
	pub(crate) fn parse_pi(&mut self) -> Result<()> {
		let saved_expand_pe = self.expand_pe;
		self.expand_pe = false;
		let saved_colon = self.allow_colon;
		self.allow_colon = false;
		let target = self.read_name(true);
		self.allow_colon = saved_colon;
		let target = target?;
		if self.symbols.resolve(target).eq_ignore_ascii_case("xml") {
			return Err(WFError::ReservedTarget(self.symbols.resolve(target).to_string()).into())
		}
		let start = self.data.len();
		if !self.try_read_str("?>")? {
			self.require_whitespace(ERRCTX_PI)?;
			self.parse_until("?>", ERRCTX_PI)?;
		}
		self.expand_pe = saved_expand_pe;
		let data = self.data.take_from(start);
		self.handler.processing_instruction(self.symbols.resolve(target), &data)
	}

	/// A comment, after `<!--`.
	pub(crate) fn parse_comment(&mut self) -> Result<()> {
		let saved_expand_pe = self.expand_pe;
		self.expand_pe = false;
		let start = self.data.len();
		self.parse_until("--", ERRCTX_COMMENT)?;
		match self.next_char(ERRCTX_COMMENT)? {
			'>' => (),
			c => return Err(WFError::UnexpectedChar(ERRCTX_COMMENT, c, Some("'>' after '--'")).into()),
		}
		self.expand_pe = saved_expand_pe;
		let text = self.data.take_from(start);
		self.handler.comment(&text)
	}

	/// Markup declarations up to the given end of the subset.
	fn parse_subset_decls(&mut self, end: SubsetEnd) -> Result<()> {
		loop {
			self.do_report = true;
			self.expand_pe = true;
			self.skip_whitespace()?;
			self.do_report = false;
			self.expand_pe = false;
			let done = match end {
				SubsetEnd::Bracket => self.try_read(']')?,
				SubsetEnd::Document => self.stack.is_empty(),
				SubsetEnd::Sentinel => self.try_read('>')?,
			};
			if done {
				return Ok(())
			}
			self.parse_markupdecl()?;
		}
	}

	/// The document type declaration, after `<!DOCTYPE`.
	fn parse_doctypedecl(&mut self) -> Result<()> {
		self.require_whitespace(ERRCTX_DOCTYPE)?;
		let root = self.read_name(true)?;
		self.skip_whitespace()?;
		let ids = self.read_external_ids(false, true)?;
		self.handler.doctype_decl(
			self.symbols.resolve(root),
			ids.public_id.as_deref(),
			ids.system_id.as_deref(),
		)?;

		self.skip_whitespace()?;
		if self.try_read('[')? {
			self.cur.ctx.in_internal_subset = true;
			self.parse_subset_decls(SubsetEnd::Bracket)?;
			self.cur.ctx.in_internal_subset = false;
		}
		self.skip_whitespace()?;
		self.require('>', ERRCTX_DOCTYPE)?;

		let subset = if ids.system_id.is_none() {
			let base = self.base_uri().map(String::from);
			self.handler.get_external_subset(self.symbols.resolve(root), base.as_deref())?
		} else {
			None
		};
		let dtd = self.symbols.intern_str(DTD_ENTITY);
		if ids.system_id.is_some() {
			self.push_external(true, dtd, &ids, None)?;
			self.parse_subset_decls(SubsetEnd::Document)?;
		} else if let Some(source) = subset {
			self.warning("modifying document by adding external subset")?;
			let ids = source_ids(&source);
			self.push_external(true, dtd, &ids, Some(source))?;
			self.parse_subset_decls(SubsetEnd::Document)?;
		}

		self.handler.end_doctype()?;
		self.expand_pe = false;
		self.do_report = true;
		Ok(())
	}

	/**
	Ask the handler for an external subset for a document without a
	DOCTYPE and read it as if the document had declared it.
	*/
	pub(crate) fn get_subset_for_root(&mut self, root: Sym) -> Result<()> {
		let base = self.base_uri().map(String::from);
		let source = match self.handler.get_external_subset(self.symbols.resolve(root), base.as_deref())? {
			Some(source) => source,
			None => return Ok(()),
		};
		self.warning("modifying document by adding DTD")?;
		self.handler.doctype_decl(
			self.symbols.resolve(root),
			source.public_id.as_deref(),
			source.system_id.as_deref(),
		)?;
		// the subset is followed by a synthetic '>' which marks its end
		self.push_internal(None, vec!['>'])?;
		let ids = source_ids(&source);
		let dtd = self.symbols.intern_str(DTD_ENTITY);
		self.push_external(true, dtd, &ids, Some(source))?;
		self.parse_subset_decls(SubsetEnd::Sentinel)?;
		if self.stack.len() != 1 {
			return Err(WFError::InvalidSyntax("external subset has unmatched '>'").into())
		}
		self.handler.end_doctype()?;
		self.expand_pe = false;
		self.do_report = true;
		Ok(())
	}

	/// One markup declaration, PI, comment or conditional section.
	pub(crate) fn parse_markupdecl(&mut self) -> Result<()> {
		self.expand_pe = true;
		self.cur.ctx.in_declaration = true;
		let saved_between = self.cur.ctx.in_pe_ref_between_decls;

		self.require('<', ERRCTX_MARKUPDECL)?;
		self.unread('<');
		self.expand_pe = false;
		let start = self.cur.id;

		if self.try_read_str("<!ELEMENT")? {
			self.expand_pe = true;
			self.parse_element_decl()?;
			self.check_decl_nesting(start)?;
		} else if self.try_read_str("<!ATTLIST")? {
			self.expand_pe = true;
			self.parse_attlist_decl()?;
			self.check_decl_nesting(start)?;
		} else if self.try_read_str("<!ENTITY")? {
			self.expand_pe = true;
			self.parse_entity_decl()?;
			self.check_decl_nesting(start)?;
		} else if self.try_read_str("<!NOTATION")? {
			self.expand_pe = true;
			self.parse_notation_decl()?;
			self.check_decl_nesting(start)?;
		} else if self.try_read_str("<?")? {
			self.cur.ctx.in_declaration = false;
			self.parse_pi()?;
			self.check_decl_nesting(start)?;
		} else if self.try_read_str("<!--")? {
			self.cur.ctx.in_declaration = false;
			self.parse_comment()?;
			self.check_decl_nesting(start)?;
		} else if self.try_read_str("<![")? {
			self.expand_pe = true;
			if self.cur.ctx.in_internal_subset {
				if self.try_read_str("CDATA")? {
					return Err(WFError::InvalidSyntax("CDATA sections not permitted between markup declarations").into())
				}
				return Err(WFError::InvalidSyntax("conditional sections illegal in internal subset").into())
			}
			self.parse_conditional_sect(start)?;
		} else {
			let c = self.next_char(ERRCTX_MARKUPDECL)?;
			return Err(WFError::UnexpectedChar(ERRCTX_MARKUPDECL, c, Some("markup declaration")).into())
		}

		if self.cur.id != start && saved_between {
			return Err(WFError::InvalidSyntax(
				"parameter entity replacement text must contain complete markup declarations"
			).into())
		}
		self.cur.ctx.in_declaration = false;
		self.expand_pe = false;
		Ok(())
	}

	fn check_decl_nesting(&mut self, start: u64) -> Result<()> {
		if self.cur.id != start {
			self.validity_error("Illegal Declaration/PE nesting")?;
		}
		Ok(())
	}

	/// A conditional section, after `<![`.
	fn parse_conditional_sect(&mut self, start: u64) -> Result<()> {
		self.skip_whitespace()?;
		if self.try_read_str("INCLUDE")? {
			self.skip_whitespace()?;
			self.require('[', ERRCTX_CONDITIONAL)?;
			self.check_decl_nesting(start)?;
			self.skip_whitespace()?;
			while !self.try_read_str("]]>")? {
				self.parse_markupdecl()?;
				// a PE reference may start the next declaration
				self.expand_pe = true;
				self.skip_whitespace()?;
				self.expand_pe = false;
			}
		} else if self.try_read_str("IGNORE")? {
			self.skip_whitespace()?;
			self.require('[', ERRCTX_CONDITIONAL)?;
			self.check_decl_nesting(start)?;
			self.expand_pe = false;
			let mut depth = 1;
			while depth > 0 {
				match self.next_char(ERRCTX_CONDITIONAL)? {
					'<' => if self.try_read_str("![")? {
						depth += 1;
					},
					']' => if self.try_read_str("]>")? {
						depth -= 1;
					},
					_ => (),
				}
			}
		} else {
			return Err(WFError::InvalidSyntax("conditional section must start with INCLUDE or IGNORE").into())
		}
		Ok(())
	}

	/**
	ExternalID, or PublicID in notation declarations.

	Returns empty identifiers if neither keyword follows and `optional` is
	set (document type declarations).
	*/
	pub(crate) fn read_external_ids(&mut self, in_notation: bool, optional: bool) -> Result<ExternalId> {
		let flags = LiteralFlags::DISABLE_CREF | LiteralFlags::DISABLE_PE | LiteralFlags::DISABLE_EREF;
		let mut ids = ExternalId::default();
		if self.try_read_str("PUBLIC")? {
			self.require_whitespace(ERRCTX_EXTERNAL_ID)?;
			let public_id = self.read_literal(LiteralFlags::NORMALIZE | LiteralFlags::PUBID | flags)?;
			if let Err(rsax_validation::Error::InvalidChar(c)) = rsax_validation::validate_pubid(&public_id) {
				return Err(WFError::InvalidPubidChar(c).into())
			}
			ids.public_id = Some(public_id);
			if in_notation {
				self.skip_whitespace()?;
				if matches!(self.peek_char()?, Some('"') | Some('\'')) {
					ids.system_id = Some(self.read_literal(flags)?);
				}
			} else {
				self.require_whitespace(ERRCTX_EXTERNAL_ID)?;
				ids.system_id = Some(self.read_literal(flags)?);
			}
		} else if self.try_read_str("SYSTEM")? {
			self.require_whitespace(ERRCTX_EXTERNAL_ID)?;
			ids.system_id = Some(self.read_literal(flags)?);
		} else if !optional {
			return Err(WFError::InvalidSyntax("missing SYSTEM or PUBLIC keyword").into())
		}

		if let Some(sys) = ids.system_id.as_ref() {
			if sys.contains('#') {
				let msg = format!("SYSTEM id has a URI fragment: {}", sys);
				self.validity_error(&msg)?;
			}
			ids.base_uri = self.base_uri().map(String::from);
			if ids.base_uri.is_none() {
				let msg = format!("No base URI; hope URI is absolute: {}", sys);
				self.warning(&msg)?;
			}
		}
		Ok(ids)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubsetEnd {
	/// `]` closes the internal subset.
	Bracket,
	/// The external subset ends when its entity does.
	Document,
	/// A synthetic `>` follows a subset supplied by the handler.
	Sentinel,
}

fn source_ids(source: &InputSource) -> ExternalId {
	ExternalId{
		public_id: source.public_id.clone(),
		system_id: source.system_id.clone(),
		base_uri: None,
	}
}

