/*!
Entering and leaving entities.
*/
use std::mem;

use log::{debug, trace};

use crate::dtd::ExternalId;
use crate::encoding::{bom_length, sniff, Encoding};
use crate::error::{Result, WFError};
use crate::handler::{Handler, InputSource};
use crate::input::{EntityBoundary, EntityType, Frame, Source, StreamSource};
use crate::symbols::Sym;

use super::Parser;

impl<'h, H: Handler + ?Sized> Parser<'h, H> {
	fn alloc_frame_id(&mut self) -> u64 {
		let id = self.next_frame_id;
		self.next_frame_id += 1;
		id
	}

	pub(crate) fn check_entity_recursion(&self, name: Sym) -> Result<()> {
		if self.boundary != EntityBoundary::Enabled {
			return Err(WFError::EntityBoundary(self.boundary.production()).into())
		}
		if self.cur.name == Some(name) || self.stack.iter().any(|f| f.name == Some(name)) {
			return Err(WFError::RecursiveEntity(self.symbols.resolve(name).to_string()).into())
		}
		Ok(())
	}

	/**
	Enter an external entity.

	Without an explicit `source`, the handler is asked to resolve `ids`
	first; if it declines, the entity is skipped. The document entity itself
	is entered through here as well, when the input stack is still empty.
	*/
	pub(crate) fn push_external(&mut self, is_pe: bool, name: Sym, ids: &ExternalId, source: Option<InputSource>) -> Result<()> {
		let is_document = self.stack.is_empty() && matches!(self.cur.source, Source::None);
		if !is_document {
			self.check_entity_recursion(name)?;
			self.has_ext_entity = true;
		}
		if !is_pe {
			self.flush_data()?;
		}
		let system_id = match ids.system_id.as_ref() {
			Some(sys) => Some(self.handler.absolutize(ids.base_uri.as_deref(), sys, false)?),
			None => None,
		};
		let entity_name = self.symbols.resolve(name).to_string();

		let source = match source {
			Some(source) => source,
			None => {
				let id = ExternalId{
					public_id: ids.public_id.clone(),
					system_id: system_id.clone(),
					base_uri: ids.base_uri.clone(),
				};
				match self.handler.resolve_entity(is_pe, &entity_name, &id, ids.base_uri.as_deref())? {
					Some(mut source) => {
						if source.system_id.is_none() {
							if let Some(sys) = system_id {
								self.warning(&format!("missing system ID, using {}", sys))?;
								source.system_id = Some(sys);
							}
						}
						source
					}
					None => {
						debug!("entity {} skipped by resolver", entity_name);
						self.warning(&format!("skipping entity: {}", entity_name))?;
						self.handler.skipped_entity(&entity_name)?;
						if is_pe {
							self.dtd.skipped_pe = true;
						}
						return Ok(())
					}
				}
			}
		};

		let (reader, is_text, system_id, hint) = source.open()?;
		debug!(
			"opened external entity {} ({})",
			entity_name,
			system_id.as_deref().unwrap_or("no system id"),
		);
		if is_document {
			self.handler.start_document()?;
		}
		self.handler.start_external_entity(&entity_name, system_id.as_deref(), is_document)?;

		let mut ctx = self.cur.ctx;
		ctx.entity_balance = 0;
		ctx.entity_type = if is_document {
			EntityType::Document
		} else if is_pe {
			ctx.in_internal_subset = false;
			EntityType::ExtPe
		} else {
			EntityType::ExtGe
		};
		let frame = Frame{
			id: self.alloc_frame_id(),
			name: Some(name),
			source: Source::Stream(StreamSource::new(reader)),
			buf: Vec::new(),
			pos: 0,
			line: 1,
			column: 0,
			system_id,
			ctx,
			pushback: false,
		};
		let parent = mem::replace(&mut self.cur, frame);
		if !is_document {
			self.stack.push(parent);
		}
		trace!("entered external entity {} at depth {}", entity_name, self.stack.len());

		self.detect_encoding(is_text, hint.as_deref())
	}

	/// Enter replacement text. Unnamed frames are used to pad parameter
	/// entity expansions with spaces.
	pub(crate) fn push_internal(&mut self, name: Option<Sym>, text: Vec<char>) -> Result<()> {
		let mut ctx = self.cur.ctx;
		if let Some(name) = name {
			self.check_entity_recursion(name)?;
			ctx.entity_balance = 0;
			if self.do_report {
				self.flush_data()?;
				self.handler.start_internal_entity(self.symbols.resolve(name))?;
			}
		}
		let frame = Frame{
			id: self.alloc_frame_id(),
			name,
			source: Source::Internal,
			buf: text,
			pos: 0,
			line: self.cur.line,
			column: self.cur.column,
			system_id: None,
			ctx,
			pushback: false,
		};
		let parent = mem::replace(&mut self.cur, frame);
		self.stack.push(parent);
		trace!("entered internal frame at depth {}", self.stack.len());
		Ok(())
	}

	/// Put characters back which were already read from the active frame.
	pub(crate) fn push_pushback(&mut self, chars: Vec<char>) {
		let frame = Frame{
			id: self.cur.id,
			name: None,
			source: Source::Internal,
			buf: chars,
			pos: 0,
			line: self.cur.line,
			column: self.cur.column,
			system_id: None,
			ctx: self.cur.ctx,
			pushback: true,
		};
		let parent = mem::replace(&mut self.cur, frame);
		self.stack.push(parent);
	}

	/// Load more characters into the active frame, or leave it if it is
	/// exhausted. Returns false at the end of the document entity.
	pub(crate) fn refill(&mut self) -> Result<bool> {
		let chunk = self.opts.read_buffer_size;
		if let Source::Stream(ref mut s) = self.cur.source {
			self.cur.buf.clear();
			self.cur.pos = 0;
			if s.fill(&mut self.cur.buf, chunk)? {
				return Ok(true)
			}
		}
		self.pop_input()
	}

	/**
	Leave the active frame.

	Reports the end of named entities and checks that nothing which must
	start and end in the same entity spans its end. Synthetic frames hand
	their scanner state back to the parent. Returns false when the document
	entity was left.
	*/
	pub(crate) fn pop_input(&mut self) -> Result<bool> {
		let name = self.cur.name;
		if name.is_some() {
			if !self.stack.is_empty() && self.boundary != EntityBoundary::Enabled {
				return Err(WFError::EntityBoundary(self.boundary.production()).into())
			}
			if self.do_report {
				self.flush_data()?;
			}
		}
		match (&self.cur.source, name) {
			(Source::None, _) => return Ok(false),
			(Source::Stream(_), Some(name)) => {
				let name = self.symbols.resolve(name);
				debug!("closing external entity {}", name);
				self.handler.end_external_entity(name)?;
			}
			(Source::Internal, Some(name)) if self.do_report => {
				self.handler.end_internal_entity(self.symbols.resolve(name))?;
			}
			_ => (),
		}

		if self.stack.is_empty() {
			let mut done = Frame::empty();
			done.line = self.cur.line;
			done.column = self.cur.column;
			done.system_id = self.cur.system_id.take();
			self.cur = done;
			return Ok(false)
		}
		if let Some(name) = name {
			if self.cur.ctx.entity_balance != 0 {
				return Err(WFError::UnbalancedEntity(self.symbols.resolve(name).to_string()).into())
			}
		}
		let parent = match self.stack.pop() {
			Some(parent) => parent,
			None => return Ok(false),
		};
		let done = mem::replace(&mut self.cur, parent);
		if done.name.is_none() {
			self.cur.ctx = done.ctx;
			if done.pushback {
				self.cur.line = done.line;
				self.cur.column = done.column;
			}
		}
		trace!("left frame, depth now {}", self.stack.len());
		Ok(true)
	}

	/// Settle the encoding of a freshly entered stream frame and parse its
	/// XML or text declaration, if any.
	fn detect_encoding(&mut self, is_text: bool, hint: Option<&str>) -> Result<()> {
		let chunk = self.opts.read_buffer_size;
		let ignore_declared = if is_text {
			true
		} else {
			let Frame{source, buf, ..} = &mut self.cur;
			let s = match source {
				Source::Stream(s) => s,
				_ => return Ok(()),
			};
			s.fill_raw(4, chunk)?;
			match hint {
				Some(label) => {
					s.encoding = Encoding::for_hint(label, s.raw())?;
					let bom = bom_length(s.encoding, s.raw());
					s.skip_raw(bom);
					s.switchable = false;
					true
				}
				None => {
					let sig = sniff(s.raw())?;
					s.encoding = sig.encoding;
					s.skip_raw(sig.bom);
					s.switchable = sig.bom == 0;
					if sig.declaration {
						s.prefetch_declaration(buf, chunk)?;
					}
					false
				}
			}
		};
		if let Some(enc) = self.cur.encoding() {
			debug!("detected encoding {}", enc.name());
			if self.stack.is_empty() {
				self.document_encoding = Some(enc);
			}
		}
		self.try_encoding_decl(ignore_declared)
	}

	fn try_encoding_decl(&mut self, ignore_declared: bool) -> Result<()> {
		if !self.try_read_str("<?xml")? {
			return Ok(())
		}
		if self.try_whitespace()? {
			if self.cur.ctx.entity_type == EntityType::Document {
				self.parse_xml_decl(ignore_declared)
			} else {
				self.parse_text_decl(ignore_declared)
			}
		} else {
			// some other PI, like <?xml-stylesheet ...?>
			let start: Vec<char> = "<?xml".chars().collect();
			self.unread_span(&start);
			Ok(())
		}
	}

	/// Apply the `encoding` pseudo-attribute of a declaration.
	pub(crate) fn switch_encoding(&mut self, label: &str) -> Result<()> {
		let s = match self.cur.source {
			Source::Stream(ref mut s) => s,
			_ => return Ok(()),
		};
		let next = s.encoding.switch_to(label)?;
		if next == s.encoding {
			return Ok(())
		}
		if !s.switchable {
			return Err(WFError::InvalidEncodingSwitch(s.encoding.name(), label.to_string()).into())
		}
		debug!("switching encoding from {} to {}", s.encoding.name(), next.name());
		s.encoding = next;
		if self.stack.is_empty() {
			self.document_encoding = Some(next);
		}
		Ok(())
	}
}
