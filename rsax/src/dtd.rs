/*!
# DTD tables

Per-parse storage for element, attribute, entity and notation declarations.
All tables are keyed by [`Sym`] handles. Parameter entities share the entity
table under their `%`-prefixed name.

Declarations are never overwritten: the first declaration of any name wins.
*/
use std::collections::HashMap;

use crate::symbols::Sym;

/// Declared content type of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
	/// No `<!ELEMENT>` declaration seen.
	Undeclared,
	Any,
	Empty,
	/// `(#PCDATA ...)`
	Mixed,
	/// Element-only content; whitespace between children is ignorable.
	Elements,
}

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
	Cdata,
	Id,
	IdRef,
	IdRefs,
	Entity,
	Entities,
	NmToken,
	NmTokens,
	Enumeration,
	Notation,
}

impl AttributeType {
	pub fn from_keyword(s: &str) -> Option<AttributeType> {
		match s {
			"CDATA" => Some(Self::Cdata),
			"ID" => Some(Self::Id),
			"IDREF" => Some(Self::IdRef),
			"IDREFS" => Some(Self::IdRefs),
			"ENTITY" => Some(Self::Entity),
			"ENTITIES" => Some(Self::Entities),
			"NMTOKEN" => Some(Self::NmToken),
			"NMTOKENS" => Some(Self::NmTokens),
			"NOTATION" => Some(Self::Notation),
			_ => None,
		}
	}

	pub fn keyword(&self) -> &'static str {
		match self {
			Self::Cdata => "CDATA",
			Self::Id => "ID",
			Self::IdRef => "IDREF",
			Self::IdRefs => "IDREFS",
			Self::Entity => "ENTITY",
			Self::Entities => "ENTITIES",
			Self::NmToken => "NMTOKEN",
			Self::NmTokens => "NMTOKENS",
			Self::Enumeration => "ENUMERATION",
			Self::Notation => "NOTATION",
		}
	}
}

/// How the default value of an attribute applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultMode {
	/// A plain default literal.
	Specified,
	Implied,
	Required,
	Fixed,
}

impl DefaultMode {
	/// Keyword as reported to the handler; `None` for a plain default.
	pub fn keyword(&self) -> Option<&'static str> {
		match self {
			Self::Specified => None,
			Self::Implied => Some("#IMPLIED"),
			Self::Required => Some("#REQUIRED"),
			Self::Fixed => Some("#FIXED"),
		}
	}
}

/// One attribute definition from an `<!ATTLIST>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
	pub name: Sym,
	pub ty: AttributeType,
	/// Token list for [`AttributeType::Enumeration`] and
	/// [`AttributeType::Notation`], e.g. `(a|b)`.
	pub enumeration: Option<String>,
	pub mode: DefaultMode,
	/// Normalized default value.
	pub default: Option<String>,
}

/// Merged `<!ELEMENT>` and `<!ATTLIST>` information for one element type.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
	pub content_type: ContentType,
	/// Canonical content model string for mixed and element content.
	pub model: Option<String>,
	/// Attribute definitions in declaration order.
	pub attributes: Vec<AttributeDecl>,
}

impl ElementDecl {
	fn new() -> ElementDecl {
		ElementDecl{
			content_type: ContentType::Undeclared,
			model: None,
			attributes: Vec::new(),
		}
	}

	pub fn attribute(&self, name: Sym) -> Option<&AttributeDecl> {
		self.attributes.iter().find(|a| a.name == name)
	}
}

/// Public identifier, system identifier and the base URI the latter is
/// relative to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalId {
	pub public_id: Option<String>,
	pub system_id: Option<String>,
	pub base_uri: Option<String>,
}

/// The kind and payload of an entity declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
	/// Replacement text, stored verbatim.
	Internal(String),
	/// External parsed entity.
	Text(ExternalId),
	/// External unparsed entity with its notation.
	Unparsed(ExternalId, Sym),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDecl {
	pub kind: EntityKind,
	/// Declared outside of the document's internal subset (either in the
	/// external subset or inside an external parameter entity).
	pub declared_externally: bool,
}

/// Outcome of an attempt to record a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
	/// Recorded, report it.
	New,
	/// A declaration for that name existed already and was kept.
	Duplicate,
	/// Declarations are not binding anymore because a parameter entity
	/// was skipped.
	Suppressed,
}

/// All declarations of one document.
#[derive(Debug, Default)]
pub struct Dtd {
	elements: HashMap<Sym, ElementDecl>,
	entities: HashMap<Sym, EntityDecl>,
	notations: HashMap<Sym, ExternalId>,
	/// Set once a parameter entity reference could not be resolved.
	pub(crate) skipped_pe: bool,
}

impl Dtd {
	pub fn new() -> Dtd {
		Dtd::default()
	}

	pub fn clear(&mut self) {
		self.elements.clear();
		self.entities.clear();
		self.notations.clear();
		self.skipped_pe = false;
	}

	pub fn element(&self, name: Sym) -> Option<&ElementDecl> {
		self.elements.get(&name)
	}

	pub fn elements(&self) -> impl Iterator<Item = (&Sym, &ElementDecl)> {
		self.elements.iter()
	}

	pub fn content_type(&self, name: Sym) -> ContentType {
		self.elements.get(&name).map(|e| e.content_type).unwrap_or(ContentType::Undeclared)
	}

	pub fn attribute(&self, element: Sym, name: Sym) -> Option<&AttributeDecl> {
		self.elements.get(&element).and_then(|e| e.attribute(name))
	}

	pub fn entity(&self, name: Sym) -> Option<&EntityDecl> {
		self.entities.get(&name)
	}

	pub fn notation(&self, name: Sym) -> Option<&ExternalId> {
		self.notations.get(&name)
	}

	/// Record the content type of an element.
	///
	/// An element which so far only had attributes declared gets its
	/// content type filled in.
	pub fn declare_element(&mut self, name: Sym, content_type: ContentType, model: Option<String>) -> Declared {
		if self.skipped_pe {
			return Declared::Suppressed
		}
		let decl = self.elements.entry(name).or_insert_with(ElementDecl::new);
		if decl.content_type != ContentType::Undeclared {
			return Declared::Duplicate
		}
		decl.content_type = content_type;
		decl.model = model;
		Declared::New
	}

	pub fn declare_attribute(&mut self, element: Sym, attr: AttributeDecl) -> Declared {
		if self.skipped_pe {
			return Declared::Suppressed
		}
		let decl = self.elements.entry(element).or_insert_with(ElementDecl::new);
		if decl.attribute(attr.name).is_some() {
			return Declared::Duplicate
		}
		decl.attributes.push(attr);
		Declared::New
	}

	pub fn declare_entity(&mut self, name: Sym, decl: EntityDecl) -> Declared {
		if self.skipped_pe {
			return Declared::Suppressed
		}
		if self.entities.contains_key(&name) {
			return Declared::Duplicate
		}
		self.entities.insert(name, decl);
		Declared::New
	}

	pub fn declare_notation(&mut self, name: Sym, id: ExternalId) -> Declared {
		if self.skipped_pe {
			return Declared::Suppressed
		}
		if self.notations.contains_key(&name) {
			return Declared::Duplicate
		}
		self.notations.insert(name, id);
		Declared::New
	}
}
