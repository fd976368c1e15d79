pub const ERRCTX_UNKNOWN: &'static str = "in unknown context";
pub const ERRCTX_DOCBEGIN: &'static str = "at document begin";
pub const ERRCTX_DOCEND: &'static str = "after document element";
pub const ERRCTX_XML_DECL: &'static str = "in XML declaration";
pub const ERRCTX_TEXT_DECL: &'static str = "in text declaration";
pub const ERRCTX_COMMENT: &'static str = "in comment";
pub const ERRCTX_PI: &'static str = "in processing instruction";
pub const ERRCTX_CDATA_SECTION: &'static str = "in CDATA section";
pub const ERRCTX_TEXT: &'static str = "in text";
pub const ERRCTX_ELEMENT: &'static str = "in element header";
pub const ERRCTX_ELEMENT_FOOT: &'static str = "in element footer";
pub const ERRCTX_ATTVAL: &'static str = "in attribute value";
pub const ERRCTX_NAME: &'static str = "in name";
pub const ERRCTX_NAMESTART: &'static str = "at start of name";
pub const ERRCTX_REF: &'static str = "in entity reference";
pub const ERRCTX_CHARREF: &'static str = "in character reference";
pub const ERRCTX_PEREF: &'static str = "in parameter entity reference";
pub const ERRCTX_LITERAL: &'static str = "in literal";
pub const ERRCTX_DOCTYPE: &'static str = "in document type declaration";
pub const ERRCTX_MARKUPDECL: &'static str = "in markup declaration";
pub const ERRCTX_ELEMENTDECL: &'static str = "in element type declaration";
pub const ERRCTX_CONTENTSPEC: &'static str = "in content model";
pub const ERRCTX_ATTLISTDECL: &'static str = "in attribute-list declaration";
pub const ERRCTX_ENTITYDECL: &'static str = "in entity declaration";
pub const ERRCTX_NOTATIONDECL: &'static str = "in notation declaration";
pub const ERRCTX_EXTERNAL_ID: &'static str = "in external identifier";
pub const ERRCTX_CONDITIONAL: &'static str = "in conditional section";
