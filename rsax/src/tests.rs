use super::*;

use std::cell::Cell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Ev {
	StartDocument,
	EndDocument,
	XmlDecl(String, Option<String>, Option<bool>),
	Doctype(String, Option<String>, Option<String>),
	EndDoctype,
	PushContext,
	PopContext,
	StartElement(String),
	EndElement(String),
	Attr(String, String, bool, bool),
	Chars(String),
	Ignorable(String),
	StartCdata,
	EndCdata,
	Comment(String),
	Pi(String, String),
	ElementDecl(String, String),
	AttributeDecl(String, String, String, Option<String>, Option<String>),
	InternalEntity(String, String),
	ExternalEntity(String, Option<String>, Option<String>),
	Unparsed(String, Option<String>, String),
	Notation(String, Option<String>, Option<String>),
	Model(String),
	StartExternal(String),
	EndExternal(String),
	StartInternal(String),
	EndInternal(String),
	Skipped(String),
	Warning(String),
	Validity(String),
	Fatal,
}

/// Records every event. External entities are served from `files`, keyed
/// by their (absolutized) system id; anything else is skipped.
#[derive(Default)]
struct Recorder {
	events: Vec<Ev>,
	files: HashMap<String, String>,
	subset: Option<(String, String)>,
}

impl Recorder {
	fn with_file(mut self, system_id: &str, text: &str) -> Self {
		self.files.insert(system_id.to_string(), text.to_string());
		self
	}

	fn with_subset(mut self, system_id: &str, text: &str) -> Self {
		self.subset = Some((system_id.to_string(), text.to_string()));
		self
	}

	/// Document content only: elements, attributes, text and the document
	/// bracket.
	fn content(&self) -> Vec<Ev> {
		self.events.iter().filter(|ev| matches!(ev,
			Ev::StartDocument | Ev::EndDocument | Ev::StartElement(_) | Ev::EndElement(_) |
			Ev::Attr(..) | Ev::Chars(_) | Ev::Ignorable(_) | Ev::StartCdata | Ev::EndCdata
		)).cloned().collect()
	}

	fn text(&self) -> String {
		let mut out = String::new();
		for ev in self.events.iter() {
			if let Ev::Chars(s) = ev {
				out.push_str(s);
			}
		}
		out
	}

	fn has(&self, ev: &Ev) -> bool {
		self.events.iter().any(|x| x == ev)
	}
}

fn opt(s: Option<&str>) -> Option<String> {
	s.map(String::from)
}

impl Handler for Recorder {
	fn start_document(&mut self) -> Result<()> {
		self.events.push(Ev::StartDocument);
		Ok(())
	}

	fn end_document(&mut self) -> Result<()> {
		self.events.push(Ev::EndDocument);
		Ok(())
	}

	fn xml_declaration(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) -> Result<()> {
		self.events.push(Ev::XmlDecl(version.to_string(), opt(encoding), standalone));
		Ok(())
	}

	fn doctype_decl(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Result<()> {
		self.events.push(Ev::Doctype(name.to_string(), opt(public_id), opt(system_id)));
		Ok(())
	}

	fn end_doctype(&mut self) -> Result<()> {
		self.events.push(Ev::EndDoctype);
		Ok(())
	}

	fn push_context(&mut self) -> Result<()> {
		self.events.push(Ev::PushContext);
		Ok(())
	}

	fn pop_context(&mut self) -> Result<()> {
		self.events.push(Ev::PopContext);
		Ok(())
	}

	fn start_element(&mut self, name: &str) -> Result<()> {
		self.events.push(Ev::StartElement(name.to_string()));
		Ok(())
	}

	fn end_element(&mut self, name: &str) -> Result<()> {
		self.events.push(Ev::EndElement(name.to_string()));
		Ok(())
	}

	fn attribute(&mut self, attr: &Attribute<'_>) -> Result<()> {
		self.events.push(Ev::Attr(attr.name.to_string(), attr.value.to_string(), attr.specified, attr.is_id));
		Ok(())
	}

	fn characters(&mut self, text: &str) -> Result<()> {
		self.events.push(Ev::Chars(text.to_string()));
		Ok(())
	}

	fn ignorable_whitespace(&mut self, text: &str) -> Result<()> {
		self.events.push(Ev::Ignorable(text.to_string()));
		Ok(())
	}

	fn start_cdata(&mut self) -> Result<()> {
		self.events.push(Ev::StartCdata);
		Ok(())
	}

	fn end_cdata(&mut self) -> Result<()> {
		self.events.push(Ev::EndCdata);
		Ok(())
	}

	fn comment(&mut self, text: &str) -> Result<()> {
		self.events.push(Ev::Comment(text.to_string()));
		Ok(())
	}

	fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
		self.events.push(Ev::Pi(target.to_string(), data.to_string()));
		Ok(())
	}

	fn element_decl(&mut self, name: &str, model: &str) -> Result<()> {
		self.events.push(Ev::ElementDecl(name.to_string(), model.to_string()));
		Ok(())
	}

	fn attribute_decl(&mut self, element: &str, name: &str, ty: &str, mode: Option<&str>, value: Option<&str>) -> Result<()> {
		self.events.push(Ev::AttributeDecl(element.to_string(), name.to_string(), ty.to_string(), opt(mode), opt(value)));
		Ok(())
	}

	fn internal_entity_decl(&mut self, name: &str, value: &str) -> Result<()> {
		self.events.push(Ev::InternalEntity(name.to_string(), value.to_string()));
		Ok(())
	}

	fn external_entity_decl(&mut self, name: &str, id: &ExternalId) -> Result<()> {
		self.events.push(Ev::ExternalEntity(name.to_string(), id.public_id.clone(), id.system_id.clone()));
		Ok(())
	}

	fn unparsed_entity_decl(&mut self, name: &str, id: &ExternalId, notation: &str) -> Result<()> {
		self.events.push(Ev::Unparsed(name.to_string(), id.system_id.clone(), notation.to_string()));
		Ok(())
	}

	fn notation_decl(&mut self, name: &str, id: &ExternalId) -> Result<()> {
		self.events.push(Ev::Notation(name.to_string(), id.public_id.clone(), id.system_id.clone()));
		Ok(())
	}

	fn start_content_model(&mut self, name: &str) -> Result<()> {
		self.events.push(Ev::Model(format!("start {}", name)));
		Ok(())
	}

	fn end_content_model(&mut self) -> Result<()> {
		self.events.push(Ev::Model("end".to_string()));
		Ok(())
	}

	fn content_model_empty(&mut self) -> Result<()> {
		self.events.push(Ev::Model("EMPTY".to_string()));
		Ok(())
	}

	fn content_model_any(&mut self) -> Result<()> {
		self.events.push(Ev::Model("ANY".to_string()));
		Ok(())
	}

	fn content_model_start_group(&mut self) -> Result<()> {
		self.events.push(Ev::Model("(".to_string()));
		Ok(())
	}

	fn content_model_end_group(&mut self, occurrence: Occurrence) -> Result<()> {
		let mut s = String::from(")");
		s.extend(occurrence.as_char());
		self.events.push(Ev::Model(s));
		Ok(())
	}

	fn content_model_sequence(&mut self) -> Result<()> {
		self.events.push(Ev::Model(",".to_string()));
		Ok(())
	}

	fn content_model_choice(&mut self) -> Result<()> {
		self.events.push(Ev::Model("|".to_string()));
		Ok(())
	}

	fn content_model_mixed(&mut self) -> Result<()> {
		self.events.push(Ev::Model("#PCDATA".to_string()));
		Ok(())
	}

	fn content_model_particle(&mut self, name: &str, occurrence: Occurrence) -> Result<()> {
		let mut s = name.to_string();
		s.extend(occurrence.as_char());
		self.events.push(Ev::Model(s));
		Ok(())
	}

	fn start_external_entity(&mut self, name: &str, _system_id: Option<&str>, _is_document: bool) -> Result<()> {
		self.events.push(Ev::StartExternal(name.to_string()));
		Ok(())
	}

	fn end_external_entity(&mut self, name: &str) -> Result<()> {
		self.events.push(Ev::EndExternal(name.to_string()));
		Ok(())
	}

	fn start_internal_entity(&mut self, name: &str) -> Result<()> {
		self.events.push(Ev::StartInternal(name.to_string()));
		Ok(())
	}

	fn end_internal_entity(&mut self, name: &str) -> Result<()> {
		self.events.push(Ev::EndInternal(name.to_string()));
		Ok(())
	}

	fn skipped_entity(&mut self, name: &str) -> Result<()> {
		self.events.push(Ev::Skipped(name.to_string()));
		Ok(())
	}

	fn resolve_entity(&mut self, _is_pe: bool, _name: &str, id: &ExternalId, _base_uri: Option<&str>) -> Result<Option<InputSource>> {
		let sys = match id.system_id.as_ref() {
			Some(sys) => sys,
			None => return Ok(None),
		};
		Ok(self.files.get(sys).map(|text| InputSource::from_str(text).with_system_id(sys.clone())))
	}

	fn get_external_subset(&mut self, _root: &str, _base_uri: Option<&str>) -> Result<Option<InputSource>> {
		Ok(self.subset.as_ref().map(|(sys, text)| InputSource::from_str(text).with_system_id(sys.clone())))
	}

	fn warning(&mut self, message: &str, _location: &Location) -> Result<()> {
		self.events.push(Ev::Warning(message.to_string()));
		Ok(())
	}

	fn validity_error(&mut self, message: &str, _location: &Location) -> Result<()> {
		self.events.push(Ev::Validity(message.to_string()));
		Ok(())
	}

	fn fatal_error(&mut self, _error: &Error) {
		self.events.push(Ev::Fatal);
	}
}

fn run(h: &mut Recorder, doc: &str) -> Result<()> {
	parse(InputSource::from_str(doc), h)
}

fn run_ok(doc: &str) -> Recorder {
	let mut h = Recorder::default();
	if let Err(e) = run(&mut h, doc) {
		panic!("{:?} failed: {}\nevents: {:?}", doc, e, h.events);
	}
	h
}

fn run_err(doc: &str) -> (Error, Recorder) {
	let mut h = Recorder::default();
	match run(&mut h, doc) {
		Ok(()) => panic!("{:?} parsed unexpectedly\nevents: {:?}", doc, h.events),
		Err(e) => (e.root().clone(), h),
	}
}

fn wf(e: Error) -> WFError {
	match e {
		Error::NotWellFormed(wf) => wf,
		other => panic!("not a well-formedness error: {:?}", other),
	}
}

fn s(v: &str) -> String {
	v.to_string()
}

#[test]
fn simple_document_events_in_order() {
	let h = run_ok("<?xml version=\"1.0\" encoding=\"UTF-8\"?><a b=\"1\"><c/>text</a>");
	assert_eq!(h.content(), vec![
		Ev::StartDocument,
		Ev::StartElement(s("a")),
		Ev::Attr(s("b"), s("1"), true, false),
		Ev::StartElement(s("c")),
		Ev::EndElement(s("c")),
		Ev::Chars(s("text")),
		Ev::EndElement(s("a")),
		Ev::EndDocument,
	]);
	assert!(h.has(&Ev::XmlDecl(s("1.0"), Some(s("UTF-8")), None)));
	assert!(!h.events.iter().any(|ev| matches!(ev, Ev::Warning(_) | Ev::Validity(_) | Ev::Fatal)));
}

#[test]
fn document_entity_and_contexts_bracket_everything() {
	let h = run_ok("<a><b/></a>");
	assert_eq!(h.events, vec![
		Ev::StartDocument,
		Ev::StartExternal(s("[document]")),
		Ev::PushContext,
		Ev::StartElement(s("a")),
		Ev::PushContext,
		Ev::StartElement(s("b")),
		Ev::EndElement(s("b")),
		Ev::PopContext,
		Ev::EndElement(s("a")),
		Ev::PopContext,
		Ev::EndExternal(s("[document]")),
		Ev::EndDocument,
	]);
}

#[test]
fn entity_of_char_refs_expands() {
	let h = run_ok("<!DOCTYPE a [<!ENTITY x \"&#65;&#66;\">]><a>&x;</a>");
	assert_eq!(h.text(), "AB");
	assert!(h.has(&Ev::InternalEntity(s("x"), s("AB"))));
	assert!(h.has(&Ev::StartInternal(s("x"))));
	assert!(h.has(&Ev::EndInternal(s("x"))));
}

#[test]
fn entity_expansion_matches_literal_text() {
	let expanded = run_ok("<!DOCTYPE a [<!ENTITY foo \"bar\">]><a>&foo;</a>");
	let literal = run_ok("<!DOCTYPE a [<!ENTITY foo \"bar\">]><a>bar</a>");
	assert_eq!(expanded.content(), literal.content());
}

#[test]
fn general_entity_refs_in_entity_values_are_kept() {
	let h = run_ok("<!DOCTYPE a [<!ENTITY x \"1&y;2\"><!ENTITY y \"-\">]><a>&x;</a>");
	assert!(h.has(&Ev::InternalEntity(s("x"), s("1&y;2"))));
	assert_eq!(h.text(), "1-2");
}

#[test]
fn predeclared_entities() {
	let h = run_ok("<a>&lt;&gt;&amp;&apos;&quot;</a>");
	assert_eq!(h.text(), "<>&'\"");
	assert!(!h.events.iter().any(|ev| matches!(ev, Ev::InternalEntity(..))));
}

#[test]
fn char_refs_reproduce_code_points() {
	for cp in [0x20u32, 0x41, 0xe9, 0x20ac, 0xd7ff, 0xe000, 0xfffd, 0x10000, 0x1d11e, 0x10ffff].iter() {
		let expected = std::char::from_u32(*cp).unwrap().to_string();
		let h = run_ok(&format!("<a>&#{};</a>", cp));
		assert_eq!(h.content()[2], Ev::Chars(expected.clone()));
		let h = run_ok(&format!("<a>&#x{:X};</a>", cp));
		assert_eq!(h.content()[2], Ev::Chars(expected));
	}
}

#[test]
fn char_refs_to_illegal_code_points_fail() {
	for doc in ["<a>&#0;</a>", "<a>&#xD800;</a>", "<a>&#xFFFE;</a>", "<a>&#x110000;</a>", "<a>&#99999999999;</a>"].iter() {
		let (e, _) = run_err(doc);
		assert!(matches!(wf(e), WFError::InvalidChar(_, _, true)), "{}", doc);
	}
	let (e, _) = run_err("<a>&#;</a>");
	assert!(matches!(wf(e), WFError::InvalidSyntax(_)));
	let (e, _) = run_err("<a>&#x4g;</a>");
	assert!(matches!(wf(e), WFError::UnexpectedChar(_, 'g', _)));
}

#[test]
fn recursive_general_entity_fails() {
	let (e, h) = run_err("<!DOCTYPE a [<!ENTITY x \"&y;\"><!ENTITY y \"[&x;]\">]><a>&x;</a>");
	assert_eq!(wf(e), WFError::RecursiveEntity(s("x")));
	assert!(h.has(&Ev::Fatal));
	assert!(!h.has(&Ev::EndDocument));
}

#[test]
fn recursive_parameter_entity_fails() {
	let (e, _) = run_err("<!DOCTYPE a [<!ENTITY % p \"&#37;p;\"> %p;]><a/>");
	assert_eq!(wf(e), WFError::RecursiveEntity(s("%p")));
}

#[test]
fn pe_reference_inside_internal_subset_declaration_fails() {
	let (e, _) = run_err("<!DOCTYPE a [<!ENTITY % p \"x\"><!ENTITY e \"%p;\">]><a/>");
	assert!(matches!(wf(e), WFError::InvalidSyntax(_)));
}

#[test]
fn parameter_entity_between_declarations() {
	let h = run_ok("<!DOCTYPE a [<!ENTITY % decl \"<!ENTITY e 'v'>\"> %decl;]><a>&e;</a>");
	assert_eq!(h.text(), "v");
	assert!(h.has(&Ev::StartInternal(s("%decl"))));
	assert!(h.has(&Ev::EndInternal(s("%decl"))));
}

fn utf16(text: &str, big_endian: bool) -> Vec<u8> {
	let mut out = Vec::new();
	for unit in text.encode_utf16() {
		let b = if big_endian { unit.to_be_bytes() } else { unit.to_le_bytes() };
		out.extend_from_slice(&b);
	}
	out
}

fn ucs4(text: &str, shifts: [u32; 4]) -> Vec<u8> {
	let mut out = Vec::new();
	for c in text.chars() {
		for shift in shifts.iter() {
			out.push(((c as u32) >> shift) as u8);
		}
	}
	out
}

#[test]
fn encoding_signatures_are_detected() {
	let doc = "<a>é€𝄞</a>";
	let with_bom = format!("\u{feff}{}", doc);
	let be = [24, 16, 8, 0];
	let le = [0, 8, 16, 24];
	let o2143 = [16, 24, 0, 8];
	let o3412 = [8, 0, 24, 16];
	let cases: Vec<(&str, Vec<u8>, &str)> = vec![
		("utf-8", doc.as_bytes().to_vec(), "UTF-8"),
		("utf-8 bom", with_bom.as_bytes().to_vec(), "UTF-8"),
		("utf-16be bom", utf16(&with_bom, true), "UTF-16BE"),
		("utf-16le bom", utf16(&with_bom, false), "UTF-16LE"),
		("ucs-4be", ucs4(doc, be), "UCS-4BE"),
		("ucs-4le", ucs4(doc, le), "UCS-4LE"),
		("ucs-4 2143", ucs4(doc, o2143), ""),
		("ucs-4 3412", ucs4(doc, o3412), ""),
		("ucs-4be bom", ucs4(&with_bom, be), "UCS-4BE"),
		("ucs-4le bom", ucs4(&with_bom, le), "UCS-4LE"),
		("ucs-4 2143 bom", ucs4(&with_bom, o2143), ""),
		("ucs-4 3412 bom", ucs4(&with_bom, o3412), ""),
	];
	for (label, bytes, name) in cases.into_iter() {
		let mut h = Recorder::default();
		let mut p = Parser::new(&mut h);
		if let Err(e) = p.parse(InputSource::from_bytes(bytes)) {
			panic!("{}: {}", label, e);
		}
		if !name.is_empty() {
			assert_eq!(p.encoding(), Some(name), "{}", label);
		}
		drop(p);
		assert_eq!(h.text(), "é€𝄞", "{}", label);
	}
}

#[test]
fn utf16_with_declaration() {
	let doc = "\u{feff}<?xml version='1.0' encoding='UTF-16'?><a>ü</a>";
	let mut h = Recorder::default();
	parse(InputSource::from_bytes(utf16(doc, false)), &mut h).unwrap();
	assert_eq!(h.text(), "ü");
	assert!(h.has(&Ev::XmlDecl(s("1.0"), Some(s("UTF-16")), None)));
}

#[test]
fn declared_latin1_switches_decoder() {
	let mut bytes = b"<?xml version='1.0' encoding='ISO-8859-1'?><a>".to_vec();
	bytes.extend_from_slice(&[0xe9, 0xfc]);
	bytes.extend_from_slice(b"</a>");
	let mut h = Recorder::default();
	let mut p = Parser::new(&mut h);
	p.parse(InputSource::from_bytes(bytes)).unwrap();
	assert_eq!(p.encoding(), Some("ISO-8859-1"));
	drop(p);
	assert_eq!(h.text(), "éü");
}

#[test]
fn declared_encoding_incompatible_with_detected_fails() {
	let mut h = Recorder::default();
	let r = parse(
		InputSource::from_bytes(&b"<?xml version='1.0' encoding='UTF-16'?><a/>"[..]),
		&mut h,
	);
	assert!(matches!(r.unwrap_err().root(), Error::NotWellFormed(WFError::InvalidEncodingSwitch(..))));
}

#[test]
fn leading_stylesheet_pi_in_byte_input_is_decoded_as_utf8() {
	let mut h = Recorder::default();
	let doc = "<?xml-stylesheet title=\"café\"?><a/>";
	parse(InputSource::from_bytes(doc.as_bytes()), &mut h).unwrap();
	assert!(h.has(&Ev::Pi(s("xml-stylesheet"), s("title=\"café\""))));
	assert!(h.has(&Ev::StartElement(s("a"))));
}

#[test]
fn leading_stylesheet_pi_in_byte_input_folds_line_endings() {
	let mut h = Recorder::default();
	parse(InputSource::from_bytes(&b"<?xml-stylesheet a\r\nb?><a/>"[..]), &mut h).unwrap();
	assert!(h.has(&Ev::Pi(s("xml-stylesheet"), s("a\nb"))));
}

#[test]
fn xml_declaration_in_byte_input_folds_line_endings() {
	let mut h = Recorder::default();
	let bytes = &b"<?xml version='1.0'\r\nencoding='UTF-8'?>\r\n<a>x\r\ny</a>"[..];
	parse(InputSource::from_bytes(bytes), &mut h).unwrap();
	assert!(h.has(&Ev::XmlDecl(s("1.0"), Some(s("UTF-8")), None)));
	assert_eq!(h.text(), "x\ny");
}

#[test]
fn unknown_encoding_is_unsupported() {
	let mut h = Recorder::default();
	let r = parse(
		InputSource::from_bytes(&b"<?xml version='1.0' encoding='X-KLINGON'?><a/>"[..]),
		&mut h,
	);
	assert!(matches!(r.unwrap_err().root(), Error::UnsupportedEncoding(_)));
}

#[test]
fn encoding_hint_overrides_detection() {
	let mut h = Recorder::default();
	let mut bytes = b"<a>".to_vec();
	bytes.push(0xe9);
	bytes.extend_from_slice(b"</a>");
	parse(InputSource::from_bytes(bytes).with_encoding("latin1"), &mut h).unwrap();
	assert_eq!(h.text(), "é");
}

#[test]
fn character_streams_ignore_declared_encoding() {
	let h = run_ok("<?xml version='1.0' encoding='ISO-8859-1'?><a>ä</a>");
	assert_eq!(h.text(), "ä");
}

#[test]
fn invalid_xml_declarations() {
	let (e, _) = run_err("<?xml version='1.1'?><a/>");
	assert_eq!(wf(e), WFError::UnsupportedVersion(s("1.1")));
	let (e, _) = run_err("<?xml version='1.0' standalone='maybe'?><a/>");
	assert_eq!(wf(e), WFError::InvalidStandalone(s("maybe")));
	let (e, _) = run_err("<?xml version='1.0' encoding='9bad'?><a/>");
	assert_eq!(wf(e), WFError::InvalidEncodingName(s("9bad")));
}

#[test]
fn attribute_defaulting() {
	let h = run_ok("<!DOCTYPE e [<!ATTLIST e a CDATA \"x\" b CDATA #IMPLIED>]><e/>");
	let attrs: Vec<Ev> = h.events.iter().filter(|ev| matches!(ev, Ev::Attr(..))).cloned().collect();
	assert_eq!(attrs, vec![Ev::Attr(s("a"), s("x"), false, false)]);
}

#[test]
fn specified_attribute_suppresses_default() {
	let h = run_ok("<!DOCTYPE e [<!ATTLIST e a CDATA \"x\">]><e a='y'/>");
	let attrs: Vec<Ev> = h.events.iter().filter(|ev| matches!(ev, Ev::Attr(..))).cloned().collect();
	assert_eq!(attrs, vec![Ev::Attr(s("a"), s("y"), true, false)]);
}

#[test]
fn attribute_values_are_normalized_by_type() {
	let h = run_ok(
		"<!DOCTYPE e [<!ATTLIST e t NMTOKENS #IMPLIED i ID #IMPLIED>]><e t='  a \n  b ' c='x\ty\nz' i=' id1 '/>"
	);
	assert!(h.has(&Ev::Attr(s("t"), s("a b"), true, false)));
	assert!(h.has(&Ev::Attr(s("c"), s("x y z"), true, false)));
	assert!(h.has(&Ev::Attr(s("i"), s("id1"), true, true)));
}

#[test]
fn entity_refs_in_attribute_values() {
	let h = run_ok("<!DOCTYPE a [<!ENTITY e \"x&lt;y\">]><a v=\"&e;&amp;\"/>");
	assert!(h.has(&Ev::Attr(s("v"), s("x<y&"), true, false)));
}

#[test]
fn lt_from_entity_in_attribute_value_fails() {
	let (e, _) = run_err("<!DOCTYPE a [<!ENTITY e \"a<b\">]><a v=\"&e;\"/>");
	assert!(matches!(wf(e), WFError::UnexpectedChar(_, '<', _)));
}

#[test]
fn external_entity_in_attribute_value_fails() {
	let mut h = Recorder::default().with_file("e.xml", "text");
	let r = run(&mut h, "<!DOCTYPE a [<!ENTITY e SYSTEM \"e.xml\">]><a v=\"&e;\"/>");
	assert_eq!(r.unwrap_err().root(), &Error::NotWellFormed(WFError::ExternalEntityInAttribute(s("e"))));
}

#[test]
fn duplicate_attributes() {
	let (e, _) = run_err("<a x='1' x='2'/>");
	assert_eq!(wf(e), WFError::DuplicateAttribute(s("x")));

	let mut h = Recorder::default();
	Parser::with_options(&mut h, ParserOptions::default().namespaces(true))
		.parse(InputSource::from_str("<a x='1' x='2'/>"))
		.unwrap();
	assert_eq!(h.events.iter().filter(|ev| matches!(ev, Ev::Attr(..))).count(), 2);
}

#[test]
fn attributes_need_separating_whitespace() {
	let (e, _) = run_err("<a x='1'y='2'/>");
	assert!(matches!(wf(e), WFError::InvalidSyntax(_)));
}

#[test]
fn cdata_sections_report_markup_as_text() {
	let h = run_ok("<a><![CDATA[<b>&amp;]]]></a>");
	assert_eq!(h.content(), vec![
		Ev::StartDocument,
		Ev::StartElement(s("a")),
		Ev::StartCdata,
		Ev::Chars(s("<b>&amp;]")),
		Ev::EndCdata,
		Ev::EndElement(s("a")),
		Ev::EndDocument,
	]);
}

#[test]
fn cdata_end_in_text_fails() {
	let (e, _) = run_err("<a>x]]>y</a>");
	assert!(matches!(wf(e), WFError::InvalidSyntax(_)));
	// single brackets are fine
	let h = run_ok("<a>]>]</a>");
	assert_eq!(h.text(), "]>]");
}

#[test]
fn whitespace_in_element_content_is_ignorable() {
	let doc = "<!DOCTYPE a [<!ELEMENT a (b)*><!ELEMENT b EMPTY>]><a> <b/>\n</a>";
	let h = run_ok(doc);
	assert_eq!(h.content(), vec![
		Ev::StartDocument,
		Ev::StartElement(s("a")),
		Ev::Ignorable(s(" ")),
		Ev::StartElement(s("b")),
		Ev::EndElement(s("b")),
		Ev::Ignorable(s("\n")),
		Ev::EndElement(s("a")),
		Ev::EndDocument,
	]);
}

#[test]
fn whitespace_in_mixed_content_is_text() {
	for decl in ["<!ELEMENT a (#PCDATA|b)*>", "<!ELEMENT a ANY>", ""].iter() {
		let doc = format!("<!DOCTYPE a [{}<!ELEMENT b EMPTY>]><a> <b/>\n</a>", decl);
		let h = run_ok(&doc);
		assert!(h.has(&Ev::Chars(s(" "))), "{}", decl);
		assert!(h.has(&Ev::Chars(s("\n"))), "{}", decl);
		assert!(!h.events.iter().any(|ev| matches!(ev, Ev::Ignorable(_))), "{}", decl);
	}
}

#[test]
fn mismatched_tags_fail_before_end_document() {
	let (e, h) = run_err("<a></b>");
	assert_eq!(wf(e), WFError::ElementMismatch(s("a"), s("b")));
	assert!(h.has(&Ev::Fatal));
	assert!(!h.has(&Ev::EndDocument));
}

#[test]
fn errors_carry_their_location() {
	let mut h = Recorder::default();
	let e = run(&mut h, "<a>\n  <b></c></b></a>").unwrap_err();
	let loc = e.location().unwrap();
	assert_eq!(loc.line, 2);
	assert!(loc.system_id.is_none());
}

#[test]
fn truncated_document_fails() {
	let (e, _) = run_err("<a><b>");
	assert!(matches!(wf(e), WFError::InvalidEof(_)));
	let (e, _) = run_err("");
	assert!(matches!(wf(e), WFError::InvalidEof(_)));
}

#[test]
fn content_after_root_fails() {
	let (e, _) = run_err("<a/>x");
	assert!(matches!(wf(e), WFError::UnexpectedChar(error::ERRCTX_DOCEND, 'x', _)));
}

#[test]
fn comments_and_processing_instructions() {
	let h = run_ok("<?pi some data?><!-- pro --><a><!-- c --><?e?></a><!--epi-->");
	assert!(h.has(&Ev::Pi(s("pi"), s("some data"))));
	assert!(h.has(&Ev::Pi(s("e"), s(""))));
	assert!(h.has(&Ev::Comment(s(" pro "))));
	assert!(h.has(&Ev::Comment(s(" c "))));
	assert!(h.has(&Ev::Comment(s("epi"))));
}

#[test]
fn reserved_pi_target_fails() {
	let (e, _) = run_err("<a/><?XmL x?>");
	assert_eq!(wf(e), WFError::ReservedTarget(s("XmL")));
}

#[test]
fn double_hyphen_in_comment_fails() {
	let (e, _) = run_err("<a><!-- a -- b --></a>");
	assert!(matches!(wf(e), WFError::UnexpectedChar(_, ' ', _)));
}

#[test]
fn element_started_in_entity_must_end_there() {
	let (e, _) = run_err("<!DOCTYPE a [<!ENTITY e \"<b>\">]><a>&e;</b></a>");
	assert_eq!(wf(e), WFError::UnbalancedEntity(s("e")));
	let (e, _) = run_err("<!DOCTYPE a [<!ENTITY e \"</a>\">]><a>&e;");
	assert_eq!(wf(e), WFError::UnbalancedEndTag);
}

#[test]
fn markup_split_across_entities_fails() {
	let (e, _) = run_err("<!DOCTYPE a [<!ENTITY e \"<b\">]><a>&e;/></a>");
	assert!(matches!(wf(e), WFError::EntityBoundary(_)));
}

#[test]
fn undeclared_entity_without_dtd_fails() {
	let (e, _) = run_err("<a>&nope;</a>");
	assert_eq!(wf(e), WFError::UndeclaredEntity(s("nope")));
}

#[test]
fn undeclared_entity_with_external_subset_is_skipped() {
	let mut h = Recorder::default().with_file("a.dtd", "<!ELEMENT a ANY>");
	run(&mut h, "<!DOCTYPE a SYSTEM \"a.dtd\"><a>x&nope;y</a>").unwrap();
	assert!(h.has(&Ev::Validity(s("reference to undeclared general entity nope"))));
	assert!(h.has(&Ev::Skipped(s("nope"))));
	assert_eq!(h.text(), "xy");
	assert!(h.has(&Ev::EndDocument));
}

#[test]
fn external_subset_is_read() {
	let mut h = Recorder::default().with_file("a.dtd", "<!ELEMENT a (#PCDATA)>\n<!ENTITY e 'ext'>\n");
	run(&mut h, "<!DOCTYPE a SYSTEM \"a.dtd\"><a>&e;</a>").unwrap();
	assert_eq!(h.text(), "ext");
	assert!(h.has(&Ev::StartExternal(s("[dtd]"))));
	assert!(h.has(&Ev::EndExternal(s("[dtd]"))));
	assert!(h.has(&Ev::ElementDecl(s("a"), s("(#PCDATA)*"))));
	assert!(h.has(&Ev::Warning(s("No base URI; hope URI is absolute: a.dtd"))));
	let end_doctype = h.events.iter().position(|ev| *ev == Ev::EndDoctype).unwrap();
	let decl = h.events.iter().position(|ev| *ev == Ev::InternalEntity(s("e"), s("ext"))).unwrap();
	assert!(decl < end_doctype);
}

#[test]
fn unresolved_external_subset_is_skipped() {
	let h = run_ok("<!DOCTYPE a SYSTEM \"missing.dtd\"><a/>");
	assert!(h.has(&Ev::Warning(s("skipping entity: [dtd]"))));
	assert!(h.has(&Ev::Skipped(s("[dtd]"))));
	assert!(h.has(&Ev::EndDocument));
}

#[test]
fn external_subset_supplied_for_doctype_without_system_id() {
	let mut h = Recorder::default().with_subset("extra.dtd", "<!ENTITY e 'supplied'>");
	run(&mut h, "<!DOCTYPE a><a>&e;</a>").unwrap();
	assert_eq!(h.text(), "supplied");
	assert!(h.has(&Ev::Warning(s("modifying document by adding external subset"))));
}

#[test]
fn external_subset_supplied_for_document_without_doctype() {
	let mut h = Recorder::default().with_subset("extra.dtd", "<!ATTLIST a d CDATA 'dflt'>");
	run(&mut h, "<a/>").unwrap();
	assert!(h.has(&Ev::Warning(s("modifying document by adding DTD"))));
	assert!(h.has(&Ev::Doctype(s("a"), None, Some(s("extra.dtd")))));
	assert!(h.has(&Ev::Attr(s("d"), s("dflt"), false, false)));
	let doctype = h.events.iter().position(|ev| *ev == Ev::EndDoctype).unwrap();
	let start = h.events.iter().position(|ev| *ev == Ev::StartElement(s("a"))).unwrap();
	assert!(doctype < start);
}

#[test]
fn supplied_subset_with_stray_gt_fails() {
	let mut h = Recorder::default().with_subset("extra.dtd", "<!ENTITY e 'x'> >");
	assert!(run(&mut h, "<a/>").is_err());
}

#[test]
fn external_parsed_entity_in_content() {
	let mut h = Recorder::default().with_file("e.xml", "<?xml encoding='UTF-8'?><b>inner</b>");
	run(&mut h, "<!DOCTYPE a [<!ENTITY e SYSTEM \"e.xml\">]><a>&e;</a>").unwrap();
	assert!(h.has(&Ev::ExternalEntity(s("e"), None, Some(s("e.xml")))));
	assert!(h.has(&Ev::StartExternal(s("e"))));
	assert!(h.has(&Ev::EndExternal(s("e"))));
	assert!(h.has(&Ev::StartElement(s("b"))));
	assert_eq!(h.text(), "inner");
}

#[test]
fn external_entity_skipped_by_resolver() {
	let mut h = Recorder::default();
	run(&mut h, "<!DOCTYPE a [<!ENTITY e SYSTEM \"e.xml\">]><a>x&e;y</a>").unwrap();
	assert!(h.has(&Ev::Warning(s("skipping entity: e"))));
	assert!(h.has(&Ev::Skipped(s("e"))));
	assert_eq!(h.text(), "xy");
}

#[test]
fn system_ids_are_absolutized() {
	let mut h = Recorder::default().with_file("http://example.org/dtd/e.xml", "E");
	let src = InputSource::from_str("<!DOCTYPE a [<!ENTITY e SYSTEM \"dtd/e.xml\">]><a>&e;</a>")
		.with_system_id("http://example.org/doc.xml");
	parse(src, &mut h).unwrap();
	assert!(h.has(&Ev::ExternalEntity(s("e"), None, Some(s("http://example.org/dtd/e.xml")))));
	assert_eq!(h.text(), "E");
}

#[test]
fn conditional_sections_in_external_subset() {
	let dtd = "<![INCLUDE[<!ENTITY a 'inc'>]]>\n<![ IGNORE [<!ENTITY b 'ign'> <![INCLUDE[ ]]> ]]>\n<!ENTITY b 'real'>";
	let mut h = Recorder::default().with_file("a.dtd", dtd);
	run(&mut h, "<!DOCTYPE a SYSTEM \"a.dtd\"><a>&a;&b;</a>").unwrap();
	assert_eq!(h.text(), "increal");
}

#[test]
fn parameter_entities_between_declarations_in_include_section() {
	let dtd = "<!ENTITY % d '<!ENTITY b \"fromPE\">'>\n<![INCLUDE[ <!ENTITY a 'inc'> %d; <!ENTITY c 'last'> ]]>";
	let mut h = Recorder::default().with_file("a.dtd", dtd);
	run(&mut h, "<!DOCTYPE a SYSTEM \"a.dtd\"><a>&a;&b;&c;</a>").unwrap();
	assert_eq!(h.text(), "incfromPElast");
}

#[test]
fn conditional_sections_in_internal_subset_fail() {
	let (e, _) = run_err("<!DOCTYPE a [<![INCLUDE[<!ENTITY a 'x'>]]>]><a/>");
	assert!(matches!(wf(e), WFError::InvalidSyntax(_)));
}

#[test]
fn external_parameter_entity_in_external_subset() {
	let mut h = Recorder::default()
		.with_file("a.dtd", "<!ENTITY % mod SYSTEM 'mod.ent'>\n%mod;\n")
		.with_file("mod.ent", "<!ENTITY e 'from module'>");
	run(&mut h, "<!DOCTYPE a SYSTEM \"a.dtd\"><a>&e;</a>").unwrap();
	assert_eq!(h.text(), "from module");
	assert!(h.has(&Ev::StartExternal(s("%mod"))));
	assert!(h.has(&Ev::EndExternal(s("%mod"))));
}

#[test]
fn standalone_document_with_external_entity_declaration_fails() {
	let mut h = Recorder::default().with_file("a.dtd", "<!ENTITY e 'x'>");
	let r = run(&mut h, "<?xml version='1.0' standalone='yes'?><!DOCTYPE a SYSTEM \"a.dtd\"><a>&e;</a>");
	assert_eq!(r.unwrap_err().root(), &Error::NotWellFormed(WFError::StandaloneViolation(s("e"))));
}

#[test]
fn standalone_document_with_externally_declared_external_entity_fails() {
	let mut h = Recorder::default()
		.with_file("a.dtd", "<!ENTITY e SYSTEM 'e.xml'>")
		.with_file("e.xml", "text");
	let r = run(&mut h, "<?xml version='1.0' standalone='yes'?><!DOCTYPE a SYSTEM \"a.dtd\"><a>&e;</a>");
	assert_eq!(r.unwrap_err().root(), &Error::NotWellFormed(WFError::StandaloneViolation(s("e"))));
	assert!(!h.has(&Ev::StartExternal(s("e"))));
}

#[test]
fn standalone_document_may_use_internally_declared_external_entity() {
	let mut h = Recorder::default().with_file("e.xml", "text");
	run(&mut h, "<?xml version='1.0' standalone='yes'?><!DOCTYPE a [<!ENTITY e SYSTEM 'e.xml'>]><a>&e;</a>").unwrap();
	assert_eq!(h.text(), "text");
}

#[test]
fn unparsed_entity_reference_fails() {
	let (e, h) = run_err(
		"<!DOCTYPE a [<!NOTATION gif PUBLIC '-//GIF//EN'><!ENTITY pic SYSTEM 'pic.gif' NDATA gif>]><a>&pic;</a>"
	);
	assert_eq!(wf(e), WFError::UnparsedEntityReference(s("pic")));
	assert!(h.has(&Ev::Notation(s("gif"), Some(s("-//GIF//EN")), None)));
	assert!(h.has(&Ev::Unparsed(s("pic"), Some(s("pic.gif")), s("gif"))));
}

#[test]
fn content_model_events() {
	let h = run_ok("<!DOCTYPE a [<!ELEMENT a (b, (c|d)+, e?)>]><a/>");
	let model: Vec<String> = h.events.iter().filter_map(|ev| match ev {
		Ev::Model(m) => Some(m.clone()),
		_ => None,
	}).collect();
	assert_eq!(model, vec![
		"start a", "(", "b", ",", "(", "c", "|", "d", ")+", "e?", ")", "end",
	]);
	assert!(h.has(&Ev::ElementDecl(s("a"), s("(b,(c|d)+,e?)"))));
}

#[test]
fn mixed_content_model() {
	let h = run_ok("<!DOCTYPE a [<!ELEMENT a (#PCDATA | b | c)*><!ELEMENT b EMPTY><!ELEMENT c ANY>]><a/>");
	assert!(h.has(&Ev::ElementDecl(s("a"), s("(#PCDATA|b|c)*"))));
	assert!(h.has(&Ev::ElementDecl(s("b"), s("EMPTY"))));
	assert!(h.has(&Ev::ElementDecl(s("c"), s("ANY"))));
	assert!(h.has(&Ev::Model(s("#PCDATA"))));
}

#[test]
fn mixed_content_with_names_requires_star() {
	let (e, _) = run_err("<!DOCTYPE a [<!ELEMENT a (#PCDATA|b)>]><a/>");
	assert!(matches!(wf(e), WFError::UnexpectedChar(_, '>', _)));
}

#[test]
fn mixing_separators_fails() {
	let (e, _) = run_err("<!DOCTYPE a [<!ELEMENT a (b,c|d)>]><a/>");
	assert!(matches!(wf(e), WFError::InvalidSyntax(_)));
}

#[test]
fn attribute_declaration_events() {
	let h = run_ok(
		"<!DOCTYPE a [<!NOTATION n1 SYSTEM 'n1'><!ATTLIST a k (x|y) 'x' n NOTATION (n1|n2) #IMPLIED r CDATA #REQUIRED f CDATA #FIXED 'v'>]><a r='1'/>"
	);
	assert!(h.has(&Ev::AttributeDecl(s("a"), s("k"), s("(x|y)"), None, Some(s("x")))));
	assert!(h.has(&Ev::AttributeDecl(s("a"), s("n"), s("NOTATION (n1|n2)"), Some(s("#IMPLIED")), None)));
	assert!(h.has(&Ev::AttributeDecl(s("a"), s("r"), s("CDATA"), Some(s("#REQUIRED")), None)));
	assert!(h.has(&Ev::AttributeDecl(s("a"), s("f"), s("CDATA"), Some(s("#FIXED")), Some(s("v")))));
	assert!(h.has(&Ev::Attr(s("f"), s("v"), false, false)));
	assert!(h.has(&Ev::Attr(s("k"), s("x"), false, false)));
}

#[test]
fn unknown_attribute_type_fails() {
	let (e, _) = run_err("<!DOCTYPE a [<!ATTLIST a k STRING #IMPLIED>]><a/>");
	assert!(matches!(wf(e), WFError::InvalidSyntax(_)));
}

#[test]
fn duplicate_declarations() {
	let h = run_ok(
		"<!DOCTYPE a [<!ELEMENT a ANY><!ELEMENT a EMPTY><!ENTITY e 'first'><!ENTITY e 'second'><!NOTATION n SYSTEM 'x'><!NOTATION n SYSTEM 'y'>]><a>&e;</a>"
	);
	assert!(h.has(&Ev::Validity(s("multiple declarations for element type: a"))));
	assert!(h.has(&Ev::Validity(s("Duplicate notation name decl: n"))));
	assert!(h.events.iter().any(|ev| matches!(ev, Ev::Warning(w) if w.contains("declared more than once"))));
	assert_eq!(h.text(), "first");
}

#[test]
fn system_id_with_fragment_is_a_validity_error() {
	let h = run_ok("<!DOCTYPE a [<!ENTITY e SYSTEM 'e.xml#frag'>]><a/>");
	assert!(h.has(&Ev::Validity(s("SYSTEM id has a URI fragment: e.xml#frag"))));
}

#[test]
fn invalid_public_id_fails() {
	let (e, _) = run_err("<!DOCTYPE a PUBLIC '{nope}' 'a.dtd'><a/>");
	assert_eq!(wf(e), WFError::InvalidPubidChar('{'));
}

#[test]
fn parser_queries_after_parse() {
	let mut h = Recorder::default();
	let mut p = Parser::new(&mut h);
	p.parse(InputSource::from_bytes(
		&b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\" standalone=\"yes\"?><!DOCTYPE a [<!ELEMENT a (b*)><!ELEMENT b EMPTY><!ATTLIST b x ID #IMPLIED>]><a/>"[..]
	)).unwrap();
	assert_eq!(p.encoding(), Some("ISO-8859-1"));
	assert_eq!(p.xml_version(), "1.0");
	assert!(p.is_standalone());
	assert_eq!(p.content_type("a"), ContentType::Elements);
	assert_eq!(p.content_type("b"), ContentType::Empty);
	assert_eq!(p.content_type("c"), ContentType::Undeclared);
	let b = p.symbols().lookup("b").unwrap();
	let x = p.symbols().lookup("x").unwrap();
	assert_eq!(p.dtd().attribute(b, x).unwrap().ty, AttributeType::Id);
	assert_eq!(p.dtd().element(b).unwrap().model, None);
	let a = p.symbols().lookup("a").unwrap();
	assert_eq!(p.dtd().element(a).unwrap().model.as_deref(), Some("(b*)"));
}

#[test]
fn parser_state_is_reset_between_documents() {
	let mut h = Recorder::default();
	let mut p = Parser::new(&mut h);
	p.parse(InputSource::from_str("<!DOCTYPE a [<!ENTITY e 'x'>]><a>&e;</a>")).unwrap();
	let r = p.parse(InputSource::from_str("<a>&e;</a>"));
	assert_eq!(r.unwrap_err().root(), &Error::NotWellFormed(WFError::UndeclaredEntity(s("e"))));
}

#[test]
fn handler_can_abort() {
	struct Stop;
	impl Handler for Stop {
		fn start_element(&mut self, name: &str) -> Result<()> {
			if name == "stop" {
				return Err(Error::aborted("enough"))
			}
			Ok(())
		}
	}
	let r = parse(InputSource::from_str("<a><stop/></a>"), &mut Stop);
	assert_eq!(r.unwrap_err().root(), &Error::Aborted(s("enough")));
}

struct DropFlag<R> {
	inner: R,
	dropped: Rc<Cell<bool>>,
}

impl<R: io::Read> io::Read for DropFlag<R> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.inner.read(buf)
	}
}

impl<R> Drop for DropFlag<R> {
	fn drop(&mut self) {
		self.dropped.set(true);
	}
}

struct Tracking {
	entity_closed: Rc<Cell<bool>>,
	closed_at_fatal: Option<bool>,
}

impl Handler for Tracking {
	fn resolve_entity(&mut self, _is_pe: bool, _name: &str, _id: &ExternalId, _base_uri: Option<&str>) -> Result<Option<InputSource>> {
		Ok(Some(InputSource::from_reader(DropFlag{
			inner: io::Cursor::new(b"broken ]]> text".to_vec()),
			dropped: self.entity_closed.clone(),
		})))
	}

	fn fatal_error(&mut self, _error: &Error) {
		self.closed_at_fatal = Some(self.entity_closed.get());
	}
}

#[test]
fn readers_are_closed_after_fatal_error() {
	let doc_closed = Rc::new(Cell::new(false));
	let mut h = Tracking{
		entity_closed: Rc::new(Cell::new(false)),
		closed_at_fatal: None,
	};
	let doc = DropFlag{
		inner: io::Cursor::new(b"<!DOCTYPE a [<!ENTITY e SYSTEM 'e.xml'>]><a>&e;</a>".to_vec()),
		dropped: doc_closed.clone(),
	};
	let mut p = Parser::new(&mut h);
	let r = p.parse(InputSource::from_reader(doc));
	assert!(r.is_err());
	assert!(doc_closed.get());
	drop(p);
	assert_eq!(h.closed_at_fatal, Some(false));
	assert!(h.entity_closed.get());
}
