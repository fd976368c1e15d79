use std::env;
use std::io;
use std::process;

use rsax::{Attribute, Error, Handler, InputSource, Location, Occurrence, Result};

/// Print one line per event, indented by element depth.
struct Dump {
	depth: usize,
}

impl Dump {
	fn line(&self, s: &str) {
		println!("{:width$}{}", "", s, width = self.depth * 2);
	}
}

impl Handler for Dump {
	fn xml_declaration(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) -> Result<()> {
		self.line(&format!("xml version={:?} encoding={:?} standalone={:?}", version, encoding, standalone));
		Ok(())
	}

	fn doctype_decl(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Result<()> {
		self.line(&format!("doctype {} public={:?} system={:?}", name, public_id, system_id));
		Ok(())
	}

	fn element_decl(&mut self, name: &str, model: &str) -> Result<()> {
		self.line(&format!("<!ELEMENT {} {}>", name, model));
		Ok(())
	}

	fn attribute_decl(&mut self, element: &str, name: &str, ty: &str, mode: Option<&str>, value: Option<&str>) -> Result<()> {
		self.line(&format!("<!ATTLIST {} {} {} {:?} {:?}>", element, name, ty, mode, value));
		Ok(())
	}

	fn internal_entity_decl(&mut self, name: &str, value: &str) -> Result<()> {
		self.line(&format!("<!ENTITY {} {:?}>", name, value));
		Ok(())
	}

	fn content_model_particle(&mut self, name: &str, occurrence: Occurrence) -> Result<()> {
		self.line(&format!("  particle {} {:?}", name, occurrence));
		Ok(())
	}

	fn start_element(&mut self, name: &str) -> Result<()> {
		self.line(&format!("<{}>", name));
		self.depth += 1;
		Ok(())
	}

	fn attribute(&mut self, attr: &Attribute<'_>) -> Result<()> {
		let marker = if attr.specified { "" } else { " (default)" };
		self.line(&format!("@{}={:?}{}", attr.name, attr.value, marker));
		Ok(())
	}

	fn end_element(&mut self, name: &str) -> Result<()> {
		self.depth = self.depth.saturating_sub(1);
		self.line(&format!("</{}>", name));
		Ok(())
	}

	fn characters(&mut self, text: &str) -> Result<()> {
		self.line(&format!("text {:?}", text));
		Ok(())
	}

	fn comment(&mut self, text: &str) -> Result<()> {
		self.line(&format!("comment {:?}", text));
		Ok(())
	}

	fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
		self.line(&format!("pi {} {:?}", target, data));
		Ok(())
	}

	fn skipped_entity(&mut self, name: &str) -> Result<()> {
		self.line(&format!("skipped {}", name));
		Ok(())
	}

	fn warning(&mut self, message: &str, location: &Location) -> Result<()> {
		eprintln!("warning: {}:{}: {}", location.line, location.column, message);
		Ok(())
	}

	fn validity_error(&mut self, message: &str, location: &Location) -> Result<()> {
		eprintln!("invalid: {}:{}: {}", location.line, location.column, message);
		Ok(())
	}

	fn fatal_error(&mut self, error: &Error) {
		eprintln!("fatal: {}", error);
	}
}

fn main() {
	let source = match env::args().nth(1) {
		Some(path) => InputSource::from_system_id(path),
		None => InputSource::from_reader(io::stdin()),
	};
	let mut dump = Dump{depth: 0};
	if rsax::parse(source, &mut dump).is_err() {
		process::exit(1);
	}
}
