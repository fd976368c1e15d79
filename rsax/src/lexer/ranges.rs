use rsax_validation::selectors::{CharSelector, CLASS_XML_NONCHAR};

/// Characters which terminate a name or name token.
pub static NAME_DELIMITERS: &'static [char] = &[
	'%', '<', '>', '&', ',', '|', '*', '+', '?', ')', '=', '\'', '"', '[', ' ', '\t', '\r', '\n',
	';', '/',
];

/// Characters which end a run of plain character data in content.
pub static TEXT_DELIMITERS: &'static [char] = &['<', '&', ']', '>'];

/// Selects the given characters and every character which must not occur
/// in a document at all.
#[derive(Debug, Clone, Copy)]
pub struct DelimOrNonchar<'a>(pub &'a [char]);

impl CharSelector for DelimOrNonchar<'_> {
	fn select(&self, c: char) -> bool {
		self.0.select(c) || CLASS_XML_NONCHAR.select(c)
	}
}
