/*!
# Character classes of the XML 1.0 grammar

Each class is a sorted table of inclusive codepoint ranges, looked up by
binary search. The contents of this module are implementation details of
`rsax` and `rsax_validation` and should not be relied upon.
*/
use std::cmp::Ordering;
use std::fmt;

/**
# Predicate trait for matching chars
*/
pub trait CharSelector {
	/// Return true if the given char is selected by the selector
	fn select(&self, c: char) -> bool;
}

impl CharSelector for char {
	fn select(&self, c: char) -> bool {
		*self == c
	}
}

impl CharSelector for &'_ [char] {
	fn select(&self, c: char) -> bool {
		self.contains(&c)
	}
}

/// A set of characters, given as sorted, disjoint, inclusive ranges.
#[derive(Clone, Copy)]
pub struct CharClass {
	name: &'static str,
	ranges: &'static [(char, char)],
}

impl CharClass {
	/// Production name, for diagnostics.
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn contains(&self, c: char) -> bool {
		self.ranges.binary_search_by(|&(lo, hi)| {
			if hi < c {
				Ordering::Less
			} else if lo > c {
				Ordering::Greater
			} else {
				Ordering::Equal
			}
		}).is_ok()
	}
}

impl CharSelector for CharClass {
	fn select(&self, c: char) -> bool {
		self.contains(c)
	}
}

impl fmt::Debug for CharClass {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "CharClass({}, {} ranges)", self.name, self.ranges.len())
	}
}

impl PartialEq for CharClass {
	fn eq(&self, other: &CharClass) -> bool {
		std::ptr::eq(self.ranges, other.ranges)
	}
}

// Surrogates are not chars, so the gaps around them need no entry.
const NONCHAR: &'static [(char, char)] = &[
	('\x00', '\x08'), ('\x0b', '\x0c'), ('\x0e', '\x1f'), ('\u{fffe}', '\u{ffff}'),
];

// [4] without the colon-free restriction of namespaces
const NAME_START: &'static [(char, char)] = &[
	(':', ':'), ('A', 'Z'), ('_', '_'), ('a', 'z'),
	('\u{c0}', '\u{d6}'), ('\u{d8}', '\u{f6}'), ('\u{f8}', '\u{2ff}'),
	('\u{370}', '\u{37d}'), ('\u{37f}', '\u{1fff}'), ('\u{200c}', '\u{200d}'),
	('\u{2070}', '\u{218f}'), ('\u{2c00}', '\u{2fef}'), ('\u{3001}', '\u{d7ff}'),
	('\u{f900}', '\u{fdcf}'), ('\u{fdf0}', '\u{fffd}'), ('\u{10000}', '\u{effff}'),
];

// [4a]
const NAME: &'static [(char, char)] = &[
	('-', '.'), ('0', ':'), ('A', 'Z'), ('_', '_'), ('a', 'z'), ('\u{b7}', '\u{b7}'),
	('\u{c0}', '\u{d6}'), ('\u{d8}', '\u{f6}'), ('\u{f8}', '\u{37d}'),
	('\u{37f}', '\u{1fff}'), ('\u{200c}', '\u{200d}'), ('\u{203f}', '\u{2040}'),
	('\u{2070}', '\u{218f}'), ('\u{2c00}', '\u{2fef}'), ('\u{3001}', '\u{d7ff}'),
	('\u{f900}', '\u{fdcf}'), ('\u{fdf0}', '\u{fffd}'), ('\u{10000}', '\u{effff}'),
];

// [13]
const PUBID: &'static [(char, char)] = &[
	('\n', '\n'), ('\r', '\r'), (' ', '!'), ('#', '%'), ('\'', ';'), ('=', '='),
	('?', 'Z'), ('_', '_'), ('a', 'z'),
];

// [81]
const ENCNAME_START: &'static [(char, char)] = &[('A', 'Z'), ('a', 'z')];
const ENCNAME: &'static [(char, char)] = &[('-', '.'), ('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')];

// [3]
const SPACE: &'static [(char, char)] = &[('\t', '\n'), ('\r', '\r'), (' ', ' ')];

/// Characters which must not occur in a document (complement of XML 1.0 § 2.2 \[2\])
pub static CLASS_XML_NONCHAR: CharClass = CharClass{name: "non-Char", ranges: NONCHAR};

/// Valid first characters for an XML Name (XML 1.0 § 2.3 \[4\])
pub static CLASS_XML_NAMESTART: CharClass = CharClass{name: "NameStartChar", ranges: NAME_START};

/// Valid non-first characters for an XML Name (XML 1.0 § 2.3 \[4a\])
pub static CLASS_XML_NAME: CharClass = CharClass{name: "NameChar", ranges: NAME};

/// Characters allowed in a public identifier literal (XML 1.0 § 2.3 \[13\])
pub static CLASS_XML_PUBID: CharClass = CharClass{name: "PubidChar", ranges: PUBID};

/// Valid first characters of an encoding name (XML 1.0 § 4.3.3 \[81\])
pub static CLASS_XML_ENCNAME_START: CharClass = CharClass{name: "EncName start", ranges: ENCNAME_START};

/// Valid non-first characters of an encoding name (XML 1.0 § 4.3.3 \[81\])
pub static CLASS_XML_ENCNAME: CharClass = CharClass{name: "EncName", ranges: ENCNAME};

/// XML whitespace (XML 1.0 § 2.3 \[3\])
pub static CLASS_XML_SPACE: CharClass = CharClass{name: "S", ranges: SPACE};
