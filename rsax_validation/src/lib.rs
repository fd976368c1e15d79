/*!
# Validator functions for XML-related strings

This is a supplementary crate for `rsax`. It holds the XML 1.0 character
classes used by the scanner and a handful of validators which check whole
strings against a production.
*/
use std::fmt;

pub mod selectors;

use selectors::{CharClass, CharSelector, CLASS_XML_ENCNAME, CLASS_XML_ENCNAME_START, CLASS_XML_NAME, CLASS_XML_NAMESTART, CLASS_XML_NONCHAR, CLASS_XML_PUBID};

/**
Error condition from validating an XML string.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// A Name, Nmtoken or EncName was empty.
	EmptyName,
	/// An invalid character was encountered.
	///
	/// This variant contains the character as data.
	InvalidChar(char),
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::EmptyName => f.write_str("Name, Nmtoken and EncName must not be empty"),
			Self::InvalidChar(c) => write!(f, "character U+{:04x} is not allowed", *c as u32),
		}
	}
}

impl std::error::Error for Error {}

/// Return true if `c` is XML whitespace (XML 1.0 § 2.3 \[3\]).
#[inline]
pub fn is_space(c: char) -> bool {
	c == ' ' || c == '\n' || c == '\t' || c == '\r'
}

/// Return true if `c` may appear in an XML 1.0 document at all.
#[inline]
pub fn is_xml_char(c: char) -> bool {
	!CLASS_XML_NONCHAR.select(c)
}

// Non-empty, first char from `first`, the rest from `rest`.
fn check_token(s: &str, first: &CharClass, rest: &CharClass) -> Result<(), Error> {
	let mut chars = s.chars();
	let c = chars.next().ok_or(Error::EmptyName)?;
	if !first.contains(c) {
		return Err(Error::InvalidChar(c))
	}
	match chars.find(|c| !rest.contains(*c)) {
		Some(c) => Err(Error::InvalidChar(c)),
		None => Ok(()),
	}
}

/**
Check whether a str is a valid XML 1.0 Name

# Example

```rust
use rsax_validation::{validate_name, Error};

assert!(validate_name("foobar").is_ok());
assert!(validate_name("foo:bar").is_ok());
assert!(matches!(validate_name("foo bar"), Err(Error::InvalidChar(' '))));
assert!(matches!(validate_name(""), Err(Error::EmptyName)));
```
*/
pub fn validate_name(s: &str) -> Result<(), Error> {
	check_token(s, &CLASS_XML_NAMESTART, &CLASS_XML_NAME)
}

/**
Check whether a str is a valid XML 1.0 Nmtoken

# Example

```rust
use rsax_validation::{validate_nmtoken, Error};

assert!(validate_nmtoken("1st").is_ok());
assert!(matches!(validate_nmtoken("a b"), Err(Error::InvalidChar(' '))));
```
*/
pub fn validate_nmtoken(s: &str) -> Result<(), Error> {
	check_token(s, &CLASS_XML_NAME, &CLASS_XML_NAME)
}

/**
Check whether a str is valid XML 1.0 CData

# Example

```rust
use rsax_validation::{validate_cdata, Error};

assert!(validate_cdata("foo bar baz <fnord!>").is_ok());
assert!(matches!(validate_cdata("\x01"), Err(Error::InvalidChar('\x01'))));
```
*/
pub fn validate_cdata(s: &str) -> Result<(), Error> {
	match s.chars().find(|c| !is_xml_char(*c)) {
		Some(c) => Err(Error::InvalidChar(c)),
		None => Ok(()),
	}
}

/**
Check whether a str consists only of PubidChars

# Example

```rust
use rsax_validation::{validate_pubid, Error};

assert!(validate_pubid("-//W3C//DTD XHTML 1.0 Strict//EN").is_ok());
assert!(matches!(validate_pubid("a{b}"), Err(Error::InvalidChar('{'))));
```
*/
pub fn validate_pubid(s: &str) -> Result<(), Error> {
	match s.chars().find(|c| !CLASS_XML_PUBID.select(*c)) {
		Some(c) => Err(Error::InvalidChar(c)),
		None => Ok(()),
	}
}

/**
Check whether a str is a valid encoding name

# Example

```rust
use rsax_validation::{validate_encoding_name, Error};

assert!(validate_encoding_name("ISO-8859-1").is_ok());
assert!(matches!(validate_encoding_name("8859"), Err(Error::InvalidChar('8'))));
```
*/
pub fn validate_encoding_name(s: &str) -> Result<(), Error> {
	check_token(s, &CLASS_XML_ENCNAME_START, &CLASS_XML_ENCNAME)
}
