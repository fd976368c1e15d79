/*!
# Character encodings

Signature sniffing and decoding for the nine built-in encodings. Everything
else is rejected with [`Error::UnsupportedEncoding`](crate::Error).

Decoded text is produced as [`char`]s, so code points above U+FFFF occupy a
single slot in the decoded buffer no matter how they were encoded.
*/
use crate::error::{EncodingError, Error, Result, WFError};

/// One of the built-in encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	Utf8,
	Latin1,
	Ascii,
	/// UCS-2 / UTF-16, most significant byte first
	Utf16Be,
	/// UCS-2 / UTF-16, least significant byte first
	Utf16Le,
	/// UCS-4, byte order 1234
	Ucs4Be,
	/// UCS-4, byte order 4321
	Ucs4Le,
	/// UCS-4, byte order 2143
	Ucs4Order2143,
	/// UCS-4, byte order 3412
	Ucs4Order3412,
}

impl Encoding {
	/// Canonical name, as reported by [`Parser::encoding`](crate::Parser::encoding).
	pub fn name(&self) -> &'static str {
		match self {
			Self::Utf8 => "UTF-8",
			Self::Latin1 => "ISO-8859-1",
			Self::Ascii => "US-ASCII",
			Self::Utf16Be => "UTF-16BE",
			Self::Utf16Le => "UTF-16LE",
			Self::Ucs4Be => "UCS-4BE",
			Self::Ucs4Le => "UCS-4LE",
			Self::Ucs4Order2143 => "UCS-4-2143",
			Self::Ucs4Order3412 => "UCS-4-3412",
		}
	}

	/// Number of bytes per code unit.
	pub fn width(&self) -> usize {
		match self {
			Self::Utf8 | Self::Latin1 | Self::Ascii => 1,
			Self::Utf16Be | Self::Utf16Le => 2,
			_ => 4,
		}
	}

	fn ucs4_shifts(&self) -> [u32; 4] {
		match self {
			Self::Ucs4Le => [0, 8, 16, 24],
			Self::Ucs4Order2143 => [16, 24, 0, 8],
			Self::Ucs4Order3412 => [8, 0, 24, 16],
			_ => [24, 16, 8, 0],
		}
	}

	/// Look up an unambiguous encoding label (case-insensitive).
	pub fn from_label(label: &str) -> Option<Encoding> {
		match label.to_ascii_uppercase().as_str() {
			"UTF-8" | "UTF8" => Some(Self::Utf8),
			"ISO-8859-1" | "8859_1" | "ISO8859_1" | "ISO_8859-1" | "LATIN1" | "L1" => Some(Self::Latin1),
			"US-ASCII" | "ASCII" => Some(Self::Ascii),
			"UTF-16BE" => Some(Self::Utf16Be),
			"UTF-16LE" => Some(Self::Utf16Le),
			"UTF-32BE" | "UCS-4BE" => Some(Self::Ucs4Be),
			"UTF-32LE" | "UCS-4LE" => Some(Self::Ucs4Le),
			_ => None,
		}
	}

	/// Resolve an encoding supplied from outside the document (e.g. a MIME
	/// charset). Labels which leave the byte order open are settled by the
	/// signature, defaulting to big endian.
	pub fn for_hint(label: &str, signature: &[u8]) -> Result<Encoding> {
		if let Some(enc) = Self::from_label(label) {
			return Ok(enc)
		}
		match label.to_ascii_uppercase().as_str() {
			"UTF-16" | "ISO-10646-UCS-2" => Ok(if signature.starts_with(b"\xff\xfe") {
				Self::Utf16Le
			} else {
				Self::Utf16Be
			}),
			"UTF-32" | "ISO-10646-UCS-4" => Ok(if signature.starts_with(b"\xff\xfe\x00\x00") {
				Self::Ucs4Le
			} else {
				Self::Ucs4Be
			}),
			_ => Err(Error::UnsupportedEncoding(label.to_string())),
		}
	}

	/// Interpret the `encoding` pseudo-attribute of an XML or text
	/// declaration for input which has been detected as `self`.
	///
	/// Returns the encoding to continue with. A known label which does not
	/// fit the detected layout is fatal. An unknown label is unsupported.
	pub fn switch_to(&self, label: &str) -> Result<Encoding> {
		let upper = label.to_ascii_uppercase();
		let declared = match upper.as_str() {
			"UTF-16" | "ISO-10646-UCS-2" if self.width() == 2 => return Ok(*self),
			"ISO-10646-UCS-4" | "UTF-32" if self.width() == 4 => return Ok(*self),
			"UTF-16" | "ISO-10646-UCS-2" => Self::Utf16Be,
			"ISO-10646-UCS-4" | "UTF-32" => Self::Ucs4Be,
			_ => match Self::from_label(&upper) {
				Some(enc) => enc,
				None => return Err(Error::UnsupportedEncoding(label.to_string())),
			},
		};
		if declared == *self || (self.width() == 1 && declared.width() == 1) {
			return Ok(declared)
		}
		Err(WFError::InvalidEncodingSwitch(self.name(), label.to_string()).into())
	}
}

/// Result of sniffing the first bytes of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
	pub encoding: Encoding,
	/// Length of the byte order mark to skip.
	pub bom: usize,
	/// True if the entity starts with the ASCII bytes of `<?xm`.
	pub declaration: bool,
}

impl Signature {
	const fn plain(encoding: Encoding) -> Signature {
		Signature{encoding, bom: 0, declaration: false}
	}

	const fn bom(encoding: Encoding, bom: usize) -> Signature {
		Signature{encoding, bom, declaration: false}
	}
}

/// Detect the encoding of an entity from (up to) its first four bytes.
///
/// Defaults to UTF-8 if nothing matches.
pub fn sniff(b: &[u8]) -> Result<Signature> {
	if b.len() >= 4 {
		match (b[0], b[1], b[2], b[3]) {
			(0x00, 0x00, 0x00, 0x3c) => return Ok(Signature::plain(Encoding::Ucs4Be)),
			(0x3c, 0x00, 0x00, 0x00) => return Ok(Signature::plain(Encoding::Ucs4Le)),
			(0x00, 0x00, 0x3c, 0x00) => return Ok(Signature::plain(Encoding::Ucs4Order2143)),
			(0x00, 0x3c, 0x00, 0x00) => return Ok(Signature::plain(Encoding::Ucs4Order3412)),
			(0x00, 0x00, 0xfe, 0xff) => return Ok(Signature::bom(Encoding::Ucs4Be, 4)),
			(0xff, 0xfe, 0x00, 0x00) => return Ok(Signature::bom(Encoding::Ucs4Le, 4)),
			(0x00, 0x00, 0xff, 0xfe) => return Ok(Signature::bom(Encoding::Ucs4Order2143, 4)),
			(0xfe, 0xff, 0x00, 0x00) => return Ok(Signature::bom(Encoding::Ucs4Order3412, 4)),
			(0x00, 0x3c, 0x00, 0x3f) | (0x3c, 0x00, 0x3f, 0x00) => {
				return Err(EncodingError::MissingByteOrderMark.into())
			}
			(0x3c, 0x3f, 0x78, 0x6d) => return Ok(Signature{
				encoding: Encoding::Utf8,
				bom: 0,
				declaration: true,
			}),
			_ => (),
		}
	}
	if b.starts_with(b"\xfe\xff") {
		Ok(Signature::bom(Encoding::Utf16Be, 2))
	} else if b.starts_with(b"\xff\xfe") {
		Ok(Signature::bom(Encoding::Utf16Le, 2))
	} else if b.starts_with(b"\xef\xbb\xbf") {
		Ok(Signature::bom(Encoding::Utf8, 3))
	} else {
		Ok(Signature::plain(Encoding::Utf8))
	}
}

/// Length of the byte order mark for `enc` at the start of `b`, if any.
pub fn bom_length(enc: Encoding, b: &[u8]) -> usize {
	let bom: &[u8] = match enc {
		Encoding::Utf8 => b"\xef\xbb\xbf",
		Encoding::Utf16Be => b"\xfe\xff",
		Encoding::Utf16Le => b"\xff\xfe",
		Encoding::Ucs4Be => b"\x00\x00\xfe\xff",
		Encoding::Ucs4Le => b"\xff\xfe\x00\x00",
		_ => return 0,
	};
	if b.starts_with(bom) {
		bom.len()
	} else {
		0
	}
}

fn classify_utf8(src: &[u8]) -> EncodingError {
	let b0 = src[0] as u32;
	let cont = |i: usize| -> Option<u32> {
		match src.get(i) {
			Some(b) if b & 0xc0 == 0x80 => Some((*b & 0x3f) as u32),
			_ => None,
		}
	};
	match src[0] {
		0x80..=0xbf => EncodingError::InvalidUtf8("unexpected continuation byte in UTF-8 sequence", b0),
		0xc0..=0xdf => match cont(1) {
			Some(c1) => EncodingError::InvalidUtf8(
				"Illegal two byte UTF-8 sequence",
				((b0 & 0x1f) << 6) | c1,
			),
			None => EncodingError::InvalidUtf8("bad continuation of multi-byte UTF-8 sequence", b0),
		},
		0xe0..=0xef => match (cont(1), cont(2)) {
			(Some(c1), Some(c2)) => EncodingError::InvalidUtf8(
				"Illegal three byte UTF-8 sequence",
				((b0 & 0x0f) << 12) | (c1 << 6) | c2,
			),
			_ => EncodingError::InvalidUtf8("bad continuation of multi-byte UTF-8 sequence", b0),
		},
		0xf0..=0xf7 => match (cont(1), cont(2), cont(3)) {
			(Some(c1), Some(c2), Some(c3)) => {
				let v = ((b0 & 0x07) << 18) | (c1 << 12) | (c2 << 6) | c3;
				if v > 0x10ffff {
					EncodingError::OutOfRange("UTF-8", v)
				} else {
					EncodingError::InvalidUtf8("Illegal four byte UTF-8 sequence", v)
				}
			}
			_ => EncodingError::InvalidUtf8("bad continuation of multi-byte UTF-8 sequence", b0),
		},
		0xf8..=0xfd => EncodingError::InvalidUtf8("unsupported five or six byte UTF-8 sequence", b0),
		_ => EncodingError::InvalidUtf8("invalid UTF-8 start byte", b0),
	}
}

fn decode_utf8(src: &[u8], eof: bool, out: &mut Vec<char>) -> Result<usize> {
	let (valid, rest) = match std::str::from_utf8(src) {
		Ok(s) => (s, None),
		Err(e) => {
			// safe as valid_up_to() is guaranteed to point behind the last
			// valid char
			let s = match std::str::from_utf8(&src[..e.valid_up_to()]) {
				Ok(s) => s,
				Err(_) => "",
			};
			(s, Some(e))
		}
	};
	out.extend(valid.chars());
	match rest {
		None => Ok(src.len()),
		Some(e) => match e.error_len() {
			None if !eof => Ok(e.valid_up_to()),
			None => Err(EncodingError::TruncatedSequence("UTF-8").into()),
			Some(_) => Err(classify_utf8(&src[e.valid_up_to()..]).into()),
		},
	}
}

fn decode_utf16(src: &[u8], big_endian: bool, eof: bool, out: &mut Vec<char>) -> Result<usize> {
	let unit = |i: usize| -> u16 {
		if big_endian {
			((src[i] as u16) << 8) | src[i + 1] as u16
		} else {
			((src[i + 1] as u16) << 8) | src[i] as u16
		}
	};
	let mut i = 0;
	while i + 2 <= src.len() {
		let hi = unit(i);
		match hi {
			0xd800..=0xdbff => {
				if i + 4 > src.len() {
					if eof {
						return Err(EncodingError::UnpairedSurrogate("UTF-16", hi as u32).into())
					}
					return Ok(i)
				}
				let lo = unit(i + 2);
				if !(0xdc00..=0xdfff).contains(&lo) {
					return Err(EncodingError::UnpairedSurrogate("UTF-16", hi as u32).into())
				}
				let cp = 0x10000 + (((hi as u32) - 0xd800) << 10) + ((lo as u32) - 0xdc00);
				match std::char::from_u32(cp) {
					Some(ch) => out.push(ch),
					None => return Err(EncodingError::OutOfRange("UTF-16", cp).into()),
				}
				i += 4;
			}
			0xdc00..=0xdfff => {
				return Err(EncodingError::UnpairedSurrogate("UTF-16", hi as u32).into())
			}
			other => {
				match std::char::from_u32(other as u32) {
					Some(ch) => out.push(ch),
					None => return Err(EncodingError::OutOfRange("UTF-16", other as u32).into()),
				}
				i += 2;
			}
		}
	}
	if eof && i < src.len() {
		return Err(EncodingError::TruncatedSequence("UCS-2").into())
	}
	Ok(i)
}

fn decode_ucs4(src: &[u8], shifts: [u32; 4], eof: bool, out: &mut Vec<char>) -> Result<usize> {
	let mut i = 0;
	while i + 4 <= src.len() {
		let v = ((src[i] as u32) << shifts[0])
			| ((src[i + 1] as u32) << shifts[1])
			| ((src[i + 2] as u32) << shifts[2])
			| ((src[i + 3] as u32) << shifts[3]);
		match std::char::from_u32(v) {
			Some(ch) => out.push(ch),
			None if v > 0x10ffff => return Err(EncodingError::OutOfRange("UCS-4", v).into()),
			None => return Err(EncodingError::UnpairedSurrogate("UCS-4", v).into()),
		}
		i += 4;
	}
	if eof && i < src.len() {
		return Err(EncodingError::TruncatedSequence("UCS-4").into())
	}
	Ok(i)
}

/// Decode as many complete characters of `src` as possible into `out`.
///
/// Returns the number of bytes consumed. Bytes of an incomplete trailing
/// sequence are left unconsumed unless `eof` is set, in which case they are
/// an error.
pub fn decode(enc: Encoding, src: &[u8], eof: bool, out: &mut Vec<char>) -> Result<usize> {
	match enc {
		Encoding::Utf8 => decode_utf8(src, eof, out),
		Encoding::Latin1 => {
			out.extend(src.iter().map(|b| *b as char));
			Ok(src.len())
		}
		Encoding::Ascii => {
			for b in src.iter() {
				if *b >= 0x80 {
					return Err(EncodingError::NonAscii(*b).into())
				}
				out.push(*b as char);
			}
			Ok(src.len())
		}
		Encoding::Utf16Be => decode_utf16(src, true, eof, out),
		Encoding::Utf16Le => decode_utf16(src, false, eof, out),
		_ => decode_ucs4(src, enc.ucs4_shifts(), eof, out),
	}
}

/**
Fold line endings of freshly decoded text in place (XML 1.0 § 2.11).

`buf[start..]` is rewritten so that CRLF pairs and lone CRs become LF.
`after_cr` carries whether the previous chunk ended in a CR, so that a CRLF
pair split between two chunks is folded exactly once.
*/
pub fn fold_line_endings(buf: &mut Vec<char>, start: usize, after_cr: &mut bool) {
	let mut w = start;
	for r in start..buf.len() {
		let c = buf[r];
		match c {
			'\r' => {
				buf[w] = '\n';
				w += 1;
				*after_cr = true;
			}
			'\n' if *after_cr => {
				*after_cr = false;
			}
			other => {
				buf[w] = other;
				w += 1;
				*after_cr = false;
			}
		}
	}
	buf.truncate(w);
}
