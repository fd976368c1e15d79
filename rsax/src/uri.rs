/*!
# System identifier handling

Reference resolution (RFC 3986 § 5.2) for system identifiers, and mapping of
`file:` URIs and plain paths onto the file system.
*/
use std::path::PathBuf;

struct Parts<'a> {
	scheme: Option<&'a str>,
	authority: Option<&'a str>,
	path: &'a str,
	query: Option<&'a str>,
}

fn scheme_len(s: &str) -> Option<usize> {
	let mut chars = s.char_indices();
	match chars.next() {
		Some((_, c)) if c.is_ascii_alphabetic() => (),
		_ => return None,
	}
	for (i, c) in chars {
		match c {
			':' => return Some(i),
			c if c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.' => (),
			_ => return None,
		}
	}
	None
}

/// Return true if `s` starts with a URI scheme.
pub fn has_scheme(s: &str) -> bool {
	// a single letter followed by a colon is more likely a drive letter
	matches!(scheme_len(s), Some(n) if n > 1)
}

fn split(s: &str) -> Parts<'_> {
	let s = match s.find('#') {
		Some(i) => &s[..i],
		None => s,
	};
	let (s, query) = match s.find('?') {
		Some(i) => (&s[..i], Some(&s[i + 1..])),
		None => (s, None),
	};
	let (scheme, s) = if has_scheme(s) {
		match scheme_len(s) {
			Some(n) => (Some(&s[..n]), &s[n + 1..]),
			None => (None, s),
		}
	} else {
		(None, s)
	};
	let (authority, path) = if s.starts_with("//") {
		let rest = &s[2..];
		match rest.find('/') {
			Some(i) => (Some(&rest[..i]), &rest[i..]),
			None => (Some(rest), ""),
		}
	} else {
		(None, s)
	};
	Parts{scheme, authority, path, query}
}

/// Remove `.` and `..` segments from a path (RFC 3986 § 5.2.4).
fn remove_dot_segments(path: &str) -> String {
	let absolute = path.starts_with('/');
	let mut out: Vec<&str> = Vec::new();
	let segments: Vec<&str> = path.split('/').collect();
	let last = segments.len().saturating_sub(1);
	let mut trailing_slash = false;
	for (i, seg) in segments.iter().enumerate() {
		match *seg {
			"." => trailing_slash = i == last,
			".." => {
				if out.len() > 0 && !(out.len() == 1 && out[0].is_empty() && absolute) {
					out.pop();
				}
				trailing_slash = i == last;
			}
			s => {
				out.push(s);
				trailing_slash = false;
			}
		}
	}
	let mut result = out.join("/");
	if absolute && !result.starts_with('/') {
		result.insert(0, '/');
	}
	if trailing_slash && !result.ends_with('/') {
		result.push('/');
	}
	result
}

fn merge(base: &Parts<'_>, reference: &str) -> String {
	if base.authority.is_some() && base.path.is_empty() {
		return format!("/{}", reference)
	}
	match base.path.rfind('/') {
		Some(i) => format!("{}{}", &base.path[..i + 1], reference),
		None => reference.to_string(),
	}
}

fn recompose(scheme: Option<&str>, authority: Option<&str>, path: &str, query: Option<&str>, fragment: Option<&str>) -> String {
	let mut out = String::new();
	if let Some(scheme) = scheme {
		out.push_str(scheme);
		out.push(':');
	}
	if let Some(authority) = authority {
		out.push_str("//");
		out.push_str(authority);
	}
	out.push_str(path);
	if let Some(q) = query {
		out.push('?');
		out.push_str(q);
	}
	if let Some(f) = fragment {
		out.push('#');
		out.push_str(f);
	}
	out
}

/**
Resolve `reference` against `base`.

Without a base, or for an absolute reference, the reference is returned
unchanged. Plain file system paths work as bases, too.

# Example

```
use rsax::uri::resolve;
assert_eq!(resolve(Some("http://a/b/c/d;p?q"), "../g"), "http://a/b/g");
assert_eq!(resolve(Some("/srv/doc/book.xml"), "dtd/book.dtd"), "/srv/doc/dtd/book.dtd");
```
*/
pub fn resolve(base: Option<&str>, reference: &str) -> String {
	let base = match base {
		Some(b) if !has_scheme(reference) => b,
		_ => return reference.to_string(),
	};
	let fragment = reference.find('#').map(|i| &reference[i + 1..]);
	let r = split(reference);
	let b = split(base);
	if r.authority.is_some() {
		return recompose(b.scheme, r.authority, &remove_dot_segments(r.path), r.query, fragment)
	}
	if r.path.is_empty() {
		let query = if r.query.is_some() { r.query } else { b.query };
		return recompose(b.scheme, b.authority, b.path, query, fragment)
	}
	let path = if r.path.starts_with('/') {
		remove_dot_segments(r.path)
	} else {
		remove_dot_segments(&merge(&b, r.path))
	};
	recompose(b.scheme, b.authority, &path, r.query, fragment)
}

fn percent_decode(s: &str) -> String {
	let bytes = s.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' && i + 2 < bytes.len() {
			let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
			if let Some(v) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
				out.push(v);
				i += 3;
				continue
			}
		}
		out.push(bytes[i]);
		i += 1;
	}
	String::from_utf8_lossy(&out).into_owned()
}

/// Map a `file:` URI or a plain path to a file system path.
///
/// Returns `None` for any other scheme.
pub fn to_file_path(uri: &str) -> Option<PathBuf> {
	if !has_scheme(uri) {
		return Some(PathBuf::from(uri))
	}
	let parts = split(uri);
	match parts.scheme {
		Some(s) if s.eq_ignore_ascii_case("file") => (),
		_ => return None,
	}
	match parts.authority {
		None | Some("") | Some("localhost") => Some(PathBuf::from(percent_decode(parts.path))),
		Some(_) => None,
	}
}
