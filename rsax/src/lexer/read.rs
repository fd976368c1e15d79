use rsax_validation::selectors::CharSelector;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Endchar {
	Eof,
	Delimiter(char),
}

fn find_first<S: CharSelector>(src: &[char], s: &S) -> Option<usize> {
	src.iter().position(|c| s.select(*c))
}

/// Advance `r` up to the first character selected by `stop`, leaving the
/// delimiter in place. Returns the number of skipped characters.
pub fn scan_until<S: CharSelector>(r: &mut &[char], stop: &S) -> (usize, Endchar) {
	match find_first(*r, stop) {
		Some(p) => {
			let delim = r[p];
			*r = &r[p..];
			(p, Endchar::Delimiter(delim))
		}
		None => {
			let n = r.len();
			*r = &[];
			(n, Endchar::Eof)
		}
	}
}

/// Like [`scan_until`], but skips the characters selected by `selector`.
pub fn skip_matching<S: CharSelector>(r: &mut &[char], selector: &S) -> (usize, Endchar) {
	let mut n = 0;
	while n < r.len() {
		if !selector.select(r[n]) {
			let delim = r[n];
			*r = &r[n..];
			return (n, Endchar::Delimiter(delim))
		}
		n += 1;
	}
	*r = &[];
	(n, Endchar::Eof)
}

/// Update a line/column pair for having consumed `span`.
pub fn advance_position(span: &[char], line: &mut u64, column: &mut u64) {
	for c in span.iter() {
		if *c == '\n' {
			*line += 1;
			*column = 0;
		} else {
			*column += 1;
		}
	}
}
