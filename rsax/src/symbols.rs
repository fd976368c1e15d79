/*!
# Name interning

All names seen during a parse (element types, attributes, entities,
notations) are hash-consed into a [`SymbolTable`]. The parser passes the
resulting [`Sym`] handles around and compares them instead of the text.
*/
use std::fmt;

use smartstring::alias::String as SmartString;

/// Number of hash buckets. Prime, so that the modulo spreads well.
pub const SYMBOL_TABLE_LENGTH: usize = 2039;

/// Handle to an interned name.
///
/// Handles are only meaningful for the table which produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(u32);

impl Sym {
	pub fn index(&self) -> usize {
		self.0 as usize
	}
}

/// Hash-consing table mapping character spans to [`Sym`] handles.
///
/// The table never shrinks. It is discarded together with the parser state
/// at the start of the next parse.
pub struct SymbolTable {
	buckets: Vec<Vec<Sym>>,
	arena: Vec<SmartString>,
}

fn hash_chars<I: Iterator<Item = char>>(chars: I) -> usize {
	let mut h: i32 = 0;
	for c in chars {
		h = h.wrapping_mul(31).wrapping_add(c as i32);
	}
	((h & 0x7fffffff) as usize) % SYMBOL_TABLE_LENGTH
}

impl SymbolTable {
	pub fn new() -> SymbolTable {
		SymbolTable{
			buckets: vec![Vec::new(); SYMBOL_TABLE_LENGTH],
			arena: Vec::new(),
		}
	}

	/// Drop all symbols.
	pub fn clear(&mut self) {
		for bucket in self.buckets.iter_mut() {
			bucket.clear();
		}
		self.arena.clear();
	}

	/// Number of distinct symbols.
	pub fn len(&self) -> usize {
		self.arena.len()
	}

	fn insert(&mut self, bucket: usize, s: SmartString) -> Sym {
		let sym = Sym(self.arena.len() as u32);
		self.arena.push(s);
		self.buckets[bucket].push(sym);
		sym
	}

	/// Intern a span of decoded characters.
	pub fn intern(&mut self, chars: &[char]) -> Sym {
		let bucket = hash_chars(chars.iter().copied());
		for sym in self.buckets[bucket].iter() {
			let known = &self.arena[sym.index()];
			if known.chars().eq(chars.iter().copied()) {
				return *sym
			}
		}
		let mut s = SmartString::new();
		for c in chars.iter() {
			s.push(*c);
		}
		self.insert(bucket, s)
	}

	/// Intern a string.
	pub fn intern_str(&mut self, s: &str) -> Sym {
		let bucket = hash_chars(s.chars());
		for sym in self.buckets[bucket].iter() {
			if self.arena[sym.index()].as_str() == s {
				return *sym
			}
		}
		self.insert(bucket, s.into())
	}

	/// Find the handle of a string without interning it.
	pub fn lookup(&self, s: &str) -> Option<Sym> {
		let bucket = hash_chars(s.chars());
		self.buckets[bucket].iter().copied().find(|sym| self.arena[sym.index()].as_str() == s)
	}

	/// Return the text of a symbol.
	pub fn resolve(&self, sym: Sym) -> &str {
		self.arena[sym.index()].as_str()
	}
}

impl fmt::Debug for SymbolTable {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "SymbolTable(<{} symbols>)", self.arena.len())
	}
}
