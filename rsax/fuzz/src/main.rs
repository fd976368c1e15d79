#[macro_use]
extern crate afl;
extern crate rsax;

use std::collections::VecDeque;
use std::io;

use rsax::{Attribute, Handler, InputSource, ParserOptions, Parser};

/// Hands out one chunk per read call, so that entity and buffer
/// boundaries fall at arbitrary places.
struct Chunked {
	chunks: VecDeque<Vec<u8>>,
}

impl io::Read for Chunked {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let chunk = match self.chunks.front_mut() {
			Some(chunk) => chunk,
			None => return Ok(0),
		};
		let n = chunk.len().min(buf.len());
		buf[..n].copy_from_slice(&chunk[..n]);
		chunk.drain(..n);
		if chunk.len() == 0 {
			self.chunks.pop_front();
		}
		Ok(n)
	}
}

#[derive(Default)]
struct Count {
	nevents: usize,
}

impl Handler for Count {
	fn start_element(&mut self, _name: &str) -> rsax::Result<()> {
		self.nevents += 1;
		Ok(())
	}

	fn attribute(&mut self, _attr: &Attribute<'_>) -> rsax::Result<()> {
		self.nevents += 1;
		Ok(())
	}

	// never touch the file system while fuzzing
	fn resolve_entity(&mut self, _is_pe: bool, _name: &str, _id: &rsax::ExternalId, _base: Option<&str>) -> rsax::Result<Option<InputSource>> {
		Ok(None)
	}
}

fn parse_chunked(chunks: &[&[u8]], read_buffer_size: usize) -> rsax::Result<usize> {
	let mut h = Count::default();
	let source = InputSource::from_reader(Chunked{
		chunks: chunks.iter().map(|c| c.to_vec()).collect(),
	});
	let options = ParserOptions::default().read_buffer_size(read_buffer_size);
	Parser::with_options(&mut h, options).parse(source)?;
	Ok(h.nevents)
}

fn main() {
	fuzz!(|data: &[u8]| {
		let mut chunks = Vec::<&[u8]>::new();
		let zero = &b"\0"[..];
		for chunk in data.split(|b| { *b == b'\0' }) {
			if chunk.len() == 0 {
				chunks.push(zero)
			} else {
				chunks.push(chunk)
			}
		}
		let buf = chunks.join(&b""[..]);

		let whole = parse_chunked(&[&buf], 8192);
		let split = parse_chunked(&chunks, 8192);
		let tiny = parse_chunked(&[&buf], 1);

		match (&whole, &split, &tiny) {
			(Ok(a), Ok(b), Ok(c)) => {
				if a != b || a != c {
					panic!("event count depends on chunking")
				}
			},
			(Err(_), Err(_), Err(_)) => (),
			_ => panic!("error state depends on chunking"),
		}
	});
}
