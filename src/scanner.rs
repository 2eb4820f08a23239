//! Splitting a lease snapshot into entry blocks.
//!
//! A `dhcpd.leases` file is a flat sequence of brace-delimited stanzas.
//! The scanner cuts the byte stream at every [`ENTRY_TERMINATOR`] and hands
//! out the text before it, without the terminator. Reads may end anywhere,
//! including in the middle of a stanza or a multi-byte character; a block is
//! only produced once its terminator has been seen, so the result does not
//! depend on how the underlying reader chunks its data.
//!
//! Input after the last terminator is an incomplete entry and is dropped.

use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::config::DEFAULT_READ_BUFFER_SIZE;
use crate::error::Result;

/// Closing delimiter of a lease stanza.
pub const ENTRY_TERMINATOR: u8 = b'}';

/// Outcome of looking for the next block in buffered input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split<'a> {
    /// A complete block. `consumed` bytes (block plus terminator) should be
    /// discarded from the front of the buffer.
    Block { consumed: usize, block: &'a [u8] },
    /// No terminator in the buffer yet; nothing was consumed.
    NeedMore,
    /// End of input with nothing buffered.
    Done,
}

/// Finds the next entry block at the front of `buffer`.
///
/// `at_eof` tells whether the underlying stream has been exhausted. When it
/// is and the buffer still holds bytes without a terminator, the result is
/// [`Split::NeedMore`]; since no more input will arrive, the caller treats
/// those bytes as an incomplete entry.
pub fn next_block(buffer: &[u8], at_eof: bool) -> Split<'_> {
    next_block_after(buffer, 0, at_eof)
}

/// Like [`next_block`], but starts looking for the terminator at
/// `searched`. The caller guarantees `buffer[..searched]` holds none.
pub fn next_block_after(buffer: &[u8], searched: usize, at_eof: bool) -> Split<'_> {
    if at_eof && buffer.is_empty() {
        return Split::Done;
    }

    let from = searched.min(buffer.len());
    match buffer[from..].iter().position(|&byte| byte == ENTRY_TERMINATOR) {
        Some(offset) => Split::Block {
            consumed: from + offset + 1,
            block: &buffer[..from + offset],
        },
        None => Split::NeedMore,
    }
}

/// Lazy, forward-only iterator over the entry blocks of a reader.
///
/// Blocks are decoded as UTF-8, with invalid sequences replaced. A read
/// error is yielded once, after which the iterator is exhausted.
pub struct EntryScanner<R> {
    reader: R,
    buffer: Vec<u8>,
    start: usize,
    /// Bytes after `start` already known to hold no terminator.
    searched: usize,
    read_size: usize,
    at_eof: bool,
    finished: bool,
}

impl<R: Read> EntryScanner<R> {
    pub fn new(reader: R) -> Self {
        Self::with_read_size(reader, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Creates a scanner that asks the reader for at most `read_size` bytes
    /// at a time. A size of zero is treated as one.
    pub fn with_read_size(reader: R, read_size: usize) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            start: 0,
            searched: 0,
            read_size: read_size.max(1),
            at_eof: false,
            finished: false,
        }
    }

    fn fill(&mut self) -> std::io::Result<()> {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.start = 0;
        }

        let filled = self.buffer.len();
        self.buffer.resize(filled + self.read_size, 0);
        loop {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(read) => {
                    self.buffer.truncate(filled + read);
                    if read == 0 {
                        self.at_eof = true;
                    }
                    return Ok(());
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    self.buffer.truncate(filled);
                    return Err(error);
                }
            }
        }
    }
}

impl<R: Read> Iterator for EntryScanner<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let pending = &self.buffer[self.start..];
            let block = match next_block_after(pending, self.searched, self.at_eof) {
                Split::Block { consumed, block } => {
                    Some((consumed, String::from_utf8_lossy(block).into_owned()))
                }
                Split::Done => break,
                Split::NeedMore => {
                    self.searched = pending.len();
                    None
                }
            };

            if let Some((consumed, text)) = block {
                self.start += consumed;
                self.searched = 0;
                return Some(Ok(text));
            }

            if self.at_eof {
                let trailing = &self.buffer[self.start..];
                if !trailing.iter().all(u8::is_ascii_whitespace) {
                    debug!(
                        "Dropping {} trailing bytes without a closing '}}'",
                        trailing.len()
                    );
                }
                break;
            }

            if let Err(error) = self.fill() {
                self.finished = true;
                return Some(Err(error.into()));
            }
        }

        self.finished = true;
        self.buffer = Vec::new();
        self.start = 0;
        self.searched = 0;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::error::Error;

    /// Returns its data in fixed-size pieces, then fails if asked to.
    struct ChunkedReader {
        data: Vec<u8>,
        position: usize,
        chunk: usize,
        fail_at_end: bool,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.position == self.data.len() && self.fail_at_end {
                return Err(std::io::Error::other("disk on fire"));
            }
            let count = self.chunk.min(buf.len()).min(self.data.len() - self.position);
            buf[..count].copy_from_slice(&self.data[self.position..self.position + count]);
            self.position += count;
            Ok(count)
        }
    }

    fn collect(scanner: EntryScanner<impl Read>) -> Vec<String> {
        scanner.map(|block| block.unwrap()).collect()
    }

    #[test]
    fn test_next_block_strips_terminator() {
        let buffer = b"lease 10.0.0.1 {\n}\nlease";
        assert_eq!(
            next_block(buffer, false),
            Split::Block {
                consumed: 18,
                block: b"lease 10.0.0.1 {\n"
            }
        );
    }

    #[test]
    fn test_next_block_needs_more_without_terminator() {
        assert_eq!(next_block(b"lease 10.0.0.1 {\n  starts", false), Split::NeedMore);
        assert_eq!(next_block(b"", false), Split::NeedMore);
    }

    #[test]
    fn test_next_block_done_at_eof() {
        assert_eq!(next_block(b"", true), Split::Done);
    }

    #[test]
    fn test_next_block_trailing_input_at_eof() {
        assert_eq!(next_block(b"lease 10.0.0.9 {", true), Split::NeedMore);
        assert_eq!(
            next_block(b"}", true),
            Split::Block {
                consumed: 1,
                block: b""
            }
        );
    }

    #[test]
    fn test_next_block_after_resumes_search() {
        let buffer = b"abc}def}";
        assert_eq!(
            next_block_after(buffer, 4, false),
            Split::Block {
                consumed: 8,
                block: b"abc}def"
            }
        );
        assert_eq!(next_block_after(b"abcdef", 3, false), Split::NeedMore);
        assert_eq!(next_block_after(b"ab", 10, false), Split::NeedMore);
        assert_eq!(next_block_after(b"", 0, true), Split::Done);
    }

    #[test]
    fn test_scanner_large_block_with_tiny_reads() {
        let mut input = String::from("lease 10.0.0.1 {\n");
        for index in 0..2000 {
            input.push_str(&format!("  set note-{} = \"x\";\n", index));
        }
        input.push_str("}\nlease 10.0.0.2 {\n}");

        let reader = ChunkedReader {
            data: input.as_bytes().to_vec(),
            position: 0,
            chunk: 1,
            fail_at_end: false,
        };
        let mut scanner = EntryScanner::with_read_size(reader, 1);
        let first = scanner.next().unwrap().unwrap();
        assert_eq!(first.len(), input.find('}').unwrap());
        assert_eq!(scanner.searched, 0);
        assert_eq!(scanner.next().unwrap().unwrap(), "\nlease 10.0.0.2 {\n");
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_scanner_yields_blocks_in_order() {
        let input = "lease 10.0.0.1 {\n}\nlease 10.0.0.2 {\n}\n";
        let blocks = collect(EntryScanner::new(Cursor::new(input)));
        assert_eq!(blocks, vec!["lease 10.0.0.1 {\n", "\nlease 10.0.0.2 {\n"]);
    }

    #[test]
    fn test_scanner_drops_incomplete_trailing_block() {
        let input = "lease 10.0.0.1 {\n}\nlease 10.0.0.2 {\n  starts 2 2023/01/10 08:00:00;\n";
        let blocks = collect(EntryScanner::new(Cursor::new(input)));
        assert_eq!(blocks, vec!["lease 10.0.0.1 {\n"]);
    }

    #[test]
    fn test_scanner_empty_input() {
        assert!(collect(EntryScanner::new(Cursor::new(""))).is_empty());
    }

    #[test]
    fn test_scanner_handles_single_byte_reads() {
        let input = "a}bc}}def";
        let reader = ChunkedReader {
            data: input.as_bytes().to_vec(),
            position: 0,
            chunk: 1,
            fail_at_end: false,
        };
        let blocks = collect(EntryScanner::with_read_size(reader, 1));
        assert_eq!(blocks, vec!["a", "bc", ""]);
    }

    #[test]
    fn test_scanner_multibyte_split_across_reads() {
        let input = "lease 10.0.0.1 { # caf\u{e9} }";
        let reader = ChunkedReader {
            data: input.as_bytes().to_vec(),
            position: 0,
            chunk: 3,
            fail_at_end: false,
        };
        let blocks = collect(EntryScanner::with_read_size(reader, 2));
        assert_eq!(blocks, vec!["lease 10.0.0.1 { # caf\u{e9} "]);
    }

    #[test]
    fn test_scanner_invalid_utf8_is_replaced() {
        let input: &[u8] = b"lease \xff {}";
        let blocks = collect(EntryScanner::new(Cursor::new(input)));
        assert_eq!(blocks, vec!["lease \u{fffd} {"]);
    }

    #[test]
    fn test_scanner_propagates_read_error_once() {
        let reader = ChunkedReader {
            data: b"x}y".to_vec(),
            position: 0,
            chunk: 16,
            fail_at_end: true,
        };
        let mut scanner = EntryScanner::new(reader);
        assert_eq!(scanner.next().unwrap().unwrap(), "x");
        assert!(matches!(scanner.next(), Some(Err(Error::Io(_)))));
        assert!(scanner.next().is_none());
    }
}
