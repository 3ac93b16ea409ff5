use std::io::BufRead;

use crate::error::{CompileError, CompileResult};
use crate::PopRc;

#[derive(Clone, Debug, PartialEq, Eq)]
/// A single immutable line of the loaded source.
///
/// Every line owns one synthetic position past its last character that
/// reads as `'\n'`, so the flattened source is addressable as a contiguous
/// run of characters.
pub struct Line {
    number: usize,
    offset: usize,
    chars: Vec<char>,
}

impl Line {
    /// The 1-based line number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Offset of the first character into the flattened source.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Offset of the synthetic newline, `offset + chars`.
    pub fn endset(&self) -> usize {
        self.offset + self.chars.len()
    }

    /// Character count including the synthetic newline.
    pub fn len(&self) -> usize {
        self.chars.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The raw characters, without the synthetic newline.
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// The character at a line-local index.
    fn char_at(&self, local: usize) -> char {
        if local == self.chars.len() {
            '\n'
        } else {
            self.chars[local]
        }
    }
}

#[derive(Clone, Debug)]
/// A character-accurate cursor over the line-indexed source buffer.
///
/// The cursor supports random access, signed-offset peeking, backtracking
/// and delimiter skipping. Sub-cursors share the underlying lines and are
/// restricted to a `[start, end)` range of absolute positions. A freshly
/// loaded cursor sits before the start; the first `next` yields the first
/// character of line 1.
pub struct CodeReader {
    lines: PopRc<[Line]>,
    /// Current absolute position, `None` while before the start.
    index: Option<usize>,
    start: usize,
    end: usize,
    /// Index into `lines` of the most recently visited line. Lookups scan
    /// from here in the direction of movement.
    line_cursor: usize,
}

impl CodeReader {
    /// Partitions source text into lines and returns a cursor before the
    /// start of it.
    pub fn load(source: &str) -> CodeReader {
        let mut lines = Vec::new();
        let mut offset = 0;
        for (idx, raw) in source.split('\n').enumerate() {
            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            let chars: Vec<char> = raw.chars().collect();
            let len = chars.len() + 1;
            lines.push(Line {
                number: idx + 1,
                offset,
                chars,
            });
            offset += len;
        }
        let end = offset;
        CodeReader {
            lines: lines.into(),
            index: None,
            start: 0,
            end,
            line_cursor: 0,
        }
    }

    /// Loads the full contents of a buffered reader.
    pub fn from_reader(mut reader: impl BufRead) -> std::io::Result<CodeReader> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        Ok(CodeReader::load(&source))
    }

    /// Yields a cursor restricted to `[from, to)` sharing the underlying
    /// lines. The new cursor starts before `from`.
    pub fn subpart(&self, from: usize, to: usize) -> CompileResult<CodeReader> {
        if from > to || to > self.total_len() {
            return Err(CompileError::BadIndex {
                index: from.max(to),
                min: 0,
                max: self.total_len(),
            });
        }
        let line_cursor = if from < self.total_len() {
            self.line_of(from)
        } else {
            self.line_cursor
        };
        Ok(CodeReader {
            lines: PopRc::clone(&self.lines),
            index: None,
            start: from,
            end: to,
            line_cursor,
        })
    }

    /// The 1-based number of the line under the cursor, or 0 before any
    /// movement on an unread cursor.
    pub fn current_line(&self) -> usize {
        match self.index {
            Some(_) => self.lines[self.line_cursor].number(),
            None => 0,
        }
    }

    /// The current absolute position, if the cursor has started.
    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    /// One past the last addressable position of this cursor.
    pub fn max_index(&self) -> usize {
        self.end
    }

    /// Rewinds to the before-start state.
    pub fn reset(&mut self) {
        self.index = None;
    }

    /// Returns whether a `next` call would succeed.
    pub fn has_next(&self) -> bool {
        match self.index {
            None => self.start < self.end,
            Some(idx) => idx + 1 < self.end,
        }
    }

    /// Advances one character.
    pub fn next(&mut self) -> CompileResult<char> {
        let target = match self.index {
            None => self.start,
            Some(idx) => idx + 1,
        };
        if target >= self.end {
            self.index = Some(self.end);
            return Err(CompileError::EndOfSource);
        }
        self.line_cursor = self.line_of(target);
        self.index = Some(target);
        let line = &self.lines[self.line_cursor];
        Ok(line.char_at(target - line.offset()))
    }

    /// The character at the current position.
    pub fn peek(&self) -> CompileResult<char> {
        self.peek_at(0)
    }

    /// The character at the current position offset by `k`, without
    /// advancing.
    pub fn peek_at(&self, k: isize) -> CompileResult<char> {
        let target = self.offset_index(k)?;
        let line = &self.lines[self.line_of(target)];
        Ok(line.char_at(target - line.offset()))
    }

    /// Tests whether `peek_at(k)` would succeed.
    pub fn can_peek(&self, k: isize) -> bool {
        self.offset_index(k).is_ok()
    }

    /// Jumps to an absolute position and returns the character there.
    pub fn move_to(&mut self, target: usize) -> CompileResult<char> {
        if target < self.start || target >= self.end {
            return Err(CompileError::BadIndex {
                index: target,
                min: self.start,
                max: self.end,
            });
        }
        self.line_cursor = self.line_of(target);
        self.index = Some(target);
        let line = &self.lines[self.line_cursor];
        Ok(line.char_at(target - line.offset()))
    }

    /// Jumps relative to the current position.
    pub fn move_by(&mut self, k: isize) -> CompileResult<char> {
        let base = self.index.ok_or(CompileError::EndOfSource)?;
        let target = base
            .checked_add_signed(k)
            .ok_or(CompileError::BadIndex {
                index: 0,
                min: self.start,
                max: self.end,
            })?;
        self.move_to(target)
    }

    /// Consumes characters until the terminator is seen. End of source is
    /// tolerated silently.
    pub fn seek_or_end(&mut self, terminator: char) {
        while let Ok(c) = self.next() {
            if c == terminator {
                return;
            }
        }
    }

    /// Consumes characters until the two-character sequence `c1 c2` is
    /// seen, consuming both. End of source is tolerated silently.
    pub fn seek_pair_or_end(&mut self, c1: char, c2: char) {
        while let Ok(c) = self.next() {
            if c == c1 && self.can_peek(1) && self.peek_at(1) == Ok(c2) {
                let _ = self.next();
                return;
            }
        }
    }

    /// Non-destructive lookahead: skips spaces and tabs and reports whether
    /// the next non-space character equals `c`. The position is restored
    /// whether or not the match succeeds.
    pub fn find_ignore_spaces(&mut self, c: char) -> bool {
        let saved_index = self.index;
        let saved_line = self.line_cursor;
        let found = loop {
            match self.next() {
                Ok(' ') | Ok('\t') => continue,
                Ok(other) => break other == c,
                Err(_) => break false,
            }
        };
        self.index = saved_index;
        self.line_cursor = saved_line;
        found
    }

    /// Total flattened length of the underlying buffer, independent of any
    /// sub-cursor restriction.
    fn total_len(&self) -> usize {
        self.lines.last().map(Line::endset).map_or(0, |e| e + 1)
    }

    fn offset_index(&self, k: isize) -> CompileResult<usize> {
        let base = self.index.ok_or(CompileError::EndOfSource)?;
        let target = base.checked_add_signed(k).ok_or(CompileError::BadIndex {
            index: 0,
            min: self.start,
            max: self.end,
        })?;
        if target < self.start || target >= self.end {
            return Err(CompileError::BadIndex {
                index: target,
                min: self.start,
                max: self.end,
            });
        }
        Ok(target)
    }

    /// Finds the line containing `target` by scanning from the cached line
    /// in the direction of movement. Amortised O(1) for monotone scans.
    fn line_of(&self, target: usize) -> usize {
        let mut l = self.line_cursor.min(self.lines.len() - 1);
        while self.lines[l].endset() < target {
            l += 1;
        }
        while self.lines[l].offset() > target {
            l -= 1;
        }
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(reader: &mut CodeReader) -> String {
        let mut out = String::new();
        while let Ok(c) = reader.next() {
            out.push(c);
        }
        out
    }

    #[test]
    fn next_walks_lines_with_synthetic_newlines() {
        let mut reader = CodeReader::load("ab\ncd");
        assert_eq!(drain(&mut reader), "ab\ncd\n");
    }

    #[test]
    fn empty_source_is_a_single_newline() {
        let mut reader = CodeReader::load("");
        assert_eq!(reader.next(), Ok('\n'));
        assert_eq!(reader.next(), Err(CompileError::EndOfSource));
    }

    #[test]
    fn first_next_returns_line_one_character_zero() {
        let mut reader = CodeReader::load("xyz");
        assert_eq!(reader.current_line(), 0);
        assert_eq!(reader.next(), Ok('x'));
        assert_eq!(reader.current_line(), 1);
        assert_eq!(reader.current_index(), Some(0));
    }

    #[test]
    fn peek_offsets_do_not_advance() {
        let mut reader = CodeReader::load("abc");
        reader.next().unwrap();
        reader.next().unwrap();
        assert_eq!(reader.peek(), Ok('b'));
        assert_eq!(reader.peek_at(1), Ok('c'));
        assert_eq!(reader.peek_at(-1), Ok('a'));
        assert_eq!(reader.current_index(), Some(1));
    }

    #[test]
    fn can_peek_respects_bounds() {
        let mut reader = CodeReader::load("ab");
        reader.next().unwrap();
        assert!(reader.can_peek(2)); // the synthetic newline
        assert!(!reader.can_peek(3));
        assert!(!reader.can_peek(-1));
    }

    #[test]
    fn move_to_is_random_access() {
        let mut reader = CodeReader::load("ab\ncd");
        assert_eq!(reader.move_to(3), Ok('c'));
        assert_eq!(reader.current_line(), 2);
        assert_eq!(reader.move_to(0), Ok('a'));
        assert_eq!(reader.current_line(), 1);
        assert_eq!(
            reader.move_to(99),
            Err(CompileError::BadIndex {
                index: 99,
                min: 0,
                max: 6
            })
        );
    }

    #[test]
    fn move_by_is_relative() {
        let mut reader = CodeReader::load("abcd");
        reader.next().unwrap();
        assert_eq!(reader.move_by(2), Ok('c'));
        assert_eq!(reader.move_by(-2), Ok('a'));
    }

    #[test]
    fn seek_or_end_consumes_through_terminator() {
        let mut reader = CodeReader::load("xx;yy");
        reader.seek_or_end(';');
        assert_eq!(reader.next(), Ok('y'));
    }

    #[test]
    fn seek_or_end_tolerates_eof() {
        let mut reader = CodeReader::load("xx");
        reader.seek_or_end(';');
        assert!(!reader.has_next());
    }

    #[test]
    fn seek_pair_consumes_both_delimiters() {
        let mut reader = CodeReader::load("a*b*/c");
        reader.seek_pair_or_end('*', '/');
        assert_eq!(reader.next(), Ok('c'));
    }

    #[test]
    fn find_ignore_spaces_restores_position() {
        let mut reader = CodeReader::load("a  \t(x");
        reader.next().unwrap();
        assert!(reader.find_ignore_spaces('('));
        assert_eq!(reader.current_index(), Some(0));
        assert!(!reader.find_ignore_spaces('{'));
        assert_eq!(reader.current_index(), Some(0));
    }

    #[test]
    fn subpart_restricts_the_range() {
        let reader = CodeReader::load("abcdef");
        let mut sub = reader.subpart(2, 4).unwrap();
        assert_eq!(drain(&mut sub), "cd");
    }

    #[test]
    fn subpart_shares_line_numbers() {
        let reader = CodeReader::load("ab\ncd\nef");
        let mut sub = reader.subpart(3, 5).unwrap();
        sub.next().unwrap();
        assert_eq!(sub.current_line(), 2);
    }

    #[test]
    fn newline_positions_read_back_as_newline() {
        let mut reader = CodeReader::load("a\nb");
        assert_eq!(reader.move_to(1), Ok('\n'));
        assert_eq!(reader.move_to(3), Ok('\n'));
    }

    #[test]
    fn crlf_line_ends_are_normalised() {
        let mut reader = CodeReader::load("ab\r\ncd");
        assert_eq!(drain(&mut reader), "ab\ncd\n");
    }
}
