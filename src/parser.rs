//! Stateful token cursor over a format string.
//!
//! Produces one [`Descriptor`] per field, flattening `n<type>` runs and replaying `n(...)`
//! groups by rewinding to the group start. Group repetition is an explicit loop; only the
//! nesting depth uses the fixed-size frame stack. [`FormatCursor::totals`] counts fields and
//! bytes without replaying anything.
//!
//! The cursor expects a string that already passed [`validate`](crate::validate::validate),
//! but still reports malformed input as an error instead of misreading it.

use crate::error::{FormatViolation, PackError};
use crate::format::{Descriptor, Endianness, FieldType, DEFAULT_ENDIANNESS, MAX_GROUP_DEPTH};
use crate::validate::{is_whitespace, parse_count};

#[derive(Debug, Clone, Copy, Default)]
struct GroupFrame {
    /// Repetitions still to replay after the current one.
    remaining: usize,
    /// Position just past the group's `(`.
    start: usize,
}

/// Field count and byte total of one group body (or the top level).
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    repeat: usize,
    fields: usize,
    bytes: usize,
}

impl Tally {
    fn add(&mut self, fields: usize, bytes: usize) {
        self.fields = self.fields.saturating_add(fields);
        self.bytes = self.bytes.saturating_add(bytes);
    }
}

enum Token {
    /// A descriptor and how many times it repeats back to back.
    Field(Descriptor, usize),
    Open { at: usize, count: usize },
    Close,
    End,
}

/// Cursor over one format string; all state lives in this value.
#[derive(Debug, Clone)]
pub struct FormatCursor<'a> {
    fmt: &'a str,
    body: usize,
    pos: usize,
    endianness: Endianness,
    groups: [GroupFrame; MAX_GROUP_DEPTH],
    depth: usize,
    current: Descriptor,
    repeat: usize,
    failed: bool,
}

impl<'a> FormatCursor<'a> {
    pub fn new(fmt: &'a str) -> Result<Self, PackError> {
        Self::with_default_endianness(fmt, DEFAULT_ENDIANNESS)
    }

    /// Cursor whose byte order, absent a `<` / `>` marker, is `default`.
    pub fn with_default_endianness(fmt: &'a str, default: Endianness) -> Result<Self, PackError> {
        let first = *fmt.as_bytes().first().ok_or(PackError::EmptyFormat)?;
        let (endianness, body) = match Endianness::from_marker(first) {
            Some(e) => (e, 1),
            None => (default, 0),
        };
        Ok(FormatCursor {
            fmt,
            body,
            pos: body,
            endianness,
            groups: [GroupFrame::default(); MAX_GROUP_DEPTH],
            depth: 0,
            current: Descriptor::scalar(FieldType::Pad),
            repeat: 0,
            failed: false,
        })
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Rewind to the first element.
    pub fn reset(&mut self) {
        self.pos = self.body;
        self.depth = 0;
        self.repeat = 0;
        self.current = Descriptor::scalar(FieldType::Pad);
        self.failed = false;
    }

    /// Next field descriptor, or `None` at the end of the string.
    pub fn next_descriptor(&mut self) -> Result<Option<Descriptor>, PackError> {
        if self.repeat > 0 {
            self.repeat -= 1;
            return Ok(Some(self.current));
        }
        match self.advance()? {
            Some((d, run)) => {
                self.current = d;
                self.repeat = run - 1;
                Ok(Some(d))
            }
            None => Ok(None),
        }
    }

    /// Next descriptor together with how many times it repeats back to back.
    ///
    /// A `4B` element comes back as one call with a run of 4 instead of four calls.
    pub fn next_run(&mut self) -> Result<Option<(Descriptor, usize)>, PackError> {
        if self.repeat > 0 {
            let run = self.repeat;
            self.repeat = 0;
            return Ok(Some((self.current, run)));
        }
        self.advance()
    }

    fn src(&self) -> &'a [u8] {
        self.fmt.as_bytes()
    }

    fn skip_whitespace(&mut self) {
        while self.src().get(self.pos).copied().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn structure_error(&self) -> PackError {
        FormatViolation::Structure { pos: self.pos }.into()
    }

    /// Scan one token, leaving `pos` just past it.
    fn token(&mut self) -> Result<Token, PackError> {
        self.skip_whitespace();
        let Some(&c) = self.src().get(self.pos) else {
            return Ok(Token::End);
        };
        if let Some(t) = FieldType::from_char(c) {
            self.pos += 1;
            return Ok(Token::Field(Descriptor::scalar(t), 1));
        }
        match c {
            b'[' => self.parse_array().map(|d| Token::Field(d, 1)),
            b'0'..=b'9' => {
                let at = self.pos;
                let n = self.parse_number()?;
                self.skip_whitespace();
                let next = self.src().get(self.pos).copied();
                if next == Some(b'(') {
                    if n == 0 {
                        return Err(FormatViolation::ZeroCount { pos: at }.into());
                    }
                    self.pos += 1;
                    return Ok(Token::Open { at, count: n });
                }
                let t = next
                    .and_then(FieldType::from_char)
                    .ok_or_else(|| self.structure_error())?;
                if n == 0 {
                    return Err(FormatViolation::ZeroCount { pos: at }.into());
                }
                self.pos += 1;
                // Text counts are lengths, never scalar repetitions.
                if t.is_text() {
                    return Ok(Token::Field(Descriptor::array(t, n), 1));
                }
                Ok(Token::Field(Descriptor::scalar(t), n))
            }
            b')' => {
                self.pos += 1;
                Ok(Token::Close)
            }
            _ => Err(self.structure_error()),
        }
    }

    fn advance(&mut self) -> Result<Option<(Descriptor, usize)>, PackError> {
        loop {
            match self.token()? {
                Token::Field(d, run) => return Ok(Some((d, run))),
                Token::Open { at, count } => self.push_group(at, count)?,
                Token::Close => self.close_group()?,
                Token::End if self.depth > 0 => {
                    return Err(FormatViolation::Grouping { pos: self.pos }.into());
                }
                Token::End => return Ok(None),
            }
        }
    }

    /// Non-padding field count and packed size of the whole string.
    ///
    /// Each group body is scanned once and its totals scaled by the repeat count, so the cost
    /// follows the length of the string, not the number of fields it expands to. Totals
    /// saturate at `usize::MAX`.
    pub fn totals(&self) -> Result<(usize, usize), PackError> {
        let mut scan = self.clone();
        scan.reset();
        // slot 0 is the top level
        let mut tallies = [Tally::default(); MAX_GROUP_DEPTH + 1];
        tallies[0].repeat = 1;
        let mut depth = 0;
        loop {
            match scan.token()? {
                Token::Field(d, run) => {
                    let fields = if d.is_padding() { 0 } else { run };
                    tallies[depth].add(fields, d.byte_len().saturating_mul(run));
                }
                Token::Open { at, count } => {
                    if depth >= MAX_GROUP_DEPTH {
                        return Err(FormatViolation::Grouping { pos: at }.into());
                    }
                    depth += 1;
                    tallies[depth] = Tally { repeat: count, fields: 0, bytes: 0 };
                }
                Token::Close => {
                    if depth == 0 {
                        return Err(FormatViolation::Grouping { pos: scan.pos - 1 }.into());
                    }
                    let inner = tallies[depth];
                    depth -= 1;
                    tallies[depth].add(
                        inner.fields.saturating_mul(inner.repeat),
                        inner.bytes.saturating_mul(inner.repeat),
                    );
                }
                Token::End if depth > 0 => {
                    return Err(FormatViolation::Grouping { pos: scan.pos }.into());
                }
                Token::End => return Ok((tallies[0].fields, tallies[0].bytes)),
            }
        }
    }

    fn parse_number(&mut self) -> Result<usize, PackError> {
        let start = self.pos;
        while self.src().get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        parse_count(&self.fmt[start..self.pos], start)
    }

    fn parse_array(&mut self) -> Result<Descriptor, PackError> {
        let open = self.pos;
        self.pos += 1;
        self.skip_whitespace();
        if !self.src().get(self.pos).is_some_and(u8::is_ascii_digit) {
            return Err(PackError::InvalidArray { pos: self.pos });
        }
        let n = self.parse_number()?;
        if n == 0 {
            return Err(PackError::InvalidArray { pos: open });
        }
        self.skip_whitespace();
        if self.src().get(self.pos) != Some(&b']') {
            return Err(PackError::InvalidArray { pos: self.pos });
        }
        self.pos += 1;
        self.skip_whitespace();
        let t = self
            .src()
            .get(self.pos)
            .copied()
            .and_then(FieldType::from_char)
            .ok_or(PackError::InvalidArray { pos: self.pos })?;
        self.pos += 1;
        Ok(Descriptor::array(t, n))
    }

    /// Enter a group whose `(` was just consumed.
    fn push_group(&mut self, at: usize, n: usize) -> Result<(), PackError> {
        if self.depth >= MAX_GROUP_DEPTH {
            return Err(FormatViolation::Grouping { pos: at }.into());
        }
        self.groups[self.depth] = GroupFrame { remaining: n - 1, start: self.pos };
        self.depth += 1;
        Ok(())
    }

    /// Leave or replay the innermost group; its `)` was just consumed.
    fn close_group(&mut self) -> Result<(), PackError> {
        if self.depth == 0 {
            return Err(FormatViolation::Grouping { pos: self.pos - 1 }.into());
        }
        let frame = &mut self.groups[self.depth - 1];
        if frame.remaining == 0 {
            self.depth -= 1;
        } else {
            frame.remaining -= 1;
            self.pos = frame.start;
        }
        Ok(())
    }
}

/// Yields every descriptor, padding included; stops after the first error.
impl Iterator for FormatCursor<'_> {
    type Item = Result<Descriptor, PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_descriptor().transpose();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}
