//! Grammar validator for format strings.
//!
//! ## Rules (checked in this order, first violation wins)
//!
//! - **Characters**: only type characters, digits, `<`, `>`, `[`, `]`, `(`, `)`, space and tab.
//! - **Endian placement**: `<` / `>` may only appear at position 0.
//! - **Group start**: the first element may not be a bare `(`; groups need a repeat count.
//! - **Terminator**: the last non-whitespace character is a type character or `)`.
//! - **Grouping**: parentheses balance, never close below zero and nest at most
//!   [`MAX_GROUP_DEPTH`] deep.
//! - **Array syntax**: `[` / `]` balance and never nest.
//! - **Numeral spacing**: whitespace may not split a number (`1 2I`).
//! - **Structure**: the string matches the PEST grammar in `grammar.pest`, and every count is
//!   between 1 and `i32::MAX`.
//!
//! Nothing is copied until a format string passes every rule.

use crate::error::{FormatViolation, PackError};
use crate::format::{Endianness, FieldType, MAX_GROUP_DEPTH};
use pest::error::InputLocation;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct FormatParser;

pub(crate) fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

fn is_allowed(c: char) -> bool {
    c.is_ascii()
        && (FieldType::from_char(c as u8).is_some()
            || c.is_ascii_digit()
            || matches!(c, '<' | '>' | '[' | ']' | '(' | ')' | ' ' | '\t'))
}

/// Validate a format string. Returns the first rule it breaks.
pub fn validate(fmt: &str) -> Result<(), PackError> {
    let src = fmt.as_bytes();
    if src.is_empty() {
        return Err(PackError::EmptyFormat);
    }
    check_characters(fmt)?;
    check_endian_placement(src)?;
    check_group_start(src)?;
    check_terminator(src)?;
    check_grouping(src)?;
    check_arrays(src)?;
    check_numeral_spacing(src)?;
    check_structure(fmt)
}

fn check_characters(fmt: &str) -> Result<(), PackError> {
    match fmt.char_indices().find(|&(_, c)| !is_allowed(c)) {
        Some((pos, ch)) => Err(FormatViolation::InvalidCharacter { pos, ch }.into()),
        None => Ok(()),
    }
}

fn check_endian_placement(src: &[u8]) -> Result<(), PackError> {
    match src
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, &c)| Endianness::from_marker(c).is_some())
    {
        Some((pos, _)) => Err(FormatViolation::EndianPlacement { pos }.into()),
        None => Ok(()),
    }
}

fn check_group_start(src: &[u8]) -> Result<(), PackError> {
    let skip = usize::from(Endianness::from_marker(src[0]).is_some());
    let first = src
        .iter()
        .enumerate()
        .skip(skip)
        .find(|(_, &c)| !is_whitespace(c));
    match first {
        Some((pos, b'(')) => Err(FormatViolation::GroupStart { pos }.into()),
        _ => Ok(()),
    }
}

fn check_terminator(src: &[u8]) -> Result<(), PackError> {
    // All-whitespace strings report their final byte.
    let pos = src
        .iter()
        .rposition(|&c| !is_whitespace(c))
        .unwrap_or(src.len() - 1);
    let c = src[pos];
    if c == b')' || FieldType::from_char(c).is_some() {
        Ok(())
    } else {
        Err(FormatViolation::Terminator { pos, ch: c as char }.into())
    }
}

fn check_grouping(src: &[u8]) -> Result<(), PackError> {
    let mut open: Vec<usize> = Vec::new();
    for (pos, &c) in src.iter().enumerate() {
        match c {
            b'(' => {
                if open.len() >= MAX_GROUP_DEPTH {
                    return Err(FormatViolation::Grouping { pos }.into());
                }
                open.push(pos);
            }
            b')' => {
                if open.pop().is_none() {
                    return Err(FormatViolation::Grouping { pos }.into());
                }
            }
            _ => {}
        }
    }
    match open.first() {
        Some(&pos) => Err(FormatViolation::Grouping { pos }.into()),
        None => Ok(()),
    }
}

fn check_arrays(src: &[u8]) -> Result<(), PackError> {
    let mut open_at: Option<usize> = None;
    for (pos, &c) in src.iter().enumerate() {
        match (c, open_at) {
            (b'[', Some(_)) | (b']', None) => return Err(PackError::InvalidArray { pos }),
            (b'[', None) => open_at = Some(pos),
            (b']', Some(_)) => open_at = None,
            _ => {}
        }
    }
    match open_at {
        Some(pos) => Err(PackError::InvalidArray { pos }),
        None => Ok(()),
    }
}

fn check_numeral_spacing(src: &[u8]) -> Result<(), PackError> {
    for pos in 0..src.len() {
        if !src[pos].is_ascii_digit() {
            continue;
        }
        let mut next = pos + 1;
        if next >= src.len() || !is_whitespace(src[next]) {
            continue;
        }
        while next < src.len() && is_whitespace(src[next]) {
            next += 1;
        }
        if next < src.len() && src[next].is_ascii_digit() {
            return Err(FormatViolation::NumeralSpacing { pos }.into());
        }
    }
    Ok(())
}

/// True when `pos` sits inside `[...]` or right after its closing `]`.
fn in_array_context(src: &[u8], pos: usize) -> bool {
    let head = &src[..pos.min(src.len())];
    if head.iter().rev().find(|&&c| !is_whitespace(c)) == Some(&b']') {
        return true;
    }
    let last_open = head.iter().rposition(|&c| c == b'[');
    let last_close = head.iter().rposition(|&c| c == b']');
    match (last_open, last_close) {
        (Some(o), Some(c)) => o > c,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Parse a count literal; `i32::MAX` is the largest count accepted.
pub(crate) fn parse_count(digits: &str, pos: usize) -> Result<usize, PackError> {
    match digits.parse::<u32>() {
        Ok(n) if n <= i32::MAX as u32 => Ok(n as usize),
        _ => Err(PackError::IntOverflow { pos }),
    }
}

fn check_structure(fmt: &str) -> Result<(), PackError> {
    let pairs = FormatParser::parse(Rule::format, fmt).map_err(|e| {
        let pos = match e.location {
            InputLocation::Pos(p) => p,
            InputLocation::Span((start, _)) => start,
        };
        if in_array_context(fmt.as_bytes(), pos) {
            PackError::InvalidArray { pos }
        } else {
            PackError::InvalidFormat(FormatViolation::Structure { pos })
        }
    })?;
    for pair in pairs.flatten() {
        let in_array = match pair.as_rule() {
            Rule::array => true,
            Rule::group | Rule::repeat => false,
            _ => continue,
        };
        let count = match pair.into_inner().find(|p| p.as_rule() == Rule::count) {
            Some(c) => c,
            None => continue,
        };
        let pos = count.as_span().start();
        if parse_count(count.as_str(), pos)? == 0 {
            return Err(if in_array {
                PackError::InvalidArray { pos }
            } else {
                FormatViolation::ZeroCount { pos }.into()
            });
        }
    }
    Ok(())
}
