//! Binary copy engine: moves one field between the buffer and its location.
//!
//! Multi-byte elements go through an explicit byte-order conversion (`byteorder`), one
//! element at a time, so the result never depends on the host's byte order. The buffer side
//! uses the format's declared [`Endianness`]; the field side is always native.
//!
//! Text fields (`s`, `u`, `w`) copy exactly N elements. Decode then writes a zero element at
//! index N, so the destination must hold N + 1 elements; encode ignores any terminator.

use crate::error::PackError;
use crate::format::{Descriptor, Endianness};
use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use std::ops::Range;

/// Buffer range `desc` occupies when it starts at `pos`.
pub(crate) fn buffer_span(desc: &Descriptor, pos: usize, buf_len: usize) -> Result<Range<usize>, PackError> {
    let end = pos.saturating_add(desc.byte_len());
    if end > buf_len {
        return Err(PackError::BufferOverrun { needed: end, len: buf_len });
    }
    Ok(pos..end)
}

fn check_field(desc: &Descriptor, field_len: usize, decode: bool) -> Result<usize, PackError> {
    let needed = desc.field_len(decode);
    if field_len < needed {
        return Err(PackError::InvalidParams(format!(
            "{} field needs {} bytes, location holds {}",
            desc.field_type.name(),
            needed,
            field_len
        )));
    }
    Ok(needed)
}

fn convert<R: ByteOrder, W: ByteOrder>(src: &[u8], dst: &mut [u8], width: usize) {
    for (s, d) in src.chunks_exact(width).zip(dst.chunks_exact_mut(width)) {
        W::write_uint(d, R::read_uint(s, width), width);
    }
}

/// Copy `src` into `dst` element by element. `decode` means `src` is the buffer side.
fn copy_elements(src: &[u8], dst: &mut [u8], width: usize, buffer_order: Endianness, decode: bool) {
    if width == 1 {
        dst.copy_from_slice(src);
        return;
    }
    match (buffer_order, decode) {
        (Endianness::Big, true) => convert::<BigEndian, NativeEndian>(src, dst, width),
        (Endianness::Little, true) => convert::<LittleEndian, NativeEndian>(src, dst, width),
        (Endianness::Big, false) => convert::<NativeEndian, BigEndian>(src, dst, width),
        (Endianness::Little, false) => convert::<NativeEndian, LittleEndian>(src, dst, width),
    }
}

/// Decode the field at `buf[pos..]` into `field`. Returns the buffer position after it.
pub fn decode_field(
    desc: &Descriptor,
    endianness: Endianness,
    buf: &[u8],
    pos: usize,
    field: &mut [u8],
) -> Result<usize, PackError> {
    let span = buffer_span(desc, pos, buf.len())?;
    check_field(desc, field.len(), true)?;
    let n = span.len();
    let width = desc.field_type.width();
    copy_elements(&buf[span.clone()], &mut field[..n], width, endianness, true);
    if desc.field_type.is_text() {
        field[n..n + width].fill(0);
    }
    Ok(span.end)
}

/// Encode `field` into `buf[pos..]`. Returns the buffer position after it.
pub fn encode_field(
    desc: &Descriptor,
    endianness: Endianness,
    field: &[u8],
    buf: &mut [u8],
    pos: usize,
) -> Result<usize, PackError> {
    let span = buffer_span(desc, pos, buf.len())?;
    check_field(desc, field.len(), false)?;
    let n = span.len();
    let width = desc.field_type.width();
    copy_elements(&field[..n], &mut buf[span.clone()], width, endianness, false);
    Ok(span.end)
}

/// Step over padding without touching the buffer.
pub fn skip_padding(desc: &Descriptor, buf_len: usize, pos: usize) -> Result<usize, PackError> {
    buffer_span(desc, pos, buf_len).map(|span| span.end)
}
