//! Pack/unpack entry points.
//!
//! Every operation runs in two passes over the format string. The dry run checks the
//! declared field count, the total packed size and each field location's size; the real pass
//! then transfers fields one by one. A rejected call leaves the buffer and every field
//! location untouched.

use crate::codec;
use crate::error::PackError;
use crate::format::{Descriptor, Endianness, DEFAULT_ENDIANNESS};
use crate::locate::{Fields, FieldsMut};
use crate::parser::FormatCursor;
use crate::validate::validate;
use tracing::{debug, trace};

/// A validated format string.
///
/// Validation and the field/size totals happen once in [`Format::new`], in time linear in the
/// length of the string; the handle can then drive any number of transfers.
#[derive(Debug, Clone)]
pub struct Format<'a> {
    fmt: &'a str,
    start: FormatCursor<'a>,
    fields: usize,
    size: usize,
}

/// Field side of one transfer.
enum Transfer<'r, 'f, 'b> {
    Decode { fields: FieldsMut<'r, 'f>, buf: &'b [u8] },
    Encode { fields: Fields<'r, 'f>, buf: &'b mut [u8] },
}

impl Transfer<'_, '_, '_> {
    fn is_decode(&self) -> bool {
        matches!(self, Transfer::Decode { .. })
    }

    fn direction(&self) -> &'static str {
        if self.is_decode() {
            "unpack"
        } else {
            "pack"
        }
    }

    fn locations(&self) -> usize {
        match self {
            Transfer::Decode { fields, .. } => fields.len(),
            Transfer::Encode { fields, .. } => fields.len(),
        }
    }

    fn buf_len(&self) -> usize {
        match self {
            Transfer::Decode { buf, .. } => buf.len(),
            Transfer::Encode { buf, .. } => buf.len(),
        }
    }

    fn capacity(&self, index: usize) -> Result<usize, PackError> {
        match self {
            Transfer::Decode { fields, .. } => fields.capacity(index),
            Transfer::Encode { fields, .. } => fields.capacity(index),
        }
    }

    /// Move field `index` and return the buffer position after it.
    fn step(&mut self, desc: &Descriptor, endianness: Endianness, index: usize, pos: usize) -> Result<usize, PackError> {
        match self {
            Transfer::Decode { fields, buf } => {
                let field = fields.resolve(index)?;
                codec::decode_field(desc, endianness, buf, pos, field)
            }
            Transfer::Encode { fields, buf } => {
                let field = fields.resolve(index)?;
                codec::encode_field(desc, endianness, field, buf, pos)
            }
        }
    }
}

fn check_params(num_fields: usize, locations: usize, buf_len: usize) -> Result<(), PackError> {
    if num_fields == 0 {
        return Err(PackError::MissingParams("field count"));
    }
    if locations == 0 {
        return Err(PackError::MissingParams("field locations"));
    }
    if buf_len == 0 {
        return Err(PackError::MissingParams("buffer"));
    }
    if locations != num_fields {
        return Err(PackError::InvalidParams(format!(
            "{} field locations for {} declared fields",
            locations, num_fields
        )));
    }
    Ok(())
}

impl<'a> Format<'a> {
    pub fn new(fmt: &'a str) -> Result<Self, PackError> {
        Self::with_default_endianness(fmt, DEFAULT_ENDIANNESS)
    }

    /// Like [`Format::new`], but a format without a `<` / `>` marker uses `default`.
    pub fn with_default_endianness(fmt: &'a str, default: Endianness) -> Result<Self, PackError> {
        validate(fmt)?;
        let start = FormatCursor::with_default_endianness(fmt, default)?;
        let (fields, size) = start.totals()?;
        Ok(Format { fmt, start, fields, size })
    }

    pub fn as_str(&self) -> &'a str {
        self.fmt
    }

    pub fn endianness(&self) -> Endianness {
        self.start.endianness()
    }

    /// Number of non-padding fields the format yields.
    pub fn field_count(&self) -> usize {
        self.fields
    }

    /// Bytes the format occupies in a buffer, padding included.
    pub fn packed_size(&self) -> usize {
        self.size
    }

    /// Every descriptor in order, padding included.
    pub fn descriptors(&self) -> FormatCursor<'a> {
        self.cursor()
    }

    fn cursor(&self) -> FormatCursor<'a> {
        self.start.clone()
    }

    /// Decode `buf` into one byte region per field.
    pub fn unpack_ptr(&self, num_fields: usize, fields: &mut [&mut [u8]], buf: &[u8]) -> Result<usize, PackError> {
        self.run(num_fields, Transfer::Decode { fields: FieldsMut::Direct(fields), buf })
    }

    /// Encode one byte region per field into `buf`.
    pub fn pack_ptr(&self, num_fields: usize, fields: &[&[u8]], buf: &mut [u8]) -> Result<usize, PackError> {
        self.run(num_fields, Transfer::Encode { fields: Fields::Direct(fields), buf })
    }

    /// Decode `buf` into the record `base`, field `i` starting at `offsets[i]`.
    pub fn unpack_offset(
        &self,
        num_fields: usize,
        offsets: &[usize],
        base: &mut [u8],
        buf: &[u8],
    ) -> Result<usize, PackError> {
        self.run(num_fields, Transfer::Decode { fields: FieldsMut::Offsets { base, offsets }, buf })
    }

    /// Encode the record `base`, field `i` starting at `offsets[i]`, into `buf`.
    pub fn pack_offset(
        &self,
        num_fields: usize,
        offsets: &[usize],
        base: &[u8],
        buf: &mut [u8],
    ) -> Result<usize, PackError> {
        self.run(num_fields, Transfer::Encode { fields: Fields::Offsets { base, offsets }, buf })
    }

    fn run(&self, num_fields: usize, mut transfer: Transfer<'_, '_, '_>) -> Result<usize, PackError> {
        let result = self
            .dry_run(num_fields, &transfer)
            .and_then(|()| self.transfer(&mut transfer));
        match &result {
            Ok(bytes) => debug!(
                format = self.fmt,
                direction = transfer.direction(),
                fields = num_fields,
                bytes,
                "transfer complete"
            ),
            Err(e) => debug!(
                format = self.fmt,
                direction = transfer.direction(),
                error = %e,
                "transfer rejected"
            ),
        }
        result
    }

    fn dry_run(&self, num_fields: usize, transfer: &Transfer<'_, '_, '_>) -> Result<(), PackError> {
        check_params(num_fields, transfer.locations(), transfer.buf_len())?;
        if self.fields != num_fields {
            return Err(PackError::FieldCountMismatch {
                declared: num_fields,
                parsed: self.fields,
            });
        }
        // Bounds the walk below: every replayed group consumes buffer bytes.
        if self.size > transfer.buf_len() {
            return Err(PackError::BufferOverrun {
                needed: self.size,
                len: transfer.buf_len(),
            });
        }
        let decode = transfer.is_decode();
        let mut cursor = self.cursor();
        let mut index = 0;
        while let Some((desc, run)) = cursor.next_run()? {
            if desc.is_padding() {
                continue;
            }
            let needed = desc.field_len(decode);
            for i in index..index + run {
                let held = transfer.capacity(i)?;
                if held < needed {
                    return Err(PackError::InvalidParams(format!(
                        "field {} ({}) needs {} bytes, location holds {}",
                        i,
                        desc.field_type.name(),
                        needed,
                        held
                    )));
                }
            }
            index += run;
        }
        Ok(())
    }

    fn transfer(&self, transfer: &mut Transfer<'_, '_, '_>) -> Result<usize, PackError> {
        let mut cursor = self.cursor();
        let mut pos = 0;
        let mut index = 0;
        while let Some(desc) = cursor.next_descriptor()? {
            if desc.is_padding() {
                pos = codec::skip_padding(&desc, transfer.buf_len(), pos)?;
                continue;
            }
            let end = transfer.step(&desc, self.endianness(), index, pos)?;
            trace!(index, ty = desc.field_type.name(), count = desc.count(), offset = pos, "field");
            pos = end;
            index += 1;
        }
        Ok(pos)
    }
}

fn prepare<'a>(fmt: &'a str, num_fields: usize, locations: usize, buf_len: usize) -> Result<Format<'a>, PackError> {
    let checked = if fmt.is_empty() {
        Err(PackError::EmptyFormat)
    } else {
        check_params(num_fields, locations, buf_len).and_then(|()| Format::new(fmt))
    };
    if let Err(e) = &checked {
        debug!(format = fmt, error = %e, "format rejected");
    }
    checked
}

/// Decode `buf` into one byte region per field. Returns the bytes consumed.
///
/// ```
/// let buf = [0x00, 0x01, 0x86, 0xa0, 0x2a];
/// let mut n = 0u32;
/// let mut b = 0u8;
/// let mut fields: [&mut [u8]; 2] = [bytemuck::bytes_of_mut(&mut n), bytemuck::bytes_of_mut(&mut b)];
/// assert_eq!(structpack::unpack_ptr(">IB", 2, &mut fields, &buf), Ok(5));
/// assert_eq!((n, b), (100_000, 42));
/// ```
pub fn unpack_ptr(fmt: &str, num_fields: usize, fields: &mut [&mut [u8]], buf: &[u8]) -> Result<usize, PackError> {
    prepare(fmt, num_fields, fields.len(), buf.len())?.unpack_ptr(num_fields, fields, buf)
}

/// Encode one byte region per field into `buf`. Returns the bytes produced.
pub fn pack_ptr(fmt: &str, num_fields: usize, fields: &[&[u8]], buf: &mut [u8]) -> Result<usize, PackError> {
    prepare(fmt, num_fields, fields.len(), buf.len())?.pack_ptr(num_fields, fields, buf)
}

/// Decode `buf` into the record `base` at the given per-field byte offsets.
pub fn unpack_offset(
    fmt: &str,
    num_fields: usize,
    offsets: &[usize],
    base: &mut [u8],
    buf: &[u8],
) -> Result<usize, PackError> {
    prepare(fmt, num_fields, offsets.len(), buf.len())?.unpack_offset(num_fields, offsets, base, buf)
}

/// Encode the record `base` at the given per-field byte offsets into `buf`.
pub fn pack_offset(fmt: &str, num_fields: usize, offsets: &[usize], base: &[u8], buf: &mut [u8]) -> Result<usize, PackError> {
    prepare(fmt, num_fields, offsets.len(), buf.len())?.pack_offset(num_fields, offsets, base, buf)
}

/// Number of non-padding fields `fmt` yields.
pub fn field_count(fmt: &str) -> Result<usize, PackError> {
    Format::new(fmt).map(|f| f.field_count())
}

/// Bytes `fmt` occupies in a buffer.
pub fn packed_size(fmt: &str) -> Result<usize, PackError> {
    Format::new(fmt).map(|f| f.packed_size())
}
