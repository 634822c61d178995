//! Field locator: maps the i-th non-padding field to the bytes that hold it.
//!
//! Two addressing modes share one engine:
//!
//! - **Direct**: one byte region per field, in format order.
//! - **Offsets**: one base record plus one byte offset per field. The field region runs from
//!   its offset to the end of the record; the copy engine takes only what it needs.
//!
//! Regions hold values in the host's native representation (`bytemuck::bytes_of_mut` on a
//! `Pod` field, or a `#[repr(C)]` record with `core::mem::offset_of!` offsets).

use crate::error::PackError;

/// Field locations written by decode.
#[derive(Debug)]
pub enum FieldsMut<'r, 'f> {
    Direct(&'r mut [&'f mut [u8]]),
    Offsets { base: &'r mut [u8], offsets: &'r [usize] },
}

/// Field locations read by encode.
#[derive(Debug, Clone, Copy)]
pub enum Fields<'r, 'f> {
    Direct(&'r [&'f [u8]]),
    Offsets { base: &'r [u8], offsets: &'r [usize] },
}

fn missing_location(index: usize) -> PackError {
    PackError::InvalidParams(format!("no location for field {}", index))
}

/// Start of field `index` inside a base record of `base_len` bytes.
fn offset_start(offsets: &[usize], base_len: usize, index: usize) -> Result<usize, PackError> {
    let off = *offsets.get(index).ok_or_else(|| missing_location(index))?;
    if off > base_len {
        return Err(PackError::InvalidParams(format!(
            "field {}: offset {} outside base record of {} bytes",
            index, off, base_len
        )));
    }
    Ok(off)
}

impl<'r, 'f> FieldsMut<'r, 'f> {
    /// Number of field locations supplied.
    pub fn len(&self) -> usize {
        match self {
            FieldsMut::Direct(list) => list.len(),
            FieldsMut::Offsets { offsets, .. } => offsets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes available at field `index`.
    pub fn capacity(&self, index: usize) -> Result<usize, PackError> {
        match self {
            FieldsMut::Direct(list) => list
                .get(index)
                .map(|f| f.len())
                .ok_or_else(|| missing_location(index)),
            FieldsMut::Offsets { base, offsets } => {
                offset_start(offsets, base.len(), index).map(|off| base.len() - off)
            }
        }
    }

    pub fn resolve(&mut self, index: usize) -> Result<&mut [u8], PackError> {
        match self {
            FieldsMut::Direct(list) => list
                .get_mut(index)
                .map(|f| &mut **f)
                .ok_or_else(|| missing_location(index)),
            FieldsMut::Offsets { base, offsets } => {
                let off = offset_start(offsets, base.len(), index)?;
                Ok(&mut base[off..])
            }
        }
    }
}

impl<'r, 'f> Fields<'r, 'f> {
    pub fn len(&self) -> usize {
        match self {
            Fields::Direct(list) => list.len(),
            Fields::Offsets { offsets, .. } => offsets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self, index: usize) -> Result<usize, PackError> {
        self.resolve(index).map(|f| f.len())
    }

    pub fn resolve(&self, index: usize) -> Result<&'r [u8], PackError> {
        match *self {
            Fields::Direct(list) => list.get(index).copied().ok_or_else(|| missing_location(index)),
            Fields::Offsets { base, offsets } => {
                let off = offset_start(offsets, base.len(), index)?;
                Ok(&base[off..])
            }
        }
    }
}
