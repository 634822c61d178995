//! # structpack — format-string driven binary struct packing
//!
//! Encode native Rust records into a byte buffer, and decode them back, following a compact
//! format string in the spirit of Python's `struct` module.
//!
//! ## Format strings
//!
//! - Optional leading byte order: `>` big-endian, `<` little-endian (default:
//!   [`DEFAULT_ENDIANNESS`]).
//! - Type characters: `x` pad, `b`/`B` 8-bit, `h`/`H` 16-bit, `i`/`I` 32-bit, `q`/`Q` 64-bit
//!   (lowercase signed), `s` text, `u` 16-bit text, `w` 32-bit text.
//! - `nT` repeats a scalar `n` times (`4B` is four fields); for text types `n` is the length
//!   (`12s` is one field).
//! - `[n]T` is one array field of `n` elements.
//! - `n(...)` replays a group `n` times, nested up to [`MAX_GROUP_DEPTH`] deep.
//! - Spaces and tabs may separate elements.
//!
//! ## Field locations
//!
//! Fields are byte regions holding the value in native representation. Either pass one region
//! per field (`*_ptr`), or one `#[repr(C)]` record plus a byte offset per field (`*_offset`).
//!
//! ```
//! use structpack::{pack_ptr, unpack_ptr};
//!
//! let id: u16 = 0xbeef;
//! let name = *b"probe\0";
//! let mut buf = [0u8; 7];
//! let n = pack_ptr(">H 5s", 2, &[bytemuck::bytes_of(&id), &name], &mut buf).unwrap();
//! assert_eq!(n, 7);
//! assert_eq!(&buf, b"\xbe\xefprobe");
//!
//! let mut id2 = 0u16;
//! let mut name2 = [0u8; 6];
//! let mut fields: [&mut [u8]; 2] = [bytemuck::bytes_of_mut(&mut id2), &mut name2];
//! unpack_ptr(">H 5s", 2, &mut fields, &buf).unwrap();
//! assert_eq!((id2, name2), (id, name));
//! ```
//!
//! See `tests/integration.rs` for offset-mode use with `core::mem::offset_of!`.

pub mod codec;
pub mod dump;
pub mod error;
pub mod format;
pub mod locate;
pub mod pack;
pub mod parser;
pub mod validate;

pub use dump::{describe, layout, LayoutRow};
pub use error::{FormatViolation, PackError};
pub use format::{Descriptor, Endianness, FieldType, DEFAULT_ENDIANNESS, MAX_GROUP_DEPTH};
pub use locate::{Fields, FieldsMut};
pub use pack::{field_count, pack_offset, pack_ptr, packed_size, unpack_offset, unpack_ptr, Format};
pub use parser::FormatCursor;
pub use validate::validate;
