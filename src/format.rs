//! Format-string data model: byte order, field types and the per-field descriptor.
//!
//! Type characters:
//!
//! | Char | Type | Width |
//! |------|------|-------|
//! | `x`  | padding (skipped) | 1 |
//! | `b` / `B` | `i8` / `u8` | 1 |
//! | `h` / `H` | `i16` / `u16` | 2 |
//! | `i` / `I` | `i32` / `u32` | 4 |
//! | `q` / `Q` | `i64` / `u64` | 8 |
//! | `s`  | 8-bit text | 1 |
//! | `u`  | 16-bit code-unit text | 2 |
//! | `w`  | 32-bit code-unit text | 4 |

/// Deepest permitted nesting of `n(...)` groups.
pub const MAX_GROUP_DEPTH: usize = 10;

/// Byte order assumed when the format string carries no `<` / `>` marker.
pub const DEFAULT_ENDIANNESS: Endianness = Endianness::Little;

/// Byte order of multi-byte elements in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    /// Endianness for a leading marker character, if it is one.
    pub fn from_marker(c: u8) -> Option<Self> {
        match c {
            b'>' => Some(Endianness::Big),
            b'<' => Some(Endianness::Little),
            _ => None,
        }
    }
}

/// Element type named by one type character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Pad,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Text,
    Utf16,
    Utf32,
}

impl FieldType {
    pub fn from_char(c: u8) -> Option<Self> {
        let t = match c {
            b'x' => FieldType::Pad,
            b'b' => FieldType::I8,
            b'B' => FieldType::U8,
            b'h' => FieldType::I16,
            b'H' => FieldType::U16,
            b'i' => FieldType::I32,
            b'I' => FieldType::U32,
            b'q' => FieldType::I64,
            b'Q' => FieldType::U64,
            b's' => FieldType::Text,
            b'u' => FieldType::Utf16,
            b'w' => FieldType::Utf32,
            _ => return None,
        };
        Some(t)
    }

    pub fn as_char(self) -> char {
        match self {
            FieldType::Pad => 'x',
            FieldType::I8 => 'b',
            FieldType::U8 => 'B',
            FieldType::I16 => 'h',
            FieldType::U16 => 'H',
            FieldType::I32 => 'i',
            FieldType::U32 => 'I',
            FieldType::I64 => 'q',
            FieldType::U64 => 'Q',
            FieldType::Text => 's',
            FieldType::Utf16 => 'u',
            FieldType::Utf32 => 'w',
        }
    }

    /// Bytes per element, in the buffer and in the field.
    pub fn width(self) -> usize {
        match self {
            FieldType::Pad | FieldType::I8 | FieldType::U8 | FieldType::Text => 1,
            FieldType::I16 | FieldType::U16 | FieldType::Utf16 => 2,
            FieldType::I32 | FieldType::U32 | FieldType::Utf32 => 4,
            FieldType::I64 | FieldType::U64 => 8,
        }
    }

    /// Text types: a leading count is an array length, and decode null-terminates.
    pub fn is_text(self) -> bool {
        matches!(self, FieldType::Text | FieldType::Utf16 | FieldType::Utf32)
    }

    pub fn is_padding(self) -> bool {
        self == FieldType::Pad
    }

    /// Short name for layout dumps and log lines.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Pad => "pad",
            FieldType::I8 => "i8",
            FieldType::U8 => "u8",
            FieldType::I16 => "i16",
            FieldType::U16 => "u16",
            FieldType::I32 => "i32",
            FieldType::U32 => "u32",
            FieldType::I64 => "i64",
            FieldType::U64 => "u64",
            FieldType::Text => "text",
            FieldType::Utf16 => "text16",
            FieldType::Utf32 => "text32",
        }
    }
}

/// One parsed field: its type and array length (0 = scalar).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub field_type: FieldType,
    pub array_len: usize,
}

impl Descriptor {
    pub fn scalar(field_type: FieldType) -> Self {
        Descriptor { field_type, array_len: 0 }
    }

    pub fn array(field_type: FieldType, array_len: usize) -> Self {
        Descriptor { field_type, array_len }
    }

    /// Number of elements transferred: `max(1, array_len)`.
    pub fn count(&self) -> usize {
        self.array_len.max(1)
    }

    /// Bytes this descriptor occupies in the buffer.
    pub fn byte_len(&self) -> usize {
        self.field_type.width().saturating_mul(self.count())
    }

    /// Bytes the field location must hold. Decoded text needs room for a terminator element.
    pub fn field_len(&self, decode: bool) -> usize {
        if decode && self.field_type.is_text() {
            self.byte_len().saturating_add(self.field_type.width())
        } else {
            self.byte_len()
        }
    }

    pub fn is_padding(&self) -> bool {
        self.field_type.is_padding()
    }
}
