//! Layout dump: where every field of a format lands in the buffer.
//!
//! Back-to-back repetitions of one scalar (`4B`) share a row.

use crate::error::PackError;
use crate::format::{Descriptor, Endianness};
use crate::pack::Format;

/// One row of a layout: a run of identical descriptors at a buffer offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRow {
    pub offset: usize,
    /// Index of the first field in the run; `None` for padding.
    pub field: Option<usize>,
    pub descriptor: Descriptor,
    /// Number of back-to-back copies of `descriptor`.
    pub repeat: usize,
}

impl LayoutRow {
    pub fn byte_len(&self) -> usize {
        self.descriptor.byte_len().saturating_mul(self.repeat)
    }
}

/// Rows for every descriptor of `format`, in buffer order.
pub fn layout(format: &Format<'_>) -> Result<Vec<LayoutRow>, PackError> {
    let mut cursor = format.descriptors();
    let mut rows = Vec::new();
    let mut offset = 0usize;
    let mut index = 0usize;
    while let Some((descriptor, repeat)) = cursor.next_run()? {
        let field = if descriptor.is_padding() {
            None
        } else {
            index += repeat;
            Some(index - repeat)
        };
        let row = LayoutRow { offset, field, descriptor, repeat };
        offset = offset.saturating_add(row.byte_len());
        rows.push(row);
    }
    Ok(rows)
}

fn endian_name(e: Endianness) -> &'static str {
    match e {
        Endianness::Big => "big-endian",
        Endianness::Little => "little-endian",
    }
}

fn table_row(offset: &str, field: &str, ty: &str, count: &str, bytes: &str) -> String {
    format!("{:>8}  {:>7}  {:<7} {:>6}  {:>6}", offset, field, ty, count, bytes)
}

/// Render the layout of `fmt` as a text table.
pub fn describe(fmt: &str) -> Result<String, PackError> {
    let format = Format::new(fmt)?;
    let rows = layout(&format)?;
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!(
        "{} ({}, {} fields, {} bytes)",
        fmt.trim(),
        endian_name(format.endianness()),
        format.field_count(),
        format.packed_size()
    ));
    lines.push(table_row("offset", "field", "type", "count", "bytes"));
    for row in &rows {
        let field = match row.field {
            Some(i) if row.repeat > 1 => format!("{}-{}", i, i + row.repeat - 1),
            Some(i) => i.to_string(),
            None => "-".to_string(),
        };
        let count = if row.descriptor.array_len > 0 {
            format!("[{}]", row.descriptor.array_len)
        } else {
            String::new()
        };
        let mut line = table_row(
            &row.offset.to_string(),
            &field,
            row.descriptor.field_type.name(),
            &count,
            &row.byte_len().to_string(),
        );
        if row.repeat > 1 {
            line.push_str(&format!(" x{}", row.repeat));
        }
        lines.push(line);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FieldType;

    #[test]
    fn rows_track_offsets_and_field_indices() {
        let format = Format::new(">4B 2x [3]h 2(I)").unwrap();
        let rows = layout(&format).unwrap();
        assert_eq!(
            rows,
            vec![
                LayoutRow { offset: 0, field: Some(0), descriptor: Descriptor::scalar(FieldType::U8), repeat: 4 },
                LayoutRow { offset: 4, field: None, descriptor: Descriptor::scalar(FieldType::Pad), repeat: 2 },
                LayoutRow { offset: 6, field: Some(4), descriptor: Descriptor::array(FieldType::I16, 3), repeat: 1 },
                LayoutRow { offset: 12, field: Some(5), descriptor: Descriptor::scalar(FieldType::U32), repeat: 1 },
                LayoutRow { offset: 16, field: Some(6), descriptor: Descriptor::scalar(FieldType::U32), repeat: 1 },
            ]
        );
    }

    #[test]
    fn describe_renders_header_and_rows() {
        let text = describe("<12s 3H x").unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "<12s 3H x (little-endian, 4 fields, 19 bytes)");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "  offset    field  type     count   bytes");
        assert_eq!(lines[2], "       0        0  text      [12]      12");
        assert_eq!(lines[3], "      12      1-3  u16                  6 x3");
        assert!(text.ends_with('\n'));
        assert!(lines[4].contains("pad"));
    }

    #[test]
    fn describe_reports_invalid_format() {
        assert!(describe("(B)").is_err());
        assert_eq!(describe(""), Err(PackError::EmptyFormat));
    }
}
