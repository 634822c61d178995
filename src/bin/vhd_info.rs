//! Print the footer (and, for sparse or differencing disks, the dynamic header) of a VHD image.
//!
//! Usage:
//!   vhd_info IMAGE.vhd
//!
//! The footer is unpacked with one location per field; the dynamic header is unpacked into a
//! `#[repr(C)]` record through `offset_of!` offsets. Set `RUST_LOG=structpack=trace` to see
//! every field transfer.

use anyhow::{bail, Context, Result};
use bytemuck::{Pod, Zeroable};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::mem::{offset_of, size_of};
use structpack::Format;
use tracing::info;

const FOOTER_LEN: usize = 512;
const HEADER_LEN: usize = 1024;
const FOOTER_FORMAT: &str = "> [8]s 2i q I [4]s I [4]s 2q HBB iI [16]B B [427]B";
const HEADER_FORMAT: &str = "> 8s 2q 3i I [16]B Ii [256]u 8(4s 3i q) [256]B";
const FOOTER_COOKIE: &[u8] = b"conectix";
const HEADER_COOKIE: &[u8] = b"cxsparse";
/// Byte range of the checksum inside the footer.
const FOOTER_CHECKSUM: std::ops::Range<usize> = 64..68;

struct Footer {
    cookie: [u8; 9],
    features: i32,
    fi_fmt_vers: i32,
    data_offset: i64,
    timestamp: u32,
    cr_app: [u8; 5],
    cr_vers: u32,
    cr_host_os: [u8; 5],
    orig_sz: i64,
    curr_sz: i64,
    cyl: u16,
    heads: u8,
    spt: u8,
    disk_type: i32,
    checksum: u32,
    uuid: [u8; 16],
    saved_st: u8,
    _reserved: [u8; 427],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ParentLocator {
    data_offset: i64,
    data_space: i32,
    data_len: i32,
    _reserved: i32,
    code: [u8; 5],
    _pad: [u8; 7],
}

/// Dynamic disk header. Fields are ordered for alignment, not file order.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SparseHeader {
    data_offset: i64,
    table_offset: i64,
    locators: [ParentLocator; 8],
    head_vers: i32,
    max_table_entries: i32,
    block_size: i32,
    checksum: u32,
    parent_timestamp: u32,
    _reserved_1: i32,
    parent_name: [u16; 257],
    cookie: [u8; 9],
    parent_uuid: [u8; 16],
    _reserved_2: [u8; 256],
    _pad: [u8; 5],
}

fn header_offsets() -> Vec<usize> {
    let mut offsets = vec![
        offset_of!(SparseHeader, cookie),
        offset_of!(SparseHeader, data_offset),
        offset_of!(SparseHeader, table_offset),
        offset_of!(SparseHeader, head_vers),
        offset_of!(SparseHeader, max_table_entries),
        offset_of!(SparseHeader, block_size),
        offset_of!(SparseHeader, checksum),
        offset_of!(SparseHeader, parent_uuid),
        offset_of!(SparseHeader, parent_timestamp),
        offset_of!(SparseHeader, _reserved_1),
        offset_of!(SparseHeader, parent_name),
    ];
    for i in 0..8 {
        let base = offset_of!(SparseHeader, locators) + i * size_of::<ParentLocator>();
        offsets.extend([
            base + offset_of!(ParentLocator, code),
            base + offset_of!(ParentLocator, data_space),
            base + offset_of!(ParentLocator, data_len),
            base + offset_of!(ParentLocator, _reserved),
            base + offset_of!(ParentLocator, data_offset),
        ]);
    }
    offsets.push(offset_of!(SparseHeader, _reserved_2));
    offsets
}

fn read_footer(buf: &[u8]) -> Result<Footer> {
    let mut footer = Footer {
        cookie: [0; 9],
        features: 0,
        fi_fmt_vers: 0,
        data_offset: 0,
        timestamp: 0,
        cr_app: [0; 5],
        cr_vers: 0,
        cr_host_os: [0; 5],
        orig_sz: 0,
        curr_sz: 0,
        cyl: 0,
        heads: 0,
        spt: 0,
        disk_type: 0,
        checksum: 0,
        uuid: [0; 16],
        saved_st: 0,
        _reserved: [0; 427],
    };
    let Footer {
        cookie,
        features,
        fi_fmt_vers,
        data_offset,
        timestamp,
        cr_app,
        cr_vers,
        cr_host_os,
        orig_sz,
        curr_sz,
        cyl,
        heads,
        spt,
        disk_type,
        checksum,
        uuid,
        saved_st,
        _reserved,
    } = &mut footer;
    let mut fields: [&mut [u8]; 18] = [
        cookie,
        bytemuck::bytes_of_mut(features),
        bytemuck::bytes_of_mut(fi_fmt_vers),
        bytemuck::bytes_of_mut(data_offset),
        bytemuck::bytes_of_mut(timestamp),
        cr_app,
        bytemuck::bytes_of_mut(cr_vers),
        cr_host_os,
        bytemuck::bytes_of_mut(orig_sz),
        bytemuck::bytes_of_mut(curr_sz),
        bytemuck::bytes_of_mut(cyl),
        bytemuck::bytes_of_mut(heads),
        bytemuck::bytes_of_mut(spt),
        bytemuck::bytes_of_mut(disk_type),
        bytemuck::bytes_of_mut(checksum),
        uuid,
        bytemuck::bytes_of_mut(saved_st),
        _reserved,
    ];
    structpack::unpack_ptr(FOOTER_FORMAT, fields.len(), &mut fields, buf).context("unpacking footer")?;
    Ok(footer)
}

fn read_header(buf: &[u8]) -> Result<SparseHeader> {
    let format = Format::new(HEADER_FORMAT)?;
    let offsets = header_offsets();
    let mut header = SparseHeader::zeroed();
    format
        .unpack_offset(offsets.len(), &offsets, bytemuck::bytes_of_mut(&mut header), buf)
        .context("unpacking dynamic header")?;
    Ok(header)
}

/// Bytes up to the first zero, as text.
fn text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn utf16_text(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One's complement of the byte sum, skipping the checksum field itself.
fn footer_checksum(buf: &[u8]) -> u32 {
    let sum = buf
        .iter()
        .enumerate()
        .filter(|(i, _)| !FOOTER_CHECKSUM.contains(i))
        .fold(0u32, |acc, (_, &b)| acc.wrapping_add(u32::from(b)));
    !sum
}

fn disk_type(t: i32) -> &'static str {
    match t {
        2 => "fixed",
        3 => "sparse",
        4 => "differencing",
        _ => "unknown",
    }
}

fn row(label: &str, value: impl std::fmt::Display) {
    println!("{:<29} : {}", label, value);
}

fn print_footer(footer: &Footer, computed: u32) {
    let status = if computed == footer.checksum { "ok" } else { "MISMATCH" };
    row("Cookie", text(&footer.cookie));
    row("Features", footer.features);
    row("File Format Vers.", footer.fi_fmt_vers);
    row("Sparse Header Offset", footer.data_offset);
    row("Timestamp", footer.timestamp);
    row("Creator App", text(&footer.cr_app));
    row("Creator Vers.", footer.cr_vers);
    row("Creator Host OS", text(&footer.cr_host_os));
    row("Original Size", footer.orig_sz);
    row("Current Size", footer.curr_sz);
    row("[Geom] cyl", footer.cyl);
    row("[Geom] heads", footer.heads);
    row("[Geom] spt", footer.spt);
    row("VHD type", disk_type(footer.disk_type));
    row("Checksum", format!("{:#010x} ({})", footer.checksum, status));
    row("UUID", hex(&footer.uuid));
    row("Saved State", footer.saved_st);
}

fn print_header(header: &SparseHeader) {
    row("[Sparse] Cookie", text(&header.cookie));
    row("[Sparse] Data Offset", header.data_offset);
    row("[Sparse] Table Offset", header.table_offset);
    row("[Sparse] Header Vers.", format!("{:#010x}", header.head_vers));
    row("[Sparse] Max Table Entries", header.max_table_entries);
    row("[Sparse] Block Size", header.block_size);
    row("[Sparse] Checksum", format!("{:#010x}", header.checksum));
    row("[Sparse] Parent UUID", hex(&header.parent_uuid));
    row("[Sparse] Parent Timestamp", header.parent_timestamp);
    row("[Sparse] Parent Name", utf16_text(&header.parent_name));
    for (i, loc) in header.locators.iter().enumerate().filter(|(_, l)| l.code[0] != 0) {
        row(
            &format!("[Sparse] Locator {}", i),
            format!(
                "{} at {} ({} of {} bytes)",
                text(&loc.code),
                loc.data_offset,
                loc.data_len,
                loc.data_space
            ),
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [path] = args.as_slice() else {
        bail!("expected one argument: path to a VHD file");
    };
    let mut file = File::open(path).with_context(|| format!("opening {}", path))?;
    let len = file.metadata()?.len();
    if len < FOOTER_LEN as u64 {
        bail!("{}: {} bytes is too small for a VHD footer", path, len);
    }
    info!(path = %path, len, "reading footer");

    let mut footer_buf = [0u8; FOOTER_LEN];
    file.seek(SeekFrom::End(-(FOOTER_LEN as i64)))?;
    file.read_exact(&mut footer_buf)?;
    if !footer_buf.starts_with(FOOTER_COOKIE) {
        bail!("{}: cookie string not found. Is file a VHD?", path);
    }
    let footer = read_footer(&footer_buf)?;
    println!("Getting info for VHD file: {}", path);
    print_footer(&footer, footer_checksum(&footer_buf));

    let dynamic = matches!(footer.disk_type, 3 | 4);
    if dynamic && footer.data_offset >= 0 {
        let mut header_buf = [0u8; HEADER_LEN];
        file.seek(SeekFrom::Start(footer.data_offset as u64))?;
        file.read_exact(&mut header_buf).context("reading dynamic header")?;
        if !header_buf.starts_with(HEADER_COOKIE) {
            bail!("{}: dynamic header cookie not found at {}", path, footer.data_offset);
        }
        print_header(&read_header(&header_buf)?);
    }
    Ok(())
}
