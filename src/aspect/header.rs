//! Image dimensions from file headers
//!
//! Only the fixed header layouts of JPEG, PNG and GIF are understood; any
//! other signature yields nothing.

use super::ImageDimensions;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SOI: &[u8] = &[0xFF, 0xD8];

/// Start-of-frame markers whose segment carries the image size
const SOF_MARKERS: &[u8] = &[0xC0, 0xC1, 0xC2];
const SOS_MARKER: u8 = 0xDA;
const EOI_MARKER: u8 = 0xD9;

/// Read dimensions from the header of the file at `path`
pub fn read_dimensions(path: &Path) -> io::Result<Option<ImageDimensions>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    parse_dimensions(&mut reader)
}

/// Read dimensions from any seekable byte source positioned at its start
pub fn parse_dimensions<R: Read + Seek>(reader: &mut R) -> io::Result<Option<ImageDimensions>> {
    let mut header = [0u8; 24];
    let len = read_up_to(reader, &mut header)?;
    let header = &header[..len];

    if header.starts_with(PNG_SIGNATURE) {
        return Ok(parse_png(header));
    }
    if header.starts_with(b"GIF8") {
        return Ok(parse_gif(header));
    }
    if header.starts_with(JPEG_SOI) {
        return parse_jpeg(reader);
    }
    Ok(None)
}

/// PNG: big-endian u32 width at 16 and height at 20 (IHDR)
fn parse_png(header: &[u8]) -> Option<ImageDimensions> {
    let width = u32::from_be_bytes(header.get(16..20)?.try_into().ok()?);
    let height = u32::from_be_bytes(header.get(20..24)?.try_into().ok()?);
    ImageDimensions::new(width, height)
}

/// GIF: little-endian u16 width at 6 and height at 8
fn parse_gif(header: &[u8]) -> Option<ImageDimensions> {
    let width = u16::from_le_bytes(header.get(6..8)?.try_into().ok()?);
    let height = u16::from_le_bytes(header.get(8..10)?.try_into().ok()?);
    ImageDimensions::new(width.into(), height.into())
}

/// JPEG: walk marker segments from offset 2 until a start-of-frame
///
/// Any number of 0xFF fill bytes may precede a marker.
fn parse_jpeg<R: Read + Seek>(reader: &mut R) -> io::Result<Option<ImageDimensions>> {
    let mut offset: u64 = 2;

    loop {
        reader.seek(SeekFrom::Start(offset))?;

        let mut byte = [0u8; 1];
        if read_up_to(reader, &mut byte)? < 1 || byte[0] != 0xFF {
            return Ok(None);
        }
        let marker = loop {
            if read_up_to(reader, &mut byte)? < 1 {
                return Ok(None);
            }
            if byte[0] != 0xFF {
                break byte[0];
            }
        };
        if marker == SOS_MARKER || marker == EOI_MARKER {
            return Ok(None);
        }
        let segment_start = reader.stream_position()?;

        // length (2) + precision (1) + height (2) + width (2)
        let mut segment = [0u8; 7];
        let len = read_up_to(reader, &mut segment)?;
        if len < 2 {
            return Ok(None);
        }

        if SOF_MARKERS.contains(&marker) {
            if len < 7 {
                return Ok(None);
            }
            let height = u16::from_be_bytes([segment[3], segment[4]]);
            let width = u16::from_be_bytes([segment[5], segment[6]]);
            return Ok(ImageDimensions::new(width.into(), height.into()));
        }

        let segment_len = u16::from_be_bytes([segment[0], segment[1]]);
        if segment_len < 2 {
            return Ok(None);
        }
        offset = segment_start + u64::from(segment_len);
    }
}

/// Fill as much of `buf` as the source allows, returning the byte count
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
