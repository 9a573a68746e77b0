//! Embedded EXIF metadata for JPEG and TIFF-based images

use super::{HEIGHT_KEY, MetadataFields, MetadataProvider, Probe, WIDTH_KEY};
use crate::error::{Error, Result};
use ::exif::{Exif, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, trace};

/// EXIF date tags and their field names, in priority order
pub const DATE_TAGS: &[(Tag, &str)] = &[
    (Tag::DateTimeOriginal, "DateTimeOriginal"),   // When the original image was taken
    (Tag::DateTimeDigitized, "DateTimeDigitized"), // When the image was digitized
    (Tag::DateTime, "DateTime"),                   // File modification date/time
];

/// Reads EXIF embedded in the file container
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifProvider;

impl MetadataProvider for ExifProvider {
    fn name(&self) -> &'static str {
        "exif"
    }

    fn probe(&self, path: &Path) -> Probe {
        match read_exif_fields(path) {
            Ok(fields) if fields.is_empty() => Probe::NoData,
            Ok(fields) => Probe::Found(fields),
            Err(e) => {
                debug!(?path, error = %e, "No EXIF data");
                Probe::NoData
            }
        }
    }
}

/// Read the date and dimension tags out of a file's EXIF block
pub fn read_exif_fields(path: &Path) -> Result<MetadataFields> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| Error::ExifRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut fields = MetadataFields::new();

    for (tag, name) in DATE_TAGS {
        if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
            trace!(?path, tag = name, "Found EXIF date");
            fields.insert(name, ascii_value(field));
        }
    }

    if let Some((width, height)) = pixel_dimensions(&exif) {
        fields.insert(WIDTH_KEY, width.to_string());
        fields.insert(HEIGHT_KEY, height.to_string());
    }

    Ok(fields)
}

/// Raw ASCII content of a field, falling back to its display form
fn ascii_value(field: &Field) -> String {
    match &field.value {
        Value::Ascii(parts) if !parts.is_empty() => {
            String::from_utf8_lossy(&parts[0]).trim_end_matches('\0').to_string()
        }
        _ => field.display_value().to_string(),
    }
}

/// Width/height from the Exif IFD, else from the primary image IFD
fn pixel_dimensions(exif: &Exif) -> Option<(u32, u32)> {
    let pairs = [
        (Tag::PixelXDimension, Tag::PixelYDimension),
        (Tag::ImageWidth, Tag::ImageLength),
    ];

    pairs.iter().find_map(|(w, h)| {
        let width = exif.get_field(*w, In::PRIMARY)?.value.get_uint(0)?;
        let height = exif.get_field(*h, In::PRIMARY)?.value.get_uint(0)?;
        (width > 0 && height > 0).then_some((width, height))
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Minimal JPEG files carrying an EXIF block

    /// Big-endian TIFF body with an Exif sub-IFD holding DateTimeOriginal
    fn tiff_with_date_time_original(value: &str) -> Vec<u8> {
        let mut ascii = value.as_bytes().to_vec();
        ascii.push(0);
        let count = ascii.len() as u32;

        let mut tiff = Vec::new();
        // Header: byte order, magic, offset of IFD0
        tiff.extend_from_slice(b"MM\x00\x2a");
        tiff.extend_from_slice(&8u32.to_be_bytes());

        // IFD0 at 8: one entry pointing at the Exif IFD (8 + 2 + 12 + 4 = 26)
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x8769u16.to_be_bytes());
        tiff.extend_from_slice(&4u16.to_be_bytes()); // LONG
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&26u32.to_be_bytes());
        tiff.extend_from_slice(&0u32.to_be_bytes());

        // Exif IFD at 26: DateTimeOriginal stored at 26 + 2 + 12 + 4 = 44
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x9003u16.to_be_bytes());
        tiff.extend_from_slice(&2u16.to_be_bytes()); // ASCII
        tiff.extend_from_slice(&count.to_be_bytes());
        tiff.extend_from_slice(&44u32.to_be_bytes());
        tiff.extend_from_slice(&0u32.to_be_bytes());

        tiff.extend_from_slice(&ascii);
        tiff
    }

    /// SOI + APP1(Exif) + EOI
    pub fn jpeg_with_date_time_original(value: &str) -> Vec<u8> {
        let tiff = tiff_with_date_time_original(value);
        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        jpeg.extend_from_slice(&payload);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }
}
