//! EXIF metadata extraction.
//!
//! Best effort: media without EXIF (or with fields we do not understand)
//! yields an empty result, never an error. Processing must complete whether
//! or not the camera wrote anything useful.

use chrono::{TimeZone, Utc};
use exif::{In, Reader, Tag, Value};
use std::io::Cursor;

use pixvault_core::models::CapturedMetadata;

// Windows XP* tags carry UTF-16LE text and have no named constants.
const TAG_XP_TITLE: Tag = Tag(exif::Context::Tiff, 0x9c9b);
const TAG_XP_COMMENT: Tag = Tag(exif::Context::Tiff, 0x9c9c);
const TAG_XP_KEYWORDS: Tag = Tag(exif::Context::Tiff, 0x9c9e);

/// Extract whatever metadata the file carries. Returns `None` when the data
/// has no parseable EXIF segment at all.
pub fn extract_captured_metadata(data: &[u8]) -> Option<CapturedMetadata> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;

    let captured_at = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))
        .and_then(|field| match &field.value {
            Value::Ascii(v) => v.first().and_then(|bytes| {
                let dt = exif::DateTime::from_ascii(bytes).ok()?;
                Utc.with_ymd_and_hms(
                    dt.year as i32,
                    dt.month as u32,
                    dt.day as u32,
                    dt.hour as u32,
                    dt.minute as u32,
                    dt.second as u32,
                )
                .single()
            }),
            _ => None,
        });

    let meta = CapturedMetadata {
        title: ascii_field(&exif, TAG_XP_TITLE)
            .or_else(|| ascii_field(&exif, Tag::ImageDescription)),
        comments: ascii_field(&exif, TAG_XP_COMMENT).or_else(|| user_comment(&exif)),
        tags: keywords(&exif),
        camera_make: ascii_field(&exif, Tag::Make),
        camera_model: ascii_field(&exif, Tag::Model),
        gps_latitude: gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
        gps_longitude: gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
        gps_altitude: gps_altitude(&exif),
        captured_at,
    };

    Some(meta)
}

fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(v) => non_empty(String::from_utf8_lossy(v.first()?).trim()),
        // XP* tags are BYTE-typed UTF-16LE.
        Value::Byte(bytes) => non_empty(utf16le_string(bytes).trim()),
        _ => None,
    }
}

fn user_comment(exif: &exif::Exif) -> Option<String> {
    let field = exif.get_field(Tag::UserComment, In::PRIMARY)?;
    match &field.value {
        Value::Undefined(bytes, _) => {
            // The first eight bytes name the character set.
            let text = bytes.strip_prefix(b"ASCII\0\0\0").unwrap_or(bytes);
            non_empty(String::from_utf8_lossy(text).trim())
        }
        Value::Ascii(v) => non_empty(String::from_utf8_lossy(v.first()?).trim()),
        _ => None,
    }
}

fn keywords(exif: &exif::Exif) -> Vec<String> {
    let Some(field) = exif.get_field(TAG_XP_KEYWORDS, In::PRIMARY) else {
        return Vec::new();
    };
    let raw = match &field.value {
        Value::Byte(bytes) => utf16le_string(bytes),
        Value::Ascii(v) => match v.first() {
            Some(bytes) => String::from_utf8_lossy(bytes).to_string(),
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn gps_coordinate(exif: &exif::Exif, tag: Tag, ref_tag: Tag, negative_ref: &str) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let rationals = match &field.value {
        Value::Rational(v) if v.len() >= 3 => v,
        _ => return None,
    };

    let degrees =
        rationals[0].to_f64() + rationals[1].to_f64() / 60.0 + rationals[2].to_f64() / 3600.0;

    let sign = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Ascii(v) => v.first().map(|b| String::from_utf8_lossy(b).to_string()),
            _ => None,
        })
        .map(|r| if r.trim() == negative_ref { -1.0 } else { 1.0 })
        .unwrap_or(1.0);

    Some(degrees * sign)
}

fn gps_altitude(exif: &exif::Exif) -> Option<f64> {
    let field = exif.get_field(Tag::GPSAltitude, In::PRIMARY)?;
    let altitude = match &field.value {
        Value::Rational(v) => v.first()?.to_f64(),
        _ => return None,
    };

    // AltitudeRef 1 means below sea level.
    let below = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .map(|f| matches!(&f.value, Value::Byte(b) if b.first() == Some(&1)))
        .unwrap_or(false);

    Some(if below { -altitude } else { altitude })
}

fn utf16le_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::{Field, Rational};

    fn exif_bytes(fields: &[Field]) -> Vec<u8> {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut buffer = Cursor::new(Vec::new());
        writer.write(&mut buffer, false).unwrap();
        buffer.into_inner()
    }

    fn ascii(tag: Tag, text: &str) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        }
    }

    #[test]
    fn camera_and_timestamp_are_extracted() {
        let data = exif_bytes(&[
            ascii(Tag::Make, "Canon"),
            ascii(Tag::Model, "EOS R5"),
            ascii(Tag::DateTimeOriginal, "2024:06:15 10:30:00"),
        ]);

        let meta = extract_captured_metadata(&data).unwrap();
        assert_eq!(meta.camera_make.as_deref(), Some("Canon"));
        assert_eq!(meta.camera_model.as_deref(), Some("EOS R5"));
        let captured = meta.captured_at.unwrap();
        assert_eq!(captured, Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn gps_references_flip_the_sign() {
        let lat = Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![
                Rational { num: 48, denom: 1 },
                Rational { num: 51, denom: 1 },
                Rational { num: 0, denom: 1 },
            ]),
        };
        let data = exif_bytes(&[lat, ascii(Tag::GPSLatitudeRef, "S")]);

        let meta = extract_captured_metadata(&data).unwrap();
        let latitude = meta.gps_latitude.unwrap();
        assert!((latitude + 48.85).abs() < 0.01, "got {}", latitude);
    }

    #[test]
    fn data_without_exif_yields_none() {
        assert!(extract_captured_metadata(b"plain bytes, no exif").is_none());
    }

    #[test]
    fn missing_fields_stay_empty() {
        let data = exif_bytes(&[ascii(Tag::Make, "Canon")]);
        let meta = extract_captured_metadata(&data).unwrap();
        assert!(meta.captured_at.is_none());
        assert!(meta.gps_latitude.is_none());
        assert!(meta.tags.is_empty());
        assert!(meta.has_any());
    }
}
