//! Builds the inspection report from the library's introspection API
//!
//! Only header-level queries are used unless entries were requested, so a
//! document with undecodable payloads still gets a header report.

use std::fmt;

use anyhow::{Context, Result};
use audalf::{
    entry_count, entry_offsets, format_version, is_audalf, is_map, key_type_tag, layout_of,
    total_byte_size, DocumentReader, PayloadLayout, TagFields, TypeTag, FORMAT_VERSION,
};

use crate::config::InspectorConfig;

#[derive(Debug)]
pub struct Report {
    pub header: Option<HeaderSummary>,
    pub entries: Option<EntryListing>,
}

#[derive(Debug)]
pub struct HeaderSummary {
    pub version: u32,
    pub byte_size: u64,
    pub buffer_len: usize,
    pub is_map: bool,
    pub entry_count: u64,
    /// `None` for sequences
    pub key_type: Option<KeyType>,
}

#[derive(Debug)]
pub struct KeyType {
    pub raw: u64,
    pub name: Option<&'static str>,
    pub fields: TagFields,
    /// Known only for catalogued tags
    pub layout: Option<PayloadLayout>,
}

#[derive(Debug)]
pub struct EntryListing {
    pub lines: Vec<EntryLine>,
    /// Entries past the configured limit
    pub omitted: usize,
}

#[derive(Debug, PartialEq)]
pub struct EntryLine {
    pub index: usize,
    pub offset: u64,
    pub key: String,
    pub value: String,
}

/// Inspect `bytes`; entry payloads are decoded only when `list_entries` is set
pub fn inspect(bytes: &[u8], list_entries: bool, config: &InspectorConfig) -> Result<Report> {
    if !is_audalf(bytes) {
        return Ok(Report {
            header: None,
            entries: None,
        });
    }

    let is_map = is_map(bytes).context("reading key type")?;
    let key_type = if is_map {
        let raw = key_type_tag(bytes).context("reading key type")?;
        let tag = TypeTag::from_raw(raw, 0).ok();
        Some(KeyType {
            raw,
            name: tag.map(TypeTag::name),
            fields: TagFields::from_raw(raw),
            layout: tag.and_then(|t| layout_of(t).ok()),
        })
    } else {
        None
    };

    let header = HeaderSummary {
        version: format_version(bytes).context("reading version")?,
        byte_size: total_byte_size(bytes).context("reading total size")?,
        buffer_len: bytes.len(),
        is_map,
        entry_count: entry_count(bytes).context("reading entry count")?,
        key_type,
    };

    let entries = if list_entries {
        Some(list(bytes, config)?)
    } else {
        None
    };

    Ok(Report {
        header: Some(header),
        entries,
    })
}

fn list(bytes: &[u8], config: &InspectorConfig) -> Result<EntryListing> {
    let offsets = entry_offsets(bytes).context("reading offset table")?;
    let reader = DocumentReader::with_settings(bytes, config.deserialization)
        .context("opening document for entry listing")?;

    let shown = offsets.len().min(config.max_entries);
    let lines = offsets
        .iter()
        .take(shown)
        .enumerate()
        .map(|(index, &offset)| {
            let entry = reader
                .entry_at(index)
                .with_context(|| format!("decoding entry {index} at offset {offset:#x}"))?;
            Ok(EntryLine {
                index,
                offset,
                key: entry.key.to_string(),
                value: entry.value.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EntryListing {
        lines,
        omitted: offsets.len() - shown,
    })
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:#018x} (width class {}, array {}, category {})",
            self.name.unwrap_or("unknown"),
            self.raw,
            self.fields.width_class,
            if self.fields.is_array { "yes" } else { "no" },
            self.fields.category
        )?;
        match self.layout {
            Some(PayloadLayout::Fixed { width }) => write!(f, ", {width}-byte slot"),
            Some(PayloadLayout::LengthPrefixed { .. }) => write!(f, ", length-prefixed"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(header) = &self.header else {
            return writeln!(f, "Not an AUDALF input (incorrect magic)");
        };

        write!(f, "AUDALF input with version: {}", header.version)?;
        if header.version != FORMAT_VERSION {
            write!(f, " (unsupported, expected {FORMAT_VERSION})")?;
        }
        writeln!(f)?;

        write!(f, "Byte amount: {}", header.byte_size)?;
        if header.byte_size != header.buffer_len as u64 {
            write!(f, " (buffer holds {})", header.buffer_len)?;
        }
        writeln!(f)?;

        writeln!(f, "Is map: {}", header.is_map)?;
        writeln!(f, "Entry count: {}", header.entry_count)?;
        match &header.key_type {
            Some(key_type) => writeln!(f, "Key type: {key_type}")?,
            None => writeln!(f, "Key type: none (sequence)")?,
        }

        if let Some(listing) = &self.entries {
            writeln!(f, "Entries:")?;
            for line in &listing.lines {
                writeln!(
                    f,
                    "  [{}] @{:#06x}  {} => {}",
                    line.index, line.offset, line.key, line.value
                )?;
            }
            if listing.omitted > 0 {
                writeln!(f, "  ... {} more", listing.omitted)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audalf::{encode_map, encode_sequence, SerializationSettings, ValueKind, ValueTypes};

    fn byte_sequence() -> Vec<u8> {
        encode_sequence([0u8, 1, 10, 100, 255], &SerializationSettings::default()).unwrap()
    }

    #[test]
    fn test_sequence_header_report() {
        let report = inspect(&byte_sequence(), false, &InspectorConfig::default()).unwrap();
        let header = report.header.as_ref().unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.byte_size, 192);
        assert!(!header.is_map);
        assert_eq!(header.entry_count, 5);
        assert!(report.entries.is_none());

        let text = report.to_string();
        assert!(text.contains("AUDALF input with version: 1\n"));
        assert!(text.contains("Byte amount: 192\n"));
        assert!(text.contains("Is map: false"));
        assert!(text.contains("Key type: none (sequence)"));
    }

    #[test]
    fn test_map_report_with_entries() {
        let mut types = ValueTypes::new();
        types.insert("second", ValueKind::String);
        let bytes = encode_map(
            ValueKind::String,
            vec![("1", Some("is one")), ("second", None), ("emojis", Some("🐶🍦"))],
            &types,
            &SerializationSettings::default(),
        )
        .unwrap();

        let report = inspect(&bytes, true, &InspectorConfig::default()).unwrap();
        let text = report.to_string();
        assert!(text.contains("Is map: true"));
        assert!(text.contains("Key type: string (UTF-8) 0x0000000005000002"));
        assert!(text.contains("category 5), length-prefixed"));

        let lines = &report.entries.as_ref().unwrap().lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].key, "\"1\"");
        assert_eq!(lines[0].value, "\"is one\"");
        assert_eq!(lines[1].value, "null (string (UTF-8))");
        assert_eq!(lines[2].value, "\"🐶🍦\"");
    }

    #[test]
    fn test_entry_limit() {
        let config = InspectorConfig {
            max_entries: 2,
            ..InspectorConfig::default()
        };
        let report = inspect(&byte_sequence(), true, &config).unwrap();
        let listing = report.entries.as_ref().unwrap();
        assert_eq!(listing.lines.len(), 2);
        assert_eq!(listing.omitted, 3);
        assert_eq!(
            listing.lines[1],
            EntryLine {
                index: 1,
                offset: 0x60,
                key: "1".into(),
                value: "1".into(),
            }
        );
        assert!(report.to_string().contains("... 3 more"));
    }

    #[test]
    fn test_foreign_input() {
        let report = inspect(b"PK\x03\x04 not a document", true, &InspectorConfig::default()).unwrap();
        assert!(report.header.is_none());
        assert_eq!(report.to_string(), "Not an AUDALF input (incorrect magic)\n");
    }

    #[test]
    fn test_unknown_key_type_still_reports_header() {
        let mut bytes = byte_sequence();
        bytes[24..32].copy_from_slice(&0x0500_0003u64.to_le_bytes());

        let report = inspect(&bytes, false, &InspectorConfig::default()).unwrap();
        assert!(report.to_string().contains("Key type: unknown 0x0000000005000003"));

        // Listing needs a decodable key type
        assert!(inspect(&bytes, true, &InspectorConfig::default()).is_err());
    }
}
