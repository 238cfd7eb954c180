//! Tag inventory of an OpenEPaperLink access point.
//!
//! The access point publishes two kinds of JSON documents:
//!
//! - `/current/tagDB.json`: every known tag, each wrapped in a one-element array
//! - `/tagtypes/XX.json`: display metadata for hardware type `XX` (hex)
//!
//! Both are parsed into explicit schema structs; documents of the wrong shape
//! fail with [`Error::Schema`] instead of being silently ignored.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::canvas::Palette;
use crate::error::Error;

/// Hardware types at or above this value are not displays (e.g. AP radios).
pub const FIRST_NON_DISPLAY_HW_TYPE: u8 = 0xE0;

/// Color table keys that count as the accent ink, in order of preference.
pub const ACCENT_KEYS: [&str; 2] = ["red", "yellow"];

/// One tag record from `tagDB.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagRecord {
    /// Tag MAC address (hex string, as the AP reports it)
    pub mac: String,
    /// Hardware type code
    #[serde(rename = "hwType")]
    pub hw_type: u8,
}

/// A hardware type document (`/tagtypes/XX.json`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HardwareTypeRecord {
    /// Panel width in pixels
    pub width: u32,
    /// Panel height in pixels
    pub height: u32,
    /// Named colors the panel can show
    #[serde(default)]
    pub colortable: HashMap<String, [u8; 3]>,
}

/// What we need to know about a display to render for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Hardware type code
    pub hw_type: u8,
    /// Panel width in pixels
    pub width: u32,
    /// Panel height in pixels
    pub height: u32,
    /// Accent ink, if the panel has one
    pub accent: Option<[u8; 3]>,
}

impl DisplayInfo {
    /// Build from a hardware type document.
    pub fn from_record(hw_type: u8, record: &HardwareTypeRecord) -> Self {
        let accent = ACCENT_KEYS
            .iter()
            .find_map(|key| record.colortable.get(*key).copied());
        Self {
            hw_type,
            width: record.width,
            height: record.height,
            accent,
        }
    }

    /// Palette for rendering. Monochrome panels get black in the accent slot.
    pub fn palette(&self) -> Palette {
        match self.accent {
            Some(accent) => Palette::with_accent(accent),
            None => {
                tracing::warn!(
                    "Hardware type {:#04X} has no accent color, using black",
                    self.hw_type
                );
                Palette::with_accent([0, 0, 0])
            }
        }
    }
}

/// Tags and their display metadata, as fetched from the access point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagInventory {
    tags: HashMap<String, u8>,
    hardware: HashMap<u8, DisplayInfo>,
}

impl TagInventory {
    /// Create an inventory from tag → hardware type pairs.
    pub fn new(tags: HashMap<String, u8>) -> Self {
        Self {
            tags,
            hardware: HashMap::new(),
        }
    }

    /// Parse `tagDB.json`.
    ///
    /// Non-display tags are left out.
    ///
    /// # Example
    ///
    /// ```
    /// use oepl_dashboard::inventory::TagInventory;
    ///
    /// let json = r#"[[{"mac": "0000021EC9EC743A", "hwType": 46, "alias": "desk"}]]"#;
    /// let inventory = TagInventory::from_tag_db(json).unwrap();
    ///
    /// assert_eq!(inventory.hardware_type("0000021EC9EC743A"), Some(46));
    /// ```
    pub fn from_tag_db(json: &str) -> Result<Self, Error> {
        let entries: Vec<Vec<TagRecord>> =
            serde_json::from_str(json).map_err(|e| Error::schema("tagDB.json", e))?;

        let mut tags = HashMap::new();
        for entry in entries {
            let [record]: [TagRecord; 1] = entry.try_into().map_err(|entry: Vec<TagRecord>| {
                Error::schema(
                    "tagDB.json",
                    format!("expected one record per tag entry, got {}", entry.len()),
                )
            })?;

            if record.hw_type >= FIRST_NON_DISPLAY_HW_TYPE {
                continue;
            }
            tags.insert(record.mac, record.hw_type);
        }

        Ok(Self::new(tags))
    }

    /// Distinct hardware types used by the known tags, in ascending order.
    pub fn hardware_types(&self) -> BTreeSet<u8> {
        self.tags.values().copied().collect()
    }

    /// Record the metadata document for a hardware type.
    pub fn add_hardware_type(&mut self, hw_type: u8, json: &str) -> Result<(), Error> {
        let record: HardwareTypeRecord = serde_json::from_str(json)
            .map_err(|e| Error::schema(hardware_file_name(hw_type), e))?;
        self.hardware
            .insert(hw_type, DisplayInfo::from_record(hw_type, &record));
        Ok(())
    }

    /// Hardware type of a tag.
    pub fn hardware_type(&self, mac: &str) -> Option<u8> {
        self.tags.get(mac).copied()
    }

    /// Display metadata for a tag.
    pub fn display_for(&self, mac: &str) -> Result<&DisplayInfo, Error> {
        let hw_type = self
            .hardware_type(mac)
            .ok_or_else(|| Error::UnknownTag(mac.to_string()))?;
        self.hardware
            .get(&hw_type)
            .ok_or(Error::UnknownHardwareType(hw_type))
    }

    /// Number of display tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether no display tags are known.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// File name of a hardware type document: two upper-case hex digits.
pub fn hardware_file_name(hw_type: u8) -> String {
    format!("{:02X}.json", hw_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG_DB: &str = r#"[
        [{"mac": "0000021EC9EC743A", "hwType": 46, "RSSI": -60, "alias": "desk"}],
        [{"mac": "00000000AABBCCDD", "hwType": 3}],
        [{"mac": "FFFFFFFF00000001", "hwType": 240}]
    ]"#;

    const HW_2E: &str = r#"{
        "version": 1,
        "name": "M3 7.5\"",
        "width": 800,
        "height": 480,
        "colortable": {"white": [255,255,255], "black": [0,0,0], "red": [255,0,0]}
    }"#;

    #[test]
    fn test_parse_tag_db_skips_non_display_types() {
        let inventory = TagInventory::from_tag_db(TAG_DB).unwrap();
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.hardware_type("00000000AABBCCDD"), Some(3));
        assert_eq!(inventory.hardware_type("FFFFFFFF00000001"), None);
        assert_eq!(
            inventory.hardware_types().into_iter().collect::<Vec<_>>(),
            vec![3, 46]
        );
    }

    #[test]
    fn test_tag_db_shape_mismatch_is_schema_error() {
        let err = TagInventory::from_tag_db(r#"[{"mac": "X", "hwType": 1}]"#).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));

        let err = TagInventory::from_tag_db(r#"[[{"mac": "X"}]]"#).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));

        let err = TagInventory::from_tag_db(r#"[[]]"#).unwrap_err();
        assert!(err.to_string().contains("got 0"));
    }

    #[test]
    fn test_display_lookup() {
        let mut inventory = TagInventory::from_tag_db(TAG_DB).unwrap();
        inventory.add_hardware_type(46, HW_2E).unwrap();

        let display = inventory.display_for("0000021EC9EC743A").unwrap();
        assert_eq!((display.width, display.height), (800, 480));
        assert_eq!(display.accent, Some([255, 0, 0]));
    }

    #[test]
    fn test_display_lookup_errors() {
        let inventory = TagInventory::from_tag_db(TAG_DB).unwrap();
        assert!(matches!(
            inventory.display_for("nope"),
            Err(Error::UnknownTag(_))
        ));
        assert!(matches!(
            inventory.display_for("0000021EC9EC743A"),
            Err(Error::UnknownHardwareType(46))
        ));
    }

    #[test]
    fn test_hardware_type_shape_mismatch() {
        let mut inventory = TagInventory::default();
        let err = inventory
            .add_hardware_type(46, r#"{"width": 800}"#)
            .unwrap_err();
        assert!(err.to_string().contains("2E.json"));
    }

    #[test]
    fn test_yellow_accent_and_monochrome() {
        let yellow: HardwareTypeRecord = serde_json::from_str(
            r#"{"width": 296, "height": 128, "colortable": {"yellow": [255,255,0]}}"#,
        )
        .unwrap();
        assert_eq!(
            DisplayInfo::from_record(1, &yellow).accent,
            Some([255, 255, 0])
        );

        let mono: HardwareTypeRecord =
            serde_json::from_str(r#"{"width": 152, "height": 152}"#).unwrap();
        let info = DisplayInfo::from_record(2, &mono);
        assert_eq!(info.accent, None);
        assert_eq!(info.palette().accent, [0, 0, 0]);
    }

    #[test]
    fn test_hardware_file_name() {
        assert_eq!(hardware_file_name(0x2e), "2E.json");
        assert_eq!(hardware_file_name(3), "03.json");
    }
}
