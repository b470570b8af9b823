//! Workflow exchange format
//!
//! A JSON array of records, one per item, with the template embedded as
//! base64. Missing fields take the same defaults the editor uses, and the
//! legacy `double_click` flag is honored when `action` is absent.

use super::error::{ConfigError, RecordError};
use super::item::{DEFAULT_CLICK_OFFSET, Item, Sequence};
use super::types::ActionKind;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Base64 encoded template image
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub delay: i64,
    #[serde(default)]
    pub interrupt: bool,
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default = "default_offset")]
    pub offset: [f32; 2],
    /// Older exports stored double clicks as a flag instead of an action
    #[serde(default, skip_serializing)]
    pub double_click: Option<bool>,
}

fn default_enable() -> bool {
    true
}

fn default_offset() -> [f32; 2] {
    [DEFAULT_CLICK_OFFSET.0, DEFAULT_CLICK_OFFSET.1]
}

impl ItemRecord {
    pub fn from_item(item: &Item) -> Self {
        let (x, y) = item.click_offset();
        Self {
            image: STANDARD.encode(item.template().bytes()),
            alias: item.alias().map(str::to_string),
            action: Some(item.action().as_wire().to_string()),
            delay: i64::try_from(item.delay_ms()).unwrap_or(i64::MAX),
            interrupt: item.interrupt_on_fail(),
            enable: item.is_enabled(),
            offset: [x, y],
            double_click: None,
        }
    }

    /// Action named by the record, applying the legacy fallback
    fn resolve_action(&self) -> Result<ActionKind, ConfigError> {
        match &self.action {
            Some(name) => ActionKind::from_wire(name).ok_or_else(|| ConfigError::UnknownAction {
                action: name.clone(),
            }),
            None if self.double_click == Some(true) => Ok(ActionKind::DoubleClick),
            None => Ok(ActionKind::SingleClick),
        }
    }

    /// Validate and convert; `index` is only used for error reporting
    pub fn into_item(self, index: usize) -> Result<Item, RecordError> {
        let invalid = |source| RecordError::InvalidItem { index, source };

        let action = self.resolve_action().map_err(invalid)?;
        let bytes = STANDARD
            .decode(self.image.trim())
            .map_err(|source| RecordError::Base64 { index, source })?;

        let mut item = Item::from_image_bytes(bytes)
            .map_err(invalid)?
            .with_action(action)
            .with_interrupt_on_fail(self.interrupt)
            .with_enabled(self.enable);
        item.set_delay_ms_signed(self.delay).map_err(invalid)?;
        item.set_click_offset(self.offset[0], self.offset[1])
            .map_err(invalid)?;
        item.set_alias(self.alias);
        Ok(item)
    }
}

/// Parse a workflow JSON document
pub fn parse_items(json: &str) -> Result<Sequence, RecordError> {
    let records: Vec<ItemRecord> = serde_json::from_str(json)?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_item(index))
        .collect()
}

/// Serialize items into a workflow JSON document
pub fn items_to_json(items: &[Item]) -> Result<String, RecordError> {
    let records: Vec<ItemRecord> = items.iter().map(ItemRecord::from_item).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn load_items(path: impl AsRef<Path>) -> Result<Sequence, RecordError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let sequence = parse_items(&json)?;
    log::info!("📂 Loaded {} items from {}", sequence.len(), path.display());
    Ok(sequence)
}

pub fn save_items(path: impl AsRef<Path>, items: &[Item]) -> Result<(), RecordError> {
    let path = path.as_ref();
    let json = items_to_json(items)?;
    std::fs::write(path, json).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("💾 Exported {} items to {}", items.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};

    fn png_base64() -> String {
        let pixels = GrayImage::from_fn(5, 3, |x, y| Luma([(x * 50 + y * 20) as u8]));
        let item = Item::from_image(&DynamicImage::ImageLuma8(pixels)).unwrap();
        STANDARD.encode(item.template().bytes())
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let json = format!(r#"[{{"image": "{}"}}]"#, png_base64());
        let seq = parse_items(&json).unwrap();

        assert_eq!(seq.len(), 1);
        let item = &seq[0];
        assert_eq!(item.action(), ActionKind::SingleClick);
        assert_eq!(item.delay_ms(), 0);
        assert!(!item.interrupt_on_fail());
        assert!(item.is_enabled());
        assert_eq!(item.click_offset(), (0.5, 0.5));
        assert_eq!(item.alias(), None);
        assert_eq!((item.template().width(), item.template().height()), (5, 3));
    }

    #[test]
    fn test_legacy_double_click_flag() {
        let json = format!(r#"[{{"image": "{}", "double_click": true}}]"#, png_base64());
        let seq = parse_items(&json).unwrap();
        assert_eq!(seq[0].action(), ActionKind::DoubleClick);

        // An explicit action wins over the legacy flag
        let json = format!(
            r#"[{{"image": "{}", "double_click": true, "action": "long"}}]"#,
            png_base64()
        );
        assert_eq!(parse_items(&json).unwrap()[0].action(), ActionKind::LongPress);
    }

    #[test]
    fn test_full_record_with_alias() {
        let json = format!(
            r#"[{{"image": "{}", "alias": "start button", "action": "right_double",
                 "delay": 100, "interrupt": true, "enable": false, "offset": [0.25, 0.75]}}]"#,
            png_base64()
        );
        let item = &parse_items(&json).unwrap()[0];
        assert_eq!(item.alias(), Some("start button"));
        assert_eq!(item.action(), ActionKind::RightDouble);
        assert_eq!(item.delay_ms(), 100);
        assert!(item.interrupt_on_fail());
        assert!(!item.is_enabled());
        assert_eq!(item.click_offset(), (0.25, 0.75));
    }

    #[test]
    fn test_export_then_import_preserves_items() {
        let json = format!(
            r#"[{{"image": "{img}", "alias": "a", "action": "long", "delay": 30}},
                {{"image": "{img}", "interrupt": true, "offset": [0.0, 1.0]}}]"#,
            img = png_base64()
        );
        let original = parse_items(&json).unwrap();

        let exported = items_to_json(original.as_slice()).unwrap();
        let reimported = parse_items(&exported).unwrap();

        assert_eq!(reimported, original);
        assert!(!exported.contains("double_click"));
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        let img = png_base64();

        let negative = format!(r#"[{{"image": "{}", "delay": -1}}]"#, img);
        assert!(matches!(
            parse_items(&negative),
            Err(RecordError::InvalidItem { index: 0, source: ConfigError::NegativeDelay { .. } })
        ));

        let offset = format!(r#"[{{"image": "{img}"}}, {{"image": "{img}", "offset": [1.5, 0.5]}}]"#);
        assert!(matches!(
            parse_items(&offset),
            Err(RecordError::InvalidItem { index: 1, source: ConfigError::OffsetOutOfRange { .. } })
        ));

        let action = format!(r#"[{{"image": "{}", "action": "triple"}}]"#, img);
        assert!(matches!(
            parse_items(&action),
            Err(RecordError::InvalidItem { source: ConfigError::UnknownAction { .. }, .. })
        ));

        assert!(matches!(
            parse_items(r#"[{"image": "***"}]"#),
            Err(RecordError::Base64 { index: 0, .. })
        ));
        assert!(matches!(parse_items("{not json"), Err(RecordError::Json { .. })));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("autoclick-workflow-{}.json", std::process::id()));
        let json = format!(r#"[{{"image": "{}", "alias": "saved"}}]"#, png_base64());
        let items = parse_items(&json).unwrap();

        save_items(&path, items.as_slice()).unwrap();
        let loaded = load_items(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.unwrap(), items);
        assert!(matches!(
            load_items(std::env::temp_dir().join("autoclick-missing-workflow.json")),
            Err(RecordError::Io { .. })
        ));
    }
}
