use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{MaskError, Result};
use crate::geometry::Rect;

pub const DEFAULT_MASK_PATH: &str = "mask_config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Face,
    Id,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Face, Label::Id];

    pub fn key(self) -> &'static str {
        match self {
            Label::Face => "face",
            Label::Id => "id",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Label::Face => "FACE",
            Label::Id => "ID",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The two named regions of a mask. Keys missing from a persisted file load
/// as `None`; both keys are always written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSet {
    #[serde(default)]
    pub face: Option<Rect>,
    #[serde(default)]
    pub id: Option<Rect>,
}

impl RegionSet {
    pub fn new(face: Option<Rect>, id: Option<Rect>) -> Self {
        Self { face, id }
    }

    pub fn get(&self, label: Label) -> Option<Rect> {
        match label {
            Label::Face => self.face,
            Label::Id => self.id,
        }
    }

    pub fn set(&mut self, label: Label, rect: Option<Rect>) {
        match label {
            Label::Face => self.face = rect,
            Label::Id => self.id = rect,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.face.is_some() && self.id.is_some()
    }

    /// First label without a rectangle, in `face`, `id` order.
    pub fn first_missing(&self) -> Option<Label> {
        Label::ALL.into_iter().find(|label| self.get(*label).is_none())
    }

    pub fn require(&self, label: Label) -> Result<Rect> {
        self.get(label).ok_or(MaskError::MissingMask { label })
    }
}

pub fn load_mask(path: &Path) -> Result<Option<RegionSet>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no mask file at {}", path.display());
            return Ok(None);
        }
        Err(err) => return Err(MaskError::io(path, err)),
    };
    let regions: RegionSet = serde_json::from_str(&content).map_err(|source| MaskError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "loaded mask {} (face={:?}, id={:?})",
        path.display(),
        regions.face,
        regions.id
    );
    Ok(Some(regions))
}

pub fn save_mask(path: &Path, regions: &RegionSet) -> Result<()> {
    let mut json = serde_json::to_string_pretty(regions).map_err(|source| MaskError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');
    fs::write(path, json).map_err(|err| MaskError::io(path, err))?;
    info!("mask saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn round_trip(regions: RegionSet) {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("mask.json");
        save_mask(&path, &regions).expect("save");
        let loaded = load_mask(&path).expect("load");
        assert_eq!(loaded, Some(regions));
    }

    #[test]
    fn complete_mask_round_trips() {
        round_trip(RegionSet::new(
            Some(Rect::new(10, 10, 50, 50)),
            Some(Rect::new(100, 100, 80, 20)),
        ));
    }

    #[test]
    fn partial_mask_round_trips() {
        round_trip(RegionSet::new(None, Some(Rect::new(-3, 4, 0, 12))));
        round_trip(RegionSet::new(Some(Rect::new(1, 2, 3, 4)), None));
    }

    #[test]
    fn empty_mask_round_trips() {
        round_trip(RegionSet::default());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_mask(&dir.path().join("absent.json")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("mask.json");
        fs::write(&path, "{\"face\": [1, 2, 3]").expect("write");
        let err = load_mask(&path).expect_err("should fail");
        assert!(matches!(err, MaskError::Parse { .. }));

        fs::write(&path, "{\"face\": [1, 2, 3]}").expect("write");
        let err = load_mask(&path).expect_err("short tuple should fail");
        assert!(matches!(err, MaskError::Parse { .. }));
    }

    #[test]
    fn absent_keys_load_as_none() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("mask.json");
        fs::write(&path, "{\"id\": [1, 2, 3, 4]}").expect("write");
        let loaded = load_mask(&path).expect("load").expect("present");
        assert_eq!(loaded, RegionSet::new(None, Some(Rect::new(1, 2, 3, 4))));
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("mask.json");
        fs::write(&path, "not json at all").expect("write");
        let regions = RegionSet::new(Some(Rect::new(0, 0, 5, 5)), None);
        save_mask(&path, &regions).expect("save");
        assert_eq!(load_mask(&path).expect("load"), Some(regions));
    }

    #[test]
    fn save_into_missing_directory_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nope").join("mask.json");
        let err = save_mask(&path, &RegionSet::default()).expect_err("should fail");
        assert!(matches!(err, MaskError::Io { .. }));
    }

    #[test]
    fn completeness_requires_both_labels() {
        let mut regions = RegionSet::default();
        assert_eq!(regions.first_missing(), Some(Label::Face));
        regions.set(Label::Face, Some(Rect::new(0, 0, 1, 1)));
        assert!(!regions.is_complete());
        assert_eq!(regions.first_missing(), Some(Label::Id));
        regions.set(Label::Id, Some(Rect::new(0, 0, 1, 1)));
        assert!(regions.is_complete());
        assert!(matches!(
            RegionSet::default().require(Label::Id),
            Err(MaskError::MissingMask { label: Label::Id })
        ));
    }
}
