use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

/// Font database and family used for every label drawn by the crate.
#[derive(Clone)]
pub struct LabelFont {
    db: Arc<fontdb::Database>,
    family: String,
}

impl LabelFont {
    pub fn family(&self) -> &str {
        &self.family
    }

    pub(crate) fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    /// Family-only font without loading system fonts. Text drawn with it is
    /// skipped by the rasterizer unless a matching face is present.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
            family: "sans-serif".to_string(),
        }
    }
}

/// Families tried, in order, when no family is configured or the configured one
/// is not installed.
const FALLBACK_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
    "FreeSans",
];

/// Resolves the label font to a face that is actually installed. The generic
/// `sans-serif` family is mapped onto that face as well.
pub fn resolve_label_font(font_path: Option<&Path>, font_family: Option<&str>) -> Result<LabelFont> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    if let Some(path) = font_path {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        let family = family_from_data(&data)
            .ok_or_else(|| anyhow!("failed to parse font: {}", path.display()))?;
        db.load_font_data(data);
        return Ok(with_family(db, family));
    }

    select_family(db, font_family)
}

fn select_family(db: fontdb::Database, font_family: Option<&str>) -> Result<LabelFont> {
    let requested = font_family
        .map(str::trim)
        .filter(|value| !value.is_empty() && !is_generic_sans(value));
    if let Some(name) = requested {
        if let Some(family) = installed_family(&db, name) {
            return Ok(with_family(db, family));
        }
        tracing::warn!("label font '{}' is not installed; using a fallback", name);
    }

    let family = FALLBACK_FAMILIES
        .iter()
        .find_map(|candidate| installed_family(&db, candidate))
        .or_else(|| first_family(&db))
        .ok_or_else(|| anyhow!("no usable font found for labels; set [overlay] font_path"))?;
    tracing::debug!("label font resolved to '{}'", family);
    Ok(with_family(db, family))
}

fn with_family(mut db: fontdb::Database, family: String) -> LabelFont {
    db.set_sans_serif_family(family.clone());
    LabelFont {
        db: Arc::new(db),
        family,
    }
}

fn is_generic_sans(family: &str) -> bool {
    family.eq_ignore_ascii_case("sans-serif") || family.eq_ignore_ascii_case("sans")
}

/// Family name as stored by the face that answers a query for `family`.
fn installed_family(db: &fontdb::Database, family: &str) -> Option<String> {
    let families = [fontdb::Family::Name(family)];
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db.query(&query)?;
    db.face(id)
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone())
}

fn first_family(db: &fontdb::Database) -> Option<String> {
    db.faces()
        .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
}

fn family_from_data(data: &[u8]) -> Option<String> {
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    (0..count)
        .filter_map(|index| Face::parse(data, index).ok())
        .find_map(|face| extract_family_name(&face))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
