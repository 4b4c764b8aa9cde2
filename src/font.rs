//! Font loading and discovery
//!
//! Uses fontdb to find system fonts by family name, falling back to the
//! generic monospace and sans-serif families.

use std::path::Path;
use std::sync::OnceLock;

use fontdb::{Database, Family, Query};
use phosphor_renderer::{FontdueGlyphSource, RenderError};

/// Global font database (loaded once)
static FONT_DB: OnceLock<Database> = OnceLock::new();

/// Get or initialize the font database
fn font_db() -> &'static Database {
    FONT_DB.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        log::info!("Loaded {} system fonts", db.faces().count());
        db
    })
}

fn load_family(family: Family<'_>) -> Option<FontdueGlyphSource> {
    let db = font_db();
    let query = Query {
        families: &[family],
        ..Default::default()
    };
    let id = db.query(&query)?;

    db.with_face_data(id, |data, index| {
        FontdueGlyphSource::from_collection(data, index)
    })?
    .map_err(|e| log::warn!("Skipping unreadable face: {}", e))
    .ok()
}

/// Resolve the glyph source for rasterization
///
/// An explicit `font_path` wins. Otherwise the first family in `families`
/// the system knows, then generic monospace, then generic sans-serif.
pub fn load_glyph_source(
    font_path: Option<&Path>,
    families: &[String],
) -> Result<FontdueGlyphSource, RenderError> {
    if let Some(path) = font_path {
        return FontdueGlyphSource::from_path(path);
    }

    for name in families {
        if let Some(source) = load_family(Family::Name(name.as_str())) {
            log::info!("Loaded font: {}", name);
            return Ok(source);
        }
        log::debug!("Font family not found: {}", name);
    }

    for generic in [Family::Monospace, Family::SansSerif] {
        if let Some(source) = load_family(generic) {
            log::info!(
                "Using fallback font {:?}",
                source.name().unwrap_or("<unnamed>")
            );
            return Ok(source);
        }
    }

    Err(RenderError::Font(format!(
        "none of {:?} found and no fallback font available; pass --font <path>",
        families
    )))
}

/// List available monospace fonts (for config help)
pub fn list_monospace_fonts() -> Vec<String> {
    let db = font_db();
    let mut fonts = Vec::new();

    for face in db.faces() {
        if face.monospaced {
            let family = face.families.first().map(|(name, _)| name.clone());
            if let Some(name) = family {
                if !fonts.contains(&name) {
                    fonts.push(name);
                }
            }
        }
    }

    fonts.sort();
    fonts
}
