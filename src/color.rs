//! Color resolution for the formatting policy.
//!
//! Styles accept CSS-style names or hex strings; the model stores
//! `#RRGGBB`, and the XLSX writer needs `FFRRGGBB`.

use crate::error::{Result, SyncError};

/// CSS names accepted in style options.
const NAMED_COLORS: [(&str, &str); 16] = [
    ("black", "#000000"),
    ("white", "#FFFFFF"),
    ("red", "#FF0000"),
    ("green", "#008000"),
    ("blue", "#0000FF"),
    ("yellow", "#FFFF00"),
    ("orange", "#FFA500"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("lightgray", "#D3D3D3"),
    ("silver", "#C0C0C0"),
    ("maroon", "#800000"),
    ("navy", "#000080"),
    ("purple", "#800080"),
    ("teal", "#008080"),
    ("mistyrose", "#FFE4E1"),
];

/// Resolve a color name, `#RGB`, `#RRGGBB`, or `AARRGGBB` to `#RRGGBB`.
///
/// # Errors
/// [`SyncError::Validation`] for anything else.
pub fn resolve_color(spec: &str) -> Result<String> {
    let spec = spec.trim();
    if let Some((_, hex)) = NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(spec))
    {
        return Ok((*hex).to_string());
    }

    let hex = spec.trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SyncError::validation(format!("unknown color {spec:?}")));
    }
    let rgb = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        8 => hex.chars().skip(2).collect(),
        _ => return Err(SyncError::validation(format!("unknown color {spec:?}"))),
    };
    Ok(format!("#{}", rgb.to_ascii_uppercase()))
}

/// `#RRGGBB` to the opaque ARGB form used in styles.xml.
#[must_use]
pub fn to_argb(rgb: &str) -> String {
    format!("FF{}", rgb.trim_start_matches('#').to_ascii_uppercase())
}

/// ARGB (or plain RGB) from styles.xml back to `#RRGGBB`.
#[must_use]
pub fn from_argb(argb: &str) -> Option<String> {
    resolve_color(argb).ok()
}
