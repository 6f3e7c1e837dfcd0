//! Text normalization and kind inference

use crate::survey::Kind;

/// Trim an optional free-text field, mapping absence to an empty string
pub fn normalize_text(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

/// Classify a device identifier by case-insensitive substring match.
///
/// "transporte" is checked before "comedor".
pub fn infer_kind_from_device(device_id: &str) -> Kind {
    let device = device_id.to_lowercase();
    if device.contains("transporte") {
        Kind::Transporte
    } else if device.contains("comedor") {
        Kind::Comedor
    } else {
        Kind::Desconocido
    }
}

/// Resolve the kind of a submission: an explicit known kind wins, then the
/// device identifier, then [`Kind::Desconocido`].
pub fn resolve_kind(requested: Option<&str>, device_id: &str) -> Kind {
    requested
        .and_then(Kind::parse_known)
        .unwrap_or_else(|| infer_kind_from_device(device_id))
}
