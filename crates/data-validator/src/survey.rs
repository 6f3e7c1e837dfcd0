//! Survey domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Satisfaction level chosen on the kiosk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    Excelente,
    Bueno,
    Regular,
    Malo,
}

impl Rating {
    /// All accepted ratings, best first
    pub const ALL: [Rating; 4] = [Rating::Excelente, Rating::Bueno, Rating::Regular, Rating::Malo];

    /// Stored label
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Excelente => "Excelente",
            Rating::Bueno => "Bueno",
            Rating::Regular => "Regular",
            Rating::Malo => "Malo",
        }
    }
}

impl FromStr for Rating {
    type Err = ();

    /// Exact, case-sensitive match against the stored labels
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rating::ALL
            .into_iter()
            .find(|rating| rating.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facility a response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Comedor,
    Transporte,
    Desconocido,
}

impl Kind {
    /// Stored label
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Comedor => "comedor",
            Kind::Transporte => "transporte",
            Kind::Desconocido => "desconocido",
        }
    }

    /// Parse a caller-supplied kind. Only the two concrete facilities are
    /// accepted; surrounding whitespace and case are ignored.
    pub fn parse_known(raw: &str) -> Option<Kind> {
        match raw.trim().to_lowercase().as_str() {
            "comedor" => Some(Kind::Comedor),
            "transporte" => Some(Kind::Transporte),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw submission body as posted by a kiosk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    pub calificacion: Option<String>,
    pub motivo: Option<String>,
    pub sede: Option<String>,
    pub dispositivo_id: Option<String>,
    pub tipo: Option<String>,
    pub meta: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_parse_is_exact() {
        assert_eq!("Excelente".parse::<Rating>(), Ok(Rating::Excelente));
        assert_eq!("Malo".parse::<Rating>(), Ok(Rating::Malo));
        assert!("excelente".parse::<Rating>().is_err());
        assert!("Pésimo".parse::<Rating>().is_err());
    }

    #[test]
    fn test_kind_parse_known() {
        assert_eq!(Kind::parse_known(" Comedor "), Some(Kind::Comedor));
        assert_eq!(Kind::parse_known("TRANSPORTE"), Some(Kind::Transporte));
        assert_eq!(Kind::parse_known("desconocido"), None);
        assert_eq!(Kind::parse_known(""), None);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&Kind::Transporte).unwrap();
        assert_eq!(json, "\"transporte\"");
    }

    #[test]
    fn test_submission_accepts_partial_body() {
        let body: Submission =
            serde_json::from_str(r#"{"calificacion":"Bueno","motivo":"rapido"}"#).unwrap();
        assert_eq!(body.calificacion.as_deref(), Some("Bueno"));
        assert!(body.tipo.is_none());
        assert!(body.meta.is_none());
    }
}
