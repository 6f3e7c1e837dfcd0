//! HTTP route handlers

pub mod debug;
pub mod health;
pub mod pages;
pub mod responses;
pub mod summary;

use storage::ResponseFilter;

/// Query parameters shared by the listing and summary endpoints
#[derive(Debug, Default, PartialEq)]
pub struct FilterQuery {
    /// comedor | transporte; other values are ignored
    pub tipo: Option<String>,
    /// Inclusive start date, YYYY-MM-DD
    pub desde: Option<String>,
    /// Inclusive end date, YYYY-MM-DD
    pub hasta: Option<String>,
}

impl FilterQuery {
    /// Collect the known parameters from raw query pairs. The first
    /// occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "tipo" => &mut query.tipo,
                "desde" => &mut query.desde,
                "hasta" => &mut query.hasta,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    pub fn to_filter(&self) -> ResponseFilter {
        ResponseFilter::from_params(
            self.tipo.as_deref(),
            self.desde.as_deref(),
            self.hasta.as_deref(),
        )
    }
}
