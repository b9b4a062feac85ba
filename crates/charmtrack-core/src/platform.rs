use serde::{Deserialize, Serialize};

/// A recognized resale marketplace.
///
/// Upstream collectors emit platform identifiers with inconsistent casing
/// (`"ebay"`, `"Ebay"`, `"eBay"`). [`Platform::parse`] is the single
/// normalization point; everywhere else the platform is this closed enum,
/// never a free string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "eBay")]
    Ebay,
    Etsy,
    Poshmark,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Ebay, Platform::Etsy, Platform::Poshmark];

    /// Parses a free-form platform identifier, case-insensitively.
    ///
    /// Returns `None` for unrecognized marketplaces; such listings are
    /// excluded from aggregation rather than treated as errors.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Platform> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ebay" => Some(Platform::Ebay),
            "etsy" => Some(Platform::Etsy),
            "poshmark" => Some(Platform::Poshmark),
            _ => None,
        }
    }

    /// Canonical display name, e.g. `"eBay"`.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Ebay => "eBay",
            Platform::Etsy => "Etsy",
            Platform::Poshmark => "Poshmark",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
