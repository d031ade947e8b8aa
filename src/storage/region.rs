//! Storage region codes and endpoint resolution

use crate::storage::error::StorageError;

/// A Bunny storage replication region.
///
/// The region is chosen once at client construction and maps to a fixed
/// base endpoint. Falkenstein (`de`) is the primary region and uses the
/// root endpoint host; every other region is a subdomain of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    /// Falkenstein, Germany (`de`) - the default region
    #[default]
    Falkenstein,
    /// London, United Kingdom (`uk`)
    London,
    /// Stockholm, Sweden (`se`)
    Stockholm,
    /// New York, United States (`ny`)
    NewYork,
    /// Los Angeles, United States (`la`)
    LosAngeles,
    /// Singapore (`sg`)
    Singapore,
    /// Sydney, Australia (`syd`)
    Sydney,
    /// São Paulo, Brazil (`br`)
    SaoPaulo,
    /// Johannesburg, South Africa (`jh`)
    Johannesburg,
}

impl Region {
    /// Resolve a short region code to a region.
    ///
    /// Codes are matched case-insensitively. The empty string resolves to
    /// the default region. Unknown codes fail with `InvalidRegion`.
    pub fn from_code(code: &str) -> Result<Self, StorageError> {
        match code.to_ascii_lowercase().as_str() {
            "" | "de" => Ok(Region::Falkenstein),
            "uk" => Ok(Region::London),
            "se" => Ok(Region::Stockholm),
            "ny" => Ok(Region::NewYork),
            "la" => Ok(Region::LosAngeles),
            "sg" => Ok(Region::Singapore),
            "syd" => Ok(Region::Sydney),
            "br" => Ok(Region::SaoPaulo),
            "jh" => Ok(Region::Johannesburg),
            _ => Err(StorageError::InvalidRegion {
                code: code.to_string(),
            }),
        }
    }

    /// The short region code used in endpoint hostnames
    pub fn code(&self) -> &'static str {
        match self {
            Region::Falkenstein => "de",
            Region::London => "uk",
            Region::Stockholm => "se",
            Region::NewYork => "ny",
            Region::LosAngeles => "la",
            Region::Singapore => "sg",
            Region::Sydney => "syd",
            Region::SaoPaulo => "br",
            Region::Johannesburg => "jh",
        }
    }

    /// Base endpoint URL for this region, with a trailing slash.
    ///
    /// The default region maps to the root endpoint host; every other
    /// region maps to a region-prefixed subdomain. Pure string work, no
    /// network access.
    pub fn base_url(&self) -> String {
        match self {
            Region::Falkenstein => "https://storage.bunnycdn.com/".to_string(),
            other => format!("https://{}.storage.bunnycdn.com/", other.code()),
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Region {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::from_code(s)
    }
}
