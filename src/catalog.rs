use std::fmt;

use crate::error::AssetError;
use crate::version::Version;

/// Territories the catalog serves. Declaration order is the fixed priority
/// used to sort resources, so that conflict outcomes are deterministic.
/// CHS is the default territory and its paths carry no prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    En,
    Chs,
    ChsT,
    Jp,
    Kr,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::En,
        Language::Chs,
        Language::ChsT,
        Language::Jp,
        Language::Kr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Chs => "chs",
            Language::ChsT => "chs_t",
            Language::Jp => "jp",
            Language::Kr => "kr",
        }
    }

    /// The path prefix resources of this territory are served under.
    pub fn prefix(self) -> &'static str {
        match self {
            Language::Chs => "",
            Language::En => "en/",
            Language::ChsT => "chs_t/",
            Language::Jp => "jp/",
            Language::Kr => "kr/",
        }
    }

    pub fn of_path(path: &str) -> Language {
        match path.split('/').next() {
            Some("en") => Language::En,
            Some("kr") => Language::Kr,
            Some("jp") => Language::Jp,
            Some("chs_t") => Language::ChsT,
            _ => Language::Chs,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strips the language-territory prefix, yielding the canonical path the
/// mapping table is keyed by. Default-territory paths pass through as-is.
pub fn strip_language_prefix(path: &str) -> &str {
    let language = Language::of_path(path);
    path.strip_prefix(language.prefix()).unwrap_or(path)
}

pub fn put_language_prefix(path: &str, language: Language) -> String {
    let prefix = language.prefix();
    if !prefix.is_empty() && path.starts_with(prefix) {
        path.to_string()
    } else {
        format!("{prefix}{path}")
    }
}

/// One file known to the catalog.
#[derive(Debug, Clone)]
pub struct Resource {
    pub language: Language,
    pub remote_path: String,
    pub version: Version,
}

pub type Catalog = Vec<Resource>;

/// Schema definition served alongside the catalog. Its presence is checked
/// as a format-revision sanity signal; the compiled bootstrap schema itself
/// ships in the binary.
pub const SCHEMA_RESOURCE_PATH: &str = "res/proto/config.proto";

/// The binary metadata container every data table is decoded from.
pub const METADATA_RESOURCE_PATH: &str = "res/config/lqc.lqbin";

pub fn find_resource<'a>(catalog: &'a [Resource], path: &str) -> Result<&'a Resource, AssetError> {
    catalog
        .iter()
        .find(|resource| resource.remote_path == path)
        .ok_or_else(|| AssetError::ResourceNotFound(path.to_string()))
}

pub fn find_schema_resource(catalog: &[Resource]) -> Result<&Resource, AssetError> {
    find_resource(catalog, SCHEMA_RESOURCE_PATH)
}

pub fn find_metadata_resource(catalog: &[Resource]) -> Result<&Resource, AssetError> {
    find_resource(catalog, METADATA_RESOURCE_PATH)
}

/// Resources strictly newer than `floor`, preserving catalog order.
pub fn resources_newer_than(catalog: Catalog, floor: &Version) -> Catalog {
    catalog
        .into_iter()
        .filter(|resource| resource.version > *floor)
        .collect()
}
