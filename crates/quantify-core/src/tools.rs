//! Legal tool reference data.
//!
//! Every canonical legal tool identifier is generated from the static
//! [`FAMILIES`] table (family × version). Each family carries its restriction
//! category and Free Culture approval; lifecycle status follows from the
//! family kind and whether the version is the family's newest.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Bucket for labels that do not map to a known legal tool.
pub const UNKNOWN: &str = "Unknown";

/// Version assumed when a Creative Commons license label omits one.
pub const LATEST_CC_VERSION: &str = "4.0";

pub const FREE_CULTURE_APPROVED: &str = "Approved for Free Cultural Works";
pub const FREE_CULTURE_LIMITED: &str = "Limited use";

const CC_VERSIONS: &[&str] = &["1.0", "2.0", "2.1", "2.5", "3.0", "4.0"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Restriction {
    PublicDomain,
    Permissive,
    Copyleft,
    Restricted,
    Unknown,
}

impl Restriction {
    pub const ALL: [Restriction; 5] = [
        Restriction::PublicDomain,
        Restriction::Permissive,
        Restriction::Copyleft,
        Restriction::Restricted,
        Restriction::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Restriction::PublicDomain => "Public domain",
            Restriction::Permissive => "Permissive",
            Restriction::Copyleft => "Copyleft",
            Restriction::Restricted => "Restricted",
            Restriction::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    Latest,
    Prior,
    Retired,
    NotCreativeCommons,
    Unknown,
}

impl Lifecycle {
    pub fn label(&self) -> &'static str {
        match self {
            Lifecycle::Latest => "Latest",
            Lifecycle::Prior => "Prior",
            Lifecycle::Retired => "Retired",
            Lifecycle::NotCreativeCommons => "Not Creative Commons",
            Lifecycle::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Product line a tool belongs to: licenses by version, or one of the
/// standalone public domain instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Product {
    Licenses4,
    Licenses3,
    Licenses2,
    Licenses1,
    Cc0,
    PublicDomainMark,
    Certification,
    NotCreativeCommons,
    Unknown,
}

impl Product {
    pub fn label(&self) -> &'static str {
        match self {
            Product::Licenses4 => "Licenses version 4.0",
            Product::Licenses3 => "Licenses version 3.0",
            Product::Licenses2 => "Licenses version 2.x",
            Product::Licenses1 => "Licenses version 1.0",
            Product::Cc0 => "CC0 1.0",
            Product::PublicDomainMark => "Public Domain Mark 1.0",
            Product::Certification => "Certification 1.0 US",
            Product::NotCreativeCommons => "Not Creative Commons",
            Product::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FamilyKind {
    /// Current Creative Commons tools; the last listed version is the latest.
    Current,
    /// Tools Creative Commons no longer recommends, in every version.
    Retired,
    /// Software licenses and other non-CC instruments; unversioned.
    External,
}

struct Family {
    name: &'static str,
    kind: FamilyKind,
    versions: &'static [&'static str],
    restriction: Restriction,
    free_culture: bool,
}

const fn family(
    name: &'static str,
    kind: FamilyKind,
    versions: &'static [&'static str],
    restriction: Restriction,
    free_culture: bool,
) -> Family {
    Family {
        name,
        kind,
        versions,
        restriction,
        free_culture,
    }
}

use FamilyKind::{Current, External, Retired};
use Restriction::{Copyleft, Permissive, PublicDomain, Restricted};

const FAMILIES: &[Family] = &[
    family("CC BY", Current, CC_VERSIONS, Permissive, true),
    family("CC BY-SA", Current, CC_VERSIONS, Copyleft, true),
    family("CC BY-NC", Current, CC_VERSIONS, Restricted, false),
    family("CC BY-ND", Current, CC_VERSIONS, Restricted, false),
    family("CC BY-NC-SA", Current, CC_VERSIONS, Restricted, false),
    family("CC BY-NC-ND", Current, CC_VERSIONS, Restricted, false),
    family("CC0", Current, &["1.0"], PublicDomain, true),
    family("Public Domain Mark", Current, &["1.0"], PublicDomain, true),
    family("CC SA", Retired, &["1.0"], Copyleft, false),
    family("CC ND", Retired, &["1.0"], Restricted, false),
    family("CC NC", Retired, &["1.0"], Restricted, false),
    family("CC NC-SA", Retired, &["1.0"], Restricted, false),
    family("CC ND-NC", Retired, &["1.0"], Restricted, false),
    family("CC SAMPLING", Retired, &["1.0"], Restricted, false),
    family("CC SAMPLING+", Retired, &["1.0"], Restricted, false),
    family("CC NC-SAMPLING+", Retired, &["1.0"], Restricted, false),
    family("CC DEVNATIONS", Retired, &["2.0"], Restricted, false),
    family("CC PUBLICDOMAIN", Retired, &["1.0"], PublicDomain, false),
    family("MIT", External, &[], Permissive, false),
    family("MIT No Attribution", External, &[], PublicDomain, false),
    family("Unlicense", External, &[], PublicDomain, false),
    family("BSD Zero Clause License", External, &[], PublicDomain, false),
];

/// One canonical legal tool with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalTool {
    pub identifier: String,
    pub family: &'static str,
    pub version: Option<&'static str>,
    pub restriction: Restriction,
    pub free_culture: bool,
    pub lifecycle: Lifecycle,
}

impl LegalTool {
    pub fn is_creative_commons(&self) -> bool {
        self.lifecycle != Lifecycle::NotCreativeCommons
    }

    pub fn product(&self) -> Product {
        match (self.family, self.version) {
            (_, None) => Product::NotCreativeCommons,
            ("CC0", _) => Product::Cc0,
            ("Public Domain Mark", _) => Product::PublicDomainMark,
            ("CC PUBLICDOMAIN", _) => Product::Certification,
            (_, Some("4.0")) => Product::Licenses4,
            (_, Some("3.0")) => Product::Licenses3,
            (_, Some(v)) if v.starts_with("2.") => Product::Licenses2,
            (_, Some(_)) => Product::Licenses1,
        }
    }

    /// Deed URL without scheme, e.g. `creativecommons.org/licenses/by-sa/3.0`.
    /// Software licenses have none.
    pub fn deed_url(&self) -> Option<String> {
        let version = self.version?;
        let path = match self.family {
            "CC0" => format!("publicdomain/zero/{version}"),
            "Public Domain Mark" => format!("publicdomain/mark/{version}"),
            "CC PUBLICDOMAIN" => "licenses/publicdomain".to_string(),
            family => format!("licenses/{}/{version}", family.strip_prefix("CC ")?.to_lowercase()),
        };
        Some(format!("creativecommons.org/{path}"))
    }
}

static REGISTRY: LazyLock<HashMap<String, LegalTool>> = LazyLock::new(|| {
    let mut registry = HashMap::new();
    for family in FAMILIES {
        if family.versions.is_empty() {
            let tool = LegalTool {
                identifier: family.name.to_string(),
                family: family.name,
                version: None,
                restriction: family.restriction,
                free_culture: family.free_culture,
                lifecycle: Lifecycle::NotCreativeCommons,
            };
            registry.insert(tool.identifier.clone(), tool);
            continue;
        }
        let latest = family.versions.last().copied();
        for &version in family.versions {
            let lifecycle = match family.kind {
                Retired => Lifecycle::Retired,
                Current if Some(version) == latest => Lifecycle::Latest,
                Current => Lifecycle::Prior,
                External => Lifecycle::NotCreativeCommons,
            };
            let tool = LegalTool {
                identifier: format!("{} {}", family.name, version),
                family: family.name,
                version: Some(version),
                restriction: family.restriction,
                free_culture: family.free_culture,
                lifecycle,
            };
            registry.insert(tool.identifier.clone(), tool);
        }
    }
    registry
});

/// Look up a canonical identifier. Non-canonical spellings return `None`;
/// run them through [`crate::label::normalize_label`] first.
pub fn lookup(identifier: &str) -> Option<&'static LegalTool> {
    REGISTRY.get(identifier)
}

/// All canonical identifiers, sorted.
pub fn identifiers() -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = REGISTRY.keys().map(String::as_str).collect();
    ids.sort_unstable();
    ids
}

/// Every Creative Commons tool (current, prior and retired), sorted by
/// identifier.
pub fn creative_commons_tools() -> Vec<&'static LegalTool> {
    identifiers()
        .into_iter()
        .filter_map(lookup)
        .filter(|t| t.is_creative_commons())
        .collect()
}

pub fn restriction_of(identifier: &str) -> Restriction {
    lookup(identifier).map_or(Restriction::Unknown, |t| t.restriction)
}

pub fn lifecycle_of(identifier: &str) -> Lifecycle {
    lookup(identifier).map_or(Lifecycle::Unknown, |t| t.lifecycle)
}

pub fn is_free_culture(identifier: &str) -> bool {
    lookup(identifier).is_some_and(|t| t.free_culture)
}

pub fn product_of(identifier: &str) -> Product {
    lookup(identifier).map_or(Product::Unknown, LegalTool::product)
}

/// Free Culture bucket label for an identifier, `Unknown` when unmapped.
pub fn free_culture_label(identifier: &str) -> &'static str {
    match lookup(identifier) {
        Some(tool) if tool.free_culture => FREE_CULTURE_APPROVED,
        Some(_) => FREE_CULTURE_LIMITED,
        None => UNKNOWN,
    }
}
