//! Legal tool label normalisation.
//!
//! Sources spell the same legal tool many ways: SPDX identifiers
//! ("CC-BY-SA-4.0"), deed URLs ("creativecommons.org/licenses/by/4.0/"),
//! unversioned short names ("CC BY-NC") and retired element orders
//! ("CC-BY-ND-NC"). [`normalize_label`] maps all of them onto the canonical
//! identifiers in [`crate::tools`].
//!
//! # Rules
//!
//! 1. Trim, upper-case, collapse whitespace, then check the alias table
//!    (software licenses, CC0, Public Domain Mark).
//! 2. Deed URLs reduce to their unit and version; `publicdomain/zero` and
//!    `publicdomain/mark` map to CC0 and the Public Domain Mark, and the
//!    unversioned `licenses/publicdomain` to the retired certification.
//! 3. `CC` labels are tokenised on spaces, hyphens and underscores. The first
//!    version-shaped token (`4.0`) splits elements from an optional
//!    jurisdiction suffix, which is dropped.
//! 4. When `BY` is present the elements are re-ordered `BY`, `NC`, `SA`/`ND`.
//!    A missing version means [`LATEST_CC_VERSION`]. Retired units keep their
//!    element order and must carry a version.
//! 5. Anything that does not land on a registered identifier is unmapped.

use crate::tools::{self, LATEST_CC_VERSION, LegalTool, UNKNOWN};

const ALIASES: &[(&str, &str)] = &[
    ("CC0", "CC0 1.0"),
    ("CC0 1.0", "CC0 1.0"),
    ("CC0-1.0", "CC0 1.0"),
    ("CC ZERO", "CC0 1.0"),
    ("CC-ZERO", "CC0 1.0"),
    ("CC PUBLICDOMAIN", "CC PUBLICDOMAIN 1.0"),
    ("PDM", "Public Domain Mark 1.0"),
    ("PDM 1.0", "Public Domain Mark 1.0"),
    ("PDM-1.0", "Public Domain Mark 1.0"),
    ("PUBLIC DOMAIN MARK", "Public Domain Mark 1.0"),
    ("PUBLIC DOMAIN MARK 1.0", "Public Domain Mark 1.0"),
    ("MIT", "MIT"),
    ("MIT LICENSE", "MIT"),
    ("MIT-0", "MIT No Attribution"),
    ("MIT NO ATTRIBUTION", "MIT No Attribution"),
    ("UNLICENSE", "Unlicense"),
    ("THE UNLICENSE", "Unlicense"),
    ("0BSD", "BSD Zero Clause License"),
    ("BSD ZERO CLAUSE LICENSE", "BSD Zero Clause License"),
];

const DEED_HOST: &str = "CREATIVECOMMONS.ORG/";

/// Map a raw source label onto a registered legal tool.
///
/// Input: "CC-BY-ND-NC", "cc by-sa 3.0", "https://creativecommons.org/licenses/by/4.0/"
/// Output: "CC BY-NC-ND 4.0", "CC BY-SA 3.0", "CC BY 4.0"
pub fn normalize_label(raw: &str) -> Option<&'static LegalTool> {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    if collapsed.is_empty() {
        return None;
    }

    if let Some((_, id)) = ALIASES.iter().find(|(alias, _)| *alias == collapsed) {
        return tools::lookup(id);
    }

    if let Some(pos) = collapsed.find(DEED_HOST) {
        return from_deed_path(&collapsed[pos + DEED_HOST.len()..]);
    }

    let rest = collapsed
        .strip_prefix("CC")
        .filter(|rest| rest.starts_with([' ', '-', '_']))?;
    let tokens: Vec<&str> = rest
        .split([' ', '-', '_'])
        .filter(|t| !t.is_empty())
        .collect();
    from_tokens(&tokens)
}

/// Canonical identifier for a raw label, or `"Unknown"`.
pub fn canonical_label(raw: &str) -> String {
    normalize_label(raw).map_or_else(|| UNKNOWN.to_string(), |t| t.identifier.clone())
}

fn from_deed_path(path: &str) -> Option<&'static LegalTool> {
    let parts: Vec<&str> = path
        .split(['/', '?', '#'])
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        ["LICENSES", "PUBLICDOMAIN"] => tools::lookup("CC PUBLICDOMAIN 1.0"),
        ["LICENSES", unit, version, ..] => {
            let mut tokens: Vec<&str> = unit.split('-').collect();
            tokens.push(*version);
            from_tokens(&tokens)
        }
        ["PUBLICDOMAIN", "ZERO", "1.0", ..] => tools::lookup("CC0 1.0"),
        ["PUBLICDOMAIN", "MARK", "1.0", ..] => tools::lookup("Public Domain Mark 1.0"),
        _ => None,
    }
}

fn from_tokens(tokens: &[&str]) -> Option<&'static LegalTool> {
    let (elements, version) = match tokens.iter().position(|t| is_version(t)) {
        Some(i) => {
            // Anything after the version is a jurisdiction port ("3.0 DE").
            if !tokens[i + 1..].iter().all(|t| is_jurisdiction(t)) {
                return None;
            }
            (&tokens[..i], Some(tokens[i]))
        }
        None => (tokens, None),
    };
    if elements.is_empty() {
        return None;
    }

    if elements.contains(&"BY") {
        let unit = by_unit(elements)?;
        let version = version.unwrap_or(LATEST_CC_VERSION);
        tools::lookup(&format!("CC {unit} {version}"))
    } else {
        let version = version?;
        tools::lookup(&format!("CC {} {version}", elements.join("-")))
    }
}

/// Re-order BY-family elements into canonical `BY[-NC][-SA|-ND]` form.
fn by_unit(elements: &[&str]) -> Option<String> {
    let (mut by, mut nc, mut sa, mut nd) = (0, 0, 0, 0);
    for element in elements {
        match *element {
            "BY" => by += 1,
            "NC" => nc += 1,
            "SA" => sa += 1,
            "ND" => nd += 1,
            _ => return None,
        }
    }
    if by > 1 || nc > 1 || sa > 1 || nd > 1 || (sa == 1 && nd == 1) {
        return None;
    }
    let mut unit = String::from("BY");
    if nc == 1 {
        unit.push_str("-NC");
    }
    if sa == 1 {
        unit.push_str("-SA");
    }
    if nd == 1 {
        unit.push_str("-ND");
    }
    Some(unit)
}

fn is_version(token: &str) -> bool {
    token.contains('.') && token.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn is_jurisdiction(token: &str) -> bool {
    (2..=3).contains(&token.len()) && token.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> String {
        canonical_label(raw)
    }

    #[test]
    fn exact_values() {
        assert_eq!(canon("CC BY 4.0"), "CC BY 4.0");
        assert_eq!(canon("CC BY-NC 4.0"), "CC BY-NC 4.0");
        assert_eq!(canon("CC-BY-ND-NC"), "CC BY-NC-ND 4.0");
        assert_eq!(canon("CC-BY-SA-4.0"), "CC BY-SA 4.0");
        assert_eq!(canon("CC BY-NC-SA 2.0"), "CC BY-NC-SA 2.0");
        assert_eq!(canon("CC0-1.0"), "CC0 1.0");
        assert_eq!(canon("MIT-0"), "MIT No Attribution");
        assert_eq!(canon("0BSD"), "BSD Zero Clause License");
        assert_eq!(canon("Unlicense"), "Unlicense");
    }

    #[test]
    fn retired_element_order_collapses() {
        assert_eq!(canon("CC BY-ND-NC 1.0"), "CC BY-NC-ND 1.0");
        assert_eq!(canon("CC BY-SA-NC 3.0"), "CC BY-NC-SA 3.0");
        assert_eq!(canon("CC ND-BY"), "CC BY-ND 4.0");
    }

    #[test]
    fn retired_units() {
        assert_eq!(canon("CC SAMPLING+ 1.0"), "CC SAMPLING+ 1.0");
        assert_eq!(canon("CC NC-SAMPLING+ 1.0"), "CC NC-SAMPLING+ 1.0");
        assert_eq!(canon("CC ND-NC 1.0"), "CC ND-NC 1.0");
        assert_eq!(canon("CC DEVNATIONS 2.0"), "CC DEVNATIONS 2.0");
        // Retired units have no default version.
        assert_eq!(canon("CC SAMPLING+"), UNKNOWN);
    }

    #[test]
    fn deed_urls() {
        assert_eq!(canon("https://creativecommons.org/licenses/by/4.0/"), "CC BY 4.0");
        assert_eq!(canon("creativecommons.org/licenses/by-nc-sa/3.0/de/"), "CC BY-NC-SA 3.0");
        assert_eq!(canon("http://creativecommons.org/publicdomain/zero/1.0/"), "CC0 1.0");
        assert_eq!(canon("creativecommons.org/publicdomain/mark/1.0"), "Public Domain Mark 1.0");
        assert_eq!(canon("creativecommons.org/about"), UNKNOWN);
        assert_eq!(canon("https://creativecommons.org/licenses/publicdomain/"), "CC PUBLICDOMAIN 1.0");
        assert_eq!(canon("CC PUBLICDOMAIN"), "CC PUBLICDOMAIN 1.0");
    }

    #[test]
    fn every_deed_url_maps_back_to_its_tool() {
        for tool in tools::creative_commons_tools() {
            let url = tool.deed_url().unwrap();
            assert_eq!(canon(&url), tool.identifier, "{url}");
        }
    }

    #[test]
    fn jurisdiction_ports_map_to_unported() {
        assert_eq!(canon("CC BY-SA 2.0 FR"), "CC BY-SA 2.0");
        assert_eq!(canon("CC BY 3.0 NOT A PORT"), UNKNOWN);
    }

    #[test]
    fn unmapped_labels() {
        assert_eq!(canon(""), UNKNOWN);
        assert_eq!(canon("   "), UNKNOWN);
        assert_eq!(canon("GPL-3.0"), UNKNOWN);
        assert_eq!(canon("CC BY-SA-ND 4.0"), UNKNOWN);
        assert_eq!(canon("CC BY 5.0"), UNKNOWN);
        assert_eq!(canon("CCBY"), UNKNOWN);
        assert_eq!(canon(UNKNOWN), UNKNOWN);
    }

    #[test]
    fn lowercase_normalised() {
        assert_eq!(canon("cc by-nc 4.0"), canon("CC BY-NC 4.0"));
        assert_eq!(canon("cc0"), "CC0 1.0");
    }

    #[test]
    fn whitespace_trimmed() {
        assert_eq!(canon("  CC   BY  4.0  "), "CC BY 4.0");
    }

    #[test]
    fn idempotent_on_every_identifier() {
        for id in tools::identifiers() {
            assert_eq!(canon(id), id, "canonical identifier {id:?} must map to itself");
        }
    }
}
