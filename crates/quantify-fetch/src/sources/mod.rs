//! Concrete adapters and the name → adapter registry.

mod doaj;
mod gcs;
mod github;
mod wikipedia;

pub use doaj::DoajAdapter;
pub use gcs::GcsAdapter;
pub use github::{GithubAdapter, TOTAL_LABEL as GITHUB_TOTAL_LABEL};
pub use wikipedia::{DEFAULT_LANGUAGES as WIKIPEDIA_DEFAULT_LANGUAGES, WikipediaAdapter};

use crate::FetchError;
use crate::adapter::SourceAdapter;
use crate::config::FetchConfig;

/// Every source the workspace can fetch, in run order.
pub const SOURCES: &[&str] = &["doaj", "gcs", "github", "wikipedia"];

/// Build the adapter registered under `name`.
///
/// Fails with [`FetchError::MissingCredential`] before any network call when
/// the source cannot run with `config`.
pub fn build_adapter(name: &str, config: &FetchConfig) -> Result<Box<dyn SourceAdapter>, FetchError> {
    let adapter: Box<dyn SourceAdapter> = match name {
        "doaj" => Box::new(DoajAdapter::new(config)),
        "gcs" => Box::new(GcsAdapter::new(config)?),
        "github" => Box::new(GithubAdapter::new(config)),
        "wikipedia" => Box::new(WikipediaAdapter::new(config)),
        other => return Err(FetchError::UnknownSource(other.to_string())),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_builds_every_listed_source() {
        let config = FetchConfig {
            gcs_developer_key: Some("key".into()),
            gcs_cx: Some("cx".into()),
            ..FetchConfig::default()
        };
        for name in SOURCES {
            let adapter = build_adapter(name, &config).unwrap();
            assert_eq!(adapter.name(), *name);
            assert!(!adapter.queries().is_empty());
        }
    }

    #[test]
    fn unknown_and_uncredentialed_sources_fail() {
        let config = FetchConfig::default();
        assert!(matches!(
            build_adapter("flickr", &config),
            Err(FetchError::UnknownSource(_))
        ));
        assert!(matches!(
            build_adapter("gcs", &config),
            Err(FetchError::MissingCredential { source_name: "gcs", .. })
        ));
    }
}
