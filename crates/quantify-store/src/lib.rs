//! Artifact storage: the hand-off between fetch, process and report.
//!
//! [`FsStore`] persists CSV tables and YAML manifests under a data directory,
//! [`MemoryStore`] keeps them in process, and [`DryRunStore`] layers an
//! in-memory overlay over any store so nothing reaches disk.

mod artifact;
mod error;
mod fs;
pub mod io;
pub mod layout;
mod memory;
mod overlay;

pub use artifact::{ArtifactStore, RawArtifact, SummaryEntry, SummaryManifest};
pub use error::StoreError;
pub use fs::FsStore;
pub use layout::{DataLayout, Phase};
pub use memory::MemoryStore;
pub use overlay::DryRunStore;
