use quantify_core::RunPeriod;
use quantify_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{source_name} table '{table}' has no license summary")]
    MissingLicenseSummary { source_name: String, table: String },

    #[error("README for {period} has '{marker}' without a matching end marker")]
    Readme { period: RunPeriod, marker: String },
}
