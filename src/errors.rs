use crate::core::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the reading exporters.
///
/// Configuration errors are fatal for the export call that hit them: silently
/// defaulting to an arbitrary unit would corrupt every displayed magnitude.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no display unit is configured for meter type \"{type_name}\" and the organization has no \"Default\" fallback")]
    MissingDisplayUnit { type_name: String },
    #[error("no conversion factor covers meter type \"{type_name}\" in display unit \"{display_unit}\", and no \"Default\" row does either")]
    MissingConversionFactor {
        type_name: String,
        display_unit: String,
    },
    #[error("unknown reading interval \"{0}\" (expected \"Exact\", \"Month\" or \"Year\")")]
    UnknownInterval(String),
}
