use thiserror::Error;

use crate::ml::ModelType;

/// Errors surfaced by the diagnosis engine
#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown fault label: {0}")]
    UnknownFault(String),

    #[error("Unknown model type: {0}")]
    UnknownModelType(String),

    #[error("Insufficient training labels: {distinct} distinct, at least 2 required")]
    InsufficientLabels { distinct: usize },

    #[error("Model type not implemented: {0}")]
    UnsupportedModel(ModelType),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),
}

impl DiagnosisError {
    /// True for errors caused by caller input rather than model fitting
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DiagnosisError::Validation(_)
                | DiagnosisError::UnknownFault(_)
                | DiagnosisError::UnknownModelType(_)
        )
    }
}

impl From<anyhow::Error> for DiagnosisError {
    fn from(error: anyhow::Error) -> Self {
        DiagnosisError::Training(error.to_string())
    }
}

impl From<validator::ValidationErrors> for DiagnosisError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DiagnosisError::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiagnosisError>;
