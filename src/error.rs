//! Render pass error types

use thiserror::Error;

use crate::backend::traits::BackendError;

/// Errors raised while creating or running render passes
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{0} material is not assigned")]
    MissingMaterial(&'static str),
    #[error("material '{material}' needs pass {pass} but has {available} pass(es)")]
    MissingMaterialPass {
        material: String,
        pass: u32,
        available: usize,
    },
    #[error("invalid camera target size {width}x{height}")]
    InvalidTargetSize { width: u32, height: u32 },
    #[error("pass '{0}' executed before it was set up and configured")]
    NotConfigured(String),
    #[error("feature '{0}' was used before create()")]
    FeatureNotCreated(String),
    #[error("no material named '{0}'")]
    UnknownMaterial(String),
    #[error("unknown render pass event '{0}'")]
    UnknownPassEvent(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderError::MissingMaterial("outline");
        assert_eq!(err.to_string(), "outline material is not assigned");

        let err = RenderError::MissingMaterialPass {
            material: "Outline".to_string(),
            pass: 1,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "material 'Outline' needs pass 1 but has 1 pass(es)"
        );
    }

    #[test]
    fn test_backend_errors_convert() {
        let err: RenderError = BackendError::DeviceLost.into();
        assert!(matches!(err, RenderError::Backend(BackendError::DeviceLost)));
        assert_eq!(err.to_string(), "Device lost");
    }
}
