use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// The model never loaded, or failed to load at startup.
    #[error("Model not loaded or failed to load")]
    NotReady,

    /// The forward pass itself failed.
    #[error("Inference failed: {0}")]
    Runtime(String),

    /// The model produced a tensor this detector cannot decode.
    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),

    /// The detector emitted a class id missing from its own label table.
    #[error("Class id {0} has no entry in the label table")]
    UnknownClass(u32),
}

impl InferenceError {
    /// Collapse an error chain into a single-line runtime failure.
    pub fn runtime(err: &anyhow::Error) -> Self {
        InferenceError::Runtime(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        assert_eq!(
            InferenceError::NotReady.to_string(),
            "Model not loaded or failed to load"
        );
        assert_eq!(
            InferenceError::UnknownClass(91).to_string(),
            "Class id 91 has no entry in the label table"
        );
        assert_eq!(
            InferenceError::InvalidOutput("rank 2".to_string()).to_string(),
            "Unexpected model output: rank 2"
        );
    }

    #[test]
    fn test_runtime_flattens_context_chain() {
        let err = anyhow::anyhow!("shape mismatch").context("session run failed");
        let inference_err = InferenceError::runtime(&err);

        assert_eq!(
            inference_err,
            InferenceError::Runtime("session run failed: shape mismatch".to_string())
        );
        assert!(!inference_err.to_string().contains('\n'));
    }
}
