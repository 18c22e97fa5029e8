// Service error types
// Configuration errors are fatal before any step runs; execution errors
// carry the identifier of the step that failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The named pipeline or its definition could not be resolved.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A step failed while the pipeline was executing.
    #[error("step '{step}' failed{}", .exit_code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
    Execution {
        step: String,
        exit_code: Option<i32>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pipeline definition: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ServiceError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Exit code the runner process should report for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceError::Execution { .. } => 1,
            _ => 2,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_display() {
        let err = ServiceError::Execution {
            step: "load".to_string(),
            exit_code: Some(3),
        };
        assert_eq!(format!("{}", err), "step 'load' failed (exit code 3)");

        let err = ServiceError::Execution {
            step: "load".to_string(),
            exit_code: None,
        };
        assert_eq!(format!("{}", err), "step 'load' failed");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ServiceError::configuration("missing").exit_code(), 2);
        let exec = ServiceError::Execution {
            step: "x".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(exec.exit_code(), 1);
    }
}
