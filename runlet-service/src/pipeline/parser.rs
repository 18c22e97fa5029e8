use crate::pipeline::models::Pipeline;
use crate::ServiceResult;

use std::fmt;
use std::fs;
use std::path::Path;

pub struct PipelineParser;

impl PipelineParser {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ServiceResult<Pipeline> {
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> ServiceResult<Pipeline> {
        let pipeline: Pipeline = serde_yaml::from_str(content)?;
        Ok(pipeline)
    }
}

/// Semantic error found while validating a parsed pipeline
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
    pub path: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation error at '{}': {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub struct PipelineValidator;

impl PipelineValidator {
    /// Semantic checks beyond YAML syntax: the definition must name itself,
    /// carry at least one step, and every step must have a unique name and
    /// a non-empty script.
    pub fn validate(pipeline: &Pipeline) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if pipeline.name.trim().is_empty() {
            errors.push(ValidationError::new("pipeline name is empty", "name"));
        }

        if pipeline.steps.is_empty() {
            errors.push(ValidationError::new(
                "pipeline has no steps",
                "steps",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for (index, step) in pipeline.steps.iter().enumerate() {
            let path = format!("steps[{}]", index);

            if step.name.trim().is_empty() {
                errors.push(ValidationError::new("step name is empty", &path));
            } else if !seen.insert(step.name.as_str()) {
                errors.push(ValidationError::new(
                    format!("duplicate step name '{}'", step.name),
                    &path,
                ));
            }

            if step.script().trim().is_empty() {
                errors.push(ValidationError::new("step has an empty script", &path));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
