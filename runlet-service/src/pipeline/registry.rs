// Pipeline Registry
// Resolves pipeline identifiers to definition files on disk

use crate::pipeline::models::Pipeline;
use crate::pipeline::parser::PipelineParser;
use crate::{ServiceError, ServiceResult};

use crate::config::PIPELINES_DIR_ENV;

use std::path::{Path, PathBuf};

/// Maps pipeline identifiers to definition files under a single directory.
/// An identifier may also be a direct path to a YAML file.
pub struct PipelineRegistry {
    root: PathBuf,
}

impl PipelineRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Registry rooted at `$RUNLET_PIPELINES_DIR`, falling back to
    /// `~/.runlet/pipelines`.
    pub fn from_env_or_default() -> ServiceResult<Self> {
        if let Ok(dir) = std::env::var(PIPELINES_DIR_ENV) {
            return Ok(Self::new(dir));
        }

        let root = dirs::home_dir()
            .map(|home| home.join(".runlet").join("pipelines"))
            .ok_or_else(|| {
                ServiceError::configuration("could not determine home directory")
            })?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an identifier to a definition file. Tries the identifier as a
    /// direct path first, then `<root>/<id>.yaml` and `<root>/<id>.yml`.
    pub fn resolve(&self, id: &str) -> ServiceResult<PathBuf> {
        let direct = Path::new(id);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        for ext in ["yaml", "yml"] {
            let candidate = self.root.join(format!("{}.{}", id, ext));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(ServiceError::configuration(format!(
            "pipeline '{}' not found in {}",
            id,
            self.root.display()
        )))
    }

    /// Resolve and parse a pipeline definition.
    pub fn load(&self, id: &str) -> ServiceResult<Pipeline> {
        let path = self.resolve(id)?;
        PipelineParser::from_file(path)
    }

    /// List identifiers of every definition in the registry directory.
    pub fn list(&self) -> ServiceResult<Vec<String>> {
        let mut ids = Vec::new();

        if !self.root.is_dir() {
            return Ok(ids);
        }

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false);
            if path.is_file() && is_yaml {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}
