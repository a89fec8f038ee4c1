// Resolves model and tokenizer files, locally or from the HuggingFace Hub

use crate::config::HubConfig;
use crate::error::{Result, TranslateError};
use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::{Repo, RepoType};
use std::path::{Path, PathBuf};

pub struct HubClient {
    api: Api,
}

impl HubClient {
    pub fn new(config: &HubConfig) -> Result<Self> {
        let mut builder = ApiBuilder::new()
            .with_progress(false)
            .with_token(config.token.clone());
        if let Some(dir) = &config.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder
            .build()
            .map_err(|e| TranslateError::HfHub(format!("Failed to create API: {}", e)))?;
        Ok(Self { api })
    }

    /// Fetch `filename` from `repo`. An existing local file path is used as
    /// is, and a `repo` naming a local directory is read without the hub.
    pub fn fetch(&self, repo: &str, revision: Option<&str>, filename: &str) -> Result<PathBuf> {
        // Bare names like "config.json" always refer to the repo
        let local = Path::new(filename);
        let is_path = local.parent().is_some_and(|p| !p.as_os_str().is_empty());
        if is_path && local.is_file() {
            return Ok(local.to_path_buf());
        }

        let dir = Path::new(repo);
        if dir.is_dir() {
            let path = dir.join(filename);
            if path.is_file() {
                return Ok(path);
            }
            return Err(TranslateError::HfHub(format!(
                "{} not found in {}",
                filename,
                dir.display()
            )));
        }

        tracing::debug!("Downloading {} from {}", filename, repo);
        let repo = match revision {
            Some(rev) => Repo::with_revision(repo.to_string(), RepoType::Model, rev.to_string()),
            None => Repo::model(repo.to_string()),
        };
        let path = self
            .api
            .repo(repo)
            .get(filename)
            .map_err(|e| TranslateError::HfHub(format!("Failed to download {}: {}", filename, e)))?;
        tracing::debug!("{} available at {:?}", filename, path);
        Ok(path)
    }

    /// First of `filenames` that resolves
    pub fn fetch_any(
        &self,
        repo: &str,
        revision: Option<&str>,
        filenames: &[&str],
    ) -> Result<PathBuf> {
        let mut last_error = None;
        for filename in filenames {
            match self.fetch(repo, revision, filename) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    tracing::debug!("{} not available in {}: {}", filename, repo, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            TranslateError::HfHub(format!("no candidate files given for {}", repo))
        }))
    }
}
