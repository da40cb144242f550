// Copyright 2025 Linegrep Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use linegrep::{index_filesystem, index_repository, CodeIndex, RepoSpec};

/// A build config names the index and lists what to ingest: bare directory
/// roots and/or repositories with explicit revisions.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fs_paths: Vec<PathBuf>,
    #[serde(default)]
    pub repositories: Vec<RepoSpec>,
}

pub fn load_config(path: &Path) -> Result<BuildConfig> {
    let raw = std::fs::read(path)
        .with_context(|| format!("read config {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parse config {}", path.display()))
}

/// Walk everything the config names into a fresh index and finalize it.
pub fn build_index(cfg: &BuildConfig) -> Result<CodeIndex> {
    let start = Instant::now();
    let mut idx = CodeIndex::new();
    if let Some(name) = &cfg.name {
        idx.set_name(name.clone());
    }
    for root in &cfg.fs_paths {
        info!(root = %root.display(), "walking filesystem root");
        index_filesystem(&mut idx, root)?;
    }
    for repo in &cfg.repositories {
        info!(repo = %repo.name, revisions = repo.revisions.len(), "walking repository");
        index_repository(&mut idx, repo)?;
    }
    idx.finalize();
    info!(
        trees = idx.trees().len(),
        files = idx.files().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "index built"
    );
    Ok(idx)
}
