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

//! Version-control walker: indexes blob contents straight out of the object
//! database, one tree per `(name, revision)`. No checkout is performed.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{CodeIndex, IndexError, MAX_FILE_SIZE};

/// One repository to index, as it appears in the build config.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSpec {
    pub path: PathBuf,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub revisions: Vec<String>,
}

pub fn index_repository(idx: &mut CodeIndex, spec: &RepoSpec) -> Result<(), IndexError> {
    let repo = git2::Repository::open(&spec.path)?;
    for rev in &spec.revisions {
        debug!(repo = %spec.name, rev = %rev, "walking revision");
        let tree_id = idx.open_tree(&spec.name, spec.metadata.clone(), rev)?;
        let commit = repo.revparse_single(rev)?.peel_to_commit()?;
        let gtree = commit.tree()?;
        let mut walk_err: Option<IndexError> = None;
        gtree.walk(git2::TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() != Some(git2::ObjectType::Blob) {
                return git2::TreeWalkResult::Ok;
            }
            let name = match entry.name() {
                Some(n) => n,
                None => {
                    warn!(repo = %spec.name, "skipping blob with non-utf8 name");
                    return git2::TreeWalkResult::Ok;
                }
            };
            let obj = match entry.to_object(&repo) {
                Ok(o) => o,
                Err(e) => {
                    warn!(repo = %spec.name, path = %name, error = %e, "skipping unreadable blob");
                    return git2::TreeWalkResult::Ok;
                }
            };
            let blob = match obj.as_blob() {
                Some(b) => b,
                None => return git2::TreeWalkResult::Ok,
            };
            if blob.size() as u64 > MAX_FILE_SIZE {
                warn!(repo = %spec.name, path = %name, size = blob.size(), "skipping oversized blob");
                return git2::TreeWalkResult::Ok;
            }
            if blob.is_binary() {
                return git2::TreeWalkResult::Ok;
            }
            let path = format!("{}{}", dir, name);
            if let Err(e) = idx.index_file(tree_id, path, blob.content()) {
                walk_err = Some(e);
                return git2::TreeWalkResult::Abort;
            }
            git2::TreeWalkResult::Ok
        })?;
        if let Some(e) = walk_err {
            return Err(e);
        }
    }
    Ok(())
}
