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

use std::error::Error;
use std::fmt::{self, Display};

/// Typed errors returned by index building operations.
#[derive(Debug)]
pub enum IndexError {
    /// Ingest was attempted after `finalize`.
    AlreadyFinalized,
    /// A single line exceeds the chunk capacity; the corpus cannot be packed.
    LineTooLong(usize),
    /// The tree id does not name a registered tree.
    UnknownTree(u32),
    /// Fallback for I/O and other textual errors.
    Other(String),
}

impl Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::AlreadyFinalized => write!(f, "index is finalized"),
            IndexError::LineTooLong(n) => write!(f, "line of {} bytes exceeds chunk size", n),
            IndexError::UnknownTree(t) => write!(f, "unknown tree id {}", t),
            IndexError::Other(s) => write!(f, "error: {}", s),
        }
    }
}

impl Error for IndexError {}

// Conversions from common error types for easier propagation in walkers.
impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Other(e.to_string())
    }
}

impl From<anyhow::Error> for IndexError {
    fn from(e: anyhow::Error) -> Self {
        IndexError::Other(e.to_string())
    }
}

impl From<git2::Error> for IndexError {
    fn from(e: git2::Error) -> Self {
        IndexError::Other(e.to_string())
    }
}
