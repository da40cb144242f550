//! On-disk index format. A dump is a single little-endian file:
//!
//! ```text
//! header:   magic u32 ("LGRP"), version u32, chunk_size u32,
//!           n_trees u32, n_files u32, n_chunks u32,
//!           manifest_off u64, chunk_table_off u64, content_sha256 [u8; 32]
//! name:     u16 length + bytes
//! manifest: trees (name, version, optional json metadata),
//!           files (tree, path, content-handle spans)
//! table:    per chunk: data_off u64, sa_off u64, files_off u64,
//!           size u32, n_files u32
//! payloads: per chunk, 8-byte aligned: raw bytes, suffix array as u32
//!           entries, chunk-file records (left, right, n, file ids)
//! ```
//!
//! Load memory-maps the file and reads chunk payloads and suffix arrays in
//! place; only the manifest is materialized on the heap.

pub(crate) const MAGIC: u32 = u32::from_le_bytes(*b"LGRP");
pub(crate) const VERSION: u32 = 1;

pub(crate) const HEADER_LEN: usize = 24 + 16 + 32;

mod reader;
mod writer;

pub(crate) use reader::read_index;
pub(crate) use writer::write_index;
