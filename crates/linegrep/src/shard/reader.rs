use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use super::{HEADER_LEN, MAGIC, VERSION};
use crate::chunk::{Chunk, ChunkAllocator, ChunkFile};
use crate::content::ContentHandle;
use crate::index::CodeIndex;
use crate::types::{IndexedFile, Span, Tree};

/// Memory-map a dumped index and reconstitute a read-only `CodeIndex`.
/// Chunk payloads and suffix arrays stay in the mapping; only the manifest
/// is materialized.
pub(crate) fn read_index(path: &Path) -> Result<CodeIndex> {
    let file =
        File::open(path).with_context(|| format!("open index file {}", path.display()))?;
    let mmap = unsafe { Mmap::map(&file)? };
    if mmap.len() < HEADER_LEN {
        bail!("index file truncated: {} bytes", mmap.len());
    }
    let magic = u32::from_le_bytes(mmap[0..4].try_into().unwrap());
    if magic != MAGIC {
        bail!("not an index file (bad magic)");
    }
    let version = u32::from_le_bytes(mmap[4..8].try_into().unwrap());
    if version != VERSION {
        bail!("unsupported index version {} (want {})", version, VERSION);
    }
    let chunk_size = u32::from_le_bytes(mmap[8..12].try_into().unwrap());
    let n_trees = u32::from_le_bytes(mmap[12..16].try_into().unwrap()) as usize;
    let n_files = u32::from_le_bytes(mmap[16..20].try_into().unwrap()) as usize;
    let n_chunks = u32::from_le_bytes(mmap[20..24].try_into().unwrap()) as usize;
    let manifest_off = u64::from_le_bytes(mmap[24..32].try_into().unwrap()) as usize;
    let chunk_table_off = u64::from_le_bytes(mmap[32..40].try_into().unwrap()) as usize;

    let mut off = HEADER_LEN;
    let name = rd_str16(&mmap, &mut off).context("index name")?;

    let mut off = manifest_off;
    let mut trees: Vec<Tree> = Vec::with_capacity(n_trees);
    for i in 0..n_trees {
        let name = rd_str16(&mmap, &mut off)
            .with_context(|| format!("manifest corrupted reading tree {} name", i))?;
        let version = rd_str16(&mmap, &mut off)
            .with_context(|| format!("manifest corrupted reading tree {} version", i))?;
        let meta_len = rd_u32(&mmap, &mut off)? as usize;
        let metadata = if meta_len > 0 {
            let raw = rd_bytes(&mmap, &mut off, meta_len)
                .with_context(|| format!("manifest corrupted reading tree {} metadata", i))?;
            Some(serde_json::from_slice(raw).context("tree metadata is not valid JSON")?)
        } else {
            None
        };
        trees.push(Tree {
            name,
            version,
            metadata,
        });
    }

    let mut files: Vec<IndexedFile> = Vec::with_capacity(n_files);
    for i in 0..n_files {
        let tree = rd_u32(&mmap, &mut off)?;
        if tree as usize >= trees.len() {
            bail!("manifest corrupted: file {} references tree {}", i, tree);
        }
        let path = rd_str16(&mmap, &mut off)
            .with_context(|| format!("manifest corrupted reading file {} path", i))?;
        let n_spans = rd_u32(&mmap, &mut off)? as usize;
        let mut spans = Vec::with_capacity(n_spans);
        for _ in 0..n_spans {
            let chunk = rd_u32(&mmap, &mut off)?;
            let s_off = rd_u32(&mmap, &mut off)?;
            let len = rd_u32(&mmap, &mut off)?;
            if chunk as usize >= n_chunks {
                bail!("manifest corrupted: file {} references chunk {}", i, chunk);
            }
            spans.push(Span {
                chunk,
                off: s_off,
                len,
            });
        }
        files.push(IndexedFile {
            tree,
            path,
            no: i as u32,
            content: ContentHandle::from_spans(spans),
        });
    }

    let map = Arc::new(mmap);
    let mut off = chunk_table_off;
    let mut chunks: Vec<Chunk> = Vec::with_capacity(n_chunks);
    for i in 0..n_chunks {
        let data_off = rd_u64(&map, &mut off)? as usize;
        let sa_off = rd_u64(&map, &mut off)? as usize;
        let files_off = rd_u64(&map, &mut off)? as usize;
        let size = rd_u32(&map, &mut off)?;
        let n_recs = rd_u32(&map, &mut off)? as usize;
        let end = data_off
            .checked_add(size as usize)
            .filter(|&e| e <= map.len());
        if end.is_none() {
            bail!("chunk {} data out of bounds (off={}, size={})", i, data_off, size);
        }
        let sa_end = sa_off
            .checked_add(size as usize * 4)
            .filter(|&e| e <= map.len());
        if sa_end.is_none() {
            bail!("chunk {} suffix array out of bounds (off={})", i, sa_off);
        }
        let mut rec_off = files_off;
        let mut recs: Vec<ChunkFile> = Vec::with_capacity(n_recs);
        for r in 0..n_recs {
            let left = rd_u32(&map, &mut rec_off)
                .with_context(|| format!("chunk {} record {} truncated", i, r))?;
            let right = rd_u32(&map, &mut rec_off)?;
            let n = rd_u32(&map, &mut rec_off)? as usize;
            let mut ids = Vec::with_capacity(n);
            for _ in 0..n {
                let fid = rd_u32(&map, &mut rec_off)?;
                if fid as usize >= files.len() {
                    bail!("chunk {} record {} references file {}", i, r, fid);
                }
                ids.push(fid);
            }
            recs.push(ChunkFile {
                left,
                right,
                files: ids,
            });
        }
        chunks.push(Chunk::from_mapping(map.clone(), data_off, size, sa_off, recs));
    }

    Ok(CodeIndex::from_parts(
        name,
        trees,
        files,
        ChunkAllocator::from_mapped(chunk_size, chunks),
    ))
}

fn rd_bytes<'a>(buf: &'a [u8], off: &mut usize, n: usize) -> Result<&'a [u8]> {
    let end = off
        .checked_add(n)
        .filter(|&e| e <= buf.len())
        .with_context(|| format!("index file truncated at offset {}", off))?;
    let out = &buf[*off..end];
    *off = end;
    Ok(out)
}

fn rd_u32(buf: &[u8], off: &mut usize) -> Result<u32> {
    Ok(u32::from_le_bytes(rd_bytes(buf, off, 4)?.try_into().unwrap()))
}

fn rd_u64(buf: &[u8], off: &mut usize) -> Result<u64> {
    Ok(u64::from_le_bytes(rd_bytes(buf, off, 8)?.try_into().unwrap()))
}

fn rd_str16(buf: &[u8], off: &mut usize) -> Result<String> {
    let n = u16::from_le_bytes(rd_bytes(buf, off, 2)?.try_into().unwrap()) as usize;
    let raw = rd_bytes(buf, off, n)?;
    Ok(std::str::from_utf8(raw)
        .context("string is not valid UTF-8")?
        .to_string())
}
