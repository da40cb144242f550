use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use super::{HEADER_LEN, MAGIC, VERSION};
use crate::index::CodeIndex;

/// Serialize a finalized index to `path`. A partially written file is
/// removed on error so a bad dump is never mistaken for an index.
pub(crate) fn write_index(idx: &CodeIndex, path: &Path) -> Result<()> {
    match write_inner(idx, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = std::fs::remove_file(path);
            Err(e)
        }
    }
}

fn write_inner(idx: &CodeIndex, path: &Path) -> Result<()> {
    let start = Instant::now();
    let mut f = File::create(path)
        .with_context(|| format!("create index file {}", path.display()))?;

    // Header with placeholder offsets and hash; patched at the end.
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend(&MAGIC.to_le_bytes());
    header.extend(&VERSION.to_le_bytes());
    header.extend(&idx.alloc().chunk_size().to_le_bytes());
    header.extend(&(idx.trees().len() as u32).to_le_bytes());
    header.extend(&(idx.files().len() as u32).to_le_bytes());
    header.extend(&(idx.alloc().chunks().len() as u32).to_le_bytes());
    header.extend(&0u64.to_le_bytes()); // manifest_off
    header.extend(&0u64.to_le_bytes()); // chunk_table_off
    header.extend(&[0u8; 32]); // content sha256
    f.write_all(&header)?;
    write_str16(&mut f, idx.name())?;

    // Manifest: trees then files.
    let manifest_off = f.stream_position()?;
    let mut buf: Vec<u8> = Vec::new();
    for t in idx.trees() {
        push_str16(&mut buf, &t.name)?;
        push_str16(&mut buf, &t.version)?;
        match &t.metadata {
            Some(v) => {
                let b = serde_json::to_vec(v).context("encode tree metadata")?;
                buf.extend(&(b.len() as u32).to_le_bytes());
                buf.extend(&b);
            }
            None => buf.extend(&0u32.to_le_bytes()),
        }
    }
    for file in idx.files() {
        buf.extend(&file.tree.to_le_bytes());
        push_str16(&mut buf, &file.path)?;
        let spans = file.content.lines();
        buf.extend(&(spans.len() as u32).to_le_bytes());
        for s in spans {
            buf.extend(&s.chunk.to_le_bytes());
            buf.extend(&s.off.to_le_bytes());
            buf.extend(&s.len.to_le_bytes());
        }
    }
    f.write_all(&buf)?;

    // Chunk table placeholder, then the payloads it will point at.
    let chunk_table_off = f.stream_position()?;
    let chunks = idx.alloc().chunks();
    f.write_all(&vec![0u8; chunks.len() * 32])?;

    let mut hasher = Sha256::new();
    let mut entries: Vec<(u64, u64, u64, u32, u32)> = Vec::with_capacity(chunks.len());
    for c in chunks {
        let data_off = align8(&mut f)?;
        let bytes = c.bytes();
        f.write_all(bytes)?;
        hasher.update(bytes);

        let sa_off = align8(&mut f)?;
        let mut sa_buf: Vec<u8> = Vec::with_capacity(c.suffix_len() * 4);
        for i in 0..c.suffix_len() {
            sa_buf.extend(&c.suffix_at(i).to_le_bytes());
        }
        f.write_all(&sa_buf)?;

        let files_off = align8(&mut f)?;
        let mut rec_buf: Vec<u8> = Vec::new();
        for rec in c.files() {
            rec_buf.extend(&rec.left.to_le_bytes());
            rec_buf.extend(&rec.right.to_le_bytes());
            rec_buf.extend(&(rec.files.len() as u32).to_le_bytes());
            for fid in &rec.files {
                rec_buf.extend(&fid.to_le_bytes());
            }
        }
        f.write_all(&rec_buf)?;
        entries.push((data_off, sa_off, files_off, c.size(), c.files().len() as u32));
    }

    // Patch the chunk table and the header.
    f.seek(SeekFrom::Start(chunk_table_off))?;
    let mut table: Vec<u8> = Vec::with_capacity(entries.len() * 32);
    for (data_off, sa_off, files_off, size, n_files) in &entries {
        table.extend(&data_off.to_le_bytes());
        table.extend(&sa_off.to_le_bytes());
        table.extend(&files_off.to_le_bytes());
        table.extend(&size.to_le_bytes());
        table.extend(&n_files.to_le_bytes());
    }
    f.write_all(&table)?;

    f.seek(SeekFrom::Start(24))?;
    f.write_all(&manifest_off.to_le_bytes())?;
    f.write_all(&chunk_table_off.to_le_bytes())?;
    let hash = hasher.finalize();
    f.write_all(&hash[..])?;
    f.flush()?;

    debug!(
        path = %path.display(),
        chunks = chunks.len(),
        files = idx.files().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "index dumped"
    );
    Ok(())
}

fn align8(f: &mut File) -> Result<u64> {
    let pos = f.stream_position()?;
    let pad = (8 - (pos % 8) as usize) % 8;
    if pad > 0 {
        f.write_all(&[0u8; 8][..pad])?;
    }
    Ok(pos + pad as u64)
}

fn write_str16(f: &mut File, s: &str) -> Result<()> {
    let mut buf = Vec::with_capacity(2 + s.len());
    push_str16(&mut buf, s)?;
    f.write_all(&buf)?;
    Ok(())
}

fn push_str16(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    let b = s.as_bytes();
    anyhow::ensure!(b.len() <= u16::MAX as usize, "string too long: {} bytes", b.len());
    buf.extend(&(b.len() as u16).to_le_bytes());
    buf.extend(b);
    Ok(())
}
