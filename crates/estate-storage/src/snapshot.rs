//! JSON-lines listing snapshots, zstd-compressed when the path ends in `.zst`.

use estate_core::{EstateError, Listing, NewListing, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

fn io_err(e: std::io::Error) -> EstateError {
    EstateError::Internal(e.to_string())
}

fn is_compressed(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("zst")
}

/// Reads every listing in the snapshot. A line may hold a full listing or a
/// new-listing payload; lines that decode as neither are skipped.
pub fn read_snapshot(path: &Path) -> Result<Vec<Listing>> {
    let fh = File::open(path).map_err(io_err)?;
    let mut text = String::new();
    if is_compressed(path) {
        let mut d = zstd::Decoder::new(fh).map_err(io_err)?;
        d.read_to_string(&mut text).map_err(io_err)?;
        Ok(parse_lines(text.lines()))
    } else {
        let lines: Vec<String> = BufReader::new(fh)
            .lines()
            .collect::<std::io::Result<_>>()
            .map_err(io_err)?;
        Ok(parse_lines(lines.iter().map(String::as_str)))
    }
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Listing> {
    let mut out = Vec::new();
    for (n, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(l) = serde_json::from_str::<Listing>(line) {
            out.push(l);
            continue;
        }
        match serde_json::from_str::<NewListing>(line)
            .map_err(|e| EstateError::Invalid(e.to_string()))
            .and_then(Listing::new)
        {
            Ok(l) => out.push(l),
            Err(e) => tracing::warn!(line = n + 1, error = %e, "snapshot line skipped"),
        }
    }
    out
}

/// Writes `listings` one per line; returns how many were written.
pub fn write_snapshot(path: &Path, listings: &[Listing]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let file = File::create(path).map_err(io_err)?;
    if is_compressed(path) {
        let mut z = zstd::Encoder::new(file, 3).map_err(io_err)?;
        write_lines(&mut z, listings)?;
        z.finish().map_err(io_err)?;
    } else {
        let mut w = BufWriter::new(file);
        write_lines(&mut w, listings)?;
        w.flush().map_err(io_err)?;
    }
    Ok(listings.len())
}

fn write_lines(out: &mut impl Write, listings: &[Listing]) -> Result<()> {
    for l in listings {
        let line = serde_json::to_string(l).map_err(|e| EstateError::Internal(e.to_string()))?;
        out.write_all(line.as_bytes()).map_err(io_err)?;
        out.write_all(b"\n").map_err(io_err)?;
    }
    Ok(())
}
