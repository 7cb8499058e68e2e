//! Parallel text emission
//!
//! Writing mirrors the reader's two-pass structure: a size pass computes
//! the exact ASCII length of every worker's share of the records, a prefix
//! sum turns the per-worker sizes into disjoint regions of a pre-sized
//! memory-mapped output file, and the emit pass formats each record
//! directly into its region. No buffering, no seeking, no locks.

use std::io;
use std::path::Path;

use rayon::prelude::*;

use gmio_core::{Label, Weight};

use crate::error::{Error, Result};
use crate::file_map::FileMap;

use super::Coo;

/// Per-worker contiguous edge ranges by arithmetic split
fn edge_ranges(lo: usize, hi: usize, workers: usize) -> Vec<(usize, usize)> {
    let span = hi - lo;
    (0..workers)
        .map(|t| (lo + t * span / workers, lo + (t + 1) * span / workers))
        .collect()
}

/// Split `out` into one region per worker, sized by the size pass
fn split_regions<'a>(mut out: &'a mut [u8], sizes: &[usize]) -> Vec<&'a mut [u8]> {
    let mut regions = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let (head, tail) = out.split_at_mut(size);
        regions.push(head);
        out = tail;
    }
    regions
}

pub(crate) fn write_edge_list<L: Label, O: Label, W: Weight>(
    coo: &Coo<L, O, W>,
    path: &Path,
) -> Result<()> {
    let m = coo.m().to_usize();
    let workers = rayon::current_num_threads().max(1);
    let (x, y, w) = (coo.x(), coo.y(), coo.weights());

    let ranges = edge_ranges(0, m, workers);

    // Size pass: exact byte length of each worker's records
    let sizes: Vec<usize> = ranges
        .par_iter()
        .map(|&(a, b)| {
            let mut sz = 0;
            for e in a..b {
                sz += x[e].ascii_len() + 1 + y[e].ascii_len();
                if let Some(w) = w {
                    sz += 1 + w[e].ascii_len();
                }
                sz += 1;
            }
            sz
        })
        .collect();

    let total: usize = sizes.iter().sum();
    if total == 0 {
        std::fs::write(path, b"")?;
        return Ok(());
    }

    let mut f = FileMap::create(path, total)?;
    {
        let out = f.bytes_mut()?;
        let regions = split_regions(out, &sizes);

        // Emit pass: format records into the disjoint regions
        ranges
            .into_par_iter()
            .zip(regions)
            .for_each(|((a, b), buf)| {
                let mut pos = 0;
                for e in a..b {
                    pos += x[e].write_ascii(&mut buf[pos..]);
                    buf[pos] = b' ';
                    pos += 1;
                    pos += y[e].write_ascii(&mut buf[pos..]);
                    if let Some(w) = w {
                        buf[pos] = b' ';
                        pos += 1;
                        pos += w[e].write_ascii(&mut buf[pos..]);
                    }
                    buf[pos] = b'\n';
                    pos += 1;
                }
            });
    }
    f.flush()
}

pub(crate) fn write_split_csv<L: Label, O: Label, W: Weight>(
    coo: &Coo<L, O, W>,
    base: &Path,
    edges_per_file: usize,
    edge_ids: bool,
) -> Result<()> {
    if edges_per_file == 0 {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "edges_per_file must be positive",
        )));
    }
    let m = coo.m().to_usize();
    let workers = rayon::current_num_threads().max(1);
    let (x, y) = (coo.x(), coo.y());

    let header: &[u8] = if edge_ids {
        b"~id,~from,~to,~label\n"
    } else {
        b"~from,~to,~label\n"
    };
    // Per record: 'v' twice, the comma between endpoints, the ",con\n"
    // terminator, and with ids an 'e' prefix plus its comma.
    let fixed = 3 + 5 + if edge_ids { 2 } else { 0 };

    let files = m.div_ceil(edges_per_file).max(1);
    for file_idx in 0..files {
        let lo = file_idx * edges_per_file;
        let hi = (lo + edges_per_file).min(m);
        let name = format!("{}.{}.csv", base.display(), file_idx);

        let ranges = edge_ranges(lo, hi, workers);
        let sizes: Vec<usize> = ranges
            .par_iter()
            .map(|&(a, b)| {
                let mut sz = 0;
                for e in a..b {
                    sz += fixed + x[e].ascii_len() + y[e].ascii_len();
                    if edge_ids {
                        sz += e.ascii_len();
                    }
                }
                sz
            })
            .collect();

        let total: usize = sizes.iter().sum();
        let mut f = FileMap::create(&name, header.len() + total)?;
        f.write_bytes(header)?;
        {
            let out = &mut f.bytes_mut()?[header.len()..];
            let regions = split_regions(out, &sizes);
            ranges
                .into_par_iter()
                .zip(regions)
                .for_each(|((a, b), buf)| {
                    let mut pos = 0;
                    for e in a..b {
                        if edge_ids {
                            buf[pos] = b'e';
                            pos += 1;
                            pos += e.write_ascii(&mut buf[pos..]);
                            buf[pos] = b',';
                            pos += 1;
                        }
                        buf[pos] = b'v';
                        pos += 1;
                        pos += x[e].write_ascii(&mut buf[pos..]);
                        buf[pos] = b',';
                        pos += 1;
                        buf[pos] = b'v';
                        pos += 1;
                        pos += y[e].write_ascii(&mut buf[pos..]);
                        buf[pos..pos + 5].copy_from_slice(b",con\n");
                        pos += 5;
                    }
                });
        }
        f.flush()?;
    }
    Ok(())
}
