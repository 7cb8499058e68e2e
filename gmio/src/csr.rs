//! Compressed sparse row container
//!
//! A [`Csr`] holds `offsets[0..n+1]` and `endpoints[0..m)` (plus optional
//! weights). It exists here as a loading target: adjacency-list `.graph`
//! text and binary CSR snapshots are read into it, and
//! [`Coo::from_csr`](crate::Coo::from_csr) expands it into coordinate form.
//!
//! The `.graph` loader indexes the newline positions of the body in
//! parallel first, which makes every vertex line independently addressable;
//! degrees, offsets, and endpoints then follow the same count, prefix-sum,
//! populate structure the edge-list parser uses.

use std::path::Path;

use log::warn;
use rayon::prelude::*;

use gmio_core::format::CSR_MAGIC;
use gmio_core::{Cursor, FileKind, GmioError, Label, Weight};

use crate::coo::read_weight;
use crate::error::Result;
use crate::file_map::{bytes_of, bytes_of_mut, try_zeroed_vec, FileMap};

/// Sparse adjacency structure in compressed sparse row form
#[derive(Debug, Clone, PartialEq)]
pub struct Csr<L = u32, O = u64, W = f32> {
    n: L,
    m: O,
    offsets: Vec<O>,
    endpoints: Vec<L>,
    weights: Option<Vec<W>>,
}

impl<L: Label, O: Label, W: Weight> Csr<L, O, W> {
    /// Build from caller-supplied arrays
    ///
    /// `offsets` must hold one entry per vertex plus the closing total,
    /// and that total must equal the endpoint count (and weight count,
    /// when weights are given).
    pub fn from_parts(
        offsets: Vec<O>,
        endpoints: Vec<L>,
        weights: Option<Vec<W>>,
    ) -> Result<Self> {
        if offsets.is_empty() {
            return Err(GmioError::MalformedHeader.into());
        }
        let n = offsets.len() - 1;
        let m = offsets[n].to_usize();
        if m != endpoints.len() {
            return Err(GmioError::PayloadLength.into());
        }
        if let Some(w) = &weights {
            if w.len() != m {
                return Err(GmioError::PayloadLength.into());
            }
        }
        Ok(Self {
            n: L::from_usize(n),
            m: O::from_usize(m),
            offsets,
            endpoints,
            weights,
        })
    }

    /// Load from a file, detecting its kind from magic bytes and extension
    pub fn from_file<P: AsRef<Path>>(path: P, weighted: bool) -> Result<Self> {
        let mut f = FileMap::open(path)?;
        let kind = f.guess_kind()?;
        Self::read_from_map(&mut f, kind, weighted)
    }

    /// Load from a file of a known kind
    pub fn from_file_as<P: AsRef<Path>>(path: P, kind: FileKind, weighted: bool) -> Result<Self> {
        let mut f = FileMap::open(path)?;
        Self::read_from_map(&mut f, kind, weighted)
    }

    pub(crate) fn read_from_map(f: &mut FileMap, kind: FileKind, weighted: bool) -> Result<Self> {
        match kind {
            FileKind::CsrBinary => Self::read_bin(f, weighted),
            FileKind::AdjacencyGraph => {
                Self::read_graph(f.bytes(), weighted, rayon::current_num_threads())
            }
            _ => Err(GmioError::UnsupportedBinary.into()),
        }
    }

    /// Reload a binary snapshot written by [`Csr::save`]
    pub fn load<P: AsRef<Path>>(path: P, weighted: bool) -> Result<Self> {
        Self::from_file_as(path, FileKind::CsrBinary, weighted)
    }

    /// Persist as a binary snapshot
    ///
    /// Same discipline as the COO snapshot: magic, width bytes, sizes,
    /// then raw payloads moved with the parallel block copy.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let n = self.n.to_usize();
        let m = self.m.to_usize();
        let lw = L::WIDTH as usize;
        let ow = O::WIDTH as usize;
        let mut size = CSR_MAGIC.len() + 2 + lw + ow + (n + 1) * ow + m * lw;
        if let Some(w) = &self.weights {
            size += w.len() * W::WIDTH as usize;
        }

        let mut f = FileMap::create(path, size)?;
        f.write_str(CSR_MAGIC)?;
        f.write_u8(L::WIDTH)?;
        f.write_u8(O::WIDTH)?;
        f.write_label(self.n)?;
        f.write_label(self.m)?;
        f.parallel_write(bytes_of(&self.offsets))?;
        f.parallel_write(bytes_of(&self.endpoints))?;
        if let Some(w) = &self.weights {
            f.parallel_write(bytes_of(w))?;
        }
        f.flush()
    }

    fn read_bin(f: &mut FileMap, weighted: bool) -> Result<Self> {
        f.read_magic(CSR_MAGIC)?;
        if f.read_u8()? != L::WIDTH {
            return Err(GmioError::LabelWidth.into());
        }
        if f.read_u8()? != O::WIDTH {
            return Err(GmioError::CountWidth.into());
        }
        let n = f.read_label::<L>()?;
        let m = f.read_label::<O>()?;
        let (nu, mu) = (n.to_usize(), m.to_usize());

        let mut expected = (nu + 1) * O::WIDTH as usize + mu * L::WIDTH as usize;
        if weighted {
            expected += mu * W::WIDTH as usize;
        }
        if f.remaining() != expected {
            return Err(GmioError::PayloadLength.into());
        }

        let mut offsets = try_zeroed_vec::<O>(nu + 1)?;
        f.parallel_read(bytes_of_mut(&mut offsets))?;
        let mut endpoints = try_zeroed_vec::<L>(mu)?;
        f.parallel_read(bytes_of_mut(&mut endpoints))?;
        let weights = if weighted {
            let mut w = try_zeroed_vec::<W>(mu)?;
            f.parallel_read(bytes_of_mut(&mut w))?;
            Some(w)
        } else {
            None
        };

        Ok(Self {
            n,
            m,
            offsets,
            endpoints,
            weights,
        })
    }

    /// Parse adjacency-list graph text
    ///
    /// Header line `n m [fmt]`, then one line of 1-based neighbors per
    /// vertex; a fmt flag with its last digit set means every neighbor is
    /// followed by an edge weight. Comment lines may precede the header.
    fn read_graph(data: &[u8], weighted: bool, workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let mut r = Cursor::new(data);
        r.move_to_first_int();
        if !r.good() {
            return Err(GmioError::MalformedHeader.into());
        }
        let n = r.read_unsigned::<L>().to_usize();
        r.move_to_next_int();
        if !r.good() {
            return Err(GmioError::MalformedHeader.into());
        }
        let m_hdr = r.read_unsigned::<O>().to_usize();
        let mut fmt = 0u32;
        if !r.at_end_of_line() {
            r.move_to_next_int();
            fmt = r.read_unsigned::<u32>();
        }
        let file_weighted = fmt % 10 == 1;
        if weighted && !file_weighted {
            return Err(GmioError::MalformedHeader.into());
        }
        r.move_to_eol();

        // The body starts at the header's newline; newline k there ends
        // the line of vertex k.
        let body = &data[r.pos()..];
        let newlines = newline_offsets(body, workers)?;
        if newlines.len() < n {
            return Err(GmioError::VertexCount.into());
        }

        let line = |v: usize| {
            let lo = newlines[v] + 1;
            let hi = if v + 1 < newlines.len() {
                newlines[v + 1]
            } else {
                body.len()
            };
            Cursor::with_range(body, lo, hi)
        };

        // Count tokens per vertex line to get the degrees. A token is a
        // maximal numeric run, so fractional weights count as one token.
        let degrees: Vec<usize> = (0..n)
            .into_par_iter()
            .map(|v| {
                let mut c = line(v);
                let mut tokens = 0usize;
                loop {
                    c.move_to_fp();
                    if !c.good() {
                        break;
                    }
                    tokens += 1;
                    c.move_to_non_fp();
                }
                if file_weighted {
                    tokens / 2
                } else {
                    tokens
                }
            })
            .collect();

        let mut offsets = try_zeroed_vec::<O>(n + 1)?;
        let mut total = 0usize;
        for (v, d) in degrees.iter().enumerate() {
            offsets[v] = O::from_usize(total);
            total += d;
        }
        offsets[n] = O::from_usize(total);
        if total != m_hdr && total != 2 * m_hdr {
            warn!("adjacency lists hold {total} endpoints but the header declared {m_hdr} edges");
        }

        let mut endpoints = try_zeroed_vec::<L>(total)?;
        let mut weights = if weighted {
            Some(try_zeroed_vec::<W>(total)?)
        } else {
            None
        };

        // Populate per vertex chunk, each chunk owning its slice
        const GRAIN: usize = 10_240;

        struct Task<'t, L, W> {
            v0: usize,
            v1: usize,
            ep: &'t mut [L],
            w: Option<&'t mut [W]>,
        }

        let mut tasks: Vec<Task<'_, L, W>> = Vec::new();
        {
            let mut eps: &mut [L] = &mut endpoints;
            let mut ws: Option<&mut [W]> = weights.as_deref_mut();
            let mut v0 = 0;
            while v0 < n {
                let v1 = (v0 + GRAIN).min(n);
                let span = offsets[v1].to_usize() - offsets[v0].to_usize();
                let (a, b) = eps.split_at_mut(span);
                eps = b;
                let wa = if let Some(rest) = ws.take() {
                    let (a, b) = rest.split_at_mut(span);
                    ws = Some(b);
                    Some(a)
                } else {
                    None
                };
                tasks.push(Task {
                    v0,
                    v1,
                    ep: a,
                    w: wa,
                });
                v0 = v1;
            }
        }

        tasks.into_par_iter().for_each(|mut t| {
            let mut out = 0usize;
            for v in t.v0..t.v1 {
                let deg = offsets[v + 1].to_usize() - offsets[v].to_usize();
                let mut c = line(v);
                for _ in 0..deg {
                    c.move_to_first_int();
                    if !c.good() {
                        break;
                    }
                    let u = c.read_unsigned::<L>();
                    // Vertex labels in the text are 1-based
                    t.ep[out] = L::from_usize(u.to_usize().wrapping_sub(1));
                    if let Some(ws) = &mut t.w {
                        match read_weight::<W>(&mut c) {
                            Some(wv) => ws[out] = wv,
                            None => break,
                        }
                    } else if file_weighted {
                        // Skip the weight column we were asked not to keep
                        c.move_to_fp();
                        c.move_to_non_fp();
                    }
                    out += 1;
                }
            }
        });

        Ok(Self {
            n: L::from_usize(n),
            m: O::from_usize(total),
            offsets,
            endpoints,
            weights,
        })
    }

    /// Vertex count
    pub fn n(&self) -> L {
        self.n
    }

    /// Edge count
    pub fn m(&self) -> O {
        self.m
    }

    /// Per-vertex offsets into the endpoint array, `n + 1` entries
    pub fn offsets(&self) -> &[O] {
        &self.offsets
    }

    /// Edge endpoints, `m` entries
    pub fn endpoints(&self) -> &[L] {
        &self.endpoints
    }

    /// Edge weights, when loaded with them
    pub fn weights(&self) -> Option<&Vec<W>> {
        self.weights.as_ref()
    }
}

/// Positions of every newline in `body`, found with a two-pass parallel
/// scan: each worker counts the newlines in its arithmetic share, a prefix
/// sum assigns disjoint output slices, and a second scan records positions.
fn newline_offsets(body: &[u8], workers: usize) -> Result<Vec<usize>> {
    let size = body.len();
    let ranges: Vec<(usize, usize)> = (0..workers)
        .map(|t| (t * size / workers, (t + 1) * size / workers))
        .collect();

    let counts: Vec<usize> = ranges
        .par_iter()
        .map(|&(a, b)| body[a..b].iter().filter(|&&c| c == b'\n').count())
        .collect();

    let total: usize = counts.iter().sum();
    let mut out = try_zeroed_vec::<usize>(total)?;
    {
        let mut rest: &mut [usize] = &mut out;
        let mut slices = Vec::with_capacity(workers);
        for &count in &counts {
            let (a, b) = rest.split_at_mut(count);
            slices.push(a);
            rest = b;
        }
        ranges
            .into_par_iter()
            .zip(slices)
            .for_each(|((a, b), slice)| {
                let mut i = 0;
                for (pos, &byte) in body[a..b].iter().enumerate() {
                    if byte == b'\n' {
                        slice[i] = a + pos;
                        i += 1;
                    }
                }
            });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_index_is_exact_for_any_worker_count() {
        let body = b"\n1 2\n\n3\nlast";
        let expect = [0usize, 4, 5, 7];
        for workers in [1, 2, 4, 64] {
            assert_eq!(newline_offsets(body, workers).unwrap(), expect);
        }
    }

    #[test]
    fn from_parts_validates() {
        assert!(Csr::<u32, u64, f32>::from_parts(vec![0, 2, 3], vec![1, 2, 0], None).is_ok());
        assert!(Csr::<u32, u64, f32>::from_parts(vec![0, 2, 3], vec![1, 2], None).is_err());
        assert!(Csr::<u32, u64, f32>::from_parts(vec![], vec![], None).is_err());
        assert!(
            Csr::<u32, u64, f32>::from_parts(vec![0, 1], vec![0], Some(vec![1.0, 2.0])).is_err()
        );
    }

    #[test]
    fn graph_text_parses_into_offsets_and_endpoints() {
        // 4 vertices, 1-based neighbor lists
        let text = b"4 4\n2 3\n1\n4\n\n";
        let csr = Csr::<u32, u64, f32>::read_graph(text, false, 2).unwrap();
        assert_eq!(csr.n(), 4);
        assert_eq!(csr.m(), 4);
        assert_eq!(csr.offsets(), &[0, 2, 3, 4, 4]);
        assert_eq!(csr.endpoints(), &[1, 2, 0, 3]);
        assert!(csr.weights().is_none());
    }

    #[test]
    fn weighted_graph_text() {
        let text = b"3 2 1\n2 0.5 3 1.5\n\n\n";
        let csr = Csr::<u32, u64, f32>::read_graph(text, true, 1).unwrap();
        assert_eq!(csr.offsets(), &[0, 2, 2, 2]);
        assert_eq!(csr.endpoints(), &[1, 2]);
        assert_eq!(csr.weights().unwrap(), &[0.5, 1.5]);
    }

    #[test]
    fn weighted_graph_text_can_drop_weights() {
        let text = b"2 2 1\n2 9 2 8\n1 7\n";
        let csr = Csr::<u32, u64, f32>::read_graph(text, false, 1).unwrap();
        assert_eq!(csr.offsets(), &[0, 2, 3]);
        assert_eq!(csr.endpoints(), &[1, 1, 0]);
        assert!(csr.weights().is_none());
    }

    #[test]
    fn graph_missing_lines_is_a_contradiction() {
        let text = b"5 2\n1 2\n";
        let err = Csr::<u32, u64, f32>::read_graph(text, false, 1).unwrap_err();
        assert_eq!(err.core(), Some(GmioError::VertexCount));
    }

    #[test]
    fn requesting_weights_from_unweighted_graph_fails() {
        let text = b"2 1\n2\n\n";
        assert!(Csr::<u32, u64, f32>::read_graph(text, true, 1).is_err());
    }

    #[test]
    fn binary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.bin");
        let csr = Csr::<u32, u64, f64>::from_parts(
            vec![0, 2, 2, 5],
            vec![1, 2, 0, 0, 1],
            Some(vec![0.5, 1.5, 2.5, 3.5, 4.5]),
        )
        .unwrap();
        csr.save(&path).unwrap();

        let back = Csr::<u32, u64, f64>::load(&path, true).unwrap();
        assert_eq!(back, csr);

        let err = Csr::<u64, u64, f64>::from_file(&path, true).unwrap_err();
        assert_eq!(err.core(), Some(GmioError::LabelWidth));
    }

    #[test]
    fn coo_construction_goes_through_csr_for_graph_files() {
        use crate::Coo;
        use gmio_core::Flags;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.graph");
        std::fs::write(&path, "3 3\n2 3\n3\n1\n").unwrap();

        let coo = Coo::<u32, u64, f32>::from_file(&path, Flags::plain()).unwrap();
        assert_eq!(coo.x(), &[0, 0, 1, 2]);
        assert_eq!(coo.y(), &[1, 2, 2, 0]);
        assert_eq!(coo.n(), 3);
    }
}
