//! Coordinate-format sparse containers
//!
//! A [`Coo`] holds an edge set as three parallel arrays: row labels `x`,
//! column labels `y`, and optional weights. It is built once, in parallel,
//! from a text or binary input (or by expanding a CSR) and is read-only
//! afterwards.
//!
//! Entry order is part of the contract: entries appear in ascending byte
//! offset of the record that produced them, with a mirrored entry (when
//! symmetrizing) immediately after its original. No sorting or
//! de-duplication is performed.

mod binary;
mod text;
mod write;

pub(crate) use text::read_weight;

use std::path::Path;

use gmio_core::{FileKind, Flags, GmioError, Label, Weight};

use crate::csr::Csr;
use crate::error::Result;
use crate::file_map::{try_zeroed_vec, FileMap};

/// Sparse matrix / edge set in coordinate form
///
/// Type parameters pick the storage widths: `L` for vertex labels, `O` for
/// the edge count, `W` for weights. The structural [`Flags`] given at
/// construction decide symmetrization, triangle filtering, self-loop
/// removal, and whether weights are carried.
#[derive(Debug, Clone, PartialEq)]
pub struct Coo<L = u32, O = u64, W = f32> {
    nrows: L,
    ncols: L,
    n: L,
    m: O,
    x: Vec<L>,
    y: Vec<L>,
    w: Option<Vec<W>>,
    flags: Flags,
}

/// Arrays and sizes produced by one of the readers
#[derive(Debug)]
pub(crate) struct Parts<L, W> {
    pub nrows: L,
    pub ncols: L,
    pub n: L,
    pub x: Vec<L>,
    pub y: Vec<L>,
    pub w: Option<Vec<W>>,
}

impl<L: Label, O: Label, W: Weight> Coo<L, O, W> {
    /// Load from a file, detecting its kind from magic bytes and extension
    pub fn from_file<P: AsRef<Path>>(path: P, flags: Flags) -> Result<Self> {
        let f = FileMap::open(path)?;
        Self::read(f, None, flags)
    }

    /// Load from a file of a known kind
    pub fn from_file_as<P: AsRef<Path>>(path: P, kind: FileKind, flags: Flags) -> Result<Self> {
        let f = FileMap::open(path)?;
        Self::read(f, Some(kind), flags)
    }

    fn read(mut f: FileMap, kind: Option<FileKind>, flags: Flags) -> Result<Self> {
        let kind = match kind {
            Some(k) => k,
            None => f.guess_kind()?,
        };
        let workers = rayon::current_num_threads();
        let parts = match kind {
            FileKind::EdgeList => text::read_edge_list::<L, W>(f.bytes(), flags, workers)?,
            FileKind::MatrixMarket => {
                text::read_matrix_market::<L, O, W>(f.bytes(), flags, workers)?
            }
            FileKind::CooBinary => binary::read::<L, O, W>(&mut f, flags)?,
            FileKind::CsrBinary | FileKind::AdjacencyGraph => {
                let csr = Csr::<L, O, W>::read_from_map(&mut f, kind, flags.weighted)?;
                return Self::from_csr(&csr, flags);
            }
            FileKind::DiGraphBinary | FileKind::TensorBinary => {
                return Err(GmioError::UnsupportedBinary.into());
            }
        };
        Ok(Self::assemble(parts, flags))
    }

    /// Build from caller-supplied arrays
    ///
    /// The arrays are taken as already filtered; the flags only record how
    /// they were produced. Lengths must agree, and weights must be present
    /// exactly when the flags say so.
    pub fn from_parts(
        nrows: L,
        ncols: L,
        x: Vec<L>,
        y: Vec<L>,
        w: Option<Vec<W>>,
        flags: Flags,
    ) -> Result<Self> {
        if x.len() != y.len() {
            return Err(GmioError::PayloadLength.into());
        }
        match &w {
            Some(w) if !flags.weighted || w.len() != x.len() => {
                return Err(GmioError::PayloadLength.into());
            }
            None if flags.weighted => return Err(GmioError::PayloadLength.into()),
            _ => {}
        }
        Ok(Self::assemble(
            Parts {
                nrows,
                ncols,
                n: nrows.max(ncols),
                x,
                y,
                w,
            },
            flags,
        ))
    }

    /// Expand a CSR into coordinate form
    ///
    /// Under `symmetrize` without `upper_triangle_only`, every edge is
    /// written together with its mirror and the edge count doubles.
    /// Triangle extraction and self-loop removal from a CSR are not
    /// implemented and fail cleanly.
    pub fn from_csr(csr: &Csr<L, O, W>, flags: Flags) -> Result<Self> {
        if flags.upper_triangle_only && !flags.symmetrize {
            return Err(GmioError::TriangleFromCsr.into());
        }
        if flags.drop_self_loops {
            return Err(GmioError::SelfLoopsFromCsr.into());
        }

        let n = csr.n().to_usize();
        let doubled = flags.symmetrize && !flags.upper_triangle_only;
        let per_edge = if doubled { 2 } else { 1 };
        let m = csr.m().to_usize() * per_edge;
        let carry_w = flags.weighted && csr.weights().is_some();

        let mut x = try_zeroed_vec::<L>(m)?;
        let mut y = try_zeroed_vec::<L>(m)?;
        let mut w = if carry_w {
            Some(try_zeroed_vec::<W>(m)?)
        } else {
            None
        };

        let offsets = csr.offsets();
        let endpoints = csr.endpoints();
        let wsrc: &[W] = csr.weights().map(|v| &v[..]).unwrap_or(&[]);

        // One task per ~10k vertices; work stealing over the tasks keeps
        // skewed degree distributions balanced.
        const GRAIN: usize = 10_240;

        struct Task<'t, L, W> {
            v0: usize,
            v1: usize,
            x: &'t mut [L],
            y: &'t mut [L],
            w: Option<&'t mut [W]>,
        }

        let mut tasks: Vec<Task<'_, L, W>> = Vec::new();
        {
            let mut xs: &mut [L] = &mut x;
            let mut ys: &mut [L] = &mut y;
            let mut ws: Option<&mut [W]> = w.as_deref_mut();
            let mut v0 = 0;
            while v0 < n {
                let v1 = (v0 + GRAIN).min(n);
                let span =
                    (offsets[v1].to_usize() - offsets[v0].to_usize()) * per_edge;
                let (xa, xb) = xs.split_at_mut(span);
                xs = xb;
                let (ya, yb) = ys.split_at_mut(span);
                ys = yb;
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
                    x: xa,
                    y: ya,
                    w: wa,
                });
                v0 = v1;
            }
        }

        use rayon::prelude::*;
        tasks.into_par_iter().for_each(|mut t| {
            let mut out = 0usize;
            for v in t.v0..t.v1 {
                let vl = L::from_usize(v);
                for idx in offsets[v].to_usize()..offsets[v + 1].to_usize() {
                    let u = endpoints[idx];
                    if flags.symmetrize && flags.upper_triangle_only {
                        let (a, b) = if vl > u { (u, vl) } else { (vl, u) };
                        t.x[out] = a;
                        t.y[out] = b;
                    } else if doubled {
                        t.x[out] = vl;
                        t.y[out] = u;
                        if let Some(ws) = &mut t.w {
                            ws[out] = wsrc[idx];
                        }
                        out += 1;
                        t.x[out] = u;
                        t.y[out] = vl;
                    } else {
                        t.x[out] = vl;
                        t.y[out] = u;
                    }
                    if let Some(ws) = &mut t.w {
                        ws[out] = wsrc[idx];
                    }
                    out += 1;
                }
            }
        });

        Ok(Self {
            nrows: csr.n(),
            ncols: csr.n(),
            n: csr.n(),
            m: O::from_usize(m),
            x,
            y,
            w,
            flags,
        })
    }

    fn assemble(parts: Parts<L, W>, flags: Flags) -> Self {
        let m = O::from_usize(parts.x.len());
        Self {
            nrows: parts.nrows,
            ncols: parts.ncols,
            n: parts.n,
            m,
            x: parts.x,
            y: parts.y,
            w: parts.w,
            flags,
        }
    }

    /// Persist as a binary snapshot
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        binary::save(self, path.as_ref())
    }

    /// Reload a binary snapshot written by [`Coo::save`]
    pub fn load<P: AsRef<Path>>(path: P, flags: Flags) -> Result<Self> {
        Self::from_file_as(path, FileKind::CooBinary, flags)
    }

    /// Emit as a plain `x y [w]` edge list
    pub fn write_edge_list<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write::write_edge_list(self, path.as_ref())
    }

    /// Emit as chunked CSV files `<base>.<k>.csv`
    ///
    /// Each file holds up to `edges_per_file` records under a fixed header;
    /// with `edge_ids` every record is prefixed with its global edge index.
    pub fn write_split_csv<P: AsRef<Path>>(
        &self,
        base: P,
        edges_per_file: usize,
        edge_ids: bool,
    ) -> Result<()> {
        write::write_split_csv(self, base.as_ref(), edges_per_file, edge_ids)
    }

    /// Number of row labels (`max(x) + 1`)
    pub fn nrows(&self) -> L {
        self.nrows
    }

    /// Number of column labels (`max(y) + 1`)
    pub fn ncols(&self) -> L {
        self.ncols
    }

    /// Single-axis label count, `max(nrows, ncols)`
    pub fn n(&self) -> L {
        self.n
    }

    /// Number of stored entries
    pub fn m(&self) -> O {
        self.m
    }

    /// Row labels, one per stored entry
    pub fn x(&self) -> &[L] {
        &self.x
    }

    /// Column labels, one per stored entry
    pub fn y(&self) -> &[L] {
        &self.y
    }

    /// Weights, present when constructed with `weighted`
    pub fn weights(&self) -> Option<&[W]> {
        self.w.as_deref()
    }

    /// The structural predicates this container was built under
    pub fn flags(&self) -> Flags {
        self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmio_core::ErrorCategory;

    fn plain_csr() -> Csr<u32, u64, f32> {
        // 0 -> {1, 2}, 1 -> {2}, 2 -> {}
        Csr::from_parts(vec![0u64, 2, 3, 3], vec![1u32, 2, 2], None).unwrap()
    }

    #[test]
    fn csr_expansion_preserves_order() {
        let coo = Coo::<u32, u64, f32>::from_csr(&plain_csr(), Flags::plain()).unwrap();
        assert_eq!(coo.x(), &[0, 0, 1]);
        assert_eq!(coo.y(), &[1, 2, 2]);
        assert_eq!(coo.n(), 3);
        assert_eq!(coo.m(), 3);
        assert!(coo.weights().is_none());
    }

    #[test]
    fn csr_expansion_doubles_when_symmetrizing() {
        let flags = Flags::plain().with_symmetrize(true);
        let coo = Coo::<u32, u64, f32>::from_csr(&plain_csr(), flags).unwrap();
        assert_eq!(coo.m(), 6);
        assert_eq!(coo.x(), &[0, 1, 0, 2, 1, 2]);
        assert_eq!(coo.y(), &[1, 0, 2, 0, 2, 1]);
    }

    #[test]
    fn csr_expansion_folds_into_upper_triangle() {
        let csr: Csr<u32, u64, f32> =
            Csr::from_parts(vec![0u64, 1, 2], vec![1u32, 0], None).unwrap();
        let flags = Flags::plain()
            .with_symmetrize(true)
            .with_upper_triangle_only(true);
        let coo = Coo::<u32, u64, f32>::from_csr(&csr, flags).unwrap();
        assert_eq!(coo.x(), &[0, 0]);
        assert_eq!(coo.y(), &[1, 1]);
    }

    #[test]
    fn csr_expansion_carries_weights() {
        let csr: Csr<u32, u64, f32> =
            Csr::from_parts(vec![0u64, 2, 2], vec![1u32, 0], Some(vec![0.5, 1.5])).unwrap();
        let flags = Flags::plain().with_symmetrize(true).with_weighted(true);
        let coo = Coo::<u32, u64, f32>::from_csr(&csr, flags).unwrap();
        assert_eq!(coo.weights().unwrap(), &[0.5, 0.5, 1.5, 1.5]);
    }

    #[test]
    fn unsupported_csr_conversions_fail_cleanly() {
        let csr = plain_csr();
        let err = Coo::<u32, u64, f32>::from_csr(
            &csr,
            Flags::plain().with_upper_triangle_only(true),
        )
        .unwrap_err();
        assert_eq!(err.core().map(|e| e.category()), Some(ErrorCategory::Unsupported));

        let err =
            Coo::<u32, u64, f32>::from_csr(&csr, Flags::plain().with_drop_self_loops(true))
                .unwrap_err();
        assert_eq!(err.core(), Some(GmioError::SelfLoopsFromCsr));
    }

    #[test]
    fn from_parts_validates_lengths() {
        let ok = Coo::<u32, u64, f32>::from_parts(
            3,
            3,
            vec![0, 1],
            vec![1, 2],
            None,
            Flags::plain(),
        )
        .unwrap();
        assert_eq!(ok.m(), 2);
        assert_eq!(ok.n(), 3);

        assert!(Coo::<u32, u64, f32>::from_parts(
            3,
            3,
            vec![0, 1],
            vec![1],
            None,
            Flags::plain()
        )
        .is_err());
        assert!(Coo::<u32, u64, f32>::from_parts(
            3,
            3,
            vec![0],
            vec![1],
            None,
            Flags::plain().with_weighted(true)
        )
        .is_err());
    }
}
