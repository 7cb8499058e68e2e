//! Two-pass parallel parsing of textual edge lists and MatrixMarket files
//!
//! The byte region is split into one contiguous range per worker. Range
//! boundaries are moved off of records: every worker (except the first)
//! advances its start past the next newline to the next digit, and every
//! worker extends its end the same way, so each record is scanned by
//! exactly one worker regardless of where the arithmetic split lands.
//!
//! Parsing is then two passes over the same ranges with the same record
//! grammar: pass one counts the entries each worker will store, an
//! exclusive prefix sum turns the counts into disjoint output slices, and
//! pass two re-scans the range writing into its slice. Because both passes
//! run the identical grammar and filter, the counts are exact and no
//! reallocation or synchronization happens inside a pass.

use log::{info, warn};
use rayon::prelude::*;

use gmio_core::format::{self, MmField, MmSymmetry};
use gmio_core::{Cursor, Emit, Flags, GmioError, Label, Weight, WeightKind};

use crate::error::Result;
use crate::file_map::try_zeroed_vec;

use super::Parts;

/// Where one record's entries go: counted in pass one, stored in pass two
trait Sink<L, W> {
    fn put(&mut self, x: L, y: L, w: W);
}

struct CountSink {
    count: usize,
}

impl<L, W> Sink<L, W> for CountSink {
    fn put(&mut self, _x: L, _y: L, _w: W) {
        self.count += 1;
    }
}

struct WriteSink<'a, L, W> {
    x: &'a mut [L],
    y: &'a mut [L],
    w: Option<&'a mut [W]>,
    pos: usize,
    max_row: L,
    max_col: L,
}

impl<L: Label, W: Weight> Sink<L, W> for WriteSink<'_, L, W> {
    fn put(&mut self, x: L, y: L, w: W) {
        self.x[self.pos] = x;
        self.y[self.pos] = y;
        if let Some(ws) = &mut self.w {
            ws[self.pos] = w;
        }
        self.pos += 1;
        if x > self.max_row {
            self.max_row = x;
        }
        if y > self.max_col {
            self.max_col = y;
        }
    }
}

/// Decode the weight column per the weight type's arithmetic class
///
/// Returns `None` when the region ends before a weight starts; the record
/// is then truncated and must not be emitted.
pub(crate) fn read_weight<W: Weight>(r: &mut Cursor<'_>) -> Option<W> {
    match W::KIND {
        WeightKind::Float => {
            r.move_to_fp();
            if !r.good() {
                return None;
            }
            let v = r.read_float();
            r.move_to_non_fp();
            Some(W::from_f64(v))
        }
        WeightKind::SignedInt => {
            r.move_to_next_signed_int();
            if !r.good() {
                return None;
            }
            Some(W::from_i64(r.read_signed()))
        }
        WeightKind::UnsignedInt => {
            r.move_to_next_int();
            if !r.good() {
                return None;
            }
            Some(W::from_u64(r.read_unsigned::<u64>()))
        }
    }
}

/// Read one `x y [w]` record and advance to the start of the next
///
/// The cursor must be at the first digit of `x`. Returns `None` when the
/// record is cut off before `y` (or before a demanded weight); a final line
/// without a trailing newline still parses.
fn read_record<L: Label, W: Weight>(r: &mut Cursor<'_>, weighted: bool) -> Option<(L, L, W)> {
    let x = r.read_unsigned::<L>();
    r.move_to_next_int();
    if !r.good() {
        return None;
    }
    let y = r.read_unsigned::<L>();
    let w = if weighted {
        read_weight::<W>(r)?
    } else {
        W::default()
    };
    r.move_to_eol();
    r.move_to_next_int();
    Some((x, y, w))
}

/// Scan every record in the worker's range through the filter into a sink
fn scan_range<L: Label, W: Weight, S: Sink<L, W>>(start: Cursor<'_>, flags: Flags, sink: &mut S) {
    let mut r = start;
    while r.good() {
        let Some((x, y, w)) = read_record::<L, W>(&mut r, flags.weighted) else {
            break;
        };
        match flags.apply(x, y) {
            Emit::Drop => {}
            Emit::One(a, b) => sink.put(a, b, w),
            Emit::Two(a, b) => {
                sink.put(a, b, w);
                sink.put(b, a, w);
            }
        }
    }
}

/// The range worker `tid` of `workers` scans, boundaries moved off records
fn worker_cursor(data: &[u8], tid: usize, workers: usize) -> Cursor<'_> {
    let size = data.len();
    let mut rs = Cursor::with_start(data, tid * size / workers);
    let mut re = Cursor::with_start(data, (tid + 1) * size / workers);
    re.move_to_eol();
    re.move_to_next_int();
    if tid == 0 {
        rs.move_to_first_int();
    } else {
        rs.move_to_eol();
        rs.move_to_next_int();
    }
    rs.set_end_min(&re);
    rs
}

/// Parse a plain edge-list region into COO arrays
pub(crate) fn read_edge_list<L: Label, W: Weight>(
    data: &[u8],
    flags: Flags,
    workers: usize,
) -> Result<Parts<L, W>> {
    let workers = workers.max(1);
    let cursors: Vec<Cursor<'_>> = (0..workers)
        .map(|tid| worker_cursor(data, tid, workers))
        .collect();

    // Pass 1: count the entries each worker will store
    let counts: Vec<usize> = cursors
        .par_iter()
        .map(|c| {
            let mut sink = CountSink { count: 0 };
            scan_range::<L, W, _>(*c, flags, &mut sink);
            sink.count
        })
        .collect();

    let m: usize = counts.iter().sum();
    let mut x = try_zeroed_vec::<L>(m)?;
    let mut y = try_zeroed_vec::<L>(m)?;
    let mut w = if flags.weighted {
        Some(try_zeroed_vec::<W>(m)?)
    } else {
        None
    };

    // The exclusive prefix sum over the counts is realized as disjoint
    // slices: worker t writes [s_t, s_t + counts[t]).
    struct Task<'t, 'd, L, W> {
        cursor: Cursor<'d>,
        x: &'t mut [L],
        y: &'t mut [L],
        w: Option<&'t mut [W]>,
    }

    let mut tasks: Vec<Task<'_, '_, L, W>> = Vec::with_capacity(workers);
    {
        let mut xs: &mut [L] = &mut x;
        let mut ys: &mut [L] = &mut y;
        let mut ws: Option<&mut [W]> = w.as_deref_mut();
        for (tid, count) in counts.iter().enumerate() {
            let (xa, xb) = xs.split_at_mut(*count);
            xs = xb;
            let (ya, yb) = ys.split_at_mut(*count);
            ys = yb;
            let wa = if let Some(rest) = ws.take() {
                let (a, b) = rest.split_at_mut(*count);
                ws = Some(b);
                Some(a)
            } else {
                None
            };
            tasks.push(Task {
                cursor: cursors[tid],
                x: xa,
                y: ya,
                w: wa,
            });
        }
    }

    // Pass 2: re-scan with the same grammar, each worker filling its slice
    let maxes: Vec<(L, L)> = tasks
        .into_par_iter()
        .map(|t| {
            let mut sink = WriteSink {
                x: t.x,
                y: t.y,
                w: t.w,
                pos: 0,
                max_row: L::ZERO,
                max_col: L::ZERO,
            };
            scan_range::<L, W, _>(t.cursor, flags, &mut sink);
            (sink.max_row, sink.max_col)
        })
        .collect();

    let (max_row, max_col) = maxes
        .into_iter()
        .fold((L::ZERO, L::ZERO), |(a, b), (c, d)| (a.max(c), b.max(d)));

    let (nrows, ncols) = if m == 0 {
        (L::ZERO, L::ZERO)
    } else {
        (
            L::from_usize(max_row.to_usize() + 1),
            L::from_usize(max_col.to_usize() + 1),
        )
    };
    Ok(Parts {
        nrows,
        ncols,
        n: nrows.max(ncols),
        x,
        y,
        w,
    })
}

/// Parse a MatrixMarket coordinate region
///
/// The banner and size line are consumed here, the body is the edge-list
/// pass above, and the declared sizes are checked against what the body
/// actually held. Labels stay 1-based as stored; the size line being
/// 1-based is absorbed by the `max + 1` label counts.
pub(crate) fn read_matrix_market<L: Label, O: Label, W: Weight>(
    data: &[u8],
    flags: Flags,
    workers: usize,
) -> Result<Parts<L, W>> {
    let mut r = Cursor::new(data);
    let pre = format::read_mm_preamble(&mut r)?;

    match pre.field {
        MmField::Complex => return Err(GmioError::UnsupportedMatrixMarket.into()),
        MmField::Pattern if flags.weighted => {
            return Err(GmioError::UnsupportedMatrixMarket.into())
        }
        _ => {}
    }
    if pre.field.has_values() && !flags.weighted {
        info!("matrix values present and skipped (unweighted read)");
    }
    if pre.symmetry == MmSymmetry::Symmetric && !flags.symmetrize {
        warn!("symmetric MatrixMarket file read without symmetrize; mirror entries are not generated");
    } else if pre.symmetry != MmSymmetry::Symmetric && flags.symmetrize {
        warn!("non-symmetric MatrixMarket file read with symmetrize; mirrored entries may duplicate existing ones");
    }

    r.move_to_next_int();
    let nrows_hdr = r.read_unsigned::<L>().to_usize() + 1;
    r.move_to_next_int();
    let ncols_hdr = r.read_unsigned::<L>().to_usize() + 1;
    r.move_to_next_int();
    let nnz_hdr = r.read_unsigned::<O>().to_usize();
    r.move_to_eol();

    let mut parts = read_edge_list::<L, W>(&data[r.pos()..], flags, workers)?;
    let m = parts.x.len();

    if nrows_hdr >= parts.nrows.to_usize() {
        parts.nrows = L::from_usize(nrows_hdr);
    } else {
        return Err(GmioError::RowCount.into());
    }
    if ncols_hdr >= parts.ncols.to_usize() {
        parts.ncols = L::from_usize(ncols_hdr);
    } else {
        return Err(GmioError::ColCount.into());
    }
    if flags.symmetrize {
        if nnz_hdr > 2 * m {
            return Err(GmioError::NonzeroCount.into());
        }
    } else if !flags.drop_self_loops {
        if nnz_hdr > m {
            return Err(GmioError::NonzeroCount.into());
        }
    } else if nnz_hdr != m {
        return Err(GmioError::NonzeroCount.into());
    }
    parts.n = parts.nrows.max(parts.ncols);
    Ok(parts)
}
