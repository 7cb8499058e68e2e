//! Binary COO snapshots
//!
//! Layout: magic, one byte each for the label and count widths, then
//! `nrows`, `ncols`, `n`, `m`, then the `x`, `y`, and (when weighted)
//! weight arrays as raw little-endian payloads. Payloads move through the
//! parallel block copy; the header is written by the calling thread.
//!
//! The stored widths must match the reader's chosen types, and the payload
//! length must agree with the stored `m`; either mismatch is fatal.

use std::path::Path;

use gmio_core::format::COO_MAGIC;
use gmio_core::{Flags, GmioError, Label, Weight};

use crate::error::Result;
use crate::file_map::{bytes_of, bytes_of_mut, try_zeroed_vec, FileMap};

use super::{Coo, Parts};

pub(crate) fn save<L: Label, O: Label, W: Weight>(
    coo: &Coo<L, O, W>,
    path: &Path,
) -> Result<()> {
    let m = coo.m().to_usize();
    let lw = L::WIDTH as usize;
    let ow = O::WIDTH as usize;
    let mut size = COO_MAGIC.len() + 2 + 3 * lw + ow + 2 * m * lw;
    if let Some(w) = coo.weights() {
        size += w.len() * W::WIDTH as usize;
    }

    let mut f = FileMap::create(path, size)?;
    f.write_str(COO_MAGIC)?;
    f.write_u8(L::WIDTH)?;
    f.write_u8(O::WIDTH)?;
    f.write_label(coo.nrows())?;
    f.write_label(coo.ncols())?;
    f.write_label(coo.n())?;
    f.write_label(coo.m())?;
    f.parallel_write(bytes_of(coo.x()))?;
    f.parallel_write(bytes_of(coo.y()))?;
    if let Some(w) = coo.weights() {
        f.parallel_write(bytes_of(w))?;
    }
    f.flush()
}

pub(crate) fn read<L: Label, O: Label, W: Weight>(
    f: &mut FileMap,
    flags: Flags,
) -> Result<Parts<L, W>> {
    f.read_magic(COO_MAGIC)?;
    if f.read_u8()? != L::WIDTH {
        return Err(GmioError::LabelWidth.into());
    }
    if f.read_u8()? != O::WIDTH {
        return Err(GmioError::CountWidth.into());
    }

    let nrows = f.read_label::<L>()?;
    let ncols = f.read_label::<L>()?;
    let n = f.read_label::<L>()?;
    let m = f.read_label::<O>()?.to_usize();

    let mut expected = 2 * m * L::WIDTH as usize;
    if flags.weighted {
        expected += m * W::WIDTH as usize;
    }
    if f.remaining() != expected {
        return Err(GmioError::PayloadLength.into());
    }

    let mut x = try_zeroed_vec::<L>(m)?;
    f.parallel_read(bytes_of_mut(&mut x))?;
    let mut y = try_zeroed_vec::<L>(m)?;
    f.parallel_read(bytes_of_mut(&mut y))?;
    let w = if flags.weighted {
        let mut w = try_zeroed_vec::<W>(m)?;
        f.parallel_read(bytes_of_mut(&mut w))?;
        Some(w)
    } else {
        None
    };

    Ok(Parts {
        nrows,
        ncols,
        n,
        x,
        y,
        w,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use gmio_core::FileKind;

    fn sample(flags: Flags) -> Coo<u32, u64, f32> {
        let w = flags.weighted.then(|| vec![1.0f32, 2.0, 0.5]);
        Coo::from_parts(5, 4, vec![0u32, 4, 2], vec![3u32, 1, 2], w, flags).unwrap()
    }

    #[test]
    fn round_trip_weighted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coo.bin");
        let flags = Flags::plain().with_weighted(true);
        let coo = sample(flags);
        coo.save(&path).unwrap();

        let back = Coo::<u32, u64, f32>::load(&path, flags).unwrap();
        assert_eq!(back, coo);
    }

    #[test]
    fn round_trip_unweighted_detects_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coo.el");
        let coo = sample(Flags::plain());
        coo.save(&path).unwrap();

        // Extension says edge list; the magic must win
        let f = FileMap::open(&path).unwrap();
        assert_eq!(f.guess_kind().unwrap(), FileKind::CooBinary);
        let back = Coo::<u32, u64, f32>::from_file(&path, Flags::plain()).unwrap();
        assert_eq!(back, coo);
    }

    #[test]
    fn matrix_market_load_survives_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mtx = dir.path().join("m.mtx");
        let bin = dir.path().join("m.bin");
        std::fs::write(
            &mtx,
            "%%MatrixMarket matrix coordinate real general\n2 2 2\n1 2 1.0\n2 1 2.0\n",
        )
        .unwrap();

        let flags = Flags::plain().with_weighted(true);
        let coo = Coo::<u32, u64, f32>::from_file(&mtx, flags).unwrap();
        assert_eq!(coo.x(), &[1, 2]);
        assert_eq!(coo.y(), &[2, 1]);
        assert_eq!(coo.weights().unwrap(), &[1.0, 2.0]);
        assert_eq!((coo.nrows(), coo.ncols()), (3, 3));

        coo.save(&bin).unwrap();
        let back = Coo::<u32, u64, f32>::from_file(&bin, flags).unwrap();
        assert_eq!(back, coo);
    }

    #[test]
    fn width_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coo.bin");
        sample(Flags::plain()).save(&path).unwrap();

        let err = Coo::<u64, u64, f32>::from_file(&path, Flags::plain()).unwrap_err();
        assert_eq!(err.core(), Some(GmioError::LabelWidth));
        let err = Coo::<u32, u32, f32>::from_file(&path, Flags::plain()).unwrap_err();
        assert_eq!(err.core(), Some(GmioError::CountWidth));
    }

    #[test]
    fn payload_length_contradiction_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coo.bin");
        sample(Flags::plain()).save(&path).unwrap();

        // Chop off the tail of the y payload
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        let err = Coo::<u32, u64, f32>::from_file(&path, Flags::plain()).unwrap_err();
        assert_eq!(err.core(), Some(GmioError::PayloadLength));

        // Reading an unweighted snapshot as weighted disagrees in length too
        sample(Flags::plain()).save(&path).unwrap();
        let err =
            Coo::<u32, u64, f32>::from_file(&path, Flags::plain().with_weighted(true)).unwrap_err();
        assert_eq!(err.core(), Some(GmioError::PayloadLength));
    }

    #[test]
    fn truncated_header_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coo.bin");
        std::fs::write(&path, &COO_MAGIC.as_bytes()[..8]).unwrap();
        let err = Coo::<u32, u64, f32>::from_file(&path, Flags::plain()).unwrap_err();
        assert!(matches!(err, Error::Core(GmioError::TruncatedPayload)));
    }
}
