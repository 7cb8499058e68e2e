//! Memory-mapped file access
//!
//! A [`FileMap`] maps an entire file into the address space, either
//! read-only or pre-extended to a fixed size for writing, and exposes the
//! mapping as one contiguous byte region with a cursor. Header scalars move
//! through the cursor one value at a time; bulk payloads move through
//! [`FileMap::parallel_read`]/[`FileMap::parallel_write`], which split the
//! region into per-worker chunks and copy them concurrently.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut, MmapOptions};
use rayon::prelude::*;

use gmio_core::{format, FileKind, GmioError, Label};

use crate::error::{Error, Result};

enum Map {
    /// Zero-length files cannot be mapped; they read as an empty region
    Empty,
    Ro(Mmap),
    Rw(MmapMut),
}

/// A file mapped into memory with a read/write cursor
pub struct FileMap {
    map: Map,
    pos: usize,
    path: PathBuf,
}

impl FileMap {
    /// Map an existing file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        let map = if len == 0 {
            Map::Empty
        } else {
            // SAFETY: the mapping is read-only and lives as long as this
            // struct; borrows of the region never outlive it. Truncation of
            // the file by another process while mapped is not defended
            // against.
            let map = unsafe { MmapOptions::new().map(&file)? };
            #[cfg(unix)]
            let _ = map.advise(memmap2::Advice::WillNeed);
            Map::Ro(map)
        };
        Ok(Self {
            map,
            pos: 0,
            path,
        })
    }

    /// Create (or truncate) a file, extend it to `size` bytes, and map it
    /// for writing
    pub fn create<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot map a zero-byte output file",
            )));
        }
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(size as u64)?;
        // SAFETY: the file was just created and sized by us; the mapping
        // lives as long as this struct.
        let map = unsafe { MmapOptions::new().map_mut(&file)? };
        Ok(Self {
            map: Map::Rw(map),
            pos: 0,
            path,
        })
    }

    /// Total length of the mapped region
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole mapped region
    pub fn bytes(&self) -> &[u8] {
        match &self.map {
            Map::Empty => &[],
            Map::Ro(m) => &m[..],
            Map::Rw(m) => &m[..],
        }
    }

    pub(crate) fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.map {
            Map::Rw(m) => Ok(&mut m[..]),
            _ => Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mapping is not writable",
            ))),
        }
    }

    /// Current cursor offset
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the region
    pub fn remaining(&self) -> usize {
        self.len() - self.pos
    }

    /// Move the cursor to an absolute offset
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.len() {
            return Err(GmioError::TruncatedPayload.into());
        }
        self.pos = pos;
        Ok(())
    }

    /// Take the next `n` bytes, advancing the cursor; hard error past end
    pub(crate) fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.pos + n > self.len() {
            return Err(GmioError::TruncatedPayload.into());
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.bytes()[start..start + n])
    }

    /// Consume and verify a fixed magic string
    pub fn read_magic(&mut self, magic: &str) -> Result<()> {
        let got = self.take(magic.len())?;
        if got != magic.as_bytes() {
            return Err(GmioError::BadMagic.into());
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read one label-typed scalar from the cursor
    pub fn read_label<T: Label>(&mut self) -> Result<T> {
        let bytes = self.take(T::WIDTH as usize)?;
        Ok(T::read_le(bytes))
    }

    pub(crate) fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        if self.pos + src.len() > self.len() {
            return Err(GmioError::TruncatedPayload.into());
        }
        let start = self.pos;
        self.bytes_mut()?[start..start + src.len()].copy_from_slice(src);
        self.pos += src.len();
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Write one label-typed scalar at the cursor
    pub fn write_label<T: Label>(&mut self, v: T) -> Result<()> {
        let mut buf = [0u8; 16];
        let w = T::WIDTH as usize;
        v.write_le(&mut buf[..w]);
        self.write_bytes(&buf[..w])
    }

    /// Copy the next `dst.len()` bytes out of the map in parallel
    pub fn parallel_read(&mut self, dst: &mut [u8]) -> Result<()> {
        let n = dst.len();
        if self.pos + n > self.len() {
            return Err(GmioError::TruncatedPayload.into());
        }
        let src = &self.bytes()[self.pos..self.pos + n];
        par_copy(dst, src);
        self.pos += n;
        Ok(())
    }

    /// Copy `src` into the map at the cursor in parallel
    pub fn parallel_write(&mut self, src: &[u8]) -> Result<()> {
        let n = src.len();
        if self.pos + n > self.len() {
            return Err(GmioError::TruncatedPayload.into());
        }
        let start = self.pos;
        let dst = &mut self.bytes_mut()?[start..start + n];
        par_copy(dst, src);
        self.pos += n;
        Ok(())
    }

    /// Detect the input kind from the leading bytes and the file name
    pub fn guess_kind(&self) -> Result<FileKind> {
        let name = self
            .path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format::detect(self.bytes(), &name)?)
    }

    /// Flush written pages back to the file
    pub fn flush(&self) -> Result<()> {
        if let Map::Rw(m) = &self.map {
            m.flush()?;
        }
        Ok(())
    }
}

/// Split both regions into matching chunks and copy them concurrently
fn par_copy(dst: &mut [u8], src: &[u8]) {
    let workers = rayon::current_num_threads().max(1);
    let chunk = dst.len().div_ceil(workers).max(1);
    dst.par_chunks_mut(chunk)
        .zip(src.par_chunks(chunk))
        .for_each(|(d, s)| d.copy_from_slice(s));
}

/// View a numeric slice as raw bytes
pub(crate) fn bytes_of<T: Copy>(v: &[T]) -> &[u8] {
    // SAFETY: T is one of the primitive numeric element types; every bit
    // pattern is a plain byte sequence with no padding, and the length in
    // bytes cannot overflow because the slice already exists.
    unsafe { std::slice::from_raw_parts(v.as_ptr().cast(), std::mem::size_of_val(v)) }
}

/// View a numeric slice as raw writable bytes
pub(crate) fn bytes_of_mut<T: Copy>(v: &mut [T]) -> &mut [u8] {
    // SAFETY: as for `bytes_of`; additionally every byte pattern written
    // is a valid T because the element types are plain integers and floats.
    unsafe { std::slice::from_raw_parts_mut(v.as_mut_ptr().cast(), std::mem::size_of_val(v)) }
}

/// Allocate a zero-filled output array, surfacing allocation failure
pub(crate) fn try_zeroed_vec<T: Copy + Default>(n: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n)?;
    v.resize(n, T::default());
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmio_core::format::COO_MAGIC;

    #[test]
    fn create_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalars.bin");

        let mut f = FileMap::create(&path, 2 + 4 + 8).unwrap();
        f.write_u8(7).unwrap();
        f.write_u8(9).unwrap();
        f.write_label(0xABCD_1234u32).unwrap();
        f.write_label(42u64).unwrap();
        f.flush().unwrap();
        drop(f);

        let mut f = FileMap::open(&path).unwrap();
        assert_eq!(f.len(), 14);
        assert_eq!(f.read_u8().unwrap(), 7);
        assert_eq!(f.read_u8().unwrap(), 9);
        assert_eq!(f.read_label::<u32>().unwrap(), 0xABCD_1234);
        assert_eq!(f.read_label::<u64>().unwrap(), 42);
        assert_eq!(f.remaining(), 0);
        assert!(matches!(
            f.read_u8(),
            Err(Error::Core(GmioError::TruncatedPayload))
        ));
    }

    #[test]
    fn parallel_copies_match_serial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block.bin");
        let src: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

        let mut f = FileMap::create(&path, src.len()).unwrap();
        f.parallel_write(&src).unwrap();
        f.flush().unwrap();
        drop(f);

        let mut f = FileMap::open(&path).unwrap();
        let mut dst = vec![0u8; src.len()];
        f.parallel_read(&mut dst).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn empty_files_map_as_empty_regions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.el");
        std::fs::write(&path, b"").unwrap();
        let f = FileMap::open(&path).unwrap();
        assert!(f.is_empty());
        assert_eq!(f.guess_kind().unwrap(), FileKind::EdgeList);
    }

    #[test]
    fn kind_detection_prefers_magic_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disguised.mtx");
        std::fs::write(&path, format!("{COO_MAGIC}xxxx")).unwrap();
        let f = FileMap::open(&path).unwrap();
        assert_eq!(f.guess_kind().unwrap(), FileKind::CooBinary);

        let path = dir.path().join("matrix.mtx");
        std::fs::write(&path, "%%MatrixMarket matrix coordinate real general\n").unwrap();
        let f = FileMap::open(&path).unwrap();
        assert_eq!(f.guess_kind().unwrap(), FileKind::MatrixMarket);
    }

    #[test]
    fn zero_byte_write_mappings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileMap::create(dir.path().join("zero.bin"), 0).is_err());
    }
}
