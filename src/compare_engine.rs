//! Compare engine (spec.md §4.6).

use crate::backend::IoBackend;
use crate::error::PfError;
use crate::path_item::PathItem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareResult {
    Equal,
    Different,
    Missing,
}

/// Compare `src` against `dst`. Stats `dst` itself rather than trusting the
/// caller's `dst.st`, since a stale `dst.st` is exactly what a compare job is
/// meant to catch.
pub fn compare_file<B: IoBackend>(
    src: &PathItem,
    dst: &PathItem,
    blocksize: u64,
    meta_only: bool,
    backend: &B,
) -> Result<CompareResult, PfError> {
    let dst_st = match backend.stat(&dst.path) {
        Ok(st) => st,
        Err(PfError::Stat { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CompareResult::Missing);
        }
        Err(e) => return Err(e),
    };

    let is_symlink = src.st.is_symlink();
    let metadata_equal = src.st.size == dst_st.size
        && src.st.mode == dst_st.mode
        && src.st.uid == dst_st.uid
        && src.st.gid == dst_st.gid
        && (src.st.mtime == dst_st.mtime || is_symlink);

    if !metadata_equal {
        return Ok(CompareResult::Different);
    }
    if meta_only {
        return Ok(CompareResult::Equal);
    }

    let (offset, length) = if src.chksz == 0 {
        (0u64, src.st.size)
    } else {
        let o = src.chkidx * src.chksz;
        (o, src.chksz.min(src.st.size.saturating_sub(o)))
    };

    let mut src_handle = backend.open_read(&src.path)?;
    let mut dst_handle = backend.open_read(&dst.path)?;

    let mut src_buf = vec![0u8; blocksize.max(1) as usize];
    let mut dst_buf = vec![0u8; blocksize.max(1) as usize];
    let mut completed = 0u64;

    while completed < length {
        let want = blocksize.min(length - completed) as usize;
        let n_src = backend.read_at(&mut src_handle, &src.path, offset + completed, &mut src_buf[..want])? as usize;
        let n_dst = backend.read_at(&mut dst_handle, &dst.path, offset + completed, &mut dst_buf[..want])? as usize;

        if n_src != n_dst || src_buf[..n_src] != dst_buf[..n_dst] {
            backend.close(src_handle)?;
            backend.close(dst_handle)?;
            return Ok(CompareResult::Different);
        }

        completed += n_src as u64;
    }

    backend.close(src_handle)?;
    backend.close(dst_handle)?;
    Ok(CompareResult::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PosixBackend;
    use crate::path_item::{FileType, StatInfo};

    fn item(path: std::path::PathBuf) -> PathItem {
        let meta = std::fs::symlink_metadata(&path).unwrap();
        let st = StatInfo::from_metadata(&meta);
        PathItem::new(path, st, FileType::Regular)
    }

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let d = std::env::temp_dir().join(format!("pftool-core-cmp-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&d);
        std::fs::create_dir_all(&d).unwrap();
        d
    }

    #[test]
    fn identical_files_compare_equal() {
        let dir = scratch_dir("equal");
        let a = dir.join("a");
        let b = dir.join("b");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        let src = item(a);
        let mut dst = item(b);
        dst.st.mtime = src.st.mtime;
        let backend = PosixBackend;
        assert_eq!(compare_file(&src, &dst, 4096, false, &backend).unwrap(), CompareResult::Equal);
    }

    #[test]
    fn differing_mtime_is_different() {
        let dir = scratch_dir("mtime");
        let a = dir.join("a");
        let b = dir.join("b");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        let src = item(a);
        let dst = item(b);
        let backend = PosixBackend;
        // Real filesystem mtimes from two separate writes will very likely
        // differ at sub-second-unaware granularity; force the point home by
        // asserting on the metadata path rather than relying on timing.
        let forced_src_mtime = dst.st.mtime + 1;
        let mut src = src;
        src.st.mtime = forced_src_mtime;
        assert_eq!(compare_file(&src, &dst, 4096, false, &backend).unwrap(), CompareResult::Different);
    }

    #[test]
    fn missing_destination() {
        let dir = scratch_dir("missing");
        let a = dir.join("a");
        std::fs::write(&a, b"x").unwrap();
        let src = item(a);
        let dst_path = dir.join("does_not_exist");
        let dst = PathItem::new(dst_path, src.st, FileType::Regular);
        let backend = PosixBackend;
        assert_eq!(compare_file(&src, &dst, 4096, false, &backend).unwrap(), CompareResult::Missing);
    }

    #[test]
    fn meta_only_skips_byte_compare_even_if_contents_differ() {
        let dir = scratch_dir("metaonly");
        let a = dir.join("a");
        let b = dir.join("b");
        std::fs::write(&a, b"aaaaaaaaaa").unwrap();
        std::fs::write(&b, b"bbbbbbbbbb").unwrap();
        let src = item(a);
        let mut dst = item(b);
        dst.st.mtime = src.st.mtime;
        let backend = PosixBackend;
        assert_eq!(compare_file(&src, &dst, 4096, true, &backend).unwrap(), CompareResult::Equal);
    }
}
