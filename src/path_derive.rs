//! Destination naming (spec.md §4.7) and `mkdir -p` semantics (spec.md §6).

use crate::config::Config;
use crate::error::PfError;
use std::path::{Path, PathBuf};

fn strip_trailing_slashes(p: &Path) -> PathBuf {
    let s = p.to_string_lossy();
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}

/// Returns `path` itself (trailing slashes stripped) if it is a directory and
/// `!wildcard`; otherwise `dirname(path)`.
///
/// Open question resolution (spec.md §9): the original's dirname-vs-`.`
/// precedence bug is read as "treat the dirname as the root shortcut when it
/// is exactly `.`" — see `get_output_path` below for where that shortcut is consumed.
pub fn get_base_path(path: &Path, wildcard: bool, is_dir: bool) -> PathBuf {
    let stripped = strip_trailing_slashes(path);
    if is_dir && !wildcard {
        stripped
    } else {
        stripped.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Computes the destination path a job writes to, given the source root.
///
/// If `cfg.recurse`, the source is a directory, the destination exists and is
/// a directory, and exactly one source path is being copied, the source's
/// basename is appended to the destination; otherwise destination is used as given.
pub fn get_dest_path(
    src_root: &Path,
    dest_path: &Path,
    src_is_dir: bool,
    dest_exists_as_dir: bool,
    num_paths: usize,
    cfg: &Config,
) -> PathBuf {
    let dest = strip_trailing_slashes(dest_path);
    if cfg.recurse && src_is_dir && dest_exists_as_dir && num_paths == 1 {
        let base = crate::path_item::basename(&strip_trailing_slashes(src_root));
        dest.join(base)
    } else {
        dest
    }
}

/// Splices the portion of `src` after `base` onto `dest`, yielding the final
/// per-file destination path. Non-recursive mode uses just the basename.
pub fn get_output_path(base: &Path, src: &Path, dest: &Path, cfg: &Config) -> PathBuf {
    if !cfg.recurse {
        return dest.join(crate::path_item::basename(src));
    }

    let base_is_dot = base.as_os_str() == "." || base.as_os_str() == "./";
    if base_is_dot {
        return dest.join(src);
    }

    match src.strip_prefix(base) {
        Ok(rel) if !rel.as_os_str().is_empty() => dest.join(rel),
        _ => dest.join(crate::path_item::basename(src)),
    }
}

/// `mkdir -p` semantics: walk the path, stat each prefix, create if absent,
/// fail with `ENOTDIR` if any prefix exists and is not a directory.
pub fn mkpath(path: &Path, mode: u32) -> Result<(), PfError> {
    let mut built = PathBuf::new();
    for component in path.components() {
        built.push(component);
        match std::fs::symlink_metadata(&built) {
            Ok(meta) if meta.is_dir() => continue,
            Ok(_) => return Err(PfError::NotADirectory { path: built }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                create_dir(&built, mode)?;
            }
            Err(source) => return Err(PfError::Mkpath { path: built, source }),
        }
    }
    Ok(())
}

fn create_dir(path: &Path, mode: u32) -> Result<(), PfError> {
    use std::os::unix::fs::DirBuilderExt;
    let mut builder = std::fs::DirBuilder::new();
    builder.mode(mode);
    match builder.create(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(PfError::Mkpath { path: path.to_path_buf(), source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkType;

    fn cfg(recurse: bool) -> Config {
        let mut c = Config::new("/a", "/x", WorkType::Copy);
        c.recurse = recurse;
        c
    }

    #[test]
    fn base_path_directory_no_wildcard_returns_self() {
        let p = get_base_path(Path::new("/a/b/"), false, true);
        assert_eq!(p, Path::new("/a/b"));
    }

    #[test]
    fn base_path_non_dir_returns_dirname() {
        let p = get_base_path(Path::new("/a/b/c.txt"), false, false);
        assert_eq!(p, Path::new("/a/b"));
    }

    #[test]
    fn output_path_recursive_file_under_dir() {
        let base = get_base_path(Path::new("/a/b/c.txt"), false, false);
        let out = get_output_path(&base, Path::new("/a/b/c.txt"), Path::new("/x"), &cfg(true));
        assert_eq!(out, Path::new("/x/c.txt"));
    }

    #[test]
    fn output_path_non_recursive_uses_basename() {
        let out = get_output_path(Path::new("/a/b"), Path::new("/a/b/c.txt"), Path::new("/x"), &cfg(false));
        assert_eq!(out, Path::new("/x/c.txt"));
    }

    #[test]
    fn dest_path_appends_basename_when_recursing_single_dir_into_existing_dir() {
        let dest = get_dest_path(Path::new("/a/b"), Path::new("/x"), true, true, 1, &cfg(true));
        assert_eq!(dest, Path::new("/x/b"));
    }

    #[test]
    fn mkpath_creates_all_levels_and_is_idempotent() {
        let root = std::env::temp_dir().join(format!("pftool-core-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let nested = root.join("a/b/c");
        mkpath(&nested, 0o755).unwrap();
        assert!(nested.is_dir());
        mkpath(&nested, 0o755).unwrap();
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn mkpath_fails_enotdir_when_prefix_is_a_file() {
        let root = std::env::temp_dir().join(format!("pftool-core-test-file-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        let file_prefix = root.join("notadir");
        std::fs::write(&file_prefix, b"x").unwrap();
        let nested = file_prefix.join("b/c");
        let err = mkpath(&nested, 0o755).unwrap_err();
        assert!(matches!(err, PfError::NotADirectory { .. }));
        std::fs::remove_dir_all(&root).unwrap();
    }
}
