//! Apply a PatchSpec to a file on disk.

use crate::patch::engine::{insert_after_marker, is_applied, join_lines, split_lines};
use crate::patch::error::PatchError;
use crate::patch::spec::PatchSpec;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub target: PathBuf,
    /// Number of lines inserted (0 when skipped).
    pub inserted: usize,
    /// One-based line number of the start marker, if it was located.
    pub marker_line: Option<usize>,
    pub skipped: bool,
}

/// Patch `spec.target` in place.
///
/// Symlinks are resolved first so the file they point to is patched and the
/// link stays a link. The target must be UTF-8; anything else is rejected
/// with `PatchError::NotUtf8` and left untouched.
///
/// The file is rewritten through a uniquely named temp file in the same
/// directory and a rename, so on failure the target is left untouched. With
/// `skip_if_applied` an already present block is left alone; otherwise every
/// call inserts.
pub fn apply(spec: &PatchSpec, skip_if_applied: bool) -> Result<PatchOutcome, PatchError> {
    let target =
        &fs::canonicalize(&spec.target).map_err(|e| PatchError::from_io(&spec.target, e))?;
    let bytes = fs::read(target).map_err(|e| PatchError::from_io(target, e))?;
    let text = String::from_utf8(bytes).map_err(|_| PatchError::NotUtf8 {
        path: target.clone(),
    })?;
    let lines = split_lines(&text);
    let block = spec.indented_block();

    if skip_if_applied && is_applied(&lines, &spec.start_marker, &block) {
        tracing::info!(file = %target.display(), "patch already applied, skipping");
        return Ok(PatchOutcome {
            target: target.clone(),
            inserted: 0,
            marker_line: None,
            skipped: true,
        });
    }

    let insertion = insert_after_marker(&lines, &spec.start_marker, &spec.end_marker, &block)?;
    write_replacing(target, &join_lines(&insertion.lines))?;

    tracing::info!(
        file = %target.display(),
        marker_line = insertion.marker_index + 1,
        inserted = block.len(),
        "patched source file"
    );

    Ok(PatchOutcome {
        target: target.clone(),
        inserted: block.len(),
        marker_line: Some(insertion.marker_index + 1),
        skipped: false,
    })
}

/// Write `contents` to a fresh temp file next to `target`, copy the target's
/// permissions, then rename over the target.
fn write_replacing(target: &Path, contents: &str) -> Result<(), PatchError> {
    let perms = fs::metadata(target)
        .map_err(|e| PatchError::from_io(target, e))?
        .permissions();
    let dir = target.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PatchError::from_io(target, e))?;
    let written = (|| -> std::io::Result<()> {
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        fs::set_permissions(tmp.path(), perms)
    })();
    written.map_err(|e| PatchError::from_io(target, e))?;

    // On error the temp file is removed when the returned handle drops.
    tmp.persist(target)
        .map_err(|e| PatchError::from_io(target, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::error::Marker;
    use crate::patch::spec::IndentUnit;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const START: &str = "        self.arg_names = symbol.list_arguments()";
    const END: &str = "        self.aux_names = symbol.list_auxiliary_states()";

    fn spec_for(target: PathBuf, content: &[&str]) -> PatchSpec {
        PatchSpec {
            target,
            start_marker: START.to_string(),
            end_marker: END.to_string(),
            indent_level: 2,
            indent_unit: IndentUnit::Spaces(4),
            content: content.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn patches_executor_group_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("executor_group.py");
        let original = format!(
            "import logging\n\nclass G(object):\n    def __init__(self, symbol):\n{START}\n        self.x = 1\n{END}\n"
        );
        fs::write(&path, &original).unwrap();

        let content = ["a = 1", "b = 2", "c = 3", "d = 4", "e = 5"];
        let outcome = apply(&spec_for(path.clone(), &content), false).unwrap();
        assert_eq!(outcome.inserted, 5);
        assert_eq!(outcome.marker_line, Some(5));

        let patched = fs::read_to_string(&path).unwrap();
        let expected = format!(
            "import logging\n\nclass G(object):\n    def __init__(self, symbol):\n{START}\n        a = 1\n        b = 2\n        c = 3\n        d = 4\n        e = 5\n        self.x = 1\n{END}\n"
        );
        assert_eq!(patched, expected);
        assert_eq!(patched.lines().count(), original.lines().count() + 5);
    }

    #[test]
    fn missing_start_marker_leaves_file_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.py");
        let original = format!("x = 1\r\n{END}\r\nno newline at end");
        fs::write(&path, &original).unwrap();

        let err = apply(&spec_for(path.clone(), &["y"]), false).unwrap_err();
        assert!(matches!(
            err,
            PatchError::MarkerNotFound {
                marker: Marker::Start,
                ..
            }
        ));
        assert_eq!(fs::read(&path).unwrap(), original.as_bytes());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let dir = tempdir().unwrap();
        let err = apply(&spec_for(dir.path().join("nope.py"), &["y"]), false).unwrap_err();
        assert!(matches!(err, PatchError::FileNotFound { .. }));
    }

    #[test]
    fn second_apply_duplicates_unless_skipping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.py");
        fs::write(&path, format!("{START}\n{END}\n")).unwrap();
        let spec = spec_for(path.clone(), &["z = 0"]);

        apply(&spec, false).unwrap();
        let skipped = apply(&spec, true).unwrap();
        assert!(skipped.skipped);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);

        apply(&spec, false).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{START}\n        z = 0\n        z = 0\n{END}\n")
        );
    }

    #[cfg(unix)]
    #[test]
    fn keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("f.py");
        fs::write(&path, format!("{START}\n{END}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        apply(&spec_for(path.clone(), &["z = 0"]), false).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn non_utf8_target_is_rejected_and_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.py");
        let mut original = format!("{START}\n").into_bytes();
        original.extend_from_slice(b"# caf\xe9\n");
        original.extend_from_slice(format!("{END}\n").as_bytes());
        fs::write(&path, &original).unwrap();

        let err = apply(&spec_for(path.clone(), &["y"]), false).unwrap_err();
        assert!(matches!(err, PatchError::NotUtf8 { .. }));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn concurrent_applies_all_succeed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.py");

        for _ in 0..20 {
            fs::write(&path, format!("{START}\n{END}\n")).unwrap();
            let spec = spec_for(path.clone(), &["z = 0"]);

            let results: Vec<Result<PatchOutcome, PatchError>> = std::thread::scope(|s| {
                let handles: Vec<_> = (0..4).map(|_| s.spawn(|| apply(&spec, false))).collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            for r in &results {
                assert!(r.is_ok(), "concurrent apply failed: {:?}", r);
            }

            // Each writer replaces the file whole: the result is always a
            // well-formed patch with between one and four blocks.
            let text = fs::read_to_string(&path).unwrap();
            let lines: Vec<&str> = text.lines().collect();
            assert_eq!(lines.first(), Some(&START));
            assert_eq!(lines.last(), Some(&END));
            let blocks = lines.len() - 2;
            assert!((1..=4).contains(&blocks), "unexpected block count {}", blocks);
            assert!(lines[1..lines.len() - 1].iter().all(|l| *l == "        z = 0"));
        }
        // No temp files left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn patches_through_symlink() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real.py");
        let link = dir.path().join("link.py");
        fs::write(&real, format!("{START}\n{END}\n")).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let outcome = apply(&spec_for(link.clone(), &["z = 0"]), false).unwrap();
        assert_eq!(outcome.target, fs::canonicalize(&real).unwrap());

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(&real).unwrap(),
            format!("{START}\n        z = 0\n{END}\n")
        );
    }
}
