use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which of the two marker lines a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    End,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Start => f.write_str("start"),
            Marker::End => f.write_str("end"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("{marker} marker not found: {text:?}")]
    MarkerNotFound { marker: Marker, text: String },

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("not a UTF-8 text file: {}", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PatchError {
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => PatchError::FileNotFound { path },
            io::ErrorKind::PermissionDenied => PatchError::PermissionDenied { path },
            _ => PatchError::Io { path, source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_not_found_display() {
        let e = PatchError::MarkerNotFound {
            marker: Marker::End,
            text: "    end()".to_string(),
        };
        assert_eq!(e.to_string(), "end marker not found: \"    end()\"");
    }

    #[test]
    fn io_kinds_map_to_variants() {
        let p = Path::new("/tmp/x.py");
        let nf = PatchError::from_io(p, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(nf, PatchError::FileNotFound { .. }));

        let pd = PatchError::from_io(p, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(pd, PatchError::PermissionDenied { .. }));

        let other = PatchError::from_io(p, io::Error::from(io::ErrorKind::InvalidData));
        assert!(matches!(other, PatchError::Io { .. }));
    }

    #[test]
    fn not_utf8_display() {
        let e = PatchError::NotUtf8 {
            path: PathBuf::from("/site/mxnet/x.py"),
        };
        assert_eq!(e.to_string(), "not a UTF-8 text file: /site/mxnet/x.py");
    }
}
