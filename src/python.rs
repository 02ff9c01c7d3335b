//! Python interpreter detection and installed-package lookup.

use anyhow::{Context, anyhow, bail};
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const PYTHON_ENV: &str = "PYTHON";
const CANDIDATES: [&str; 2] = ["python3", "python"];

/// Pick the interpreter: explicit flag, then `$PYTHON`, then `python3` /
/// `python` on `path_var`.
pub fn detect(
    explicit: Option<&Path>,
    env_python: Option<OsString>,
    path_var: Option<OsString>,
) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Some(p) = env_python.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let path_var = path_var.ok_or_else(|| anyhow!("PATH is not set; pass --python"))?;
    for name in CANDIDATES {
        if let Some(found) = find_on_path(name, &path_var) {
            tracing::debug!(python = %found.display(), "found interpreter on PATH");
            return Ok(found);
        }
    }
    bail!(
        "no Python interpreter found on PATH (tried {}); pass --python or set {}",
        CANDIDATES.join(", "),
        PYTHON_ENV
    )
}

/// First executable file called `name` in the directories of `path_var`.
pub fn find_on_path(name: &str, path_var: &OsString) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Parse `Python 3.8.10` (as printed by `--version`) into `(3, 8)`.
pub fn parse_version(text: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"Python\s+(\d+)\.(\d+)").ok()?;
    let caps = re.captures(text)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    Some((major, minor))
}

/// Run `<python> --version` and require Python 3.
pub fn check_version(python: &Path) -> anyhow::Result<(u32, u32)> {
    let out = Command::new(python)
        .arg("--version")
        .output()
        .with_context(|| format!("run {} --version", python.display()))?;
    // Python 2 prints the version on stderr.
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    let (major, minor) = parse_version(&text)
        .ok_or_else(|| anyhow!("cannot parse version from {}: {:?}", python.display(), text.trim()))?;
    if major != 3 {
        bail!("{} is Python {}.{}, need Python 3", python.display(), major, minor);
    }
    tracing::info!(python = %python.display(), version = %format!("{}.{}", major, minor), "using interpreter");
    Ok((major, minor))
}

fn check_package_name(package: &str) -> anyhow::Result<()> {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")?;
    if !re.is_match(package) {
        bail!("invalid Python package name {:?}", package);
    }
    Ok(())
}

/// Directory of an installed package, as reported by the interpreter.
pub fn package_dir(python: &Path, package: &str) -> anyhow::Result<PathBuf> {
    check_package_name(package)?;
    let code = format!(
        "import os, {pkg}; print(os.path.dirname({pkg}.__file__))",
        pkg = package
    );
    let out = Command::new(python)
        .arg("-c")
        .arg(&code)
        .output()
        .with_context(|| format!("run {} to locate package {}", python.display(), package))?;
    if !out.status.success() {
        bail!(
            "cannot import {} with {}: {}",
            package,
            python.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    let dir = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if dir.is_empty() {
        bail!("{} reported no location for package {}", python.display(), package);
    }
    tracing::debug!(package, dir = %dir, "located package");
    Ok(PathBuf::from(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_versions() {
        assert_eq!(parse_version("Python 3.8.10\n"), Some((3, 8)));
        assert_eq!(parse_version("Python 2.7.18"), Some((2, 7)));
        assert_eq!(parse_version("python3: not found"), None);
    }

    #[test]
    fn package_names() {
        assert!(check_package_name("mxnet").is_ok());
        assert!(check_package_name("byteps.mxnet").is_ok());
        assert!(check_package_name("os; import sys").is_err());
        assert!(check_package_name("").is_err());
    }

    #[test]
    fn explicit_and_env_win() {
        let p = detect(Some(Path::new("/opt/py/bin/python")), Some("/x".into()), None).unwrap();
        assert_eq!(p, PathBuf::from("/opt/py/bin/python"));

        let p = detect(None, Some("/usr/bin/python3.9".into()), None).unwrap();
        assert_eq!(p, PathBuf::from("/usr/bin/python3.9"));

        assert!(detect(None, Some("".into()), None).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn searches_path_in_order() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();

        // Not executable: skipped.
        fs::write(a.path().join("python3"), "").unwrap();
        let exe = b.path().join("python3");
        fs::write(&exe, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

        let path_var = std::env::join_paths([a.path(), b.path()]).unwrap();
        assert_eq!(detect(None, None, Some(path_var.clone())).unwrap(), exe);

        let empty = tempfile::tempdir().unwrap();
        let none = std::env::join_paths([empty.path()]).unwrap();
        assert!(detect(None, None, Some(none)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn version_and_package_from_fake_interpreter() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("python");
        fs::write(
            &fake,
            "#!/bin/sh\nif [ \"$1\" = --version ]; then echo 'Python 3.10.4'; else echo /site/mxnet; fi\n",
        )
        .unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(check_version(&fake).unwrap(), (3, 10));
        assert_eq!(package_dir(&fake, "mxnet").unwrap(), PathBuf::from("/site/mxnet"));
    }
}
