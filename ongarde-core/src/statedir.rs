//! State-directory hygiene: the `~/.ongarde` layout (`config.yaml`,
//! `allowlist.yaml`, `audit.db`, `proxy.pid`, `proxy.log`) lives in a
//! `0700` directory with `0600` files, and a PID file is written for the
//! lifetime of the process.

use std::path::Path;

/// Creates `dir` if missing and tightens it to `0700` on unix. A no-op on
/// platforms without unix permission bits.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    harden_dir(dir)
}

/// Narrows an existing state file (config, allowlist, audit db) to `0600`.
/// Safe to call repeatedly; missing files are ignored rather than erroring,
/// since not every deployment populates every file (e.g. no allowlist yet).
pub fn harden_file(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            let mut perms = meta.permissions();
            perms.set_mode(0o600);
            let _ = std::fs::set_permissions(path, perms);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn harden_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(dir)?.permissions();
        perms.set_mode(0o700);
        std::fs::set_permissions(dir, perms)?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

/// Writes the current process id to `<state_dir>/proxy.pid`, hardened to
/// `0600`. Removed by [`remove_pid_file`] on clean shutdown; a stale pid
/// file left behind by a crash is simply overwritten on the next start.
pub fn write_pid_file(state_dir: &Path) -> std::io::Result<()> {
    let path = state_dir.join("proxy.pid");
    std::fs::write(&path, std::process::id().to_string())?;
    harden_file(&path);
    Ok(())
}

pub fn remove_pid_file(state_dir: &Path) {
    let _ = std::fs::remove_file(state_dir.join("proxy.pid"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_and_hardens() {
        let base = tempfile::tempdir().unwrap();
        let nested = base.path().join("state");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&nested).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn write_and_remove_pid_file_round_trips() {
        let base = tempfile::tempdir().unwrap();
        write_pid_file(base.path()).unwrap();
        let pid_path = base.path().join("proxy.pid");
        assert!(pid_path.exists());
        let contents = std::fs::read_to_string(&pid_path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
        remove_pid_file(base.path());
        assert!(!pid_path.exists());
    }
}
