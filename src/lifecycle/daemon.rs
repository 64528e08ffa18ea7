//! Background daemon management through a PID file.
//!
//! # Exit Codes
//! | Condition                         | Code |
//! |-----------------------------------|------|
//! | PID file missing (`stop`)         | 2    |
//! | PID file unreadable (`stop`)      | 13   |
//! | Daemon already running (`start`)  | 16   |
//!
//! `status` never fails on a missing or unreadable file; it reports and
//! exits 0.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

pub const DEFAULT_PID_FILE: &str = "cors-proxy.pid";

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("No PID file")]
    NoPidFile,

    #[error("Found existing PID file but could not read it")]
    Unreadable,

    #[error("Daemon is already running (pid is {0})")]
    AlreadyRunning(u32),

    #[error("failed to spawn daemon: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("PID file error: {0}")]
    Io(#[from] io::Error),
}

impl DaemonError {
    /// Process exit code for this error. Lookup errors only fail the
    /// process when `strict`.
    pub fn exit_code(&self, strict: bool) -> i32 {
        match self {
            DaemonError::NoPidFile if strict => 2,
            DaemonError::Unreadable if strict => 13,
            DaemonError::NoPidFile | DaemonError::Unreadable => 0,
            DaemonError::AlreadyRunning(_) => 16,
            _ => 1,
        }
    }
}

/// A process recorded in the PID file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub pid: u32,
    pub alive: bool,
}

#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<tmpdir>/cors-proxy.pid`.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(DEFAULT_PID_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the recorded PID and probe whether that process is alive.
    pub fn read(&self) -> Result<Recorded, DaemonError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(DaemonError::NoPidFile),
            Err(_) => return Err(DaemonError::Unreadable),
        };

        let pid = parse_pid(&content).ok_or(DaemonError::Unreadable)?;
        Ok(Recorded {
            pid,
            alive: is_process_alive(pid),
        })
    }

    pub fn write(&self, pid: u32) -> io::Result<()> {
        fs::write(&self.path, pid.to_string())
    }

    pub fn remove(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }

    /// Remove the file only if it records `pid`.
    pub fn remove_if_owned(&self, pid: u32) -> io::Result<bool> {
        match fs::read_to_string(&self.path) {
            Ok(content) if parse_pid(&content) == Some(pid) => {
                self.remove()?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// A PID must be a positive integer that fits a `pid_t`; anything else
/// (including 0, which would address a process group) is rejected.
fn parse_pid(content: &str) -> Option<u32> {
    content
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|pid| *pid > 0 && *pid <= i32::MAX as u32)
}

#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    // kill(pid, 0) checks for existence without sending anything.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}

#[cfg(unix)]
fn terminate(pid: u32) -> Result<(), DaemonError> {
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(DaemonError::Signal {
            pid,
            source: io::Error::last_os_error(),
        })
    }
}

#[cfg(not(unix))]
fn terminate(pid: u32) -> Result<(), DaemonError> {
    Err(DaemonError::Signal {
        pid,
        source: io::Error::new(io::ErrorKind::Unsupported, "signals are not supported"),
    })
}

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Started {
    pub pid: u32,
    /// A PID file of a dead process was removed first.
    pub removed_stale: bool,
}

/// Spawn `program args…` detached from this process and record its PID.
///
/// A stale PID file is removed first; a live one is an error.
pub fn start(pid_file: &PidFile, program: &Path, args: &[String]) -> Result<Started, DaemonError> {
    let mut removed_stale = false;
    if pid_file.exists() {
        let recorded = pid_file.read()?;
        if recorded.alive {
            return Err(DaemonError::AlreadyRunning(recorded.pid));
        }
        pid_file.remove()?;
        removed_stale = true;
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let child = command.spawn().map_err(DaemonError::Spawn)?;
    let pid = child.id();
    pid_file.write(pid)?;
    Ok(Started { pid, removed_stale })
}

/// What `stop` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stopped {
    /// SIGTERM was sent to the daemon.
    Signalled(u32),
    /// The recorded process was gone; the PID file was removed.
    StaleRemoved(u32),
}

pub fn stop(pid_file: &PidFile) -> Result<Stopped, DaemonError> {
    let recorded = pid_file.read()?;
    if recorded.alive {
        terminate(recorded.pid)?;
        Ok(Stopped::Signalled(recorded.pid))
    } else {
        pid_file.remove()?;
        Ok(Stopped::StaleRemoved(recorded.pid))
    }
}

pub fn status(pid_file: &PidFile) -> Result<Recorded, DaemonError> {
    pid_file.read()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_pid_file() -> (tempfile::TempDir, PidFile) {
        let dir = tempfile::tempdir().unwrap();
        let file = PidFile::new(dir.path().join("proxy.pid"));
        (dir, file)
    }

    #[test]
    fn test_parse_pid() {
        assert_eq!(parse_pid("1234"), Some(1234));
        assert_eq!(parse_pid(" 42\n"), Some(42));
        assert_eq!(parse_pid("0"), None);
        assert_eq!(parse_pid("-1"), None);
        assert_eq!(parse_pid("abc"), None);
        assert_eq!(parse_pid(""), None);
    }

    #[test]
    fn test_missing_pid_file() {
        let (_dir, file) = temp_pid_file();
        let err = file.read().unwrap_err();
        assert!(matches!(err, DaemonError::NoPidFile));
        assert_eq!(err.exit_code(true), 2);
        assert_eq!(err.exit_code(false), 0);
    }

    #[test]
    fn test_garbage_pid_file_is_unreadable() {
        let (_dir, file) = temp_pid_file();
        fs::write(file.path(), "not a pid").unwrap();

        let err = file.read().unwrap_err();
        assert!(matches!(err, DaemonError::Unreadable));
        assert_eq!(err.exit_code(true), 13);
        assert_eq!(err.exit_code(false), 0);
    }

    #[test]
    fn test_already_running_exit_code() {
        assert_eq!(DaemonError::AlreadyRunning(1).exit_code(true), 16);
    }

    #[cfg(unix)]
    #[test]
    fn test_own_process_is_alive() {
        let (_dir, file) = temp_pid_file();
        file.write(std::process::id()).unwrap();

        let recorded = status(&file).unwrap();
        assert_eq!(recorded.pid, std::process::id());
        assert!(recorded.alive);
    }

    #[cfg(unix)]
    #[test]
    fn test_start_refuses_when_running() {
        let (_dir, file) = temp_pid_file();
        file.write(std::process::id()).unwrap();

        let err = start(&file, Path::new("/bin/true"), &[]).unwrap_err();
        assert!(matches!(err, DaemonError::AlreadyRunning(pid) if pid == std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_removes_stale_file() {
        let (_dir, file) = temp_pid_file();
        // pid_max on Linux is at most 2^22, so this pid cannot exist.
        file.write(i32::MAX as u32).unwrap();

        assert_eq!(stop(&file).unwrap(), Stopped::StaleRemoved(i32::MAX as u32));
        assert!(!file.exists());
    }

    #[test]
    fn test_remove_if_owned() {
        let (_dir, file) = temp_pid_file();
        file.write(77).unwrap();

        assert!(!file.remove_if_owned(78).unwrap());
        assert!(file.exists());
        assert!(file.remove_if_owned(77).unwrap());
        assert!(!file.exists());
        assert!(!file.remove_if_owned(77).unwrap());
    }
}
