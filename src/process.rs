//! # External process runner.
//!
//! [`Process`] starts a program in its own process group and waits for it. When the
//! context is cancelled the whole group (the program and anything it spawned) gets
//! `SIGINT`, and the runner waits for the program to exit.
//!
//! ## Exit mapping
//! - exit code 0 → `Ok(())`
//! - terminated by the `SIGINT` sent on cancellation → `Ok(())`
//! - anything else → [`ProcessError::Exit`] wrapped in [`RunError::Failed`]
//!
//! A bare program name is looked up in this process's `PATH` before the program's
//! own environment is applied, so `Process::command("cargo", ..)` works without
//! [`Process::inherit_env`].
//!
//! Unix only, behind the `process` feature.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::{context::Context, error::RunError, runners::Runner};

/// Failures of an external process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting for {name}: {source}")]
    Wait {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("{name} exited with {status}")]
    Exit { name: String, status: ExitStatus },
}

/// Where an output stream of the process goes.
#[derive(Clone, Debug, Default)]
pub enum Output {
    /// Discarded.
    #[default]
    Null,
    /// Shared with this process.
    Inherit,
    /// Appended to a shared buffer.
    Capture(Arc<Mutex<Vec<u8>>>),
}

impl Output {
    /// A fresh capture buffer, returned alongside the setting that fills it.
    pub fn capture() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (Output::Capture(Arc::clone(&buf)), buf)
    }

    fn stdio(&self) -> Stdio {
        match self {
            Output::Null => Stdio::null(),
            Output::Inherit => Stdio::inherit(),
            Output::Capture(_) => Stdio::piped(),
        }
    }

    fn drain<R>(&self, pipe: Option<R>) -> Option<JoinHandle<()>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (Output::Capture(buf), Some(mut pipe)) = (self, pipe) else {
            return None;
        };
        let buf = Arc::clone(buf);
        Some(tokio::spawn(async move {
            let mut data = Vec::new();
            let _ = pipe.read_to_end(&mut data).await;
            if let Ok(mut buf) = buf.lock() {
                buf.extend_from_slice(&data);
            }
        }))
    }
}

/// Runner for an external program.
///
/// # Example
/// ```no_run
/// use runvisor::{Context, Process, Runner};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let redis = Process::command("redis-server", ["--port", "6380"]).inherit_env();
/// redis.run(Context::new()).await.unwrap();
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Process {
    name: String,
    path: PathBuf,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    inherit_env: bool,
    do_not_inherit: Vec<String>,
    search_path: Option<OsString>,
    inherit_stdin: bool,
    stdout: Output,
    stderr: Output,
}

impl Process {
    /// Runs `path` with `args`. The name used in errors is the file name of `path`.
    pub fn command<I, S>(path: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path,
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            env: BTreeMap::new(),
            inherit_env: false,
            do_not_inherit: Vec::new(),
            search_path: None,
            inherit_stdin: false,
            stdout: Output::Null,
            stderr: Output::Null,
        }
    }

    /// Overrides the name used in errors.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Working directory of the program.
    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets an environment variable; wins over inherited ones.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Passes this process's environment on to the program.
    pub fn inherit_env(mut self) -> Self {
        self.inherit_env = true;
        self
    }

    /// Excludes `key` from the inherited environment.
    pub fn do_not_inherit(mut self, key: impl Into<String>) -> Self {
        self.do_not_inherit.push(key.into());
        self
    }

    /// Directories searched for a bare program name, in `PATH` syntax.
    ///
    /// Defaults to this process's `PATH`; the program's environment is not consulted.
    pub fn search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Shares stdin with this process (default: `/dev/null`).
    pub fn inherit_stdin(mut self) -> Self {
        self.inherit_stdin = true;
        self
    }

    pub fn stdout(mut self, out: Output) -> Self {
        self.stdout = out;
        self
    }

    pub fn stderr(mut self, out: Output) -> Self {
        self.stderr = out;
        self
    }

    fn build(&self) -> Command {
        let search = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        let mut cmd = Command::new(resolve_program(&self.path, search.as_deref()));
        cmd.args(&self.args)
            .process_group(0)
            .stdin(if self.inherit_stdin {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .stdout(self.stdout.stdio())
            .stderr(self.stderr.stdio());

        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        if self.inherit_env {
            for key in &self.do_not_inherit {
                cmd.env_remove(key);
            }
        } else {
            cmd.env_clear();
        }
        cmd.envs(&self.env);
        cmd
    }

    fn interrupt(&self, child: &Child) {
        let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        // The program leads its own group, so its pid is the group id.
        let _ = killpg(Pid::from_raw(pid), Signal::SIGINT);
    }
}

/// Resolves a bare program name against `search`; anything with a separator is kept.
fn resolve_program(program: &Path, search: Option<&OsStr>) -> PathBuf {
    let bare = !program.is_absolute() && program.components().count() == 1;
    if !bare {
        return program.to_path_buf();
    }
    search
        .into_iter()
        .flat_map(std::env::split_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .unwrap_or_else(|| program.to_path_buf())
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[async_trait]
impl Runner for Process {
    async fn run(&self, ctx: Context) -> Result<(), RunError> {
        let mut child = self.build().spawn().map_err(|source| {
            RunError::other(ProcessError::Spawn {
                name: self.name.clone(),
                source,
            })
        })?;
        let drains: Vec<_> = [
            self.stdout.drain(child.stdout.take()),
            self.stderr.drain(child.stderr.take()),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut interrupted = false;
        let waited = tokio::select! {
            status = child.wait() => status,
            _ = ctx.cancelled() => {
                self.interrupt(&child);
                interrupted = true;
                child.wait().await
            }
        };
        for drain in drains {
            let _ = drain.await;
        }

        let status = waited.map_err(|source| {
            RunError::other(ProcessError::Wait {
                name: self.name.clone(),
                source,
            })
        })?;
        let stopped_by_us = interrupted && status.signal() == Some(Signal::SIGINT as i32);
        if status.success() || stopped_by_us {
            Ok(())
        } else {
            Err(RunError::other(ProcessError::Exit {
                name: self.name.clone(),
                status,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    fn text(buf: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(buf.lock().unwrap().clone()).unwrap()
    }

    #[tokio::test]
    async fn test_captures_output() {
        let (out, buf) = Output::capture();
        let echo = Process::command("echo", ["Hello, World!"])
            .inherit_env()
            .stdout(out);

        echo.run(Context::new()).await.unwrap();
        assert_eq!(text(&buf), "Hello, World!\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let sh = Process::command("/bin/sh", ["-c", "exit 3"]);

        let err = sh.run(Context::new()).await.unwrap_err();
        match err.find::<ProcessError>() {
            Some(ProcessError::Exit { name, status }) => {
                assert_eq!(name, "sh");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = Process::command("/definitely/not/here", Vec::<String>::new())
            .run(Context::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.find::<ProcessError>(),
            Some(ProcessError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_environment() {
        let (out, buf) = Output::capture();
        let sh = Process::command("/bin/sh", ["-c", "printf '%s:%s' \"$FOO\" \"$HOME\""])
            .env("FOO", "bar")
            .stdout(out);

        sh.run(Context::new()).await.unwrap();
        assert_eq!(text(&buf), "bar:");
    }

    #[tokio::test]
    async fn test_bare_name_uses_parent_path() {
        let sh = Process::command("sh", ["-c", "exit 0"]);
        sh.run(Context::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_program_outside_system_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("runvisor-greet");
        std::fs::write(&script, "#!/bin/sh\nprintf greeted\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let (out, buf) = Output::capture();
        let greet = Process::command("runvisor-greet", Vec::<String>::new())
            .search_path(dir.path())
            .stdout(out);

        greet.run(Context::new()).await.unwrap();
        assert_eq!(text(&buf), "greeted");
    }

    #[test]
    fn test_resolve_program() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("not-executable");
        std::fs::write(&plain, "").unwrap();

        let search = dir.path().as_os_str();
        assert_eq!(
            resolve_program(Path::new("not-executable"), Some(search)),
            PathBuf::from("not-executable")
        );
        assert_eq!(
            resolve_program(Path::new("/bin/sh"), Some(search)),
            PathBuf::from("/bin/sh")
        );
        assert_eq!(
            resolve_program(Path::new("./tool"), None),
            PathBuf::from("./tool")
        );
    }

    #[tokio::test]
    async fn test_cancel_interrupts_process_group() {
        let ctx = Context::new();
        let sleeper = Process::command("sleep", ["30"]).inherit_env();

        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        sleeper.run(ctx).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
