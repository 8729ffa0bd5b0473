//! Child process execution under a wall-clock budget.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{EngineConfig, Launcher, DEFAULT_KILL_GRACE_MS, DEFAULT_MAX_OUTPUT_BYTES};
use crate::error::{SandboxError, SandboxResult};
use crate::outcome::{ExecutionOutcome, OutcomeKind};
use crate::synth::SynthesizedProgram;

const READ_CHUNK: usize = 8 * 1024;

/// Output of one stream, possibly cut at the capture cap.
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn into_text(self, cap: usize) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(&format!("\n[output truncated at {cap} bytes]\n"));
        }
        text
    }
}

/// Runs synthesized programs, one child per call.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    launcher: Launcher,
    working_dir: Option<PathBuf>,
    max_output_bytes: usize,
    debug_dump_dir: Option<PathBuf>,
    kill_grace: Duration,
}

impl ProcessRunner {
    pub fn new(launcher: Launcher) -> Self {
        Self {
            launcher,
            working_dir: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            debug_dump_dir: None,
            kill_grace: Duration::from_millis(DEFAULT_KILL_GRACE_MS),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            launcher: config.launcher.clone(),
            working_dir: config.working_dir.clone(),
            max_output_bytes: config.max_output_bytes,
            debug_dump_dir: config.debug_dump_dir.clone(),
            kill_grace: config.kill_grace(),
        }
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn with_debug_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dump_dir = Some(dir.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Run `program` and wait at most `budget` for it.
    ///
    /// Always returns an outcome: spawn and pipe failures become `Failed`.
    pub async fn run(&self, program: &SynthesizedProgram, budget: Duration) -> ExecutionOutcome {
        let start = Instant::now();
        match self.try_run(program, budget, start).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let mut outcome = ExecutionOutcome::failed(&err);
                outcome.duration = start.elapsed();
                outcome
            }
        }
    }

    async fn try_run(
        &self,
        program: &SynthesizedProgram,
        budget: Duration,
        start: Instant,
    ) -> SandboxResult<ExecutionOutcome> {
        if let Some(dir) = &self.debug_dump_dir {
            dump_program(dir, program).await;
        }

        let args = self.launcher.args(program.requirements());
        debug!(program = %self.launcher.program(), args = ?args, "spawning interpreter");

        let mut command = Command::new(self.launcher.program());
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
            program: self.launcher.program().to_string(),
            source,
        })?;
        let group = ProcessGroup::new(child.id());

        let cap = self.max_output_bytes;
        let stdout = tokio::spawn(read_capped(child.stdout.take(), cap));
        let stderr = tokio::spawn(read_capped(child.stderr.take(), cap));

        if let Some(mut stdin) = child.stdin.take() {
            let source = program.source().as_bytes().to_vec();
            tokio::spawn(async move {
                // The child may exit before reading everything.
                if let Err(e) = stdin.write_all(&source).await {
                    debug!(error = %e, "program write to stdin stopped early");
                }
            });
        }

        let (kind, exit_status) = match tokio::time::timeout(budget, child.wait()).await {
            Ok(status) => (OutcomeKind::Completed, status?.code()),
            Err(_) => {
                warn!(budget_ms = budget.as_millis() as u64, "execution budget exceeded, killing child");
                kill_child(&mut child, &group).await;
                (OutcomeKind::TimedOut { budget }, None)
            }
        };

        let deadline = tokio::time::Instant::now() + self.kill_grace;
        let (stdout, stderr) = tokio::join!(
            collect(stdout, deadline),
            collect(stderr, deadline)
        );
        if stdout.is_none() || stderr.is_none() {
            // Something outside the child still holds the pipes.
            group.kill();
        }
        group.release();

        Ok(ExecutionOutcome {
            kind,
            stdout: stdout.unwrap_or_default().into_text(cap),
            stderr: stderr.unwrap_or_default().into_text(cap),
            exit_status,
            duration: start.elapsed(),
        })
    }
}

/// Drain `reader` to EOF, keeping at most `cap` bytes. Excess is read and
/// dropped so the writer never blocks on a full pipe.
async fn read_capped<R>(reader: Option<R>, cap: usize) -> Captured
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let Some(mut reader) = reader else {
        return captured;
    };
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = cap.saturating_sub(captured.bytes.len());
                if n > room {
                    captured.truncated = true;
                }
                captured.bytes.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) => {
                debug!(error = %e, "output stream read failed");
                break;
            }
        }
    }
    captured
}

async fn collect(mut handle: JoinHandle<Captured>, deadline: tokio::time::Instant) -> Option<Captured> {
    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(Ok(captured)) => Some(captured),
        Ok(Err(e)) => {
            warn!(error = %e, "output reader task failed");
            Some(Captured::default())
        }
        Err(_) => {
            handle.abort();
            None
        }
    }
}

/// The child's process group, killed on drop unless released.
///
/// The run future can be dropped at any await point. `kill_on_drop` only
/// reaches the direct child, which for `uv` is not the interpreter.
struct ProcessGroup {
    pid: Option<u32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    fn kill(&self) {
        kill_process_group(self.pid);
    }

    fn release(mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.take() {
            debug!(pid, "run dropped before completion, killing process group");
            kill_process_group(Some(pid));
        }
    }
}

/// Kill the child together with everything it started, then reap it.
async fn kill_child(child: &mut Child, group: &ProcessGroup) {
    group.kill();
    if let Err(e) = child.kill().await {
        debug!(error = %e, "child kill after group kill failed");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // SAFETY: the child was spawned with process_group(0), so its pid is
        // also its process group id. killpg has no memory-safety preconditions.
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

async fn dump_program(dir: &Path, program: &SynthesizedProgram) {
    let path = dir.join(format!("{}.py", program.digest()));
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, program.source()).await
    }
    .await;
    match result {
        Ok(()) => debug!(path = %path.display(), "program dumped"),
        Err(e) => warn!(path = %path.display(), error = %e, "program dump failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ExecutionRequest;
    use crate::snapshot::ContextSnapshot;
    use crate::synth::synthesize;

    fn python3_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn program(code: &str) -> SynthesizedProgram {
        synthesize(&ExecutionRequest::new(code), &ContextSnapshot::default()).unwrap()
    }

    #[tokio::test]
    async fn test_read_capped_truncates() {
        let data = vec![b'a'; 100];
        let captured = read_capped(Some(&data[..]), 10).await;
        assert_eq!(captured.bytes.len(), 10);
        assert!(captured.truncated);
        let text = captured.into_text(10);
        assert!(text.starts_with("aaaaaaaaaa\n[output truncated at 10 bytes]"));
    }

    #[tokio::test]
    async fn test_read_capped_within_limit() {
        let captured = read_capped(Some(&b"hello"[..]), 10).await;
        assert!(!captured.truncated);
        assert_eq!(captured.into_text(10), "hello");
        let none = read_capped::<&[u8]>(None, 10).await;
        assert!(none.bytes.is_empty());
    }

    #[test]
    fn test_lossy_decoding() {
        let captured = Captured {
            bytes: vec![b'o', b'k', 0xff, b'!'],
            truncated: false,
        };
        assert_eq!(captured.into_text(100), "ok\u{fffd}!");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_failed_outcome() {
        let runner = ProcessRunner::new(Launcher::python("/nonexistent/python-interpreter"));
        let outcome = runner.run(&program("print(1)"), Duration::from_secs(5)).await;
        match &outcome.kind {
            OutcomeKind::Failed { error_kind, message } => {
                assert_eq!(error_kind, "SpawnError");
                assert!(message.contains("/nonexistent/python-interpreter"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_runs_program_over_stdin() {
        if !python3_available() {
            return;
        }
        let runner = ProcessRunner::new(Launcher::python("python3"));
        let outcome = runner.run(&program("print(6 * 7)"), Duration::from_secs(30)).await;
        assert!(outcome.is_completed(), "{outcome:?}");
        assert_eq!(outcome.exit_status, Some(0));
        assert!(outcome.stdout.contains("42\n"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_still_completed() {
        if !python3_available() {
            return;
        }
        let runner = ProcessRunner::new(Launcher::python("python3"));
        let outcome = runner
            .run(&program("import sys\nsys.exit(3)"), Duration::from_secs(30))
            .await;
        assert!(outcome.is_completed());
        assert_eq!(outcome.exit_status, Some(3));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        if !python3_available() {
            return;
        }
        let runner = ProcessRunner::new(Launcher::python("python3"));
        let code = "import sys\nprint('started')\nsys.stdout.flush()\nwhile True:\n    pass";
        let outcome = runner.run(&program(code), Duration::from_secs(1)).await;
        assert!(outcome.is_timed_out(), "{outcome:?}");
        assert!(outcome.exit_status.is_none());
        assert!(outcome.stdout.contains("started"));
        assert!(outcome.duration < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_output_cap_applies_per_stream() {
        if !python3_available() {
            return;
        }
        let runner = ProcessRunner::new(Launcher::python("python3")).with_max_output_bytes(256);
        let outcome = runner
            .run(&program("print('x' * 100000)"), Duration::from_secs(30))
            .await;
        assert!(outcome.is_completed());
        assert!(outcome.stdout.contains("[output truncated at 256 bytes]"));
        assert!(outcome.stdout.len() < 400);
    }

    #[tokio::test]
    async fn test_debug_dump_written() {
        if !python3_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let dump_dir = dir.path().join("dumps");
        let runner = ProcessRunner::new(Launcher::python("python3")).with_debug_dump_dir(&dump_dir);
        let program = program("print('dumped')");
        let outcome = runner.run(&program, Duration::from_secs(30)).await;
        assert!(outcome.is_completed());

        let dumped = std::fs::read_to_string(dump_dir.join(format!("{}.py", program.digest()))).unwrap();
        assert_eq!(dumped, program.source());
    }

    /// Wrapper launcher that keeps the interpreter one level down, as `uv`
    /// does. Launcher arguments are ignored.
    #[cfg(target_os = "linux")]
    fn nested_launcher(dir: &Path) -> Launcher {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("nested-launcher.sh");
        std::fs::write(&script, "#!/bin/sh\npython3 -\necho launcher done\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        Launcher::Uv {
            program: script.display().to_string(),
        }
    }

    #[cfg(target_os = "linux")]
    fn assert_not_running(pid: u32) {
        // Gone, or a zombie waiting for init to reap it.
        if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            let state = stat
                .rsplit(')')
                .next()
                .and_then(|rest| rest.split_whitespace().next())
                .unwrap_or("?");
            assert_eq!(state, "Z", "process {pid} still running: {stat}");
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropped_run_kills_nested_interpreter() {
        if !python3_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("interpreter.pid");
        let code = format!(
            "import os\nopen({:?}, 'w').write(str(os.getpid()))\nwhile True:\n    pass",
            pid_file.display().to_string()
        );
        let runner = ProcessRunner::new(nested_launcher(dir.path()));
        let program = program(&code);

        let mut run = Box::pin(runner.run(&program, Duration::from_secs(60)));
        let pid = tokio::select! {
            outcome = &mut run => panic!("run finished before cancellation: {outcome:?}"),
            pid = wait_for_pid(&pid_file) => pid,
        };
        drop(run);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_not_running(pid);
    }

    #[cfg(target_os = "linux")]
    async fn wait_for_pid(path: &Path) -> u32 {
        loop {
            if let Ok(text) = tokio::fs::read_to_string(path).await {
                if let Ok(pid) = text.trim().parse() {
                    return pid;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_completed_run_through_nested_launcher() {
        if !python3_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(nested_launcher(dir.path()));
        let outcome = runner
            .run(&program("print('nested ok')"), Duration::from_secs(30))
            .await;
        assert!(outcome.is_completed(), "{outcome:?}");
        assert!(outcome.stdout.contains("nested ok\n"));
        assert!(outcome.stdout.ends_with("launcher done\n"));
    }

    #[tokio::test]
    async fn test_working_dir_is_applied() {
        if !python3_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let runner = ProcessRunner::new(Launcher::python("python3")).with_working_dir(dir.path());
        let outcome = runner
            .run(&program("print(open('marker.txt').read())"), Duration::from_secs(30))
            .await;
        assert!(outcome.stdout.contains("here"), "{outcome:?}");
    }
}
