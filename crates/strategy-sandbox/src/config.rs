//! Engine configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SandboxError, SandboxResult};
use crate::gather::DEFAULT_HISTORY_WINDOW;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_KILL_GRACE_MS: u64 = 2_000;

const ENV_PREFIX: &str = "STRATEGY_SANDBOX_";

/// How the interpreter is started. Either way the program arrives on stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Launcher {
    /// `uv run --with <lib>... python -`: resolves the program's libraries
    /// into a throwaway environment.
    Uv { program: String },
    /// `<interpreter> -`: whatever the interpreter already has installed.
    Python { program: String },
}

impl Default for Launcher {
    fn default() -> Self {
        Self::uv()
    }
}

impl Launcher {
    pub fn uv() -> Self {
        Self::Uv {
            program: "uv".to_string(),
        }
    }

    pub fn python(program: impl Into<String>) -> Self {
        Self::Python {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        match self {
            Self::Uv { program } | Self::Python { program } => program,
        }
    }

    pub fn args(&self, requirements: &[String]) -> Vec<String> {
        match self {
            Self::Uv { .. } => {
                let mut args = vec!["run".to_string()];
                for requirement in requirements {
                    args.push("--with".to_string());
                    args.push(requirement.clone());
                }
                args.push("python".to_string());
                args.push("-".to_string());
                args
            }
            Self::Python { .. } => vec!["-".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock budget per invocation unless the request overrides it.
    pub timeout_secs: u64,
    /// Daily bars fetched per requested symbol.
    pub history_window: usize,
    pub launcher: Launcher,
    pub working_dir: Option<PathBuf>,
    /// Capture cap per output stream.
    pub max_output_bytes: usize,
    /// When set, every program is written here as `<digest>.py` before it runs.
    pub debug_dump_dir: Option<PathBuf>,
    /// How long to keep draining pipes after a timed-out child is killed.
    pub kill_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            history_window: DEFAULT_HISTORY_WINDOW,
            launcher: Launcher::default(),
            working_dir: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            debug_dump_dir: None,
            kill_grace_ms: DEFAULT_KILL_GRACE_MS,
        }
    }
}

impl EngineConfig {
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_history_window(mut self, bars: usize) -> Self {
        self.history_window = bars;
        self
    }

    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn with_debug_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dump_dir = Some(dir.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Load from the process environment.
    ///
    /// Reads (all optional):
    /// - STRATEGY_SANDBOX_TIMEOUT_SECS (default: 30)
    /// - STRATEGY_SANDBOX_HISTORY_WINDOW (default: 30)
    /// - STRATEGY_SANDBOX_LAUNCHER: "uv" (default) or "python"
    /// - STRATEGY_SANDBOX_UV (default: "uv")
    /// - STRATEGY_SANDBOX_PYTHON (default: "python3")
    /// - STRATEGY_SANDBOX_WORKDIR
    /// - STRATEGY_SANDBOX_MAX_OUTPUT_BYTES (default: 1048576)
    /// - STRATEGY_SANDBOX_DEBUG_DUMP_DIR
    /// - STRATEGY_SANDBOX_KILL_GRACE_MS (default: 2000)
    pub fn from_env() -> SandboxResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] over an arbitrary lookup. Empty
    /// values count as unset.
    pub fn from_lookup<F>(lookup: F) -> SandboxResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(v) = get("TIMEOUT_SECS") {
            config.timeout_secs = parse("TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("HISTORY_WINDOW") {
            config.history_window = parse("HISTORY_WINDOW", &v)?;
        }
        if let Some(v) = get("MAX_OUTPUT_BYTES") {
            config.max_output_bytes = parse("MAX_OUTPUT_BYTES", &v)?;
        }
        if let Some(v) = get("KILL_GRACE_MS") {
            config.kill_grace_ms = parse("KILL_GRACE_MS", &v)?;
        }
        config.working_dir = get("WORKDIR").map(PathBuf::from);
        config.debug_dump_dir = get("DEBUG_DUMP_DIR").map(PathBuf::from);

        config.launcher = match get("LAUNCHER").map(|v| v.to_lowercase()).as_deref() {
            None | Some("uv") => Launcher::Uv {
                program: get("UV").unwrap_or_else(|| "uv".to_string()),
            },
            Some("python") => Launcher::python(get("PYTHON").unwrap_or_else(|| "python3".to_string())),
            Some(other) => {
                return Err(SandboxError::InvalidConfig(format!(
                    "{ENV_PREFIX}LAUNCHER must be 'uv' or 'python', got '{other}'"
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SandboxResult<()> {
        if self.timeout_secs == 0 {
            return Err(SandboxError::InvalidConfig(
                "timeout must be at least one second".to_string(),
            ));
        }
        if self.history_window == 0 {
            return Err(SandboxError::InvalidConfig(
                "history window must be at least one bar".to_string(),
            ));
        }
        if self.launcher.program().trim().is_empty() {
            return Err(SandboxError::InvalidConfig(
                "launcher program is empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> SandboxResult<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        SandboxError::InvalidConfig(format!("{ENV_PREFIX}{name}='{value}': {e}"))
    })
}
