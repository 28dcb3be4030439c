//! Producing the two renderings of a sample.
//!
//! The layout engine and the reference renderer are both external; they are reached through
//! [`CandidateRenderer`] and [`ReferenceRenderer`]. [`CommandRenderer`] drives a
//! mermaid-cli-compatible program, [`SvgDirRenderer`] serves pre-rendered files.

use crate::error::ReferenceError;
use serde::Serialize;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Flags passed to the headless browser behind the reference renderer.
pub const DEFAULT_BROWSER_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-gpu",
    "--no-zygote",
    "--disable-dev-shm-usage",
];

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One sample to render.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Path of the sample source, used for naming and lookups.
    pub sample: &'a Path,
    pub source: &'a str,
    pub width: u32,
    pub height: u32,
}

pub trait CandidateRenderer {
    fn render_candidate(
        &self,
        request: &RenderRequest<'_>,
        cancel: &CancelToken,
    ) -> Result<String, ReferenceError>;
}

pub trait ReferenceRenderer {
    fn render_reference(
        &self,
        request: &RenderRequest<'_>,
        cancel: &CancelToken,
    ) -> Result<String, ReferenceError>;
}

/// Runs `<program> [leading args] -i <input> -o <output> -w W -H H [--puppeteerConfigFile <cfg>]`
/// on scratch files that are unique per call and removed afterwards.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    timeout: Duration,
    poll_interval: Duration,
    browser_args: Option<Vec<String>>,
    leading_args: Vec<String>,
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::new("mmdc")
    }
}

#[derive(Serialize)]
struct BrowserConfig<'a> {
    args: &'a [String],
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_millis(25_000),
            poll_interval: Duration::from_millis(50),
            browser_args: Some(DEFAULT_BROWSER_ARGS.iter().map(|s| s.to_string()).collect()),
            leading_args: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// `None` skips writing a browser config file and its flag.
    pub fn with_browser_args(mut self, args: Option<Vec<String>>) -> Self {
        self.browser_args = args;
        self
    }

    /// Arguments placed before the renderer flags, e.g. a script for an interpreter program.
    pub fn with_leading_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether `<program> --version` runs and succeeds.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .args(&self.leading_args)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    pub fn render(
        &self,
        request: &RenderRequest<'_>,
        cancel: &CancelToken,
    ) -> Result<String, ReferenceError> {
        let mut input = tempfile::Builder::new()
            .prefix("remora-in-")
            .suffix(".mmd")
            .tempfile()?;
        input.write_all(request.source.as_bytes())?;
        input.flush()?;
        let output = tempfile::Builder::new()
            .prefix("remora-out-")
            .suffix(".svg")
            .tempfile()?;
        let mut stderr = tempfile::tempfile()?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("-i")
            .arg(input.path())
            .arg("-o")
            .arg(output.path())
            .arg("-w")
            .arg(request.width.to_string())
            .arg("-H")
            .arg(request.height.to_string());

        let _config = match &self.browser_args {
            Some(args) => {
                let mut cfg = tempfile::Builder::new()
                    .prefix("remora-browser-")
                    .suffix(".json")
                    .tempfile()?;
                serde_json::to_writer(&mut cfg, &BrowserConfig { args })
                    .map_err(std::io::Error::from)?;
                cfg.flush()?;
                cmd.arg("--puppeteerConfigFile").arg(cfg.path());
                Some(cfg)
            }
            None => None,
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr.try_clone()?));

        tracing::debug!(
            program = %self.program,
            sample = %request.sample.display(),
            "spawning renderer"
        );
        let mut child = cmd.spawn().map_err(|source| ReferenceError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                tracing::info!(program = %self.program, "renderer cancelled");
                return Err(ReferenceError::Cancelled);
            }
            if start.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(
                    program = %self.program,
                    sample = %request.sample.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "renderer timed out"
                );
                return Err(ReferenceError::Timeout {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
            std::thread::sleep(self.poll_interval);
        };

        if !status.success() {
            let mut captured = String::new();
            stderr.seek(SeekFrom::Start(0))?;
            stderr.read_to_string(&mut captured)?;
            return Err(ReferenceError::Exit {
                program: self.program.clone(),
                code: status.code(),
                stderr: captured.trim().to_string(),
            });
        }

        let svg = fs::read_to_string(output.path())?;
        if svg.trim().is_empty() {
            return Err(ReferenceError::MissingOutput {
                path: output.path().to_path_buf(),
            });
        }
        Ok(svg)
    }
}

impl CandidateRenderer for CommandRenderer {
    fn render_candidate(
        &self,
        request: &RenderRequest<'_>,
        cancel: &CancelToken,
    ) -> Result<String, ReferenceError> {
        self.render(request, cancel)
    }
}

impl ReferenceRenderer for CommandRenderer {
    fn render_reference(
        &self,
        request: &RenderRequest<'_>,
        cancel: &CancelToken,
    ) -> Result<String, ReferenceError> {
        self.render(request, cancel)
    }
}

/// Serves `<dir>/<sample stem>.svg`.
#[derive(Debug, Clone)]
pub struct SvgDirRenderer {
    dir: PathBuf,
}

impl SvgDirRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, sample: &Path) -> PathBuf {
        let stem = sample.file_stem().unwrap_or(sample.as_os_str());
        let mut name = stem.to_os_string();
        name.push(".svg");
        self.dir.join(name)
    }

    pub fn render(&self, request: &RenderRequest<'_>) -> Result<String, ReferenceError> {
        let path = self.path_for(request.sample);
        match fs::read_to_string(&path) {
            Ok(svg) if !svg.trim().is_empty() => Ok(svg),
            Ok(_) => Err(ReferenceError::MissingOutput { path }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ReferenceError::MissingOutput { path })
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl CandidateRenderer for SvgDirRenderer {
    fn render_candidate(
        &self,
        request: &RenderRequest<'_>,
        _cancel: &CancelToken,
    ) -> Result<String, ReferenceError> {
        self.render(request)
    }
}

impl ReferenceRenderer for SvgDirRenderer {
    fn render_reference(
        &self,
        request: &RenderRequest<'_>,
        _cancel: &CancelToken,
    ) -> Result<String, ReferenceError> {
        self.render(request)
    }
}
