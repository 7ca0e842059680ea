//! Runner for the external playbook binary.
//!
//! Every run is `<binary> <playbook> -t <tag> [-e key=value ...] <verbosity>`
//! with stdout and stderr streamed line by line into a per-operation log file
//! and an in-memory transcript. The log file starts with the command line.
//! Registered secrets are masked in both.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::constants::{MASK, OUTPUT_GRACE, ROTATED_LOG_SUFFIX};
use crate::core::{DrError, Result};

/// Builder for one playbook run.
#[derive(Debug, Clone)]
pub struct PlaybookCommand {
    binary: String,
    playbook: PathBuf,
    tag: String,
    extra_vars: Vec<(String, String)>,
    verbosity: Option<String>,
    current_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    timeout: Duration,
    secrets: Vec<String>,
}

/// Output of a successful run.
#[derive(Debug, Clone)]
pub struct PlaybookOutput {
    /// Interleaved stdout and stderr, secrets masked
    pub output: String,
    pub elapsed: Duration,
}

impl PlaybookCommand {
    pub fn new(binary: impl Into<String>, playbook: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            playbook: playbook.into(),
            tag: tag.into(),
            extra_vars: Vec::new(),
            verbosity: None,
            current_dir: None,
            log_file: None,
            timeout: Duration::from_secs(crate::constants::DEFAULT_PLAYBOOK_TIMEOUT_SECS),
            secrets: Vec::new(),
        }
    }

    /// Add an `-e key=value` pair.
    pub fn extra_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_vars.push((key.into(), value.into()));
        self
    }

    pub fn verbosity(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        self.verbosity = (!flag.is_empty()).then_some(flag);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Stream output into `path`, moving a previous log to `<path>.old`.
    pub fn log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.log_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub const fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Text replaced with `********` in the echoed command and the output.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    pub fn secrets(self, secrets: impl IntoIterator<Item = String>) -> Self {
        secrets.into_iter().fold(self, |cmd, secret| cmd.secret(secret))
    }

    fn playbook_name(&self) -> String {
        self.playbook
            .file_name()
            .map_or_else(|| self.playbook.display().to_string(), |n| n.to_string_lossy().to_string())
    }

    /// Arguments after the binary.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.playbook.display().to_string(), "-t".to_string(), self.tag.clone()];
        for (key, value) in &self.extra_vars {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        if let Some(flag) = &self.verbosity {
            args.push(flag.clone());
        }
        args
    }

    /// The command line as echoed into logs, secrets masked.
    #[must_use]
    pub fn display_line(&self) -> String {
        let line = std::iter::once(self.binary.clone())
            .chain(self.args().into_iter().map(|a| format!("'{a}'")))
            .collect::<Vec<_>>()
            .join(" ");
        mask(&line, &self.secrets)
    }

    /// Run to completion or until the timeout elapses.
    ///
    /// A missing binary fails before anything is written. On timeout the
    /// child is killed and the output captured so far is returned in the
    /// error.
    pub async fn execute(self) -> Result<PlaybookOutput> {
        let binary = which::which(&self.binary).map_err(|_| DrError::BinaryNotFound {
            binary: self.binary.clone(),
        })?;
        let playbook = self.playbook_name();
        let start = Instant::now();

        let log = match &self.log_file {
            Some(path) => Some(open_log(path, &self.display_line()).await?),
            None => None,
        };

        let mut cmd = Command::new(&binary);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        debug!(target: "site::playbook", playbook = %self.playbook.display(), tag = %self.tag, "{}", self.display_line());
        let mut child = cmd.spawn().map_err(|e| DrError::fs("spawn playbook", &binary, &e))?;

        let transcript = Arc::new(Mutex::new(Transcript {
            text: String::new(),
            log,
            secrets: self.secrets.clone(),
        }));
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(pump(stdout, Arc::clone(&transcript)));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(pump(stderr, Arc::clone(&transcript)));
        }

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(status) => Some(status.map_err(|e| DrError::fs("wait for playbook", &binary, &e))?),
            Err(_) => {
                warn!(target: "site::playbook", %playbook, tag = %self.tag, "timed out after {}s, killing", self.timeout.as_secs());
                if let Err(e) = child.kill().await {
                    warn!(target: "site::playbook", "failed to kill playbook: {e}");
                }
                None
            }
        };

        drain(pumps).await;
        let output = {
            let mut transcript = transcript.lock().await;
            if status.is_none() {
                let note = format!("killed after {}s timeout", self.timeout.as_secs());
                transcript.append(&note).await;
            }
            transcript.flush().await;
            transcript.text.clone()
        };
        let elapsed = start.elapsed();

        let Some(status) = status else {
            return Err(DrError::PlaybookTimeout {
                playbook,
                tag: self.tag,
                seconds: self.timeout.as_secs(),
                output,
            });
        };
        if !status.success() {
            debug!(target: "site::playbook", %playbook, code = ?status.code(), "playbook failed");
            return Err(DrError::PlaybookFailed {
                playbook,
                tag: self.tag,
                exit_code: status.code(),
                output,
            });
        }

        info!(target: "site::playbook", %playbook, tag = %self.tag, "completed in {:.1}s", elapsed.as_secs_f64());
        Ok(PlaybookOutput {
            output,
            elapsed,
        })
    }
}

struct Transcript {
    text: String,
    log: Option<File>,
    secrets: Vec<String>,
}

impl Transcript {
    async fn append(&mut self, line: &str) {
        let line = mask(line, &self.secrets);
        self.text.push_str(&line);
        self.text.push('\n');
        let failed = match &mut self.log {
            Some(log) => log.write_all(format!("{line}\n").as_bytes()).await.err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!(target: "site::playbook", "failed to write log: {e}");
            self.log = None;
        }
    }

    async fn flush(&mut self) {
        if let Some(log) = &mut self.log {
            let _ = log.flush().await;
        }
    }
}

fn pump<R>(reader: R, transcript: Arc<Mutex<Transcript>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            transcript.lock().await.append(&line).await;
        }
    })
}

/// Wait for the output pumps, giving up after a short grace period when a
/// grandchild keeps a pipe open.
async fn drain(pumps: Vec<JoinHandle<()>>) {
    let aborts: Vec<_> = pumps.iter().map(JoinHandle::abort_handle).collect();
    let all = async {
        for pump in pumps {
            let _ = pump.await;
        }
    };
    if timeout(OUTPUT_GRACE, all).await.is_err() {
        debug!(target: "site::playbook", "output still open after grace period, detaching");
        for handle in aborts {
            handle.abort();
        }
    }
}

async fn open_log(path: &Path, header: &str) -> Result<File> {
    if fs::try_exists(path).await.map_err(|e| DrError::fs("check log", path, &e))? {
        let mut rotated = path.as_os_str().to_owned();
        rotated.push(ROTATED_LOG_SUFFIX);
        fs::rename(path, &rotated).await.map_err(|e| DrError::fs("rotate log", path, &e))?;
    }
    let mut file = File::create(path).await.map_err(|e| DrError::fs("create log", path, &e))?;
    file.write_all(format!("{header}\n").as_bytes())
        .await
        .map_err(|e| DrError::fs("write log", path, &e))?;
    Ok(file)
}

/// Replace every occurrence of each secret with a fixed mask.
#[must_use]
pub fn mask(text: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(text.to_string(), |text, secret| text.replace(secret.as_str(), MASK))
}
