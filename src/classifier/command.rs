use super::{prompt::build_prompt, reply::parse_reply, Classification, Classifier};
use crate::{
    config::Config,
    error::{Result, SplitError},
    store::SourcePdf,
    usage::UsageMetrics,
};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Request written to the worker's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub input_pdf: PathBuf,
    pub total_pages: u32,
    pub prompt: String,
    pub model: String,
    pub render_scale: f32,
}

/// Envelope the worker prints on stdout: the raw model text plus counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyEnvelope {
    pub text: String,
    #[serde(default)]
    pub usage: Option<UsageMetrics>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Runs an external worker process per source document.
pub struct CommandClassifier {
    program: PathBuf,
    args: Vec<String>,
    model: String,
    render_scale: f32,
    timeout: Option<Duration>,
    keep_stderr: bool,
    env: Vec<(String, String)>,
}

impl CommandClassifier {
    pub fn new(cfg: &Config) -> Result<Self> {
        let c = &cfg.classifier;
        let program = c.program.trim();
        if program.is_empty() {
            return Err(SplitError::Validation("classifier.program is empty".into()));
        }
        Ok(Self {
            program: expand_tilde(program),
            args: c.args.clone(),
            model: c.model.clone(),
            render_scale: c.render_scale,
            timeout: (c.timeout_seconds > 0).then(|| Duration::from_secs(c.timeout_seconds)),
            keep_stderr: c.keep_stderr,
            env: c.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        })
    }

    fn run(&self, req: &ClassifyRequest) -> Result<ClassifyEnvelope> {
        debug!(
            "classifier run {} timeout={:?}",
            self.program.display(),
            self.timeout
        );
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        // Own process group, so a timeout can take down anything the worker spawned.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| {
            SplitError::Classification(format!("spawning {}: {e}", self.program.display()))
        })?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| SplitError::Classification("classifier has no stdin".into()))?;
            let bytes = serde_json::to_vec(req)
                .map_err(|e| SplitError::Classification(format!("encoding request: {e}")))?;
            stdin
                .write_all(&bytes)
                .map_err(|e| SplitError::Classification(format!("writing request: {e}")))?;
            stdin.flush().ok();
        }

        let output = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
            None => child
                .wait_with_output()
                .map_err(|e| SplitError::Classification(format!("waiting for classifier: {e}")))?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitError::Classification(format!(
                "classifier exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if self.keep_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("classifier stderr: {}", stderr.trim());
        }

        let envelope: ClassifyEnvelope = serde_json::from_slice(&output.stdout)
            .map_err(|e| SplitError::Classification(format!("parsing worker output: {e}")))?;
        if let Some(err) = envelope.error {
            return Err(SplitError::Classification(err));
        }
        Ok(envelope)
    }
}

impl Classifier for CommandClassifier {
    fn classify(&self, source: &SourcePdf) -> Result<Classification> {
        let total_pages = source.page_count();
        let req = ClassifyRequest {
            input_pdf: source.path().to_path_buf(),
            total_pages,
            prompt: build_prompt(total_pages),
            model: self.model.clone(),
            render_scale: self.render_scale,
        };
        let envelope = self.run(&req)?;
        let reply = parse_reply(&envelope.text, total_pages)?;
        info!(
            "classified {} documents in {} (confidence {:?})",
            reply.documents.len(),
            source.path().display(),
            reply.analysis_confidence
        );
        let confidence = reply.analysis_confidence;
        Ok(Classification {
            buckets: reply.into_buckets(),
            confidence,
            usage: envelope.usage,
        })
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a chatty worker can't block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let join = |h: std::thread::JoinHandle<std::io::Result<Vec<u8>>>| -> Result<Vec<u8>> {
        h.join()
            .map_err(|_| SplitError::Classification("pipe reader thread panicked".into()))?
            .map_err(|e| SplitError::Classification(format!("reading classifier output: {e}")))
    };

    let start = Instant::now();
    loop {
        let polled = child
            .try_wait()
            .map_err(|e| SplitError::Classification(format!("try_wait: {e}")))?;
        if let Some(status) = polled {
            return Ok(Output {
                status,
                stdout: join(stdout_thread)?,
                stderr: join(stderr_thread)?,
            });
        }

        if start.elapsed() > timeout {
            warn!("classifier timed out after {:?}", timeout);
            kill_group(child);
            let _ = child.kill();
            let _ = child.wait();
            // Grandchildren may still hold the pipes, so the reader threads are
            // detached rather than joined.
            return Err(SplitError::Classification(format!(
                "classifier exceeded timeout ({timeout:?})"
            )));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(unix)]
fn kill_group(child: &Child) {
    let status = Command::new("kill")
        .arg("-KILL")
        .arg(format!("-{}", child.id()))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(err) = status {
        debug!("killing process group {}: {err}", child.id());
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}
