use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::config::TranscodeConfig;
use crate::platform::AudioFormat;

/// Errors reported by the external transcoding process
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Conversion I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts the recordings of a directory to another audio format
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, directory: &Path, format: AudioFormat) -> Result<(), TranscodeError>;
}

/// Runs a conversion script as a child process.
///
/// Arguments may contain `{script}`, `{dir}` and `{format}` placeholders.
pub struct ScriptTranscoder {
    program: String,
    args: Vec<String>,
    script: PathBuf,
}

impl ScriptTranscoder {
    pub fn new(program: impl Into<String>, args: Vec<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            script: script.into(),
        }
    }

    /// Build from configuration; a relative script path resolves against `base_dir`
    pub fn from_config(config: &TranscodeConfig, base_dir: &Path) -> Self {
        let script = if config.script.is_absolute() {
            config.script.clone()
        } else {
            base_dir.join(&config.script)
        };
        Self::new(config.program.clone(), config.args.clone(), script)
    }

    /// Command line arguments with placeholders filled in
    pub fn arguments(&self, directory: &Path, format: AudioFormat) -> Vec<String> {
        let script = self.script.to_string_lossy();
        let directory = directory.to_string_lossy();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{script}", &script)
                    .replace("{dir}", &directory)
                    .replace("{format}", format.as_str())
            })
            .collect()
    }
}

#[async_trait]
impl Transcoder for ScriptTranscoder {
    async fn transcode(&self, directory: &Path, format: AudioFormat) -> Result<(), TranscodeError> {
        let args = self.arguments(directory, format);
        tracing::debug!("Running {} {:?}", self.program, args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_task = async move {
            if let Some(stdout) = stdout {
                for_each_line(stdout, |line| tracing::info!("{}", line)).await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let stderr_task = async move {
            let mut collected = String::new();
            if let Some(stderr) = stderr {
                for_each_line(stderr, |line| {
                    tracing::error!("Conversion error: {}", line);
                    collected.push_str(line);
                    collected.push('\n');
                })
                .await?;
            }
            Ok::<_, std::io::Error>(collected)
        };

        let (stdout_result, stderr_result) = tokio::join!(stdout_task, stderr_task);

        // Reap the child before looking at reader errors
        let status = child.wait().await?;
        if let Err(e) = &stdout_result {
            tracing::warn!("Could not read conversion output: {}", e);
        }
        let stderr_output = stderr_result.unwrap_or_else(|e| {
            tracing::warn!("Could not read conversion errors: {}", e);
            String::new()
        });

        if status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Failed {
                code: status.code(),
                stderr: stderr_output.trim_end().to_string(),
            })
        }
    }
}

/// Feed each non-empty trimmed line to `handle`; invalid UTF-8 is replaced, not rejected
async fn for_each_line<R, F>(reader: R, mut handle: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if !line.is_empty() {
            handle(line);
        }
    }
}
