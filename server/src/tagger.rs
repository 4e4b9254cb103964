//! Image → caption collaborator.
//!
//! The index only ever sees caption strings; how an image is turned into one is
//! behind [`Tagger`]. [`CommandTagger`] shells out to an external model such as
//! DeepDanbooru and picks up the `<stem>.txt` file it writes next to the image.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("failed to run tagger: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("tagger exited with {status}: {stderr}")]
    Failed { status: std::process::ExitStatus, stderr: String },

    #[error("tagger produced no caption for {0}")]
    NoCaption(String),
}

#[async_trait]
pub trait Tagger: Send + Sync {
    /// Caption `image` as comma-space separated tags.
    async fn tag(&self, image: &Path) -> Result<String, TaggerError>;
}

/// Runs `program args..`, replacing `{image}` with the image path and `{dir}`
/// with its directory in every argument.
#[derive(Debug, Clone)]
pub struct CommandTagger {
    program: String,
    args: Vec<String>,
}

impl CommandTagger {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Split a shell-style command line; `None` if it is blank or badly quoted.
    pub fn parse(cmdline: &str) -> Option<Self> {
        let mut parts = shlex::split(cmdline)?.into_iter();
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    fn render_args(&self, image: &Path) -> Vec<String> {
        let image_s = image.to_string_lossy();
        let dir_s = image.parent().map(|d| d.to_string_lossy().into_owned()).unwrap_or_else(|| ".".into());
        self.args.iter().map(|a| a.replace("{image}", &image_s).replace("{dir}", &dir_s)).collect()
    }
}

#[async_trait]
impl Tagger for CommandTagger {
    async fn tag(&self, image: &Path) -> Result<String, TaggerError> {
        let args = self.render_args(image);
        tracing::debug!(program = %self.program, ?args, "running tagger");
        let output = Command::new(&self.program).args(&args).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(status = %output.status, %stderr, "tagger failed");
            return Err(TaggerError::Failed { status: output.status, stderr });
        }

        let sidecar = image.with_extension("txt");
        if tokio::fs::try_exists(&sidecar).await.unwrap_or(false) {
            let caption = tokio::fs::read_to_string(&sidecar).await?;
            return Ok(caption.trim().to_string());
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(TaggerError::NoCaption(image.display().to_string()));
        }
        Ok(stdout)
    }
}
