use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{Result, ScanError};

const LIST_ARGS: [&str; 3] = ["list", "--json", "--all"];
const FALLBACK_ARGS: [&str; 2] = ["ls", "--json"];

/// Returns the npm executable name for the current platform.
pub fn default_npm_program() -> &'static str {
    if cfg!(target_os = "windows") {
        "npm.cmd"
    } else {
        "npm"
    }
}

/// Lists a project's full dependency tree by running npm in its directory.
pub struct NpmLister {
    project: PathBuf,
    program: String,
    dump_dir: Option<PathBuf>,
}

impl NpmLister {
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            program: default_npm_program().to_string(),
            dump_dir: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Also writes the raw listing to this directory for inspection.
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    fn command_line(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        info!(command = %self.command_line(args), project = %self.project.display(), "running npm");
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.project)
            .output()
            .await
            .map_err(|source| ScanError::Spawn {
                command: self.command_line(args),
                source,
            })
    }
}

#[async_trait]
impl super::DependencyLister for NpmLister {
    fn name(&self) -> &'static str {
        "npm list"
    }

    async fn list(&self) -> Result<Vec<u8>> {
        if !self.project.join("package.json").is_file() {
            return Err(ScanError::MissingManifest(self.project.clone()));
        }

        let output = self.run(&LIST_ARGS).await?;
        let stdout = if output.status.success() {
            output.stdout
        } else if !output.stdout.is_empty() {
            // npm exits 1 on peer dependency problems but still prints the tree
            warn!(status = %output.status, "npm list reported problems, using its output anyway");
            output.stdout
        } else {
            warn!(status = %output.status, "npm list failed, trying `npm ls --json`");
            let fallback = self.run(&FALLBACK_ARGS).await?;
            if !fallback.status.success() && fallback.stdout.is_empty() {
                return Err(ScanError::ListingFailed {
                    command: self.command_line(&FALLBACK_ARGS),
                    status: fallback.status.to_string(),
                });
            }
            fallback.stdout
        };

        if stdout.len() < 10 {
            warn!(bytes = stdout.len(), "npm output is very small, it may be empty or an error");
        }

        if let Some(dir) = &self.dump_dir {
            match write_dump(dir, &stdout).await {
                Ok(path) => info!(path = %path.display(), "saved raw npm output"),
                Err(e) => warn!(error = %e, "could not save raw npm output"),
            }
        }

        Ok(stdout)
    }
}

/// Writes a listing to `<dir>/npm_deps_<timestamp>.json`.
async fn write_dump(dir: &Path, listing: &[u8]) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("npm_deps_{}.json", stamp));

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ScanError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, listing)
        .await
        .map_err(|source| ScanError::Write {
            path: path.clone(),
            source,
        })?;

    Ok(path)
}
