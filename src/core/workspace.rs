//! Project bootstrapping and `.gitignore` bookkeeping

use crate::core::config::ProjectConfig;
use crate::core::error::Result;
use crate::core::pipeline::GENERATED_SUFFIX;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const GITIGNORE_FILE: &str = ".gitignore";

/// What `init` did, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitAction {
    CreatedDirectory(PathBuf),
    CreatedTemplate(PathBuf),
    AddedToGitignore(String),
    AlreadyIgnored(String),
}

/// Create the project directory layout under `root`
///
/// Creates `<directory>/tasks`, an empty template for the default pipeline,
/// and makes sure the generated document and secrets file are git-ignored.
/// Existing files are left alone.
pub fn init(config: &ProjectConfig, root: &Path) -> Result<Vec<InitAction>> {
    let mut actions = Vec::new();

    let tasks_dir = root.join(config.directory_path()).join("tasks");
    if !tasks_dir.is_dir() {
        std::fs::create_dir_all(&tasks_dir)?;
        actions.push(InitAction::CreatedDirectory(tasks_dir));
    }

    for entry in config.pipeline_entries() {
        let template = root.join(config.directory_path()).join(&entry.template);
        if !template.exists() {
            if let Some(parent) = template.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(&template)?;
            info!("Created empty template {}", template.display());
            actions.push(InitAction::CreatedTemplate(template));
        }
    }

    let mut ignored: Vec<String> = config
        .pipeline_entries()
        .iter()
        .map(|entry| match &entry.generated {
            Some(generated) => join_unix(&config.directory, generated),
            None => format!(
                "{}{}",
                join_unix(&config.directory, &entry.template),
                GENERATED_SUFFIX
            ),
        })
        .collect();
    ignored.push(join_unix(&config.directory, &config.secrets_filename));

    let gitignore = root.join(GITIGNORE_FILE);
    for glob in ignored {
        if ensure_in_gitignore(&gitignore, &glob)? {
            actions.push(InitAction::AddedToGitignore(glob));
        } else {
            actions.push(InitAction::AlreadyIgnored(glob));
        }
    }

    Ok(actions)
}

/// Append `glob` to the ignore file unless a line already matches it
///
/// Returns whether the file was changed.
pub fn ensure_in_gitignore(gitignore: &Path, glob: &str) -> Result<bool> {
    let existing = match std::fs::read_to_string(gitignore) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    if existing.lines().any(|line| line == glob) {
        return Ok(false);
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(gitignore)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{}", glob)?;
    Ok(true)
}

fn join_unix(directory: &str, file: &str) -> String {
    format!("{}/{}", directory.trim_end_matches('/'), file)
}
