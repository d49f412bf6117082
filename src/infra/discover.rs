use crate::domain::{Hierarchy, ProjectSessions, build_hierarchy};
use crate::infra::{load_session_record, scan_cwd_hint};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use walkdir::{DirEntry, WalkDir};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ScanWarningCount(usize);

impl From<usize> for ScanWarningCount {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl ScanWarningCount {
    pub fn get(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("Claude projects directory not found: {0}")]
    ProjectsDirMissing(String),
}

pub fn ensure_projects_dir(projects_dir: &Path) -> Result<(), DiscoverError> {
    if projects_dir.is_dir() {
        return Ok(());
    }
    Err(DiscoverError::ProjectsDirMissing(
        projects_dir.display().to_string(),
    ))
}

#[derive(Clone, Debug)]
pub struct DiscoverOutput {
    pub hierarchy: Hierarchy,
    pub warnings: ScanWarningCount,
}

pub fn discover_sessions(projects_dir: &Path, anchor: &str) -> DiscoverOutput {
    let (projects, warnings) = scan_projects_dir(projects_dir);
    let session_count: usize = projects.iter().map(|project| project.sessions.len()).sum();
    let agent_count: usize = projects.iter().map(|project| project.agents.len()).sum();
    log::info!(
        "discovered {} project(s), {session_count} session(s), {agent_count} agent log(s) under {}",
        projects.len(),
        projects_dir.display()
    );

    DiscoverOutput {
        hierarchy: build_hierarchy(projects, anchor, OffsetDateTime::now_utc()),
        warnings,
    }
}

/// Reads every project directory under `projects_dir`. A missing root yields nothing.
pub fn scan_projects_dir(projects_dir: &Path) -> (Vec<ProjectSessions>, ScanWarningCount) {
    let mut warnings = 0usize;
    let mut projects = Vec::new();

    if !projects_dir.is_dir() {
        return (projects, ScanWarningCount::default());
    }

    for entry in sorted_children(projects_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                log::debug!("skipping unreadable entry: {error}");
                warnings += 1;
                continue;
            }
        };
        if !entry.file_type().is_dir() || is_hidden(&entry) {
            continue;
        }

        match scan_project_dir(entry.path(), &mut warnings) {
            Some(project) => projects.push(project),
            None => log::debug!("no project path found in {}", entry.path().display()),
        }
    }

    (projects, ScanWarningCount::from(warnings))
}

fn scan_project_dir(dir: &Path, warnings: &mut usize) -> Option<ProjectSessions> {
    let log_files = session_log_files(dir, warnings);
    let project_path = resolve_project_path(&log_files)?;

    let mut project = ProjectSessions {
        project_path,
        sessions: Vec::new(),
        agents: Vec::new(),
    };
    for path in &log_files {
        match load_session_record(path) {
            Ok(record) if record.is_agent() => project.agents.push(record),
            Ok(record) => project.sessions.push(record),
            Err(error) => {
                log::warn!("failed to read {}: {error}", path.display());
                *warnings += 1;
            }
        }
    }

    Some(project)
}

fn resolve_project_path(log_files: &[PathBuf]) -> Option<PathBuf> {
    log_files
        .iter()
        .find_map(|path| scan_cwd_hint(path).ok().flatten())
}

fn session_log_files(dir: &Path, warnings: &mut usize) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in sorted_children(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => {
                *warnings += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
            continue;
        }
        files.push(entry.into_path());
    }
    files
}

fn sorted_children(dir: &Path) -> walkdir::IntoIter {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
