use crate::domain::DEFAULT_ANCHOR;
use dirs::home_dir;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

pub const PROJECTS_DIR_ENV: &str = "CLAUDE_PROJECTS_DIR";
pub const ANCHOR_ENV: &str = "CLAUDE_STREAM_ANCHOR";
pub const LOG_FILE_ENV: &str = "CLAUDE_STREAM_LOG";
pub const LOG_LEVEL_ENV: &str = "CLAUDE_STREAM_LOG_LEVEL";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ResolveProjectsDirError {
    #[error("home directory not found")]
    HomeDirNotFound,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub projects_dir: PathBuf,
    pub anchor: String,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ResolveProjectsDirError> {
        Self::from_lookup(|key| std::env::var_os(key), home_dir())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<OsString>,
        home: Option<PathBuf>,
    ) -> Result<Self, ResolveProjectsDirError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let projects_dir = match non_empty(PROJECTS_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let Some(home) = home else {
                    return Err(ResolveProjectsDirError::HomeDirNotFound);
                };
                home.join(".claude").join("projects")
            }
        };

        Ok(Self {
            projects_dir,
            anchor: non_empty(ANCHOR_ENV)
                .map(|value| value.to_string_lossy().to_string())
                .unwrap_or_else(|| DEFAULT_ANCHOR.to_string()),
            log_file: non_empty(LOG_FILE_ENV).map(PathBuf::from),
            log_level: non_empty(LOG_LEVEL_ENV)
                .map(|value| value.to_string_lossy().to_string())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), OsString::from(value)))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_claude_projects_under_home() {
        let config = Config::from_lookup(lookup(&[]), Some(PathBuf::from("/home/u"))).expect("config");
        assert_eq!(config.projects_dir, PathBuf::from("/home/u/.claude/projects"));
        assert_eq!(config.anchor, "Git");
        assert_eq!(config.log_file, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn env_overrides_win() {
        let config = Config::from_lookup(
            lookup(&[
                (PROJECTS_DIR_ENV, "/tmp/projects"),
                (ANCHOR_ENV, "src"),
                (LOG_FILE_ENV, "/tmp/stream.log"),
                (LOG_LEVEL_ENV, "debug"),
            ]),
            None,
        )
        .expect("config");
        assert_eq!(config.projects_dir, PathBuf::from("/tmp/projects"));
        assert_eq!(config.anchor, "src");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/stream.log")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_home_is_an_error() {
        assert!(matches!(
            Config::from_lookup(lookup(&[]), None),
            Err(ResolveProjectsDirError::HomeDirNotFound)
        ));
    }
}
