use crate::infra::{ANCHOR_ENV, LOG_FILE_ENV, LOG_LEVEL_ENV, PROJECTS_DIR_ENV};
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Tui,
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

/// `args` includes the program name at index 0.
pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    match args.get(1) {
        None => Ok(CliInvocation::Tui),
        Some(arg) if arg.starts_with('-') => Err(CliParseError::UnknownFlag(arg.clone())),
        Some(arg) => Err(CliParseError::UnexpectedArgument(arg.clone())),
    }
}

pub fn help_text() -> String {
    format!(
        "\
claude-stream {version}
Browse Claude session logs as an org/repo/branch tree and stream transcripts live.

USAGE:
    claude-stream [--help | --version]

ENVIRONMENT:
    {PROJECTS_DIR_ENV}      sessions root (default: ~/.claude/projects)
    {ANCHOR_ENV}     directory that precedes <org>/<repo> in project paths (default: Git)
    {LOG_FILE_ENV}        append diagnostics to this file
    {LOG_LEVEL_ENV}  log filter, e.g. debug (default: info)

KEYS (tree):
    j/k, arrows       move          enter/l   expand or open
    space             toggle        h/b       collapse or go to parent
    g/G               first/last    r         rescan
    q, esc, ctrl-c    quit

KEYS (viewer):
    j/k, arrows       scroll        pgup/pgdn page
    g/G               top/bottom    s         skip playback
    q, esc, h, b      back to tree
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
