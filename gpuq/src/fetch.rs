//! Snapshot fetching and identity lookup. Everything here is plain
//! blocking subprocess I/O; a failed snapshot fetch is fatal to the run,
//! while name lookups are best-effort.

use std::process::Command;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: &'static str,
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}")]
    Failed {
        command: &'static str,
        status: std::process::ExitStatus,
    },
}

fn run(command: &'static str, args: &[&str]) -> Result<String, FetchError> {
    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|source| FetchError::Spawn { command, source })?;
    if !output.status.success() {
        return Err(FetchError::Failed {
            command,
            status: output.status,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// The raw block-delimited job-attribute dump for all jobs.
pub fn fetch_job_snapshot() -> Result<String, FetchError> {
    run("scontrol", &["show", "job", "-d"])
}

/// One line per node: name, state, partition and GRES, `||`-delimited.
pub fn fetch_node_snapshot() -> Result<String, FetchError> {
    run("sinfo", &["-N", "-o", "%N||%T||%P||%G"])
}

/// Login name of the invoking user, for the "my jobs" sections.
pub fn current_user() -> Option<String> {
    users::get_current_username().and_then(|name| name.into_string().ok())
}

/// Best-effort full-name lookup through `getent passwd`. Returns `None`
/// when the user is unknown or the gecos field is empty; callers fall
/// back to the login name.
pub fn lookup_full_name(user_id: &str) -> Option<String> {
    let line = run("getent", &["passwd", user_id]).ok()?;
    parse_gecos(line.trim())
}

/// Extracts the display-name portion of a passwd line's gecos field
/// (field 5, comma-separated sub-fields of which the first is the full
/// name).
fn parse_gecos(passwd_line: &str) -> Option<String> {
    let gecos = passwd_line.split(':').nth(4)?;
    let full_name = gecos.split(',').next().unwrap_or(gecos).trim();
    if full_name.is_empty() {
        None
    } else {
        Some(full_name.to_string())
    }
}
