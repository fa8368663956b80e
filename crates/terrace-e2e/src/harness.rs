use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

static BUILD_TERRACE: OnceLock<Result<(), String>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub command_line: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    #[must_use]
    pub fn transcript(&self) -> String {
        format!(
            "$ {}\n[exit: {}]\n[stdout]\n{}[stderr]\n{}",
            self.command_line, self.exit_code, self.stdout, self.stderr
        )
    }

    /// Zero-based line index of the first stdout line ending with `suffix`.
    #[must_use]
    pub fn line_ending_with(&self, suffix: &str) -> Option<usize> {
        self.stdout
            .lines()
            .position(|line| line.trim_end().ends_with(suffix))
    }
}

/// Run `terrace <command> <root> <flags...>` as an external process.
///
/// `NO_PAGER=1` and `--color never` are always set to keep output
/// deterministic for assertions.
///
/// # Errors
///
/// Returns an error if building/running the `terrace` binary fails.
pub fn run_terrace(command: &str, root: &Path, flags: &[&str]) -> Result<RunResult, String> {
    ensure_terrace_built()?;
    let bin = terrace_bin()?;

    let mut process = Command::new(bin);
    process.env("NO_PAGER", "1");
    process.args(["--color", "never", command]);
    process.arg(root);
    process.args(flags);

    let mut command_parts = vec![
        "terrace".to_string(),
        command.to_string(),
        root.display().to_string(),
    ];
    command_parts.extend(flags.iter().map(|flag| (*flag).to_string()));

    let output = process
        .output()
        .map_err(|error| format!("failed to run terrace {command}: {error}"))?;

    Ok(RunResult {
        command_line: command_parts.join(" "),
        exit_code: output.status.code().unwrap_or(1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run the binary with raw arguments and no fixture path.
///
/// # Errors
///
/// Returns an error if building/running the `terrace` binary fails.
pub fn run_raw(args: &[&str]) -> Result<RunResult, String> {
    ensure_terrace_built()?;
    let output = Command::new(terrace_bin()?)
        .env("NO_PAGER", "1")
        .args(args)
        .output()
        .map_err(|error| format!("failed to run terrace: {error}"))?;

    Ok(RunResult {
        command_line: format!("terrace {}", args.join(" ")),
        exit_code: output.status.code().unwrap_or(1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Write a text file, creating parent directories if needed.
///
/// # Errors
///
/// Returns an error if directories or file contents cannot be written.
pub fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

fn ensure_terrace_built() -> Result<(), String> {
    match BUILD_TERRACE.get_or_init(|| {
        let status = Command::new("cargo")
            .arg("build")
            .arg("-q")
            .arg("-p")
            .arg("terrace")
            .status()
            .map_err(|error| format!("failed to build terrace binary: {error}"))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!(
                "failed to build terrace binary: cargo exited with status {status}"
            ))
        }
    }) {
        Ok(()) => Ok(()),
        Err(error) => Err(error.clone()),
    }
}

fn terrace_bin() -> Result<PathBuf, String> {
    let mut path = std::env::current_exe()
        .map_err(|error| format!("failed to determine current executable: {error}"))?;
    if !path.pop() {
        return Err("failed to resolve test executable directory".to_string());
    }
    if path.ends_with("deps") {
        let _ = path.pop();
    }
    Ok(path.join(format!("terrace{}", std::env::consts::EXE_SUFFIX)))
}
