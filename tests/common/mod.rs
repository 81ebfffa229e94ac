#![allow(dead_code)]

use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    /// Parse stdout as the single JSON object a command emits off-tty.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(self.stdout.trim()).unwrap_or_else(|e| {
            panic!(
                "stdout is not JSON ({e}); log: {}",
                self.log_path.display()
            )
        })
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_file-bisect") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) {
        "file-bisect.exe"
    } else {
        "file-bisect"
    };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve file-bisect binary path for integration test"),
    }
}

/// Run the binary with `args` and an isolated environment, logging the
/// invocation under the system temp dir.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &OsStr)]) -> CmdResult {
    let root = std::env::temp_dir().join("file-bisect-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .env("FILE_BISECT_SEED", "7")
        .env_remove("FILE_BISECT_OUTPUT_FORMAT");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command.output().expect("execute file-bisect command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// A working directory plus private HOME and TMPDIR, so config, journal and
/// quarantine never leak outside the test.
pub struct Sandbox {
    _root: tempfile::TempDir,
    pub work: PathBuf,
    pub home: PathBuf,
    pub tmp: PathBuf,
}

impl Sandbox {
    pub fn new(files: &[&str]) -> Self {
        let root = tempfile::tempdir().expect("create sandbox");
        let work = root.path().join("work");
        let home = root.path().join("home");
        let tmp = root.path().join("tmp");
        for dir in [&work, &home, &tmp] {
            fs::create_dir_all(dir).expect("create sandbox dir");
        }
        for name in files {
            fs::write(work.join(name), name.as_bytes()).expect("write sandbox file");
        }
        Self {
            _root: root,
            work,
            home,
            tmp,
        }
    }

    /// Run a subcommand against the sandbox working directory.
    pub fn run(&self, case_name: &str, args: &[&str]) -> CmdResult {
        let dir = self.work.to_string_lossy().into_owned();
        let mut full: Vec<&str> = vec!["--dir", &dir];
        full.extend_from_slice(args);
        run_cli_case_with_env(
            case_name,
            &full,
            &self.env(),
        )
    }

    /// HOME and TMPDIR pointing into the sandbox.
    pub fn env(&self) -> Vec<(&'static str, &OsStr)> {
        vec![("HOME", self.home.as_os_str()), ("TMPDIR", self.tmp.as_os_str())]
    }

    pub fn journal_path(&self) -> PathBuf {
        self.home
            .join(".local")
            .join("share")
            .join("file-bisect")
            .join("journal.jsonl")
    }

    pub fn working_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.work)
            .expect("list working dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with("file-bisect-index"))
            .collect();
        names.sort();
        names
    }
}
