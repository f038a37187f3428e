use std::path::PathBuf;
use std::process::Command;

use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;

/// Assert command succeeded
#[macro_export]
macro_rules! assert_command_success {
    ($output:expr) => {
        assert!(
            $output.success,
            "Command failed with exit code {}\nstdout: {}\nstderr: {}",
            $output.exit_code, $output.stdout, $output.stderr
        );
    };
}

/// Isolated tsm data directory driven through the real binary.
pub struct TestFixture {
    pub temp_dir: TempDir,
    /// Fake home so no user-level config leaks in
    pub home: PathBuf,
    /// tsm root (config.toml + tsm.db)
    pub tsm_root: PathBuf,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    test_name: String,
}

pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}):\n{}", self.stdout))
    }
}

impl TestFixture {
    pub fn new(test_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let home = temp_dir.path().join("home");
        let tsm_root = temp_dir.path().join(".tsm");
        std::fs::create_dir_all(&home).expect("Failed to create fake home");

        println!("[FIXTURE] Test: {test_name}");
        println!("[FIXTURE] TSM root: {tsm_root:?}");

        Self {
            config_path: tsm_root.join("config.toml"),
            db_path: tsm_root.join("tsm.db"),
            temp_dir,
            home,
            tsm_root,
            test_name: test_name.to_string(),
        }
    }

    /// Fixture with `tsm init` already run.
    pub fn initialized(test_name: &str) -> Self {
        let fixture = Self::new(test_name);
        let output = fixture.run_tsm(&["init"]);
        assert_command_success!(output);
        fixture
    }

    pub fn run_tsm(&self, args: &[&str]) -> CommandOutput {
        println!("[CMD] {} :: tsm {}", self.test_name, args.join(" "));
        let output = Command::new(env!("CARGO_BIN_EXE_tsm"))
            .args(args)
            .env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", self.home.join(".config"))
            .env("TSM_ROOT", &self.tsm_root)
            .env_remove("TSM_CONFIG")
            .env_remove("TSM_DB_PATH")
            .env_remove("TSM_SYSTEM_ACTOR_ID")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .current_dir(self.temp_dir.path())
            .output()
            .expect("Failed to spawn tsm");

        let result = CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        println!("[CMD] exit={} stdout={} bytes", result.exit_code, result.stdout.len());
        result
    }

    /// Create a mapping through the CLI and return its id.
    pub fn create(&self, order: &str, test: &str, sample_id: i64, sample_number: u32) -> i64 {
        let sample_id = sample_id.to_string();
        let sample_number = sample_number.to_string();
        let output = self.run_tsm(&[
            "--json",
            "create",
            "--order",
            order,
            "--test",
            test,
            "--sample-id",
            &sample_id,
            "--sample-number",
            &sample_number,
            "--vial-type",
            "4",
        ]);
        assert_command_success!(output);
        output.json()["data"]["id"]
            .as_i64()
            .expect("created mapping id")
    }

    pub fn open_db(&self) -> Connection {
        Connection::open(&self.db_path).expect("Failed to open fixture database")
    }
}
