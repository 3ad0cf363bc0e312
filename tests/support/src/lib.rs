//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support" }
//! ```
//!
//! Then in tests:
//! ```rust,no_run
//! use test_support::{cmd_bin, fixtures_env};
//!
//! let mut cmd = cmd_bin("contrib-stats");
//! cmd.envs(fixtures_env(&serde_json::json!({})));
//! ```

use once_cell::sync::Lazy;

use std::env;

/// Env var read by the binary for inline HTTP fixtures.
pub const FIXTURES_ENV: &str = "CONTRIB_STATS_HTTP_FIXTURES";

/// Credential variables every platform reads; cleared for hermetic CLI runs.
pub const CREDENTIAL_VARS: &[&str] = &[
    "GITHUB_TOKEN",
    "GH_TOKEN",
    "GITLAB_API_TOKEN",
    "GITLAB_SERVER",
    "TRELLO_API_KEY",
    "TRELLO_API_TOKEN",
    "SMARTSHEETS_API_TOKEN",
    "GOOGLE_CHAT_TOKEN",
    "ROCKETCHAT_AUTH_TOKEN",
    "ROCKETCHAT_USER_ID",
];

/// Initialize `env_logger` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global logger.
pub fn init_logging() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .is_test(true)
            .try_init();
    });
    Lazy::force(&INIT);
}

/// Initialize insta snapshot settings once per test process.
///
/// - Centralizes snapshot files in `tests/snapshots` (relative to the test binary's CWD)
/// - Omits `Expression:` in snapshot headers for cleaner diffs
pub fn init_insta() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let mut settings = insta::Settings::clone_current();
        settings.set_snapshot_path("../snapshots");
        settings.set_omit_expression(true);
        // Bind settings to the thread for the remainder of the test process by leaking the guard
        let guard = settings.bind_to_scope();
        std::mem::forget(guard);
    });
    Lazy::force(&INIT);
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Remove environment variables for the duration of the returned guard.
pub fn without_env(names: &[&str]) -> EnvGuard {
    EnvGuard::unset_many(names)
}

/// Env pairs routing every request of the binary to `routes`.
pub fn fixtures_env(routes: &serde_json::Value) -> Vec<(String, String)> {
    vec![(FIXTURES_ENV.to_string(), routes.to_string())]
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// Credentials from the developer's shell are stripped so runs are hermetic.
///
/// Example:
/// ```no_run
/// use test_support::cmd_bin;
/// use predicates::prelude::*;
///
/// let mut cmd = cmd_bin("contrib-stats");
/// cmd.arg("--help").assert().success().stdout(predicate::str::contains("Usage"));
/// ```
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_logging();
    let mut cmd = assert_cmd::Command::cargo_bin(bin).expect("binary target not found");
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove(FIXTURES_ENV).env_remove("CONTRIB_STATS_HTTP_FIXTURES_FILE");
    // `gh auth token` must not leak a real token into tests.
    cmd.env("PATH", "");
    cmd
}

/// Guard for temporarily setting environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            prev.push((k.to_string(), env::var(k).ok()));
            env::set_var(k, v);
        }
        Self { prev }
    }

    pub fn unset_many(names: &[&str]) -> Self {
        let mut prev = Vec::with_capacity(names.len());
        for k in names {
            prev.push((k.to_string(), env::var(k).ok()));
            env::remove_var(k);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}
