use crate::agent::ScratchpadState;
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::debug;

pub const LIST_DIRECTORY_TOOL: &str = "list_directory_files";
pub const READ_FILE_TOOL: &str = "read_file";
pub const WRITE_FILE_TOOL: &str = "write_file";
pub const RUN_TESTS_TOOL: &str = "run_pytest_tests";

const DEFAULT_LISTING_DEPTH: i64 = 2;

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub target_module: Option<String>,
    pub test_output_dir: String,
    pub max_dir_listings: usize,
    pub duplicate_window: usize,
    pub signature_history: usize,
}

impl ThrottleConfig {
    pub fn new(test_output_dir: impl Into<String>) -> Self {
        Self {
            target_module: None,
            test_output_dir: test_output_dir.into(),
            max_dir_listings: 2,
            duplicate_window: 3,
            signature_history: 5,
        }
    }

    pub fn with_target_module(mut self, target: impl Into<String>) -> Self {
        self.target_module = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThrottleDecision {
    /// Dispatch with these (possibly normalized) arguments.
    Dispatch(Map<String, Value>),
    /// Do not dispatch; record `note` and steer the model.
    Skip { note: String, steer: String },
    /// Do not dispatch; answer the call with a failed tool result, then steer.
    Reject {
        note: String,
        error: String,
        steer: String,
    },
    /// Do not dispatch and do not answer.
    Drop,
}

/// Keeps the model from looping on exploration. Decisions read and update the
/// bookkeeping in [`ScratchpadState`].
#[derive(Debug, Clone)]
pub struct ThrottleGuard {
    config: ThrottleConfig,
}

impl ThrottleGuard {
    pub fn new(config: ThrottleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn check(
        &self,
        state: &mut ScratchpadState,
        tool_name: &str,
        args: Map<String, Value>,
    ) -> ThrottleDecision {
        match tool_name {
            LIST_DIRECTORY_TOOL => self.check_listing(state, args),
            READ_FILE_TOOL => self.check_read(state, args),
            WRITE_FILE_TOOL => {
                if let Some(path) = path_arg(&args)
                    && is_test_path(path, &self.config.test_output_dir)
                {
                    state.test_files_written.insert(path.to_string());
                }
                ThrottleDecision::Dispatch(args)
            }
            RUN_TESTS_TOOL if state.test_files_written.is_empty() => {
                debug!("Skipping {} until a test file is written", RUN_TESTS_TOOL);
                ThrottleDecision::Drop
            }
            _ => ThrottleDecision::Dispatch(args),
        }
    }

    /// Bookkeeping after a call the guard allowed has actually run.
    pub fn record_dispatch(
        &self,
        state: &mut ScratchpadState,
        tool_name: &str,
        args: &Map<String, Value>,
    ) {
        match tool_name {
            LIST_DIRECTORY_TOOL => {
                state.record_dir_listing(listing_signature(args), self.config.signature_history);
            }
            READ_FILE_TOOL => {
                if let Some(path) = path_arg(args) {
                    state.read_files_seen.insert(path.to_string());
                }
            }
            _ => {}
        }
    }

    fn check_listing(
        &self,
        state: &mut ScratchpadState,
        mut args: Map<String, Value>,
    ) -> ThrottleDecision {
        let path = normalize_listing_path(args.get("path"));
        let depth = clamp_depth(args.get("depth"));
        args.insert("path".into(), json!(path));
        args.insert("depth".into(), json!(depth));

        let signature = listing_signature(&args);
        if state.has_recent_signature(&signature, self.config.duplicate_window) {
            debug!("Skipping duplicate {} for {}", LIST_DIRECTORY_TOOL, signature);
            return ThrottleDecision::Skip {
                note: format!("skipped duplicate {} for {}", LIST_DIRECTORY_TOOL, signature),
                steer: format!(
                    "Directory {} was already listed. Next action: {}",
                    path,
                    self.next_steps()
                ),
            };
        }

        if state.dir_listings_executed >= self.config.max_dir_listings || state.target_module_read
        {
            debug!("Skipping {}: exploration phase over", LIST_DIRECTORY_TOOL);
            return ThrottleDecision::Skip {
                note: "directory listings disabled after initial exploration; read target module and proceed to tests.".to_string(),
                steer: format!("Stop listing directories. Next action: {}", self.next_steps()),
            };
        }

        ThrottleDecision::Dispatch(args)
    }

    fn check_read(
        &self,
        state: &mut ScratchpadState,
        args: Map<String, Value>,
    ) -> ThrottleDecision {
        let Some(path) = path_arg(&args) else {
            return ThrottleDecision::Dispatch(args);
        };

        if self.config.target_module.as_deref() == Some(path) {
            state.target_module_read = true;
        }

        if state.read_files_seen.contains(path) {
            debug!("Skipping duplicate {} for {}", READ_FILE_TOOL, path);
            let test_dir = &self.config.test_output_dir;
            return ThrottleDecision::Reject {
                note: format!(
                    "skipped duplicate {} for {}; proceed to write tests into {} and run pytest there.",
                    READ_FILE_TOOL, path, test_dir
                ),
                error: format!(
                    "{} already executed for this path; write tests now and run pytest.",
                    READ_FILE_TOOL
                ),
                steer: format!(
                    "Do not re-read the same file. Move on: write tests into {}, then run pytest in {}.",
                    test_dir, test_dir
                ),
            };
        }

        ThrottleDecision::Dispatch(args)
    }

    fn next_steps(&self) -> String {
        let test_dir = &self.config.test_output_dir;
        match &self.config.target_module {
            Some(target) => format!(
                "{} {}, write tests into {}, then run pytest in {}.",
                READ_FILE_TOOL, target, test_dir, test_dir
            ),
            None => format!(
                "read the module under test, write tests into {}, then run pytest in {}.",
                test_dir, test_dir
            ),
        }
    }
}

/// Whether `path` lies under the test-output directory, compared by path
/// components so `tools/llm_tests_old` is not under `tools/llm_tests`.
pub fn is_test_path(path: &str, test_output_dir: &str) -> bool {
    let path = path.trim_start_matches("./");
    let dir = test_output_dir.trim_start_matches("./");
    Path::new(path).starts_with(dir)
}

/// File path argument of the read/write tools.
pub fn path_arg(args: &Map<String, Value>) -> Option<&str> {
    args.get("file_path")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
}

fn normalize_listing_path(value: Option<&Value>) -> String {
    match value.and_then(Value::as_str) {
        None | Some("") | Some("./") => ".".to_string(),
        Some(path) => path.to_string(),
    }
}

fn clamp_depth(value: Option<&Value>) -> i64 {
    let depth = match value {
        None | Some(Value::Null) => Some(DEFAULT_LISTING_DEPTH),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Bool(b)) => Some(i64::from(*b)),
        Some(_) => None,
    };
    depth.unwrap_or(DEFAULT_LISTING_DEPTH).clamp(1, 2)
}

/// Sorted-key JSON of the normalized `{depth, path}` pair.
fn listing_signature(args: &Map<String, Value>) -> String {
    let depth = args.get("depth").cloned().unwrap_or(json!(DEFAULT_LISTING_DEPTH));
    let path = args.get("path").cloned().unwrap_or(json!("."));
    format!(r#"{{"depth": {}, "path": {}}}"#, depth, path)
}
