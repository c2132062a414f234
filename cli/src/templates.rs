use proctor_core::AgentVariant;

pub const DEFAULT_SIMPLE_PROMPT: &str = r#"# Unit Tester

You write pytest unit tests for Python modules in this repository and keep
going until they pass.

## Tools

{tools}

## Workflow

1. Read the module under test with `read_file`.
2. Write one test file into the test output directory with `write_file`.
3. Run `run_pytest_tests` on the test output directory.
4. If imports fail, tests fail, or nothing is collected, fix the test file and
   run pytest again.

## Rules

- Never touch files outside the test output directory.
- Mock network, browser, and filesystem side effects; test our code paths.
- Use plain pytest functions, no `unittest.main`.
- Prefer calling tools over describing what you would do."#;

pub const DEFAULT_SCRATCHPAD_PROMPT: &str = r#"# Unit Tester

You write pytest unit tests for Python modules in this repository and keep
going until they pass. Older tool results are removed from the conversation;
the latest `<scratchpad>` message summarizes what you already did.

## Tools

{tools}

## Workflow

1. List the repository at most once or twice to find the module under test.
2. Read the module under test once with `read_file`.
3. Write one test file into the test output directory with `write_file`.
4. Run `run_pytest_tests` on the test output directory.
5. If imports fail, tests fail, or nothing is collected, fix the test file and
   run pytest again.

## Rules

- Do not list the same directory twice or re-read a file you already read.
- Never touch files outside the test output directory.
- Mock network, browser, and filesystem side effects; test our code paths.
- Use plain pytest functions, no `unittest.main`.
- Check the scratchpad before acting."#;

pub fn default_prompt(variant: AgentVariant) -> &'static str {
    match variant {
        AgentVariant::Simple => DEFAULT_SIMPLE_PROMPT,
        AgentVariant::Scratchpad => DEFAULT_SCRATCHPAD_PROMPT,
    }
}

/// User task asking for tests of `files`, written into `test_dir`.
pub fn build_task(files: &[String], test_dir: &str) -> String {
    let files = files
        .iter()
        .map(|f| format!("`{}`", f))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Write pytest unit tests for: {files}
- Write tests to a single file under {test_dir} (e.g., test_<module>.py).
- You may mock external/browser/network interactions as needed; focus on verifying our code paths (no real network/HTTP calls).
- Use pytest functions (no unittest.main). Add sys.path.append(str(Path(__file__).resolve().parents[2])) so package imports from the repository root work.
- After writing the test file, run pytest in {test_dir} and report results. If imports fail or no tests collected, fix and retry.
- Do not touch files outside {test_dir}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_carry_the_tools_placeholder() {
        assert!(DEFAULT_SIMPLE_PROMPT.contains("{tools}"));
        assert!(DEFAULT_SCRATCHPAD_PROMPT.contains("{tools}"));
    }

    #[test]
    fn task_names_files_and_test_dir() {
        let task = build_task(
            &["tools/toolkit/web_explorer.py".to_string()],
            "tools/llm_tests",
        );

        assert!(task.starts_with("Write pytest unit tests for: `tools/toolkit/web_explorer.py`"));
        assert!(task.contains("run pytest in tools/llm_tests"));
    }
}
