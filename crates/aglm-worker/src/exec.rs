use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use aglm_contracts::TaskStatus;

use crate::error::WorkflowError;

const OUTPUT_TRIM_CHARS: usize = 2_000;

/// Trim `s` to its trailing `OUTPUT_TRIM_CHARS` characters (not bytes —
/// output may be non-ASCII).
pub fn trim_output(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= OUTPUT_TRIM_CHARS {
        s.to_string()
    } else {
        chars[chars.len() - OUTPUT_TRIM_CHARS..].iter().collect()
    }
}

/// Outcome of running a workflow's argv as a child process.
pub struct ExecOutcome {
    pub status: TaskStatus,
    pub output: String,
}

/// Run `argv` as a child process with a hard timeout, capturing and
/// trimming combined stdout/stderr per the source's output policy: stdout
/// (stripped) if non-empty, else stderr (stripped), else `"无输出"`.
///
/// `project_root` is the working directory the child is launched from —
/// every workflow argv uses project-relative paths (`scripts/...`,
/// `workflows/...`), so they only resolve if the child's cwd is anchored
/// there regardless of the binary's own cwd.
pub async fn run_workflow(
    argv: &[String],
    timeout: Duration,
    project_root: &Path,
) -> Result<ExecOutcome, WorkflowError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(WorkflowError::Launch("empty argv".to_string()));
    };

    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .current_dir(project_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // A timed-out child must not be left running: dropping the future
        // on timeout drops the `Child`, which tokio then kills.
        .kill_on_drop(true);

    let child = command
        .spawn()
        .map_err(|e| WorkflowError::Launch(e.to_string()))?;

    let wait = child.wait_with_output();

    let output = match tokio::time::timeout(timeout, wait).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(WorkflowError::Launch(e.to_string())),
        Err(_) => return Err(WorkflowError::Timeout),
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let text = if !stdout.is_empty() {
        stdout
    } else if !stderr.is_empty() {
        stderr
    } else {
        "无输出".to_string()
    };

    let status = if output.status.success() {
        TaskStatus::Success
    } else {
        TaskStatus::Failed
    };

    Ok(ExecOutcome {
        status,
        output: trim_output(&text),
    })
}
