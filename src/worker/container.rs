//! Thin subprocess wrapper around the `docker` CLI.
//!
//! Mirrors the git subprocess pattern used by the worktree controller:
//! captured output, explicit timeouts via a background thread and a
//! channel, and errors mapped into [`CorralError::ContainerError`].

use crate::error::{CorralError, Result};
use std::process::{Command, Stdio};
use std::time::Duration;

fn run_docker(args: &[&str]) -> Result<String> {
    let output = Command::new("docker")
        .args(args)
        .output()
        .map_err(|e| CorralError::ContainerError(format!("failed to execute docker: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CorralError::ContainerError(format!(
            "docker {} failed: {}",
            args.first().unwrap_or(&""),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Force-remove a container by name, ignoring "no such container" errors.
pub fn force_remove(name: &str) {
    let _ = Command::new("docker")
        .args(["rm", "-f", name])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// List container names whose name starts with `prefix`.
pub fn list_names_with_prefix(prefix: &str) -> Vec<String> {
    let filter = format!("name={}", prefix);
    match run_docker(&["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"]) {
        Ok(output) => output.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

/// Parameters for launching a single worker container.
pub struct RunContainerSpec<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub workspace_mount: &'a str,
    pub logs_mount: &'a str,
    pub repo_mount: &'a str,
    pub docker_network: Option<&'a str>,
    pub env: Vec<(String, String)>,
}

/// Start a detached, auto-removing container. Returns the container id.
pub fn run_container(spec: &RunContainerSpec) -> Result<String> {
    let mut args: Vec<String> = vec![
        "run".to_string(),
        "-d".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        spec.name.to_string(),
        "-v".to_string(),
        format!("{}:/workspace", spec.workspace_mount),
        "-v".to_string(),
        format!("{}:/logs", spec.logs_mount),
        "-v".to_string(),
        format!("{}:{}", spec.repo_mount, spec.repo_mount),
    ];

    if let Some(network) = spec.docker_network {
        args.push("--network".to_string());
        args.push(network.to_string());
    }

    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.push(spec.image.to_string());

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run_docker(&arg_refs)
}

/// Outcome of waiting for a container to exit.
#[derive(Debug, Clone)]
pub struct ContainerExit {
    pub exit_code: i32,
    pub error: Option<String>,
}

/// Block until `container_id` exits, up to `timeout`. If the container is
/// already gone (auto-removed after a fast exit), reports exit 0.
pub fn wait_container(container_id: &str, timeout: Duration) -> ContainerExit {
    let container_id = container_id.to_string();
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let result = Command::new("docker").args(["wait", &container_id]).output();
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) if output.status.success() => {
            let code_str = String::from_utf8_lossy(&output.stdout);
            let exit_code = code_str.trim().parse::<i32>().unwrap_or(0);
            ContainerExit { exit_code, error: None }
        }
        Ok(Ok(_)) => {
            // `docker wait` fails if the container no longer exists (already
            // auto-removed): treat as a clean exit.
            ContainerExit { exit_code: 0, error: None }
        }
        Ok(Err(e)) => ContainerExit {
            exit_code: -1,
            error: Some(format!("docker wait execution error: {}", e)),
        },
        Err(_) => ContainerExit {
            exit_code: -1,
            error: Some(format!("container wait timed out after {}s", timeout.as_secs())),
        },
    }
}

/// Stop a container, giving it `grace` before a hard kill, then remove it.
pub fn stop_container(container_id: &str, grace: Duration) {
    let _ = Command::new("docker")
        .args(["stop", "-t", &grace.as_secs().to_string(), container_id])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    force_remove(container_id);
}
