//! Host environment probing.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use modgate_types::{Architecture, OsFamily, PlatformDescriptor};
use tokio::process::Command;
use tracing::debug;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers the two environment questions the matrix builder needs.
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    /// Whether a container engine is reachable.
    async fn container_engine_available(&self) -> bool;

    /// The platform tests run on.
    async fn detect_platform(&self) -> PlatformDescriptor;
}

/// Probes the real host: `docker info` for the engine, `java -version` for the runtime.
///
/// Each command is killed if it has not exited within the command timeout.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    container_command: String,
    java_command: String,
    command_timeout: Duration,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self {
            container_command: "docker".to_string(),
            java_command: "java".to_string(),
            command_timeout: COMMAND_TIMEOUT,
        }
    }
}

impl HostEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container_command(mut self, command: impl Into<String>) -> Self {
        self.container_command = command.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    async fn java_major(&self) -> Option<u32> {
        let output = tokio::time::timeout(
            self.command_timeout,
            Command::new(&self.java_command)
                .arg("-version")
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .ok()?
        .ok()?;

        // `java -version` writes to stderr.
        let text = String::from_utf8_lossy(&output.stderr);
        parse_java_major(&text)
    }
}

#[async_trait]
impl EnvironmentProbe for HostEnvironment {
    async fn container_engine_available(&self) -> bool {
        let status = tokio::time::timeout(
            self.command_timeout,
            Command::new(&self.container_command)
                .arg("info")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status(),
        )
        .await;

        let available = matches!(status, Ok(Ok(s)) if s.success());
        debug!(command = %self.container_command, available, "Container engine probed");
        available
    }

    async fn detect_platform(&self) -> PlatformDescriptor {
        let os_version = tokio::fs::read_to_string("/etc/os-release")
            .await
            .ok()
            .and_then(|text| os_release_version(&text))
            .unwrap_or_else(|| "unknown".to_string());

        let mut platform = PlatformDescriptor::os(OsFamily::host(), os_version, Architecture::host());
        if let Some(major) = self.java_major().await {
            platform = platform.with_runtime(major);
        }
        platform
    }
}

/// Fixed answers, for tests and for hosts described by configuration.
#[derive(Debug, Clone)]
pub struct StaticEnvironment {
    pub platform: PlatformDescriptor,
    pub container_available: bool,
}

impl StaticEnvironment {
    pub fn new(platform: PlatformDescriptor, container_available: bool) -> Self {
        Self {
            platform,
            container_available,
        }
    }
}

#[async_trait]
impl EnvironmentProbe for StaticEnvironment {
    async fn container_engine_available(&self) -> bool {
        self.container_available
    }

    async fn detect_platform(&self) -> PlatformDescriptor {
        self.platform.clone()
    }
}

/// Major version from `java -version` output; `1.8.0_292` is Java 8.
pub fn parse_java_major(output: &str) -> Option<u32> {
    let start = output.find('"')? + 1;
    let rest = &output[start..];
    let quoted = &rest[..rest.find('"')?];

    let mut parts = quoted.split(['.', '_', '-', '+']);
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        parts.next()?.parse().ok()
    } else {
        Some(first)
    }
}

fn os_release_version(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.strip_prefix("VERSION_ID="))
        .map(|v| v.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_major_handles_both_schemes() {
        assert_eq!(parse_java_major(r#"openjdk version "17.0.2" 2022-01-18"#), Some(17));
        assert_eq!(parse_java_major(r#"java version "1.8.0_292""#), Some(8));
        assert_eq!(parse_java_major(r#"openjdk version "11" 2018-09-25"#), Some(11));
        assert_eq!(parse_java_major("command not found"), None);
    }

    #[test]
    fn os_release_version_is_unquoted() {
        let text = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\n";
        assert_eq!(os_release_version(text).as_deref(), Some("22.04"));
        assert_eq!(os_release_version("NAME=x\n"), None);
    }

    #[tokio::test]
    async fn missing_engine_binary_reports_unavailable() {
        let env = HostEnvironment::new().with_container_command("modgate-no-such-engine");
        assert!(!env.container_engine_available().await);
    }

    /// Scheduler state of `pid` from /proc, `None` once it is gone.
    #[cfg(target_os = "linux")]
    fn process_state(pid: u32) -> Option<char> {
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        stat.rsplit_once(')')?.1.trim_start().chars().next()
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn hung_engine_is_killed_at_the_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("engine.pid");
        let script = dir.path().join("hung-engine");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > {}\nexec sleep 300\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let env = HostEnvironment::new()
            .with_container_command(script.display().to_string())
            .with_command_timeout(Duration::from_millis(500));
        let started = std::time::Instant::now();
        assert!(!env.container_engine_available().await);
        assert!(started.elapsed() < Duration::from_secs(5));

        let pid: u32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
        let mut state = process_state(pid);
        for _ in 0..50 {
            if matches!(state, None | Some('Z') | Some('X')) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            state = process_state(pid);
        }
        assert!(matches!(state, None | Some('Z') | Some('X')), "engine still running: {:?}", state);
    }
}
