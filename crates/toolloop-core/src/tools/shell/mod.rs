//! Shell tools for command execution

mod execute;

pub use execute::RunCommand;

/// Configuration for shell execution safety
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Substrings that make a command refused outright
    pub blocked_commands: Vec<String>,
    /// Default execution time limit in seconds
    pub timeout_seconds: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        let blocked = [
            "rm -rf /",
            "sudo ",
            "mkfs",
            "dd if=/dev",
            ":(){:|:&};:", // Fork bomb
            "shutdown",
            "reboot",
        ];

        Self {
            blocked_commands: blocked.iter().map(|s| s.to_string()).collect(),
            timeout_seconds: 60,
        }
    }
}
