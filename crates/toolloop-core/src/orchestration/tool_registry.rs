//! Tool registry factory
//!
//! Centralizes registration of the built-in tools; each group can be switched
//! off through the builder.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::tools::filesystem::{ListFiles, ReadFile, SearchFiles, WriteFile};
use crate::tools::shell::{RunCommand, ShellConfig};
use crate::tools::system::{GetSystemInfo, ManageProcesses};
use crate::tools::ToolRegistry;

/// Builder for creating a tool registry with customizable options
pub struct ToolRegistryBuilder {
    workspace: PathBuf,
    include_filesystem: bool,
    include_shell: bool,
    include_system: bool,
    shell_config: ShellConfig,
}

impl ToolRegistryBuilder {
    /// Create a new builder with the given workspace path
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            include_filesystem: true,
            include_shell: true,
            include_system: true,
            shell_config: ShellConfig::default(),
        }
    }

    /// Apply the `[tools]` config section
    pub fn with_config(self, config: &ToolsConfig) -> Self {
        let mut shell_config = self.shell_config.clone();
        shell_config.timeout_seconds = config.command_timeout_secs;
        self.with_filesystem(config.filesystem)
            .with_shell(config.shell)
            .with_system(config.system)
            .with_shell_config(shell_config)
    }

    /// Include filesystem tools (read_file, write_file, list_files, search_files)
    pub fn with_filesystem(mut self, include: bool) -> Self {
        self.include_filesystem = include;
        self
    }

    /// Include run_command
    pub fn with_shell(mut self, include: bool) -> Self {
        self.include_shell = include;
        self
    }

    /// Include get_system_info and manage_processes
    pub fn with_system(mut self, include: bool) -> Self {
        self.include_system = include;
        self
    }

    pub fn with_shell_config(mut self, config: ShellConfig) -> Self {
        self.shell_config = config;
        self
    }

    /// Build the tool registry
    pub fn build(self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();

        if self.include_filesystem {
            registry.register(Arc::new(ReadFile::new(self.workspace.clone())));
            registry.register(Arc::new(WriteFile::new(self.workspace.clone())));
            registry.register(Arc::new(ListFiles::new(self.workspace.clone())));
            registry.register(Arc::new(SearchFiles::new(self.workspace.clone())));
        }

        if self.include_shell {
            registry.register(Arc::new(
                RunCommand::new(self.workspace.clone()).with_config(self.shell_config),
            ));
        }

        if self.include_system {
            registry.register(Arc::new(GetSystemInfo));
            registry.register(Arc::new(ManageProcesses));
        }

        registry
    }
}

/// Registry with every built-in tool rooted at `workspace`
pub fn create_standard_tool_registry(workspace: PathBuf) -> ToolRegistry {
    ToolRegistryBuilder::new(workspace).build()
}
