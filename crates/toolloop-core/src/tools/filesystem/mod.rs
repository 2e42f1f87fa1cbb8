//! Filesystem tools for file operations

mod list;
mod path_utils;
mod read;
mod search;
mod write;

pub use list::ListFiles;
pub use read::ReadFile;
pub use search::SearchFiles;
pub use write::WriteFile;

pub use path_utils::{
    normalize_path, path_to_display, relative_display, resolve, validate_path, validate_write_path,
};

/// Largest file `read_file` will return (10 MiB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
