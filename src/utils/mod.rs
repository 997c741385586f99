pub mod environment;
pub mod logging;
pub mod paths;
pub mod process;
pub mod sources;

pub use environment::{current_exe, find_executable};
pub use paths::{
    absolutize, format_path_with_tilde, relative_to, resolve_workspace, validate_file_size,
};
pub use process::{ToolCommand, ToolOutput};
pub use sources::SourceScan;
