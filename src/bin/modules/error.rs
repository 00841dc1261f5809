use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    /// Errors originating from the core dmlimit library.
    #[error("Calculation error: {0}")]
    Calculation(#[from] dmlimit::DmLimitError),

    /// I/O errors associated with a specific file path.
    #[error("I/O error for '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// General I/O errors not tied to a specific file.
    #[error("I/O error: {0}")]
    GenericIo(#[from] std::io::Error),

    /// Command-line values that cannot describe a sweep.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
