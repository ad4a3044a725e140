use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    /// Errors originating from the core chargefit library.
    #[error("Calculation error: {0}")]
    Calculation(#[from] chargefit::ChargeError),

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

    /// Errors parsing SDF input.
    #[error("Failed to parse SDF from {source_name}: {details}")]
    SdfParse {
        source_name: String,
        details: String,
    },

    /// A method with atom parameters was run without a parameter file.
    #[error("Method '{0}' needs a parameter file (--par-file)")]
    MissingParameterFile(String),

    /// Failure to configure the worker thread pool or the log output.
    #[error("Setup error: {0}")]
    Setup(String),
}
