use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),

    #[error("failed to render output: {0}")]
    Render(String),

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
