use fornax::core::io::scene_json::SceneFileError;
use fornax::engine::error::{PlaybackError, SceneError};
use fornax::engine::scene::Rejection;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Failed to write scene: {0}")]
    SceneFile(#[from] SceneFileError),

    #[error("Edit rejected: {0}")]
    Rejected(Rejection),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn file_parsing_keeps_the_parser_error_as_source() {
        let source = toml::from_str::<toml::Table>("key = ").unwrap_err();
        let err = CliError::FileParsing {
            path: PathBuf::from("fornax.toml"),
            source: source.into(),
        };
        assert!(err.to_string().starts_with("Failed to parse file 'fornax.toml'"));
        assert!(err.source().is_some());
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn read() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/fornax/config.toml")?)
        }
        assert!(matches!(read(), Err(CliError::Io(_))));
    }
}
