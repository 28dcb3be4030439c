use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Geom(#[from] remora_geom::Error),

    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("comparison run cancelled")]
    Cancelled,
}

/// Why one sample could not be rendered. Recorded against the sample; never aborts a run
/// except for [`ReferenceError::Cancelled`].
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {}: {stderr}", exit_label(*code))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{program}` timed out after {}ms", timeout.as_millis())]
    Timeout { program: String, timeout: Duration },

    #[error("renderer produced no output at `{}`", path.display())]
    MissingOutput { path: PathBuf },

    #[error("renderer I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("render cancelled")]
    Cancelled,
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}
