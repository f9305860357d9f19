//! # Pipeline Errors
//!
//! Every failure during `execute()` is fatal for the run: the loop stops
//! immediately and the error names the unit and bag involved.

use aerie_types::NestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// `execute()` called on a loop without a resolved source.
    #[error("[{main_loop}] no source specified")]
    NoSource { main_loop: String },

    /// A required module chain resolved to nothing.
    #[error("[{main_loop}] module chain '{chain}' is empty")]
    NoModules { main_loop: String, chain: String },

    #[error("Source '{source_name}' failed: {error}")]
    SourceFailed {
        source_name: String,
        #[source]
        error: NestError,
    },

    #[error("Module '{module}' failed on bag {bag}: {error}")]
    ModuleFailed {
        module: String,
        bag: u64,
        #[source]
        error: NestError,
    },

    #[error("Signpost '{signpost}' failed on bag {bag}: {error}")]
    SignpostFailed {
        signpost: String,
        bag: u64,
        #[source]
        error: NestError,
    },

    /// The signpost picked a fork that does not exist.
    #[error("Signpost '{signpost}' returned fork {fork} on bag {bag}; only 1 and 2 exist")]
    InvalidFork {
        signpost: String,
        bag: u64,
        fork: usize,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<PipelineError> for NestError {
    fn from(err: PipelineError) -> Self {
        NestError::Other(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_module_failed_keeps_source() {
        let err = PipelineError::ModuleFailed {
            module: "fitter".to_string(),
            bag: 4,
            error: NestError::component("fitter", "no hits"),
        };
        assert_eq!(err.to_string(), "Module 'fitter' failed on bag 4: [fitter] no hits");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_into_nest_error() {
        let err: NestError = PipelineError::Configuration("bad".to_string()).into();
        assert!(matches!(err, NestError::Other(_)));
        assert_eq!(err.to_string(), "Configuration error: bad");
    }
}
