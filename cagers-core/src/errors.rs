use std::fmt::{self, Display};

use thiserror::Error;

/// Pipeline stage names, used when reporting which step of a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clustering,
    Profiling,
    Aggregation,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Clustering => "clustering",
            Stage::Profiling => "profiling",
            Stage::Aggregation => "aggregation",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug)]
pub enum CageError {
    /// Invalid option values. Raised before any computation starts and
    /// never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A sample or cluster lacks usable signal for the requested
    /// operation. Recoverable: callers skip the affected unit and
    /// continue rather than fabricate values.
    #[error("sample '{sample}': {reason}")]
    Data { sample: String, reason: String },

    /// A worker task failed. Remaining scheduled work is cancelled and
    /// partial results are discarded.
    #[error("{stage} failed for sample '{sample}'")]
    Execution {
        stage: Stage,
        sample: String,
        #[source]
        source: Box<CageError>,
    },
}

impl CageError {
    /// Wrap a per-sample task failure with the stage and sample it
    /// happened in, so a failed run never reports a bare "failed".
    pub fn in_stage(self, stage: Stage, sample: &str) -> CageError {
        CageError::Execution {
            stage,
            sample: sample.to_string(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_execution_error_names_stage_and_sample() {
        let inner = CageError::Data {
            sample: "liver_1".to_string(),
            reason: "no CTSS positions pass the inclusion filter".to_string(),
        };
        let err = inner.in_stage(Stage::Clustering, "liver_1");
        assert_eq!(err.to_string(), "clustering failed for sample 'liver_1'");

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(
            source.to_string(),
            "sample 'liver_1': no CTSS positions pass the inclusion filter"
        );
    }
}
