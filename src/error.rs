use thiserror::Error;

/// Problems with the resolved configuration, raised before any stage runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("can either map or reduce, not both. (Did you mean --mapreduce ?)")]
    BothPhases,

    #[error("neither map nor reduce called")]
    NoPhase,

    #[error("the partition count must be at least 1")]
    ZeroPartitions,

    #[error("the {stage} worker count must be at least 1")]
    ZeroWorkers { stage: &'static str },
}
