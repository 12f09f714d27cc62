use thiserror::Error;

//configuration errors, raised before a simulation starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("score {0} is outside [0, 1]")]
    ScoreOutOfRange(f64),
    #[error("initial capital must be non-negative and finite, got {0}")]
    NegativeCapital(f64),
    #[error("{name} must be in [0, 1), got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("max_hold must be at least 1")]
    ZeroMaxHold,
    #[error("{name} window must be at least {min}, got {value}")]
    InvalidWindow {
        name: &'static str,
        value: usize,
        min: usize,
    },
    #[error("lot size must be at least 1")]
    InvalidLotSize,
    #[error("periods_per_year must be positive, got {0}")]
    InvalidPeriodsPerYear(f64),
    #[error("invalid score bands: {0}")]
    InvalidScoreBands(String),
    #[error("invalid composite weights: calc={calc}, ai={ai}")]
    InvalidWeights { calc: f64, ai: f64 },
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("no instruments configured")]
    NoInstruments,
    #[error("instruments share no common trading dates")]
    NoCommonDates,
    #[error("no bars found for instrument {0}")]
    MissingInstrument(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
