use thiserror::Error;

/// Typed failures surfaced at the engine boundary.
///
/// `InputInvalid` and `InvariantBreach` are fatal: the caller should abort
/// the run. `Infeasible` is informational (soft-constraint violations are
/// priced into cost, not rejected). An operator that cannot apply reports
/// it by returning `Ok(0)` (§4.4/§7's "number of applications"), not an
/// `Err`, and cancellation is reported via `EngineOutput::cancelled`, not
/// a `Result` at all — so there is no variant for either here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("infeasible: {0}")]
    Infeasible(String),

    #[error("internal invariant breach at container {container}, day {day}: {detail}")]
    InvariantBreach {
        container: usize,
        day: usize,
        detail: String,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
