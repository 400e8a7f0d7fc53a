#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("register allocation invariant broken in `{func}`: {reason}")]
    InvariantViolation { func: String, reason: String },

    #[error("function `{func}` exceeds the stack frame budget ({requested} of {budget} bytes)")]
    FrameBudgetExceeded {
        func: String,
        requested: u32,
        budget: u32,
    },

    #[error("spill temporary v{0} was itself selected for spilling")]
    SpillTempSpilled(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
