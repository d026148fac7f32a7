use derive_more::derive::{Display, Error};

/// `Result` with this crate's [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can go wrong in desk-kit.
///
/// Missing or rejected height frames are not errors: polling reports them as
/// `None` and the next poll simply tries again.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// A background task could not be spawned (its pool is already in use).
    // `SpawnError` does not implement `core::error::Error`, so it cannot be
    // the source.
    #[cfg(target_os = "none")]
    #[display("Task spawn failed: {_0:?}")]
    TaskSpawn(#[error(not(source))] embassy_executor::SpawnError),

    /// A relay output pin refused a level change. RP2040/RP2350 GPIO outputs
    /// cannot fail, so this only comes from other `OutputPin` drivers.
    #[display("Relay output could not be set")]
    RelayOutput,

    /// A [`DeskConfig`](crate::config::DeskConfig) value is unusable.
    #[display("Invalid desk configuration: {_0}")]
    InvalidConfig(#[error(not(source))] &'static str),
}

#[cfg(target_os = "none")]
impl From<embassy_executor::SpawnError> for Error {
    fn from(spawn_error: embassy_executor::SpawnError) -> Self {
        Self::TaskSpawn(spawn_error)
    }
}
