/// Stand-in for the unstable `!` type.
///
/// [`DeskController::run`](crate::desk_controller::DeskController::run) returns
/// `Result<Never>`: it only ever comes back with an error.
#[derive(Debug)]
pub enum Never {}
