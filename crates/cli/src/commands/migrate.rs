use crate::commands::{with_database, CommandResult};

pub fn run() -> CommandResult {
    let result = with_database("migrate", |_pool, _config| async { Ok(()) });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => failure,
    }
}
