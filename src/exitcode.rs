//! Process exit codes

/// Successful termination
pub const OK: i32 = 0;

/// Any failure: usage, authentication, transfer or communication error
pub const FAILURE: i32 = 1;
