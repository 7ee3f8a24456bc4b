//! deskflow CLI library: command implementations shared by the `deskflow`
//! binary and its integration tests.

pub mod commands;
