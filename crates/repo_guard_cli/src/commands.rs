//! Command modules for the repo-guard CLI.
//!
//! - `apply_cmd`: provision a repository from a plan
//! - `init_cmd`: write the built-in plan to a file

pub mod apply_cmd;
pub mod init_cmd;
