//! Command-line entry points, one function per subcommand. `main.rs` is
//! kept to argument parsing and dispatch; every subcommand's actual work
//! lives in [`commands`].

pub mod commands;
