// src/config/mod.rs

//! Configuration inputs of an invocation.
//!
//! - [`locations`] lists the rc-file candidates in precedence order.
//! - [`args_file`] turns rc files into flag arguments ahead of argv.
//! - [`overlay`] merges `key=value` tokens with env-format files.
//! - [`input`] resolves the parsed CLI into an immutable [`ResolvedInput`].

pub mod args_file;
pub mod input;
pub mod locations;
pub mod overlay;

pub use args_file::{config_file_args, effective_args, read_args_file, ArgsFileMode};
pub use input::ResolvedInput;
pub use locations::{ConfigLocations, RC_FILE_NAME};
pub use overlay::{
    overlay, parse_key_values, parse_platforms, parse_secrets, read_env_file, KeyValueMap,
};
