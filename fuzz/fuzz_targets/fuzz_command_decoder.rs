//! Fuzz target: `decode_command`
//!
//! Drives arbitrary bytes into the validating command decoder and checks
//! that it never panics and that every accepted command names itself
//! with one of the known wire names.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartgarden::rpc::codec::{DecodeError, decode_command};
use smartgarden::rpc::command::Command;

fuzz_target!(|data: &[u8]| {
    match decode_command(data) {
        Ok(cmd) => assert!(Command::NAMES.contains(&cmd.name())),
        Err(DecodeError::Unknown(name)) => assert!(name.len() <= 32),
        Err(_) => {}
    }
});
