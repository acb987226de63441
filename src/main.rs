//! Binary entrypoint that loads the chat store and reports its contents.

use std::process::ExitCode;

use ems_chat::start_ems_chat;

fn main() -> ExitCode {
    start_ems_chat::run()
}
