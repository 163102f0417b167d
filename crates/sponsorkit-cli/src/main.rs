#[macro_use]
extern crate hiro_system_kit;

#[macro_use]
mod macros;

pub mod cli;

fn main() {
    cli::main();
}
