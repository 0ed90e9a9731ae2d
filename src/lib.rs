#[macro_use]
extern crate tracing;

pub mod cli;
pub mod fade;
pub mod utils;
pub mod wayland;

pub use fade::Outcome;
pub use wayland::run;
