pub mod brackets;
pub mod config;
pub mod error;
pub mod loader;
pub mod machine;
pub mod opcode;
pub mod tape;

pub use config::Config;
pub use error::{Error, Result};
pub use loader::Program;
pub use machine::{Halt, Machine, run};
pub use opcode::{Opcode, Tier, Tiers};
pub use tape::Tape;
