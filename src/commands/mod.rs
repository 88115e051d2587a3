//! Command implementations for the brewmaint CLI
//!
//! - **bump**: compare packages against upstream and open bump pull requests
//! - **generate_zap**: infer a cask `zap` stanza from leftover files

pub mod bump;
pub mod generate_zap;

pub use bump::{BumpArgs, bump};
pub use generate_zap::{GenerateZapArgs, generate_zap};
