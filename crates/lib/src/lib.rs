//! Hookchat core library — configuration, conversation identity, and the
//! webhook delivery client used by the CLI.

pub mod config;
pub mod identity;
pub mod webhook;
