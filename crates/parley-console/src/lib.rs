//! Parley console host.
//!
//! Reads user messages from stdin, runs them through a small demo dialog
//! tree and prints the replies.

pub mod config;
pub mod demo;
pub mod error;
