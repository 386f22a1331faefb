//! Parley: dialog stack orchestration.
//!
//! A conversation is a stack of running dialogs. Each inbound turn is
//! dispatched to the dialog on top of the stack; dialogs begin children,
//! end with results that resume their parents, and container dialogs host
//! nested stacks of their own. `domain` holds the engine, `library` the
//! reusable dialog variants, and `application` the turn handling that
//! loads and saves state around the engine.

pub mod application;
pub mod domain;
pub mod library;
