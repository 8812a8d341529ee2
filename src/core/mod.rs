//! Infrastructure: persistence, session state, mail delivery, shared utilities

pub mod mail;
pub mod persistence;
pub mod state;
pub mod util;
