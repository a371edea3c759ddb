//! Diversion CLI - command line tools for the decision service.
//!
//! Binaries:
//! - divert_sim: scripted emergency flight simulator
//! - list_airports: print the airport directory served by the server

pub mod sim;
