//! Background loops for continuous processing.

pub mod decision_loop;
