//! Command implementations for pmps-cli

pub mod hosts;
pub mod plc;
pub mod run;

pub use hosts::run_hosts;
pub use plc::run_plc;
pub use run::run_action;
