//! Study Buddy CLI Library Crate
//!
//! Configuration loading and the terminal surface for the `study-buddy`
//! binary. The binary itself is a thin wrapper that wires these into a
//! `StudyBuddy` session.

pub mod config;
pub mod console;
