//! Display models for CLI output
//!
//! Converts API response types into CLI-friendly display formats.

mod display;
