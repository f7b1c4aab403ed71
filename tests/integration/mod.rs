//! Integration test suite for tirunner.
//!
//! These tests drive the loader, dispatcher, and coordinator together
//! against a scripted in-memory server.
//!
//! # Test Categories
//!
//! - `dispatch`: Worker pool bounds, completion order, and failure isolation
//! - `run_e2e`: Full runs from input file to summary, including fatal paths
//!
//! # CI Compatibility
//!
//! No test opens a network connection.


mod run_e2e;
