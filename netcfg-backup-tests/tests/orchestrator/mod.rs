//! Orchestrator tests for netcfg-backup
//!
//! These tests drive full batch runs against the mock driver and check the
//! results, the session discipline and the artifacts left on disk.

mod batch;
mod scenarios;
mod sessions;
