//! E2E test harness for nt.

pub mod workspace;

pub use workspace::TestWorkspace;
