//! Conformance-testing infrastructure for taps and targets.
//!
//! The harness has three layers: runners execute a plugin end-to-end
//! and capture its output, templates drive every test category through
//! one shared four-phase lifecycle, and a small built-in test library
//! covers the checks any connector should pass.

pub mod config;
pub mod runner;
pub mod samples;
pub mod templates;

pub use config::SuiteConfig;
pub use runner::{TapTestRunner, TargetTestRunner};
pub use templates::{
    run_lifecycle, singer_fixture_path, AttributeTest, AttributeTestContext, HookOutcome,
    PluginKind, StreamTest, StreamTestContext, SyncContext, TapTest, TapTestContext, TargetTest,
    TargetTestContext, TestIdentity, TestResource, TestTemplate,
};
