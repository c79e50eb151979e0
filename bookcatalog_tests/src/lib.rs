//! End to end tests for the book catalog service.
//! Require a running instance on localhost, so they are gated behind the
//! `system_tests` feature.

#[cfg(all(test, feature = "system_tests"))]
mod system_tests;
