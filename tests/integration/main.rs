//! Integration tests for complete Nutra runs.

mod helpers;

mod config_test;
mod failure_test;
mod lifecycle_test;
mod preprocess_test;
mod reporting_test;
