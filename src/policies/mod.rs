//! Retry delay policies.
//!
//! This module holds the pure backoff calculators that turn an attempt
//! number into a delay, plus the adapter that packages a calculator as an
//! `on_retry` hook. See [`BackoffPolicy`].

mod backoff;

pub use backoff::BackoffPolicy;
