//! A rotating counter
//!
//! This library keeps an approximate running sum of values added over a
//! trailing window of time, for questions like "how many requests in the last
//! 60 seconds?". The window is split into a fixed number of buckets. A single
//! background task owns the buckets, applies every add and, once per bucket
//! width, rotates to the next bucket and drops the oldest from the total.
//! Memory is fixed at construction no matter how many values are added.
//!
//! Producers never touch the buckets. They submit values over a bounded
//! channel, see [`Counter`].

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

mod counter;
mod layout;
mod ring;
mod worker;

pub use counter::Counter;
pub use layout::{Layout, MAXIMUM_BUCKETS};

/// Errors produced when constructing a [`Counter`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The window duration is zero.
    #[error("counter duration must not be zero")]
    ZeroDuration,
    /// The bucket resolution is zero.
    #[error("counter resolution must not be zero")]
    ZeroResolution,
    /// The window would need more buckets than allowed.
    #[error("counter would need {requested} buckets, maximum is {maximum}")]
    TooManyBuckets {
        /// Buckets needed for the requested duration and resolution.
        requested: u128,
        /// The largest allowed bucket count.
        maximum: usize,
    },
    /// The resolution is too large for the first rotation to be scheduled.
    #[error("counter resolution is too large to schedule a rotation")]
    DurationTooLarge,
    /// No tokio runtime is available to run the counter's worker.
    #[error("counter must be created within a tokio runtime")]
    NoRuntime,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
/// Configuration of a [`Counter`].
pub struct Config {
    /// The width of the counting window, in milliseconds.
    pub duration_milliseconds: NonZeroU64,
    /// The requested width of a single bucket, in milliseconds. The effective
    /// width is recomputed so that buckets evenly tile the window.
    pub resolution_milliseconds: NonZeroU64,
    /// Depth of the intake queue. Zero makes every add wait until it is
    /// counted.
    #[serde(default)]
    pub buffer_size: u8,
}

#[cfg(test)]
mod test {
    use std::num::NonZeroU64;

    use crate::{Config, Error};

    #[test]
    fn config_from_yaml() {
        let contents = r"
duration_milliseconds: 60000
resolution_milliseconds: 500
buffer_size: 10
";
        let config: Config = serde_yaml::from_str(contents).unwrap();
        assert_eq!(
            config,
            Config {
                duration_milliseconds: NonZeroU64::new(60_000).unwrap(),
                resolution_milliseconds: NonZeroU64::new(500).unwrap(),
                buffer_size: 10,
            }
        );
    }

    #[test]
    fn config_buffer_size_defaults_to_blocking() {
        let contents = r"
duration_milliseconds: 30
resolution_milliseconds: 10
";
        let config: Config = serde_yaml::from_str(contents).unwrap();
        assert_eq!(config.buffer_size, 0);
    }

    #[test]
    fn config_rejects_unknown_and_zero() {
        let unknown = r"
duration_milliseconds: 30
resolution_milliseconds: 10
window: 5
";
        assert!(serde_yaml::from_str::<Config>(unknown).is_err());

        let zero = r"
duration_milliseconds: 0
resolution_milliseconds: 10
";
        assert!(serde_yaml::from_str::<Config>(zero).is_err());
    }

    #[test]
    fn error_display() {
        let err = Error::TooManyBuckets {
            requested: 3_600_000_000_000,
            maximum: 1 << 20,
        };
        assert_eq!(
            err.to_string(),
            "counter would need 3600000000000 buckets, maximum is 1048576"
        );
    }
}
