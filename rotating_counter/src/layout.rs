//! Bucket layout
//!
//! A counter window of `duration` is tiled by `buckets` slots of
//! `resolution` each. The requested resolution is a hint: the bucket count is
//! the whole number of requested resolutions that fit in the duration, never
//! less than one, and the effective resolution is then recomputed from it so
//! that the slots cover the window without drift.

use std::time::Duration;

use crate::Error;

/// The largest number of buckets a counter may allocate.
pub const MAXIMUM_BUCKETS: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The computed shape of a counter window.
pub struct Layout {
    buckets: usize,
    duration: Duration,
    resolution: Duration,
}

impl Layout {
    /// Compute the layout for a `duration` window with roughly `resolution`
    /// wide buckets.
    ///
    /// # Errors
    ///
    /// Returns an error if either argument is zero or if the window would need
    /// more than [`MAXIMUM_BUCKETS`] buckets.
    pub fn new(duration: Duration, resolution: Duration) -> Result<Self, Error> {
        if duration.is_zero() {
            return Err(Error::ZeroDuration);
        }
        if resolution.is_zero() {
            return Err(Error::ZeroResolution);
        }

        // A resolution wider than the window clamps to a single bucket.
        let requested = (duration.as_nanos() / resolution.as_nanos()).max(1);
        let buckets = u32::try_from(requested)
            .ok()
            .filter(|n| *n as usize <= MAXIMUM_BUCKETS)
            .ok_or(Error::TooManyBuckets {
                requested,
                maximum: MAXIMUM_BUCKETS,
            })?;

        Ok(Self {
            buckets: buckets as usize,
            duration,
            resolution: duration / buckets,
        })
    }

    /// The number of buckets in the window.
    #[must_use]
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// The total width of the window.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The effective width of a single bucket.
    #[must_use]
    pub fn resolution(&self) -> Duration {
        self.resolution
    }
}
