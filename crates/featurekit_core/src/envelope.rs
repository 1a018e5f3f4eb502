//! Axis-aligned bounding regions.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle.
///
/// The null envelope contains nothing; expanding it by another envelope
/// yields that envelope. Coordinates are opaque numbers; no reference
/// system is attached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Envelope {
    /// Creates an envelope from two corner coordinates, in any order.
    #[must_use]
    pub fn new(x1: f64, x2: f64, y1: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Returns the null envelope.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: -1.0,
            max_y: -1.0,
        }
    }

    /// Returns true if this envelope contains nothing.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.max_x < self.min_x
    }

    /// Minimum x, or `None` for the null envelope.
    #[must_use]
    pub fn min_x(&self) -> Option<f64> {
        (!self.is_null()).then_some(self.min_x)
    }

    /// Minimum y, or `None` for the null envelope.
    #[must_use]
    pub fn min_y(&self) -> Option<f64> {
        (!self.is_null()).then_some(self.min_y)
    }

    /// Maximum x, or `None` for the null envelope.
    #[must_use]
    pub fn max_x(&self) -> Option<f64> {
        (!self.is_null()).then_some(self.max_x)
    }

    /// Maximum y, or `None` for the null envelope.
    #[must_use]
    pub fn max_y(&self) -> Option<f64> {
        (!self.is_null()).then_some(self.max_y)
    }

    /// Width; zero for the null envelope.
    #[must_use]
    pub fn width(&self) -> f64 {
        if self.is_null() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    /// Height; zero for the null envelope.
    #[must_use]
    pub fn height(&self) -> f64 {
        if self.is_null() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    /// Grows this envelope to cover `other`.
    pub fn expand_to_include(&mut self, other: &Envelope) {
        if other.is_null() {
            return;
        }
        if self.is_null() {
            *self = *other;
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Returns the smallest envelope covering both.
    #[must_use]
    pub fn union(&self, other: &Envelope) -> Envelope {
        let mut merged = *self;
        merged.expand_to_include(other);
        merged
    }

    /// Returns true if `other` lies entirely inside this envelope.
    #[must_use]
    pub fn contains(&self, other: &Envelope) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Returns true if the envelopes share at least one point.
    #[must_use]
    pub fn intersects(&self, other: &Envelope) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::null()
    }
}
