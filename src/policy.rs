//! Split ratio selection by corpus size.
//!
//! A [`SplitPolicy`] maps a line count to train/dev/test ratios through three
//! size bands. Every band has a default, so an implementation only overrides
//! the bands it cares about:
//!
//! ```
//! use ironsplit::policy::{SplitPolicy, SplitRatios};
//!
//! struct HalfSmall;
//!
//! impl SplitPolicy for HalfSmall {
//!     fn below_thousand(&self) -> SplitRatios {
//!         SplitRatios::new(0.5, 0.25, 0.25)
//!     }
//! }
//!
//! assert_eq!(HalfSmall.ratios_for(500), SplitRatios::new(0.5, 0.25, 0.25));
//! assert_eq!(HalfSmall.ratios_for(50_000), SplitRatios::new(0.6, 0.2, 0.2));
//! ```
//!
//! [`BandOverrides`] does the same without a new type.
//!
//! The default million-line band is `(0.98, 0.10, 0.10)`, which sums to 1.18.
//! It is kept as-is; [`SplitPlan`] derives train from the remainder, so the
//! partition sizes still add up to the line count.

use serde::{Deserialize, Serialize};

/// Train/dev/test proportions. The sum is not checked.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub dev: f64,
    pub test: f64,
}

impl SplitRatios {
    #[must_use]
    pub const fn new(train: f64, dev: f64, test: f64) -> Self {
        Self { train, dev, test }
    }

    /// Default for corpora under a thousand lines.
    pub const SMALL: Self = Self::new(0.70, 0.00, 0.30);

    /// Default for corpora under a million lines.
    pub const MEDIUM: Self = Self::new(0.60, 0.20, 0.20);

    /// Default for corpora of a million lines or more.
    pub const LARGE: Self = Self::new(0.98, 0.10, 0.10);
}

/// Size band a corpus falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitBand {
    /// `n < 1_000`
    BelowThousand,
    /// `1_000 <= n < 1_000_000`
    BelowMillion,
    /// `n >= 1_000_000`
    MillionOrMore,
}

impl SplitBand {
    #[must_use]
    pub const fn for_line_count(n: u64) -> Self {
        if n < 1_000 {
            Self::BelowThousand
        } else if n < 1_000_000 {
            Self::BelowMillion
        } else {
            Self::MillionOrMore
        }
    }
}

/// Strategy for choosing split ratios.
pub trait SplitPolicy: Send + Sync {
    fn below_thousand(&self) -> SplitRatios {
        SplitRatios::SMALL
    }

    fn below_million(&self) -> SplitRatios {
        SplitRatios::MEDIUM
    }

    fn million_or_more(&self) -> SplitRatios {
        SplitRatios::LARGE
    }

    /// Ratios for a corpus of `line_count` lines.
    fn ratios_for(&self, line_count: u64) -> SplitRatios {
        match SplitBand::for_line_count(line_count) {
            SplitBand::BelowThousand => self.below_thousand(),
            SplitBand::BelowMillion => self.below_million(),
            SplitBand::MillionOrMore => self.million_or_more(),
        }
    }
}

/// The built-in policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSplitPolicy;

impl SplitPolicy for DefaultSplitPolicy {}

/// Per-band overrides on top of the default policy.
///
/// ```
/// use ironsplit::policy::{BandOverrides, SplitPolicy, SplitRatios};
///
/// let policy = BandOverrides::default().below_million(SplitRatios::new(0.8, 0.1, 0.1));
/// assert_eq!(policy.ratios_for(5_000).train, 0.8);
/// assert_eq!(policy.ratios_for(10).train, 0.7);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandOverrides {
    #[serde(default)]
    pub small: Option<SplitRatios>,
    #[serde(default)]
    pub medium: Option<SplitRatios>,
    #[serde(default)]
    pub large: Option<SplitRatios>,
}

impl BandOverrides {
    #[must_use]
    pub const fn below_thousand(mut self, ratios: SplitRatios) -> Self {
        self.small = Some(ratios);
        self
    }

    #[must_use]
    pub const fn below_million(mut self, ratios: SplitRatios) -> Self {
        self.medium = Some(ratios);
        self
    }

    #[must_use]
    pub const fn million_or_more(mut self, ratios: SplitRatios) -> Self {
        self.large = Some(ratios);
        self
    }
}

impl SplitPolicy for BandOverrides {
    fn below_thousand(&self) -> SplitRatios {
        self.small.unwrap_or_else(|| DefaultSplitPolicy.below_thousand())
    }

    fn below_million(&self) -> SplitRatios {
        self.medium.unwrap_or_else(|| DefaultSplitPolicy.below_million())
    }

    fn million_or_more(&self) -> SplitRatios {
        self.large.unwrap_or_else(|| DefaultSplitPolicy.million_or_more())
    }
}

/// Exact per-partition line counts.
///
/// Invariant: `train + dev + test == line_count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub train: u64,
    pub dev: u64,
    pub test: u64,
}

impl SplitPlan {
    /// Floor the dev and test shares and give everything left to train.
    ///
    /// If a policy asks for more dev+test lines than exist, dev is capped at
    /// `line_count` and test at what dev leaves over.
    #[must_use]
    pub fn new(line_count: u64, ratios: SplitRatios) -> Self {
        let dev = floor_share(ratios.dev, line_count).min(line_count);
        let test = floor_share(ratios.test, line_count).min(line_count - dev);
        Self {
            train: line_count - dev - test,
            dev,
            test,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.train + self.dev + self.test
    }

    /// Last 1-based position that belongs to train.
    #[must_use]
    pub const fn train_end(&self) -> u64 {
        self.train
    }

    /// Last 1-based position that belongs to dev.
    #[must_use]
    pub const fn dev_end(&self) -> u64 {
        self.train + self.dev
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn floor_share(ratio: f64, n: u64) -> u64 {
    // `as` saturates: NaN and negatives become 0.
    (ratio * n as f64).floor() as u64
}
