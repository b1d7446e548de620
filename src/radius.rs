use derive_more::{Display, Into};
use thiserror::Error;

/// Search radius around a city center, in whole meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Into)]
pub struct Radius(u32);

impl Radius {
    pub const MIN: u32 = 500;
    pub const MAX: u32 = 5_000;
    pub const STEP: u32 = 500;

    pub fn meters(self) -> u32 {
        self.0
    }
}

impl Default for Radius {
    fn default() -> Self {
        Self(1_000)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RadiusError {
    #[error("radius of {0} m is outside {min}..={max} m", min = Radius::MIN, max = Radius::MAX)]
    OutOfRange(u32),

    #[error("radius of {0} m is not a multiple of {step} m", step = Radius::STEP)]
    Step(u32),
}

impl TryFrom<u32> for Radius {
    type Error = RadiusError;

    fn try_from(meters: u32) -> Result<Self, Self::Error> {
        if !(Self::MIN..=Self::MAX).contains(&meters) {
            Err(RadiusError::OutOfRange(meters))
        } else if meters % Self::STEP != 0 {
            Err(RadiusError::Step(meters))
        } else {
            Ok(Self(meters))
        }
    }
}
