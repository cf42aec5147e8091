//! Thumbnail size variants.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three thumbnail variants generated for every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailSize {
    Sm,
    Md,
    Lg,
}

impl ThumbnailSize {
    pub const ALL: [ThumbnailSize; 3] = [ThumbnailSize::Sm, ThumbnailSize::Md, ThumbnailSize::Lg];

    /// Bounding-box edge in pixels. The source is scaled, preserving aspect
    /// ratio, to the largest size that fits the box.
    pub fn bound(&self) -> u32 {
        match self {
            ThumbnailSize::Sm => 128,
            ThumbnailSize::Md => 512,
            ThumbnailSize::Lg => 1024,
        }
    }
}

impl Display for ThumbnailSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ThumbnailSize::Sm => write!(f, "sm"),
            ThumbnailSize::Md => write!(f, "md"),
            ThumbnailSize::Lg => write!(f, "lg"),
        }
    }
}

impl FromStr for ThumbnailSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sm" => Ok(ThumbnailSize::Sm),
            "md" => Ok(ThumbnailSize::Md),
            "lg" => Ok(ThumbnailSize::Lg),
            _ => Err(anyhow::anyhow!("Invalid thumbnail size: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_strictly_increasing() {
        assert!(ThumbnailSize::Sm.bound() < ThumbnailSize::Md.bound());
        assert!(ThumbnailSize::Md.bound() < ThumbnailSize::Lg.bound());
    }

    #[test]
    fn display_round_trips() {
        for size in ThumbnailSize::ALL {
            assert_eq!(size.to_string().parse::<ThumbnailSize>().unwrap(), size);
        }
        assert!("xl".parse::<ThumbnailSize>().is_err());
    }
}
