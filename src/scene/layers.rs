//! Layer masks and render queue ranges used to filter renderers

use std::fmt;
use std::ops::{BitOr, RangeInclusive};

/// Number of layers a renderer can be assigned to
pub const LAYER_COUNT: u8 = 32;

/// 32-bit layer mask; bit `n` selects layer `n`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NOTHING: Self = Self(0);
    pub const EVERYTHING: Self = Self(u32::MAX);

    /// Mask selecting a single layer. Layers outside `0..32` select nothing.
    pub fn layer(layer: u8) -> Self {
        if layer < LAYER_COUNT {
            Self(1 << layer)
        } else {
            Self::NOTHING
        }
    }

    pub fn from_layers(layers: &[u8]) -> Self {
        layers
            .iter()
            .fold(Self::NOTHING, |mask, &layer| mask | Self::layer(layer))
    }

    pub fn contains_layer(&self, layer: u8) -> bool {
        layer < LAYER_COUNT && self.0 & (1 << layer) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Layers selected by this mask, lowest first
    pub fn layers(&self) -> impl Iterator<Item = u8> + '_ {
        (0..LAYER_COUNT).filter(move |&layer| self.contains_layer(layer))
    }
}

impl BitOr for LayerMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for LayerMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerMask({:#010x})", self.0)
    }
}

/// Inclusive range of render queue values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderQueueRange {
    pub lower: i32,
    pub upper: i32,
}

impl RenderQueueRange {
    pub const MIN_QUEUE: i32 = 0;
    pub const MAX_QUEUE: i32 = 5000;

    pub const ALL: Self = Self {
        lower: Self::MIN_QUEUE,
        upper: Self::MAX_QUEUE,
    };
    pub const OPAQUE: Self = Self {
        lower: Self::MIN_QUEUE,
        upper: 2500,
    };
    pub const TRANSPARENT: Self = Self {
        lower: 2501,
        upper: Self::MAX_QUEUE,
    };

    pub fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, queue: i32) -> bool {
        (self.lower..=self.upper).contains(&queue)
    }
}

impl Default for RenderQueueRange {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<RangeInclusive<i32>> for RenderQueueRange {
    fn from(range: RangeInclusive<i32>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// Well-known render queue values
pub mod queue {
    pub const BACKGROUND: i32 = 1000;
    pub const GEOMETRY: i32 = 2000;
    pub const ALPHA_TEST: i32 = 2450;
    pub const TRANSPARENT: i32 = 3000;
    pub const OVERLAY: i32 = 4000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask_membership() {
        let mask = LayerMask::from_layers(&[0, 5, 31]);
        assert!(mask.contains_layer(0));
        assert!(mask.contains_layer(5));
        assert!(mask.contains_layer(31));
        assert!(!mask.contains_layer(1));
        assert_eq!(mask.layers().collect::<Vec<_>>(), vec![0, 5, 31]);
    }

    #[test]
    fn test_out_of_range_layer_selects_nothing() {
        assert_eq!(LayerMask::layer(32), LayerMask::NOTHING);
        assert!(!LayerMask::EVERYTHING.contains_layer(40));
    }

    #[test]
    fn test_queue_ranges_split_at_transparent() {
        assert!(RenderQueueRange::OPAQUE.contains(queue::GEOMETRY));
        assert!(!RenderQueueRange::OPAQUE.contains(queue::TRANSPARENT));
        assert!(RenderQueueRange::TRANSPARENT.contains(queue::TRANSPARENT));
        assert!(RenderQueueRange::ALL.contains(0));
        assert!(RenderQueueRange::ALL.contains(5000));
        assert!(!RenderQueueRange::ALL.contains(5001));
    }

    #[test]
    fn test_queue_range_from_inclusive_range() {
        let range: RenderQueueRange = (1000..=2000).into();
        assert!(range.contains(1000));
        assert!(range.contains(2000));
        assert!(!range.contains(999));
    }
}
