//! Identifiers for blueprint entities.

use serde::{Deserialize, Serialize};

/// Index of a state inside its owning [`AnimatorLayer`](crate::blueprint::AnimatorLayer).
///
/// Ids are dense and only meaningful together with the layer that issued them.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for StateId {
    #[inline]
    fn from(idx: usize) -> Self {
        StateId(idx as u32)
    }
}
