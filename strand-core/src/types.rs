/// Identifier handed out by a [`crate::scene::SceneStore`] when an
/// instance is registered.
///
/// Only meaningful within the store that issued it.
pub type ObjectId = usize;

/// Timeline position of a keyframe. Fractional frames are allowed.
pub type Frame = f32;
