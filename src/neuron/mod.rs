//! Perception Neuron capture via the Axis Neuron BVH data stream.

pub mod bones;
pub mod frame;
pub mod reader;

pub use bones::{bone_index, BONES, BONE_COUNT};
pub use frame::{AvatarFrame, FrameError, FrameSplitter};
pub use reader::NeuronReader;
