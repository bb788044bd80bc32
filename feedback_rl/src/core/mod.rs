//! Core types shared across the training pipeline.

pub mod episode_state;
pub mod feedback_slot;
pub mod frame_stack;
pub mod target_network;
pub mod transition;

pub use episode_state::EpisodeState;
pub use feedback_slot::FeedbackSlot;
pub use frame_stack::FrameStack;
pub use target_network::{hard_copy, TargetSync};
pub use transition::{Transition, unix_now};
