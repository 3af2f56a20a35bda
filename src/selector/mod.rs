//! Projecting the snapshot into a leaf's inputs.

mod connect;

pub use connect::{connect, connect_with, snapshot_props, Connected, Identity, MountedLeaf, Prop, Props};
