//! Broadcast channel for the current snapshot.
//!
//! A [`Provider`] holds exactly one current value; any number of [`Consumer`]s
//! read it and subscribe to be told synchronously when it is replaced.

mod channel;

pub use channel::{channel, Consumer, Provider, Subscription};
