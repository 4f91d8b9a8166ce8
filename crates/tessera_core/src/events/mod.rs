//! # Events
//!
//! Producers announce occurrences without knowing their consumers.

mod router;

pub use router::{
    ChannelConfig, ChannelStats, EventRouter, OverflowPolicy, Publisher, Subscription,
};
