//! `fuselight` - Time-driven phase sequencer for the fuse and lightbulb
//! animation
//!
//! A projectile strikes a hanging bulb, the bulb swings, flickers and
//! settles lit. This library sequences those phases from animation
//! completion events and one internal timer, and derives the visual
//! parameters a renderer paints each frame.

pub mod animation;
pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod player;
pub mod render;
pub mod scheduler;
pub mod sequencer;
