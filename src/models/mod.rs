//! Data models for the Learning Hub application.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod kind;
mod postcard;
mod profile;
mod takeover;
mod team;
mod theme;
mod three_two_one;
mod visibility;

pub use kind::*;
pub use postcard::*;
pub use profile::*;
pub use takeover::*;
pub use team::*;
pub use theme::*;
pub use three_two_one::*;
pub use visibility::*;
