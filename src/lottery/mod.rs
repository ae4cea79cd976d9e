//! Member-day lottery: campaign resolution, share registration and the two
//! bounded draw loops.

pub mod engine;
pub mod state;

pub use engine::LotteryEngine;
