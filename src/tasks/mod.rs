//! Single-purpose steps run for one account. Each step owns its endpoint,
//! request body and the meaning of an empty or failed reply.

pub mod checkin;
pub mod coupons;
pub mod identity;
pub mod profile;

pub use identity::AccountHandle;
