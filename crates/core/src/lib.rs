// Core gateway layer for the cq Cardano transaction decoder

pub mod bridge;
pub mod clock;
pub mod decoder;
pub mod input;
pub mod rate_limit;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::{BridgeError, ProcessBridge, ProcessInvocation};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decoder::CqDecoder;
pub use input::DecoderInput;
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter, SweeperHandle};
pub use types::*;
