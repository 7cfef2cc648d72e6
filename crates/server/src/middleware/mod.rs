pub mod rate_limit;

pub use rate_limit::{enforce_rate_limit, RateLimitGuard};
