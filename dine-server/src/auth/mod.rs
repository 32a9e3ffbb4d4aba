//! Authentication: access tokens, the caller extractor, role checks and
//! per-IP rate limiting

pub mod extractor;
pub mod jwt;
pub mod permissions;
pub mod rate_limit;

pub use extractor::CurrentUser;
pub use jwt::{Claims, JwtError, JwtService};
pub use rate_limit::RateLimiter;
