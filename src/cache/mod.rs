//! Response caching and request interception
//!
//! This module provides the shared response cache consulted before any network
//! fetch and the interception policy that blocks static assets and trackers.

mod interceptor;
mod response;

pub use interceptor::{
    is_blocked, parse_max_age, InterceptDecision, RequestInterceptor, BLOCKED_PATTERNS,
};
pub use response::{CachedResponse, ResponseCache};
