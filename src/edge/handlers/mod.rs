pub mod forward;
pub use self::forward::{forward, Upstream, DEFAULT_UPSTREAM_TIMEOUT, MAX_BODY_BYTES};

pub mod health;
pub use self::health::health;
