//! Runtime defaults
//!
//! Single source of truth for the values `RuntimeConfig` falls back to.

/// Scheduler timing
pub mod timing {
    /// Fixed tick interval (roughly 60 ticks per second)
    pub const TICK_INTERVAL_MS: u64 = 16;
    /// Time a bridge call may wait for the engine's reply
    pub const BRIDGE_TIMEOUT_MS: u64 = 2000;
}

/// Engine readiness handshake
pub mod handshake {
    /// Bootstrap requests sent before giving up
    pub const READY_ATTEMPTS: u32 = 5;
    /// Pause between bootstrap requests
    pub const READY_BACKOFF_MS: u64 = 100;
}

/// Broker channel defaults
pub mod channels {
    /// Messages queued per sink before the overflow policy applies
    pub const CAPACITY: usize = 256;
    /// Requests queued between the bridge and the engine
    pub const BRIDGE_QUEUE: usize = 64;
}

/// File names
pub mod paths {
    /// Config file looked up next to the system document
    pub const CONFIG_FILE: &str = "orbital.json";
}
