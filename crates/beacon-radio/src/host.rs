//! The platform's own discovery advertising.
//!
//! The beacon slot and the platform's regular advertising must not run
//! at the same time, so a session pauses the latter and resumes it on
//! stop if it was running before.

pub trait HostAdvertising: Send + Sync {
    fn is_active(&self) -> bool;
    fn start_advertising(&self);
    fn stop_advertising(&self);
}
