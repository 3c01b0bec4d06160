use std::thread;
use std::time::Duration;

/// Blocking wait used by the blocking traversal strategy.
pub trait Sleeper {
    fn sleep(&self, d: Duration);
}

/// Sleeps the calling thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, d: Duration) {
        thread::sleep(d);
    }
}

/// Sleep for `d`; a zero duration returns immediately.
pub fn pause(sleeper: &dyn Sleeper, d: Duration) {
    if !d.is_zero() {
        sleeper.sleep(d);
    }
}

/// Seconds as a duration. Callers validate the value first.
pub fn secs(secs: f64) -> Duration {
    Duration::from_secs_f64(secs.max(0.0))
}
