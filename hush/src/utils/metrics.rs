/// Runs given function and, with the `metrics` feature enabled, logs how long
/// it took.
#[cfg(feature = "metrics")]
pub fn measure<T>(metric: &str, f: impl FnOnce() -> T) -> T {
    use std::time::{Duration, Instant};

    let tt = Instant::now();
    let result = f();
    let tt = tt.elapsed();

    // Sub-microsecond precision is just noise
    let tt = Duration::from_micros(tt.as_micros() as u64);

    log::trace!("metric: {} = {}", metric, humantime::format_duration(tt));

    result
}

#[cfg(not(feature = "metrics"))]
pub fn measure<T>(_: &str, f: impl FnOnce() -> T) -> T {
    f()
}
