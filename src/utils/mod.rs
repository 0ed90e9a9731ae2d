use std::process;

/// Returns the current `CLOCK_MONOTONIC` time in milliseconds.
///
/// The clock is unaffected by wall-clock adjustments. Failing to read it is an unrecoverable
/// environment fault, so the process exits right away.
pub fn now_ms() -> i64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    // SAFETY: ts is a valid, writable timespec for the duration of the call.
    let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        error!("clock_gettime(CLOCK_MONOTONIC) failed: {err}");
        process::exit(1);
    }

    i64::from(ts.tv_sec) * 1000 + i64::from(ts.tv_nsec) / 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_monotonic() {
        let mut prev = now_ms();
        for _ in 0..1000 {
            let now = now_ms();
            assert!(now >= prev);
            prev = now;
        }
    }
}
