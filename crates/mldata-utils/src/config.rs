//! Runtime configuration read from `MLDATA_*` environment variables.

pub(crate) const MAX_THREADS: &str = "MLDATA_MAX_THREADS";
pub(crate) const THREAD_NAME: &str = "MLDATA_THREAD_NAME";
pub(crate) const VERBOSE: &str = "MLDATA_VERBOSE";

pub fn verbose() -> bool {
    std::env::var(VERBOSE).as_deref().unwrap_or("") == "1"
}

/// Prints a diagnostic line if verbose logging has been enabled.
pub fn verbose_print<F: Fn() -> String>(create_log_message: F) {
    if verbose() {
        eprintln!("[ml_data] {}", create_log_message())
    }
}

/// Number of worker threads of the global pool.
///
/// `MLDATA_MAX_THREADS` overrides the detected parallelism; an unparsable or
/// zero value falls back to the detected parallelism.
pub fn max_threads() -> usize {
    std::env::var(MAX_THREADS)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
}

pub fn thread_name() -> String {
    std::env::var(THREAD_NAME).unwrap_or_else(|_| "mldata".to_string())
}
