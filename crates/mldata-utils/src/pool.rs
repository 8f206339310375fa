use std::sync::LazyLock;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config;

pub static THREAD_POOL: LazyLock<ThreadPool> = LazyLock::new(|| {
    let thread_name = config::thread_name();
    ThreadPoolBuilder::new()
        .num_threads(config::max_threads())
        .thread_name(move |i| format!("{thread_name}-{i}"))
        .build()
        .expect("could not spawn threads")
});

/// Handle to the global worker pool used for sharded row compilation.
pub struct POOL;

impl POOL {
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        THREAD_POOL.install(op)
    }

    pub fn current_num_threads(&self) -> usize {
        THREAD_POOL.current_num_threads()
    }
}
