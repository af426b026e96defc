//! Synthetic CPU load.
//!
//! The Fibonacci implementation is the naive doubly-recursive one on purpose:
//! its exponential running time is what turns a small `n` into measurable CPU
//! pressure for autoscalers and load balancers. Do not memoize it.

/// n-th Fibonacci number by plain recursion.
///
/// `fib(0) = 0`, `fib(1) = 1`. Callers must keep `n <= 93` for the result to
/// fit in a `u64`.
pub fn fibonacci(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    fibonacci(n - 1) + fibonacci(n - 2)
}

/// Run `count` independent Fibonacci computations of index `n`.
///
/// Returns the number of computations performed.
pub fn run_batch(count: u64, n: u64) -> u64 {
    let mut processed = 0;
    for _ in 0..count {
        std::hint::black_box(fibonacci(std::hint::black_box(n)));
        processed += 1;
    }
    processed
}
