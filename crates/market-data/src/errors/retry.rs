/// Classification for retry policy.
///
/// Used by the client's acquisition loop to decide whether another attempt
/// (or the fallback strategy) is worth making after an upstream failure.
///
/// # Behavior Summary
///
/// | Class | Retry same strategy? | Move to fallback? |
/// |-------|----------------------|-------------------|
/// | `Never` | No | No |
/// | `Transient` | Yes, after the fixed backoff | Yes, once retries run out |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - bad input, unknown symbol, or a payload we cannot read.
    /// The request is fundamentally invalid and retrying won't help.
    Never,

    /// Network blip, throttling, timeout or a 5xx answer.
    ///
    /// The loop resets the strategy's shared session, waits the fixed
    /// backoff and tries again until the attempt budget is spent.
    Transient,
}
