//! Readiness probe (spec.md §6, A4): a trivial, solve-independent liveness
//! check for an external health-check layer to call.

/// Always `true` — this crate has no background state that could make it
/// unready once loaded.
pub const fn is_ready() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_ready() {
        assert!(is_ready());
    }
}
