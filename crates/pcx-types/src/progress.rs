use std::sync::Arc;

/// Progress sink, called with a fraction in `[0, 1]`.
///
/// The pipelines call `report` at most once per block, with
/// non-decreasing values. The copy adapters finish with a `report(1.0)`
/// so sources of unknown length still complete.
///
/// Any `Fn(f64) + Send + Sync` closure is a `Progress`.
pub trait Progress: Send + Sync {
    fn report(&self, fraction: f64);
}

impl<F> Progress for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, fraction: f64) {
        self(fraction);
    }
}

/// A progress sink that drops every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _fraction: f64) {}
}

/// Progress sink shared between the caller and a pipeline task.
pub type SharedProgress = Arc<dyn Progress>;

/// Fraction of `total` covered by `consumed`, or `None` when the total is
/// unknown. An empty source counts as complete.
#[allow(clippy::cast_precision_loss)]
pub fn fraction(consumed: u64, total: Option<u64>) -> Option<f64> {
    match total? {
        0 => Some(1.0),
        total => Some((consumed as f64 / total as f64).min(1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_are_progress_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |p: f64| seen.lock().unwrap().push(p)
        };
        let shared: SharedProgress = Arc::new(sink);
        shared.report(0.5);
        shared.report(1.0);
        assert_eq!(*seen.lock().unwrap(), vec![0.5, 1.0]);
    }

    #[test]
    fn fraction_handles_unknown_and_empty_totals() {
        assert_eq!(fraction(10, None), None);
        assert_eq!(fraction(0, Some(0)), Some(1.0));
        assert_eq!(fraction(25, Some(100)), Some(0.25));
        assert_eq!(fraction(120, Some(100)), Some(1.0));
    }
}
