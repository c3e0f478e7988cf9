//! Sampling decision for calls and streams.

use rand::Rng;

/// Decide whether a call should be logged at `rate`.
///
/// Draws from the calling thread's generator, so concurrent callers never share a
/// draw. A rate of `0.0` never samples and a rate of `1.0` always does.
#[must_use]
pub fn should_sample(rate: f64) -> bool {
    should_sample_with(&mut rand::rng(), rate)
}

/// Decide whether a call should be logged at `rate` using an explicit generator.
#[must_use]
pub fn should_sample_with<R: Rng>(rng: &mut R, rate: f64) -> bool {
    rng.random::<f64>() < rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_rate_never_samples() {
        assert!((0..10_000).all(|_| !should_sample(0.0)));
    }

    #[test]
    fn full_rate_always_samples() {
        assert!((0..10_000).all(|_| should_sample(1.0)));
    }

    #[test]
    fn partial_rate_tracks_probability() {
        let mut rng = StdRng::seed_from_u64(7);
        let hits = (0..20_000)
            .filter(|_| should_sample_with(&mut rng, 0.25))
            .count();
        assert!((4_000..6_000).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn concurrent_callers_draw_independently() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..2_000).filter(|_| should_sample(0.5)).count()))
            .collect();
        for handle in handles {
            let hits = handle.join().expect("sampling thread panicked");
            assert!((600..1_400).contains(&hits), "hits = {hits}");
        }
    }
}
