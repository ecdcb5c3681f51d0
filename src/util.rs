use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Seeded generator when a seed is given, otherwise seeded from entropy.
pub fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Random permutation of `0..n`.
pub fn random_permutation(n: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
}

/// `h:mm:ss` above an hour, `m:ss` otherwise.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;

    if total >= 3600 {
        let h = total / 3600;
        let rest = total - h * 3600;
        return format!("{h}:{:02}:{:02}", rest / 60, rest % 60);
    }

    format!("{}:{:02}", total / 60, total % 60)
}
