//! Utility functions shared by the codecs and the issue reporter
use std::cmp::Ordering;

/// Returns the values similar to `v`, best match last
pub fn did_you_mean<T, I>(v: &str, possible_values: I) -> Vec<String>
where
    T: AsRef<str>,
    I: IntoIterator<Item = T>,
{
    let mut candidates: Vec<(f64, String)> = possible_values
        .into_iter()
        .map(|pv| (strsim::jaro_winkler(v, pv.as_ref()), pv.as_ref().to_owned()))
        .filter(|(confidence, _)| *confidence > 0.8)
        .collect();
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    candidates.into_iter().map(|(_, pv)| pv).collect()
}

/// Rounds to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions() {
        let names = vec!["Start", "Stairs", "Ending"];
        assert_eq!(did_you_mean("Strat", &names).pop(), Some("Start".to_string()));
        assert!(did_you_mean("Zebra", &names).is_empty());
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(0.666), 0.67);
        assert_eq!(round2(1.0), 1.0);
    }
}
