use chrono::{DateTime, Utc};
use crate::index::persistent_map::{KeyPath, PersistentMap};

/// Multipliers applied to the freshest / largest documents of an object type.
/// A multiplier of 1.0 disables that boost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBoostOptions {
    pub freshness_multiplier: f64,
    pub magnitude_multiplier: f64,
}

impl Default for ScoreBoostOptions {
    fn default() -> Self {
        ScoreBoostOptions {
            freshness_multiplier: 1.0,
            magnitude_multiplier: 1.0,
        }
    }
}

/// f64 compared by its bits, for use as a map key
#[derive(Debug, Clone, Copy)]
struct OrderedValue(f64);

impl PartialEq for OrderedValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedValue {}

/// Orders values the way `f64::total_cmp` does.
struct ValuePath;

impl KeyPath<OrderedValue> for ValuePath {
    const BITS: u32 = 64;

    fn path(key: &OrderedValue) -> u64 {
        let bits = key.0.to_bits();
        if bits >> 63 == 1 { !bits } else { bits | 1 << 63 }
    }
}

/// Multiset of observed values that can report its current min and max.
#[derive(Debug, Clone, Default)]
struct ValueRange {
    counts: PersistentMap<OrderedValue, u32, ValuePath>,
}

impl ValueRange {
    fn add(&mut self, value: f64) {
        let key = OrderedValue(value);
        match self.counts.get_mut(&key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key, 1);
            }
        }
    }

    fn remove(&mut self, value: f64) {
        let key = OrderedValue(value);
        if let Some(count) = self.counts.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&key);
            }
        }
    }

    /// Linear position of `value` between the observed min and max, in [0, 1].
    fn normalize(&self, value: f64) -> Option<f64> {
        let min = self.counts.first()?.0.0;
        let max = self.counts.last()?.0.0;
        if max <= min {
            return None;
        }
        Some(((value - min) / (max - min)).clamp(0.0, 1.0))
    }
}

/// Per object type record of freshness and magnitude values across the
/// corpus, used to turn one document's values into a score multiplier.
#[derive(Debug, Clone, Default)]
pub struct ScoreBoostMetadata {
    options: ScoreBoostOptions,
    freshness: ValueRange,   // Milliseconds since the epoch
    magnitude: ValueRange,
}

impl ScoreBoostMetadata {
    pub fn new(options: ScoreBoostOptions) -> Self {
        ScoreBoostMetadata { options, ..Default::default() }
    }

    pub fn options(&self) -> ScoreBoostOptions {
        self.options
    }

    pub fn add(&mut self, freshness: Option<DateTime<Utc>>, magnitude: Option<f64>) {
        if let Some(date) = freshness {
            self.freshness.add(date.timestamp_millis() as f64);
        }
        if let Some(value) = magnitude {
            self.magnitude.add(value);
        }
    }

    pub fn remove(&mut self, freshness: Option<DateTime<Utc>>, magnitude: Option<f64>) {
        if let Some(date) = freshness {
            self.freshness.remove(date.timestamp_millis() as f64);
        }
        if let Some(value) = magnitude {
            self.magnitude.remove(value);
        }
    }

    /// Multiplier in `[1, freshness_multiplier * magnitude_multiplier]`.
    pub fn calculate_boost(&self, freshness: Option<DateTime<Utc>>, magnitude: Option<f64>) -> f64 {
        let freshness_boost = freshness
            .and_then(|date| self.freshness.normalize(date.timestamp_millis() as f64))
            .map_or(1.0, |n| scale(n, self.options.freshness_multiplier));
        let magnitude_boost = magnitude
            .and_then(|value| self.magnitude.normalize(value))
            .map_or(1.0, |n| scale(n, self.options.magnitude_multiplier));

        freshness_boost * magnitude_boost
    }
}

fn scale(normalized: f64, multiplier: f64) -> f64 {
    1.0 + normalized * (multiplier - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_magnitude_boost_is_linear_between_min_and_max() {
        let mut metadata = ScoreBoostMetadata::new(ScoreBoostOptions {
            freshness_multiplier: 1.0,
            magnitude_multiplier: 3.0,
        });
        metadata.add(None, Some(10.0));
        metadata.add(None, Some(20.0));
        metadata.add(None, Some(30.0));

        assert_eq!(metadata.calculate_boost(None, Some(10.0)), 1.0);
        assert_eq!(metadata.calculate_boost(None, Some(20.0)), 2.0);
        assert_eq!(metadata.calculate_boost(None, Some(30.0)), 3.0);
        assert_eq!(metadata.calculate_boost(None, None), 1.0);
    }

    #[test]
    fn test_removing_the_extreme_value_narrows_the_range() {
        let mut metadata = ScoreBoostMetadata::new(ScoreBoostOptions {
            freshness_multiplier: 2.0,
            magnitude_multiplier: 1.0,
        });
        let old = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mid = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        metadata.add(Some(old), None);
        metadata.add(Some(mid), None);
        metadata.add(Some(new), None);

        assert!(metadata.calculate_boost(Some(mid), None) < 2.0);

        metadata.remove(Some(new), None);
        assert_eq!(metadata.calculate_boost(Some(mid), None), 2.0);
    }

    #[test]
    fn test_range_orders_negative_values_first() {
        let mut range = ValueRange::default();
        for value in [3.5, -2.0, 0.0, -0.5, 10.0] {
            range.add(value);
        }
        range.add(10.0);

        assert_eq!(range.normalize(-2.0), Some(0.0));
        assert_eq!(range.normalize(4.0), Some(0.5));

        range.remove(10.0);
        assert_eq!(range.normalize(10.0), Some(1.0));
        range.remove(10.0);
        assert_eq!(range.normalize(3.5), Some(1.0));
    }

    #[test]
    fn test_single_value_gives_no_boost() {
        let mut metadata = ScoreBoostMetadata::new(ScoreBoostOptions {
            freshness_multiplier: 1.0,
            magnitude_multiplier: 5.0,
        });
        metadata.add(None, Some(42.0));
        assert_eq!(metadata.calculate_boost(None, Some(42.0)), 1.0);
    }
}
