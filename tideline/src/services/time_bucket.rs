use crate::config::TimeDecayConfig;

/// Hours covered by the precomputed table; older posts fall back to the
/// direct formula (infrequent path).
const TABLE_HOURS: usize = 168;

/// Posts younger than this get the extra "just posted" bonus.
const JUST_POSTED_HOURS: f64 = 0.1;

/// Floor for the exponential decay; old posts stay reachable.
const DECAY_FLOOR: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct TimeBucket {
    pub bonus: f64,
    pub decay: f64,
    pub combined: f64,
}

/// Precomputed recency/decay lookup, indexed by `floor(hours_old)` and built
/// once at startup. Immutable for the process lifetime; a config change means
/// building a new table.
#[derive(Debug, Clone)]
pub struct TimeBucketTable {
    buckets: Vec<TimeBucket>,
    config: TimeDecayConfig,
}

impl TimeBucketTable {
    pub fn new(config: &TimeDecayConfig) -> Self {
        let buckets = (0..=TABLE_HOURS)
            .map(|hour| {
                let bonus = bonus_for_hour(hour, config);
                let decay = decay_for(hour as f64, config);
                TimeBucket {
                    bonus,
                    decay,
                    combined: (1.0 + bonus) * decay,
                }
            })
            .collect();
        Self {
            buckets,
            config: config.clone(),
        }
    }

    /// Combined recency multiplier `(1 + bonus) * decay` for a post age.
    pub fn multiplier(&self, hours_old: f64) -> f64 {
        let hours_old = hours_old.max(0.0);
        if hours_old < JUST_POSTED_HOURS {
            return 1.0 + self.just_posted_bonus();
        }
        let index = hours_old.floor() as usize;
        if index <= TABLE_HOURS {
            self.buckets[index].combined
        } else {
            // Beyond the table: bonus is zero, decay computed on demand.
            decay_for(hours_old, &self.config)
        }
    }

    pub fn just_posted_bonus(&self) -> f64 {
        self.config.recent_boost_1hr + 2.0
    }

    pub fn bucket(&self, hour: usize) -> Option<&TimeBucket> {
        self.buckets.get(hour)
    }
}

fn bonus_for_hour(hour: usize, config: &TimeDecayConfig) -> f64 {
    match hour {
        0 => config.recent_boost_1hr,
        1..=5 => config.recent_boost_6hr,
        6..=23 => config.recent_boost_24hr,
        _ => 0.0,
    }
}

fn decay_for(hours_old: f64, config: &TimeDecayConfig) -> f64 {
    if hours_old <= 24.0 {
        1.0
    } else if hours_old < config.decay_hours {
        let exponent = (hours_old - 24.0) / (config.decay_hours - 24.0);
        DECAY_FLOOR.powf(exponent).max(DECAY_FLOOR)
    } else {
        DECAY_FLOOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TimeDecayConfig {
        TimeDecayConfig {
            recent_boost_1hr: 3.0,
            recent_boost_6hr: 2.0,
            recent_boost_24hr: 1.0,
            decay_hours: 168.0,
        }
    }

    #[test]
    fn test_just_posted_gets_extra_bonus() {
        let table = TimeBucketTable::new(&test_config());
        // 3 minutes old: base 1hr bonus + 2.0 extra
        assert_eq!(table.multiplier(0.05), 1.0 + 3.0 + 2.0);
    }

    #[test]
    fn test_bonus_tiers() {
        let table = TimeBucketTable::new(&test_config());
        assert_eq!(table.multiplier(0.5), 4.0); // (1 + 3.0) * 1.0
        assert_eq!(table.multiplier(3.0), 3.0); // (1 + 2.0) * 1.0
        assert_eq!(table.multiplier(12.0), 2.0); // (1 + 1.0) * 1.0
    }

    #[test]
    fn test_decay_monotonic_past_24_hours() {
        let table = TimeBucketTable::new(&test_config());
        let mut prev = table.multiplier(25.0);
        for hour in 26..200 {
            let current = table.multiplier(hour as f64);
            assert!(
                current <= prev,
                "decay must be non-increasing: {current} > {prev} at hour {hour}"
            );
            prev = current;
        }
    }

    #[test]
    fn test_decay_never_below_floor() {
        let table = TimeBucketTable::new(&test_config());
        for hour in [168.0, 200.0, 1000.0, 10_000.0] {
            let m = table.multiplier(hour);
            assert!(m >= DECAY_FLOOR - 1e-9, "multiplier {m} below floor at {hour}h");
        }
        assert_eq!(table.multiplier(5000.0), DECAY_FLOOR);
    }

    #[test]
    fn test_beyond_table_matches_formula() {
        let config = TimeDecayConfig {
            decay_hours: 400.0,
            ..test_config()
        };
        let table = TimeBucketTable::new(&config);
        let hours = 300.0;
        let expected = 0.1f64.powf((hours - 24.0) / (400.0 - 24.0));
        assert!((table.multiplier(hours) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_negative_age_clamped_to_just_posted() {
        let table = TimeBucketTable::new(&test_config());
        assert_eq!(table.multiplier(-1.0), table.multiplier(0.0));
    }

    #[test]
    fn test_table_covers_full_week() {
        let table = TimeBucketTable::new(&test_config());
        assert!(table.bucket(168).is_some());
        assert!(table.bucket(169).is_none());
    }
}
