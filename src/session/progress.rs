use std::time::Instant;

/// Progress notification emitted after every frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
    /// `total` is the smaller of the frame cap and the source length, when
    /// either is known.
    Batch { processed: u64, total: Option<u64> },
    Live { processed: u64, last_update: Instant },
}

impl Progress {
    pub fn processed(&self) -> u64 {
        match self {
            Progress::Batch { processed, .. } | Progress::Live { processed, .. } => *processed,
        }
    }

    /// Completed fraction in `0.0..=1.0`. Only known for bounded batches.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Progress::Batch {
                processed,
                total: Some(total),
            } if *total > 0 => Some((*processed as f64 / *total as f64).min(1.0)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_fraction() {
        let p = Progress::Batch {
            processed: 75,
            total: Some(300),
        };
        assert_eq!(p.processed(), 75);
        assert_eq!(p.fraction(), Some(0.25));
        let unknown = Progress::Batch {
            processed: 75,
            total: None,
        };
        assert_eq!(unknown.fraction(), None);
    }

    #[test]
    fn live_has_no_fraction() {
        let p = Progress::Live {
            processed: 3,
            last_update: Instant::now(),
        };
        assert_eq!(p.processed(), 3);
        assert!(p.fraction().is_none());
    }
}
