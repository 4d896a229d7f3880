use crate::error::ScanError;
use crate::models::{BestCandidate, DetectionSample};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Result of reducing one frame: the winner plus the samples that were thrown
/// out as malformed.
#[derive(Debug, Default)]
pub struct FrameSelection {
    pub best: Option<BestCandidate>,
    pub rejected: Vec<ScanError>,
}

/// Highest-confidence sample strictly above `threshold`, first one wins ties.
pub fn select_best_candidate(samples: &[DetectionSample], threshold: f32) -> Option<BestCandidate> {
    let mut best: Option<&DetectionSample> = None;
    for sample in samples.iter().filter(|s| s.confidence > threshold) {
        match best {
            Some(current) if sample.confidence <= current.confidence => {}
            _ => best = Some(sample),
        }
    }
    best.map(BestCandidate::from)
}

/// Validates, applies the label allow-list and selects the frame's candidate.
///
/// An empty `allowed_labels` accepts every label.
pub fn filter_frame(
    samples: &[DetectionSample],
    threshold: f32,
    allowed_labels: &[String],
) -> FrameSelection {
    let mut rejected = Vec::new();
    let usable: Vec<DetectionSample> = samples
        .iter()
        .filter(|sample| match sample.validate() {
            Ok(()) => true,
            Err(err) => {
                rejected.push(err);
                false
            }
        })
        .filter(|sample| allowed_labels.is_empty() || allowed_labels.contains(&sample.label))
        .cloned()
        .collect();

    FrameSelection {
        best: select_best_candidate(&usable, threshold),
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rect;

    fn sample(label: &str, confidence: f32) -> DetectionSample {
        DetectionSample::new(label, confidence, Rect::new(0.1, 0.1, 0.2, 0.2))
    }

    #[test]
    fn none_when_nothing_clears_threshold() {
        let samples = vec![sample("a", 0.5), sample("b", 0.2)];
        assert!(select_best_candidate(&samples, DEFAULT_CONFIDENCE_THRESHOLD).is_none());
        assert!(select_best_candidate(&[], DEFAULT_CONFIDENCE_THRESHOLD).is_none());
    }

    #[test]
    fn picks_highest_confidence() {
        let samples = vec![sample("a", 0.6), sample("b", 0.95), sample("c", 0.7)];
        let best = select_best_candidate(&samples, DEFAULT_CONFIDENCE_THRESHOLD).unwrap();
        assert_eq!(best.label, "b");
    }

    #[test]
    fn first_maximum_wins_ties() {
        let samples = vec![sample("first", 0.8), sample("second", 0.8)];
        let best = select_best_candidate(&samples, DEFAULT_CONFIDENCE_THRESHOLD).unwrap();
        assert_eq!(best.label, "first");
    }

    #[test]
    fn malformed_samples_do_not_poison_the_frame() {
        let samples = vec![sample("broken", 3.0), sample("", 0.9), sample("ok", 0.7)];
        let selection = filter_frame(&samples, DEFAULT_CONFIDENCE_THRESHOLD, &[]);
        assert_eq!(selection.best.unwrap().label, "ok");
        assert_eq!(selection.rejected.len(), 2);
    }

    #[test]
    fn allow_list_drops_unlisted_labels() {
        let samples = vec![sample("cat", 0.99), sample("mug", 0.6)];
        let allowed = vec!["mug".to_string()];
        let selection = filter_frame(&samples, DEFAULT_CONFIDENCE_THRESHOLD, &allowed);
        assert_eq!(selection.best.unwrap().label, "mug");
        assert!(selection.rejected.is_empty());
    }
}
