use std::sync::Mutex;

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

use crate::classify::backend::{Classification, ClassifierBackend, Label};

/// Fraction of full luminance above which a frame counts as an incident.
const INCIDENT_LUMA: f32 = 0.8;

/// Stub classifier for development and tests.
///
/// Flags a frame as an incident when it is markedly brighter than normal AND
/// differs from the previous frame (a static scene is never a new incident,
/// however bright). Pixel hashing follows the change-detection scheme the
/// motion stubs use; the last-frame hash is the only internal state.
pub struct StubClassifier {
    last_hash: Mutex<Option<[u8; 32]>>,
}

impl StubClassifier {
    pub fn new() -> Self {
        Self {
            last_hash: Mutex::new(None),
        }
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBackend for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&self, pixels: &[u8], width: u32, height: u32) -> Result<Classification> {
        if width == 0 || height == 0 || pixels.is_empty() {
            return Ok(Classification {
                label: Label::Unknown,
                confidence: 0.0,
            });
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let current_hash: [u8; 32] = Sha256::digest(pixels).into();
        let changed = {
            let mut last = self
                .last_hash
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let changed = last.map_or(true, |prev| prev != current_hash);
            *last = Some(current_hash);
            changed
        };

        // Coarse mean luminance over a sparse pixel sample.
        let mut sum = 0u64;
        let mut count = 0u64;
        for &p in pixels.iter().step_by(97) {
            sum += p as u64;
            count += 1;
        }
        let mean = sum as f32 / (count.max(1) as f32 * 255.0);

        if changed && mean >= INCIDENT_LUMA {
            Ok(Classification {
                label: Label::Incident,
                confidence: mean.min(1.0),
            })
        } else {
            Ok(Classification {
                label: Label::NoIncident,
                confidence: (1.0 - mean).clamp(0.0, 1.0),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: u8, width: u32, height: u32) -> Vec<u8> {
        vec![value; (width * height * 3) as usize]
    }

    #[test]
    fn bright_frame_is_an_incident() {
        let classifier = StubClassifier::new();
        let result = classifier.classify(&frame(230, 16, 16), 16, 16).unwrap();
        assert_eq!(result.label, Label::Incident);
        assert!(result.confidence >= INCIDENT_LUMA);
    }

    #[test]
    fn dim_frame_is_not_an_incident() {
        let classifier = StubClassifier::new();
        let result = classifier.classify(&frame(40, 16, 16), 16, 16).unwrap();
        assert_eq!(result.label, Label::NoIncident);
    }

    #[test]
    fn static_bright_scene_only_fires_once() {
        let classifier = StubClassifier::new();
        let pixels = frame(230, 16, 16);

        let first = classifier.classify(&pixels, 16, 16).unwrap();
        assert_eq!(first.label, Label::Incident);

        // Identical frame again: no change, no new incident.
        let second = classifier.classify(&pixels, 16, 16).unwrap();
        assert_eq!(second.label, Label::NoIncident);
    }

    #[test]
    fn empty_frame_is_unknown() {
        let classifier = StubClassifier::new();
        let result = classifier.classify(&[], 0, 0).unwrap();
        assert_eq!(result.label, Label::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn wrong_buffer_length_is_an_error() {
        let classifier = StubClassifier::new();
        assert!(classifier.classify(&[1, 2, 3], 16, 16).is_err());
    }
}
