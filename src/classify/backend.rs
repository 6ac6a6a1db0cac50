use anyhow::Result;

/// Class label for one frame.
///
/// `Unknown` is a handled outcome (a model may emit a class the pipeline does
/// not map), never an error.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    Incident,
    NoIncident,
    Unknown,
}

/// Result of classifying one frame.
#[derive(Clone, Copy, Debug)]
pub struct Classification {
    pub label: Label,
    /// Normalized confidence in [0, 1].
    pub confidence: f32,
}

/// Classifier backend trait.
///
/// One backend instance is shared across all dispatch workers, so `classify`
/// takes `&self` and implementations keep any internal state behind their own
/// lock. A slow `classify` call occupies one worker; it must never block
/// anything else.
pub trait ClassifierBackend: Send + Sync {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Classify a single RGB24 frame.
    ///
    /// Implementations must treat the pixel slice as read-only and ephemeral.
    fn classify(&self, pixels: &[u8], width: u32, height: u32) -> Result<Classification>;

    /// Optional warm-up hook, called once before the pipeline starts.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
