use std::sync::Mutex;

use crate::types::TagKey;

// ---------------------------------------------------------------------------
// SpanSink — the span/tag collaborator interface
//
// Span creation, closing, and off-process export are owned by the tracer
// runtime. This trait is the only surface the toolkit touches: an error
// flag and string tags on the currently active span.
// ---------------------------------------------------------------------------

pub trait SpanSink: Send + Sync {
    /// Set or clear the error flag on the span.
    fn set_error_status(&self, is_error: bool);

    /// Attach a string tag to the span. Re-tagging a key overwrites.
    fn tag(&self, key: &TagKey, value: &str);
}

/// In-memory span sink for testing.
#[derive(Default)]
pub struct RecordingSpan {
    error_status: Mutex<Option<bool>>,
    tags: Mutex<Vec<(TagKey, String)>>,
}

impl RecordingSpan {
    pub fn new() -> Self {
        Self {
            error_status: Mutex::new(None),
            tags: Mutex::new(Vec::new()),
        }
    }

    /// The last error status written, if any.
    pub fn error_status(&self) -> Option<bool> {
        *self.error_status.lock().expect("span lock poisoned")
    }

    pub fn tags(&self) -> Vec<(TagKey, String)> {
        self.tags.lock().expect("span lock poisoned").clone()
    }

    pub fn tag_value(&self, key: &TagKey) -> Option<String> {
        self.tags
            .lock()
            .expect("span lock poisoned")
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl SpanSink for RecordingSpan {
    fn set_error_status(&self, is_error: bool) {
        *self.error_status.lock().expect("span lock poisoned") = Some(is_error);
    }

    fn tag(&self, key: &TagKey, value: &str) {
        self.tags
            .lock()
            .expect("span lock poisoned")
            .push((key.clone(), value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify the trait object is object-safe
    fn _assert_span_sink_object_safe(_: &dyn SpanSink) {}

    #[test]
    fn test_recording_span_starts_empty() {
        let span = RecordingSpan::new();
        assert_eq!(span.error_status(), None);
        assert!(span.tags().is_empty());
    }

    #[test]
    fn test_recording_span_error_status() {
        let span = RecordingSpan::new();
        span.set_error_status(true);
        assert_eq!(span.error_status(), Some(true));
        span.set_error_status(false);
        assert_eq!(span.error_status(), Some(false));
    }

    #[test]
    fn test_recording_span_tags() {
        let span = RecordingSpan::new();
        span.tag(&TagKey::new("tenant"), "acme");
        span.tag(&TagKey::new("region"), "eu-west");
        assert_eq!(span.tags().len(), 2);
        assert_eq!(span.tag_value(&TagKey::new("tenant")), Some("acme".into()));
        assert_eq!(span.tag_value(&TagKey::new("missing")), None);
    }

    #[test]
    fn test_recording_span_last_tag_wins() {
        let span = RecordingSpan::new();
        span.tag(&TagKey::new("tenant"), "acme");
        span.tag(&TagKey::new("tenant"), "globex");
        assert_eq!(span.tag_value(&TagKey::new("tenant")), Some("globex".into()));
    }
}
