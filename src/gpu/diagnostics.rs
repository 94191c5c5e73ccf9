//! GPU error collection

use parking_lot::Mutex;
use std::sync::Arc;

/// Collects device errors raised outside any explicit error scope.
///
/// The device callback pushes; the pipeline drains after each stage. Nothing
/// here is fatal.
#[derive(Clone, Default)]
pub struct GpuErrorSink {
    errors: Arc<Mutex<Vec<String>>>,
}

impl GpuErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route the device's uncaptured errors into this sink
    pub fn install(&self, device: &wgpu::Device) {
        let errors = Arc::clone(&self.errors);
        device.on_uncaptured_error(Box::new(move |error| {
            let message = match &error {
                wgpu::Error::Validation { description, .. } => description.clone(),
                other => other.to_string(),
            };
            log::error!("[GPU] Uncaptured device error: {}", message);
            errors.lock().push(message);
        }));
    }

    pub fn push(&self, message: impl Into<String>) {
        self.errors.lock().push(message.into());
    }

    /// Take every error recorded since the last drain
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.errors.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_the_queue() {
        let sink = GpuErrorSink::new();
        let clone = sink.clone();
        clone.push("bad bind group");
        sink.push("bad pipeline");

        assert_eq!(sink.drain(), vec!["bad bind group", "bad pipeline"]);
        assert!(sink.is_empty());
        assert!(clone.drain().is_empty());
    }
}
