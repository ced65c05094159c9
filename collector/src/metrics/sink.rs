use super::MetricSample;
use tokio::sync::mpsc;
use tracing::trace;

/// Append-only destination for metric samples.
///
/// Cheap to clone; every clone appends to the same underlying channel, so any
/// number of collectors may write concurrently. Samples sent through one
/// clone arrive in the order they were sent.
#[derive(Debug, Clone)]
pub struct MetricSink {
    tx: mpsc::UnboundedSender<MetricSample>,
}

/// Receiving end of a [`MetricSink`].
#[derive(Debug)]
pub struct SinkReceiver {
    rx: mpsc::UnboundedReceiver<MetricSample>,
}

impl MetricSink {
    /// Create a connected sink/receiver pair.
    pub fn channel() -> (MetricSink, SinkReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MetricSink { tx }, SinkReceiver { rx })
    }

    pub fn emit(&self, sample: MetricSample) {
        if let Err(e) = self.tx.send(sample) {
            trace!(metric = e.0.name(), "sink receiver dropped, discarding sample");
        }
    }

    pub fn emit_all(&self, samples: impl IntoIterator<Item = MetricSample>) {
        for sample in samples {
            self.emit(sample);
        }
    }
}

impl SinkReceiver {
    /// Take every sample currently buffered.
    ///
    /// Call this once all [`MetricSink`] clones that can still write have
    /// been dropped, otherwise later appends are not part of the result.
    pub fn drain(mut self) -> Vec<MetricSample> {
        let mut samples = Vec::new();
        while let Ok(sample) = self.rx.try_recv() {
            samples.push(sample);
        }
        samples
    }
}
