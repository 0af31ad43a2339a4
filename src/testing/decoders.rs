//! Instrumented decoders.

use crate::decoder::{ArffDecoder, ParsedData, RawDecoder};
use crate::error::Result;
use crate::schema::StorageFormat;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps a decoder and counts [`RawDecoder::decode`] calls.
pub struct CountingDecoder {
    inner: Arc<dyn RawDecoder>,
    calls: AtomicUsize,
}

impl CountingDecoder {
    #[must_use]
    pub fn new(inner: Arc<dyn RawDecoder>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of parses so far, failed ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for CountingDecoder {
    fn default() -> Self {
        Self::new(Arc::new(ArffDecoder::default()))
    }
}

impl RawDecoder for CountingDecoder {
    fn decode(&self, path: &Path, storage: StorageFormat) -> Result<ParsedData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(path, storage)
    }
}
