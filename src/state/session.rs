/// Transform session
///
/// Owns the image currently being edited: the original file, its
/// preview reference, the latest processed result, and a status flag.
/// Every file selection or parameter change re-runs the codec against
/// the original bytes, never against a previous (lossy) output.
///
/// Invocations may overlap. Each one is tagged with a generation number
/// taken when it starts; on completion it only commits if no newer
/// selection, parameter change or reset has happened since. Results that
/// lose that race are discarded and their preview released.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::codec::preview::PreviewAllocator;
use crate::codec::Codec;
use crate::error::Result;
use crate::state::data::{ProcessedImage, SourceFile, SourceImage};
use crate::state::edit::TransformParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No source selected
    Idle,
    /// Source present, no current output
    Loaded,
    /// A codec invocation is in flight
    Processing,
    /// Processed output matches the current parameters
    Ready,
}

/// What happened to a requested invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The result is now the session's processed image
    Applied(ProcessedImage),
    /// A newer request started first; the result was thrown away
    Superseded,
    /// Parameters were stored but there is no source to process
    NoSource,
}

/// Point-in-time copy of the session for the presentation layer
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub source: Option<SourceImage>,
    pub processed: Option<ProcessedImage>,
    pub parameters: TransformParameters,
    pub error: Option<String>,
}

struct SessionState {
    status: SessionStatus,
    source: Option<SourceImage>,
    processed: Option<ProcessedImage>,
    parameters: TransformParameters,
    error: Option<String>,
    generation: u64,
}

pub struct TransformSession {
    codec: Arc<dyn Codec>,
    previews: Arc<dyn PreviewAllocator>,
    state: Mutex<SessionState>,
}

impl TransformSession {
    pub fn new(
        codec: Arc<dyn Codec>,
        previews: Arc<dyn PreviewAllocator>,
        parameters: TransformParameters,
    ) -> Self {
        Self {
            codec,
            previews,
            state: Mutex::new(SessionState {
                status: SessionStatus::Idle,
                source: None,
                processed: None,
                parameters,
                error: None,
                generation: 0,
            }),
        }
    }

    /// Replace the current source and process it with the current parameters
    pub async fn select_file(&self, file: SourceFile) -> Result<Outcome> {
        let (generation, bytes, parameters) = {
            let mut state = self.state.lock();
            self.release_all(&mut state);

            let preview = self.previews.allocate(file.bytes.clone(), &file.mime_type());
            tracing::info!("📷 Selected {} ({} bytes)", file.name, file.bytes.len());

            let bytes = file.bytes.clone();
            state.source = Some(SourceImage {
                file,
                preview,
                width: None,
                height: None,
            });
            state.error = None;
            state.status = SessionStatus::Processing;
            state.generation += 1;
            (state.generation, bytes, state.parameters)
        };

        self.run(generation, bytes, parameters).await
    }

    /// Store new parameters and re-process the original source, if any
    pub async fn set_parameters(&self, parameters: TransformParameters) -> Result<Outcome> {
        let (generation, bytes) = {
            let mut state = self.state.lock();
            state.parameters = parameters;

            let Some(source) = &state.source else {
                return Ok(Outcome::NoSource);
            };
            let bytes = source.file.bytes.clone();

            state.error = None;
            state.status = SessionStatus::Processing;
            state.generation += 1;
            (state.generation, bytes)
        };

        self.run(generation, bytes, parameters).await
    }

    /// Drop the source and output and release their preview references
    pub fn reset(&self) {
        let mut state = self.state.lock();
        self.release_all(&mut state);
        state.error = None;
        state.status = SessionStatus::Idle;
        state.generation += 1;
        tracing::debug!("Session reset");
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    pub fn parameters(&self) -> TransformParameters {
        self.state.lock().parameters
    }

    pub fn processed(&self) -> Option<ProcessedImage> {
        self.state.lock().processed.clone()
    }

    pub fn source(&self) -> Option<SourceImage> {
        self.state.lock().source.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            status: state.status,
            source: state.source.clone(),
            processed: state.processed.clone(),
            parameters: state.parameters,
            error: state.error.clone(),
        }
    }

    async fn run(
        &self,
        generation: u64,
        bytes: bytes::Bytes,
        parameters: TransformParameters,
    ) -> Result<Outcome> {
        let result = self.codec.transform(bytes, parameters).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            if let Ok(stale) = &result {
                self.previews.release(&stale.preview);
            }
            tracing::debug!(
                "Discarding superseded result for width {} (generation {} < {})",
                parameters.target_width,
                generation,
                state.generation
            );
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(processed) => {
                if let Some(previous) = state.processed.replace(processed.clone()) {
                    self.previews.release(&previous.preview);
                }
                if let Some(source) = state.source.as_mut() {
                    source.width = Some(processed.source_width);
                    source.height = Some(processed.source_height);
                }
                state.error = None;
                state.status = SessionStatus::Ready;
                tracing::debug!(
                    "✅ Processed {}x{} {} ({} bytes)",
                    processed.width,
                    processed.height,
                    processed.format,
                    processed.size()
                );
                Ok(Outcome::Applied(processed))
            }
            Err(err) => {
                // Keep the source, drop the stale output
                if let Some(previous) = state.processed.take() {
                    self.previews.release(&previous.preview);
                }
                state.error = Some(err.to_string());
                state.status = SessionStatus::Loaded;
                tracing::warn!("⚠️  Processing failed: {}", err);
                Err(err)
            }
        }
    }

    fn release_all(&self, state: &mut SessionState) {
        if let Some(processed) = state.processed.take() {
            self.previews.release(&processed.preview);
        }
        if let Some(source) = state.source.take() {
            self.previews.release(&source.preview);
        }
    }
}

impl Drop for TransformSession {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(processed) = state.processed.take() {
            self.previews.release(&processed.preview);
        }
        if let Some(source) = state.source.take() {
            self.previews.release(&source.preview);
        }
    }
}

impl std::fmt::Debug for TransformSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransformSession")
            .field("status", &state.status)
            .field("parameters", &state.parameters)
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::format::OutputFormat;
    use crate::codec::preview::{PreviewRegistry, PreviewUrl};
    use crate::codec::processor::target_height;
    use crate::error::Error;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    /// Preview allocator that remembers every release
    #[derive(Default)]
    struct RecordingPreviews {
        registry: PreviewRegistry,
        released: Mutex<Vec<PreviewUrl>>,
    }

    impl PreviewAllocator for RecordingPreviews {
        fn allocate(&self, bytes: Bytes, mime_type: &str) -> PreviewUrl {
            self.registry.allocate(bytes, mime_type)
        }

        fn release(&self, url: &PreviewUrl) {
            self.released.lock().push(url.clone());
            self.registry.release(url);
        }
    }

    impl RecordingPreviews {
        fn was_released(&self, url: &PreviewUrl) -> bool {
            self.released.lock().contains(url)
        }
    }

    /// Codec that pretends every source is 1000x500 and can be held back per width
    struct ScriptedCodec {
        previews: Arc<RecordingPreviews>,
        gates: Mutex<HashMap<u32, oneshot::Receiver<()>>>,
        failing_width: Option<u32>,
        calls: Mutex<Vec<TransformParameters>>,
    }

    impl ScriptedCodec {
        fn new(previews: Arc<RecordingPreviews>) -> Self {
            Self {
                previews,
                gates: Mutex::new(HashMap::new()),
                failing_width: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn hold(&self, width: u32) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().insert(width, rx);
            tx
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        async fn wait_for_calls(&self, n: usize) {
            while self.call_count() < n {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl Codec for ScriptedCodec {
        async fn transform(&self, source: Bytes, params: TransformParameters) -> Result<ProcessedImage> {
            self.calls.lock().push(params);

            let gate = self.gates.lock().remove(&params.target_width);
            if let Some(gate) = gate {
                let _ = gate.await;
            }

            if self.failing_width == Some(params.target_width) {
                return Err(Error::encode("scripted failure"));
            }

            let bytes = Bytes::from(format!("{}:{}", source.len(), params.target_width));
            let preview = self.previews.allocate(bytes.clone(), params.format.mime_type());
            Ok(ProcessedImage {
                bytes,
                preview,
                width: params.target_width,
                height: target_height(params.target_width, 1000, 500),
                format: params.format,
                source_width: 1000,
                source_height: 500,
            })
        }
    }

    fn params(width: u32) -> TransformParameters {
        TransformParameters::new(width, 0.6, OutputFormat::Jpeg)
    }

    fn file(name: &str) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            bytes: Bytes::from_static(b"source-bytes"),
            mime_type: Some("image/png".to_string()),
        }
    }

    fn setup() -> (Arc<RecordingPreviews>, Arc<ScriptedCodec>) {
        let previews = Arc::new(RecordingPreviews::default());
        let codec = Arc::new(ScriptedCodec::new(previews.clone()));
        (previews, codec)
    }

    #[tokio::test]
    async fn test_select_file_processes_with_current_parameters() {
        let (previews, codec) = setup();
        let session = TransformSession::new(codec.clone(), previews.clone(), params(400));
        assert_eq!(session.status(), SessionStatus::Idle);

        let outcome = session.select_file(file("a.png")).await.unwrap();
        let Outcome::Applied(processed) = outcome else {
            panic!("expected an applied result");
        };

        assert_eq!((processed.width, processed.height), (400, 200));
        assert_eq!(session.status(), SessionStatus::Ready);

        let source = session.source().unwrap();
        assert_eq!((source.width, source.height), (Some(1000), Some(500)));
        // Source preview + processed preview
        assert_eq!(previews.registry.live_count(), 2);
    }

    #[tokio::test]
    async fn test_parameter_change_reprocesses_original_source() {
        let (previews, codec) = setup();
        let session = TransformSession::new(codec.clone(), previews.clone(), params(400));
        session.select_file(file("a.png")).await.unwrap();
        let first = session.processed().unwrap();

        session.set_parameters(params(800)).await.unwrap();

        let second = session.processed().unwrap();
        assert_eq!((second.width, second.height), (800, 400));
        assert!(previews.was_released(&first.preview));
        assert_eq!(previews.registry.live_count(), 2);

        // Both invocations were fed the original bytes
        let widths: Vec<u32> = codec.calls.lock().iter().map(|p| p.target_width).collect();
        assert_eq!(widths, vec![400, 800]);
        assert_eq!(&second.bytes[..], b"12:800");
    }

    #[tokio::test]
    async fn test_parameters_without_source() {
        let (previews, codec) = setup();
        let session = TransformSession::new(codec.clone(), previews, params(400));

        let outcome = session.set_parameters(params(600)).await.unwrap();

        assert_eq!(outcome, Outcome::NoSource);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.parameters().target_width, 600);
        assert_eq!(codec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_releases_every_reference() {
        let (previews, codec) = setup();
        let session = TransformSession::new(codec, previews.clone(), params(400));
        session.select_file(file("a.png")).await.unwrap();

        let source_preview = session.source().unwrap().preview;
        let processed_preview = session.processed().unwrap().preview;

        session.reset();

        assert!(previews.was_released(&source_preview));
        assert!(previews.was_released(&processed_preview));
        assert_eq!(previews.registry.live_count(), 0);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.source().is_none());
        assert!(session.processed().is_none());
    }

    #[tokio::test]
    async fn test_reselect_releases_previous_file() {
        let (previews, codec) = setup();
        let session = TransformSession::new(codec, previews.clone(), params(400));
        session.select_file(file("a.png")).await.unwrap();
        let old_source = session.source().unwrap().preview;
        let old_processed = session.processed().unwrap().preview;

        session.select_file(file("b.png")).await.unwrap();

        assert!(previews.was_released(&old_source));
        assert!(previews.was_released(&old_processed));
        assert_eq!(session.source().unwrap().file.name, "b.png");
        assert_eq!(previews.registry.live_count(), 2);
    }

    #[tokio::test]
    async fn test_superseded_result_is_discarded() {
        let (previews, codec) = setup();
        let session = Arc::new(TransformSession::new(
            codec.clone(),
            previews.clone(),
            params(400),
        ));
        session.select_file(file("a.png")).await.unwrap();

        let release_a = codec.hold(100);
        let release_b = codec.hold(200);

        let a = tokio::spawn({
            let session = session.clone();
            async move { session.set_parameters(params(100)).await }
        });
        codec.wait_for_calls(2).await;

        let b = tokio::spawn({
            let session = session.clone();
            async move { session.set_parameters(params(200)).await }
        });
        codec.wait_for_calls(3).await;
        assert_eq!(session.status(), SessionStatus::Processing);

        // B finishes first, then A
        release_b.send(()).unwrap();
        let b_outcome = b.await.unwrap().unwrap();
        assert!(matches!(b_outcome, Outcome::Applied(ref p) if p.width == 200));

        release_a.send(()).unwrap();
        let a_outcome = a.await.unwrap().unwrap();
        assert_eq!(a_outcome, Outcome::Superseded);

        let visible = session.processed().unwrap();
        assert_eq!((visible.width, visible.height), (200, 100));
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.parameters().target_width, 200);
        // Stale preview from A was released, leaving source + B
        assert_eq!(previews.registry.live_count(), 2);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_result() {
        let (previews, codec) = setup();
        let session = Arc::new(TransformSession::new(
            codec.clone(),
            previews.clone(),
            params(400),
        ));
        let release = codec.hold(400);

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.select_file(file("a.png")).await }
        });
        codec.wait_for_calls(1).await;

        session.reset();
        release.send(()).unwrap();

        assert_eq!(pending.await.unwrap().unwrap(), Outcome::Superseded);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(previews.registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_to_loaded() {
        let previews = Arc::new(RecordingPreviews::default());
        let mut codec = ScriptedCodec::new(previews.clone());
        codec.failing_width = Some(13);
        let codec = Arc::new(codec);

        let session = TransformSession::new(codec, previews.clone(), params(400));
        session.select_file(file("a.png")).await.unwrap();
        let stale = session.processed().unwrap().preview;

        let result = session.set_parameters(params(13)).await;
        assert!(matches!(result, Err(Error::EncodeFailure(_))));

        assert_eq!(session.status(), SessionStatus::Loaded);
        assert!(session.processed().is_none());
        assert!(session.source().is_some());
        assert!(session.error().is_some());
        assert!(previews.was_released(&stale));

        // Still usable: nudge the parameter and retry
        session.set_parameters(params(500)).await.unwrap();
        assert_eq!(session.status(), SessionStatus::Ready);
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_references() {
        let (previews, codec) = setup();
        let session = TransformSession::new(codec, previews.clone(), params(400));
        session.select_file(file("a.png")).await.unwrap();
        assert_eq!(previews.registry.live_count(), 2);

        drop(session);

        assert_eq!(previews.registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_tracks_ready_and_failed_states() {
        let previews = Arc::new(RecordingPreviews::default());
        let mut codec = ScriptedCodec::new(previews.clone());
        codec.failing_width = Some(13);
        let session = TransformSession::new(Arc::new(codec), previews, params(400));

        let idle = session.snapshot();
        assert_eq!(idle.status, SessionStatus::Idle);
        assert!(idle.source.is_none() && idle.processed.is_none());

        session.select_file(file("a.png")).await.unwrap();
        let ready = session.snapshot();
        assert_eq!(ready.status, SessionStatus::Ready);
        assert_eq!(ready.source.unwrap().file.name, "a.png");
        assert_eq!(ready.processed.unwrap().width, 400);
        assert_eq!(ready.parameters.target_width, 400);
        assert!(ready.error.is_none());

        let _ = session.set_parameters(params(13)).await;
        let failed = session.snapshot();
        assert_eq!(failed.status, SessionStatus::Loaded);
        assert!(failed.source.is_some());
        assert!(failed.processed.is_none());
        assert_eq!(failed.parameters.target_width, 13);
        assert!(failed.error.unwrap().contains("scripted failure"));
    }
}
