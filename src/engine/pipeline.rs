// ABOUTME: Namelist task pipeline: fetch, decode, transform, encode, dispatch
// ABOUTME: Tracks the linear stage sequence and records which stage a failure happened in

use std::fmt;
use tracing::{debug, info};

use super::error::{ExecutionError, Result};
use crate::namelist::{self, Document};
use crate::remote::Remote;

/// Stage a pipeline has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Fetched,
    Decoded,
    Transformed,
    Encoded,
    Dispatched,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Fetched => "fetch",
            PipelineStage::Decoded => "decode",
            PipelineStage::Transformed => "overlay/derive",
            PipelineStage::Encoded => "encode",
            PipelineStage::Dispatched => "dispatch",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    At(PipelineStage),
    /// Terminal; holds the stage that was being entered
    Failed { during: PipelineStage },
}

/// One namelist's trip from a remote source file to a remote target file.
///
/// Stages must run in order. Remote failures in fetch and dispatch are
/// returned as they came from the remote; decode, transform and encode
/// failures are wrapped in [`ExecutionError::PipelineFailed`].
#[derive(Debug)]
pub struct NamelistPipeline {
    source: String,
    target: String,
    state: PipelineState,
    raw: Option<Vec<u8>>,
    text: Option<String>,
    document: Option<Document>,
}

impl NamelistPipeline {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            state: PipelineState::At(PipelineStage::Idle),
            raw: None,
            text: None,
            document: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Encoded text, once the encode stage has run
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub async fn fetch(&mut self, remote: &dyn Remote) -> Result<()> {
        self.enter(PipelineStage::Idle, PipelineStage::Fetched)?;
        match remote.get(&self.source).await {
            Ok(bytes) => {
                debug!("Fetched {} ({} bytes)", self.source, bytes.len());
                self.raw = Some(bytes);
                Ok(())
            }
            Err(e) => {
                self.state = PipelineState::Failed {
                    during: PipelineStage::Fetched,
                };
                Err(e.into())
            }
        }
    }

    pub fn decode(&mut self) -> Result<()> {
        self.enter(PipelineStage::Fetched, PipelineStage::Decoded)?;
        let bytes = self.raw.take().unwrap_or_default();
        let document = namelist::decode_bytes(&bytes).map_err(|e| self.fail(e.into()))?;
        self.document = Some(document);
        Ok(())
    }

    /// Apply overlay and derived parameters to the decoded document
    pub fn transform<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        self.enter(PipelineStage::Decoded, PipelineStage::Transformed)?;
        let mut document = self.document.take().unwrap_or_default();
        let outcome = apply(&mut document);
        self.document = Some(document);
        outcome.map_err(|e| self.fail(e))
    }

    pub fn encode(&mut self) -> Result<&str> {
        self.enter(PipelineStage::Transformed, PipelineStage::Encoded)?;
        let text = self
            .document
            .as_ref()
            .map(namelist::encode)
            .unwrap_or_default();
        Ok(self.text.insert(text).as_str())
    }

    pub async fn dispatch(&mut self, remote: &dyn Remote) -> Result<()> {
        self.enter(PipelineStage::Encoded, PipelineStage::Dispatched)?;
        let text = self.text.as_deref().unwrap_or_default();
        match remote.put_text(text, &self.target).await {
            Ok(()) => {
                info!("Wrote namelist {}", self.target);
                Ok(())
            }
            Err(e) => {
                self.state = PipelineState::Failed {
                    during: PipelineStage::Dispatched,
                };
                Err(e.into())
            }
        }
    }

    /// Run every stage in order, returning the dispatched document
    pub async fn run<F>(mut self, remote: &dyn Remote, apply: F) -> Result<Document>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        self.fetch(remote).await?;
        self.decode()?;
        self.transform(apply)?;
        self.encode()?;
        self.dispatch(remote).await?;
        Ok(self.document.unwrap_or_default())
    }

    fn enter(&mut self, expected: PipelineStage, next: PipelineStage) -> Result<()> {
        match self.state {
            PipelineState::At(found) if found == expected => {
                self.state = PipelineState::At(next);
                Ok(())
            }
            PipelineState::At(found) | PipelineState::Failed { during: found } => {
                Err(ExecutionError::InvalidStage { expected, found })
            }
        }
    }

    fn fail(&mut self, source: ExecutionError) -> ExecutionError {
        let stage = match self.state {
            PipelineState::At(stage) | PipelineState::Failed { during: stage } => stage,
        };
        self.state = PipelineState::Failed { during: stage };
        ExecutionError::PipelineFailed {
            stage,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namelist::{NamelistError, NmlValue};
    use crate::remote::{MockRemote, RemoteError};

    const SOURCE: &str = "/exp/input.nml.src";
    const TARGET: &str = "/exp/work/input.nml";

    #[tokio::test]
    async fn test_full_pipeline() {
        let remote = MockRemote::new();
        remote.add_file(SOURCE, "&a\n x = 1\n/\n").await;

        let mut pipeline = NamelistPipeline::new(SOURCE, TARGET);
        pipeline.fetch(&remote).await.unwrap();
        pipeline.decode().unwrap();
        pipeline
            .transform(|doc| {
                doc.set("a", "x", 2i64)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(pipeline.encode().unwrap(), "&a\n    x = 2\n/\n");
        pipeline.dispatch(&remote).await.unwrap();

        assert_eq!(pipeline.state(), PipelineState::At(PipelineStage::Dispatched));
        assert_eq!(
            remote.file_text(TARGET).await.as_deref(),
            Some("&a\n    x = 2\n/\n")
        );
        assert_eq!(
            pipeline.document().unwrap().get("a", "x"),
            Some(&NmlValue::from(2i64))
        );
    }

    #[tokio::test]
    async fn test_decode_failure_names_stage() {
        let remote = MockRemote::new();
        remote.add_file(SOURCE, "&a\n x = \n/\n").await;

        let err = NamelistPipeline::new(SOURCE, TARGET)
            .run(&remote, |_| Ok(()))
            .await
            .unwrap_err();
        assert_eq!(err.failed_stage(), Some(PipelineStage::Decoded));
        match err {
            ExecutionError::PipelineFailed { source, .. } => assert!(matches!(
                *source,
                ExecutionError::Namelist(NamelistError::DecodeError { line: 2, .. })
            )),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(remote.file(TARGET).await.is_none());
    }

    #[tokio::test]
    async fn test_non_utf8_source_fails_in_decode() {
        let remote = MockRemote::new();
        remote.add_file(SOURCE, b"&a\n x = '\xff\xfe'\n/\n".to_vec()).await;

        let err = NamelistPipeline::new(SOURCE, TARGET)
            .run(&remote, |_| Ok(()))
            .await
            .unwrap_err();
        assert_eq!(err.failed_stage(), Some(PipelineStage::Decoded));
        match err {
            ExecutionError::PipelineFailed { source, .. } => assert!(matches!(
                *source,
                ExecutionError::Namelist(NamelistError::DecodeError { line: 2, .. })
            )),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(remote.file(TARGET).await.is_none());
    }

    #[tokio::test]
    async fn test_transform_failure_keeps_state() {
        let remote = MockRemote::new();
        remote.add_file(SOURCE, "&a\n/\n").await;

        let mut pipeline = NamelistPipeline::new(SOURCE, TARGET);
        pipeline.fetch(&remote).await.unwrap();
        pipeline.decode().unwrap();
        let err = pipeline
            .transform(|doc| {
                doc.set("missing_nml", "x", 1i64)?;
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some(PipelineStage::Transformed));
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed {
                during: PipelineStage::Transformed
            }
        );
        assert!(matches!(
            pipeline.encode(),
            Err(ExecutionError::InvalidStage { .. })
        ));
    }

    #[tokio::test]
    async fn test_remote_errors_pass_through() {
        let remote = MockRemote::new();
        let err = NamelistPipeline::new(SOURCE, TARGET)
            .run(&remote, |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Remote(RemoteError::RemoteOperationFailure { operation: "get", .. })
        ));

        remote.add_file(SOURCE, "&a\n/\n").await;
        remote.fail_on("/work/").await;
        let err = NamelistPipeline::new(SOURCE, TARGET)
            .run(&remote, |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Remote(RemoteError::RemoteOperationFailure { operation: "put", .. })
        ));
    }

    #[test]
    fn test_out_of_order_stage() {
        let mut pipeline = NamelistPipeline::new(SOURCE, TARGET);
        assert!(matches!(
            pipeline.decode(),
            Err(ExecutionError::InvalidStage {
                expected: PipelineStage::Fetched,
                found: PipelineStage::Idle
            })
        ));
    }
}
