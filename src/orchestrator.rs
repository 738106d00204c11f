//! Question-answering orchestrator for Spor.
//!
//! Ties a question about a video to its cached index, picks the context and
//! runs generation inside the asking session.

use crate::cache::{IndexLookup, SessionHistoryStore, VideoIndexCache, VideoIndexEntry};
use crate::chunking::ChunkingConfig;
use crate::config::{Prompts, Settings};
use crate::error::{Result, SporError};
use crate::rag::{AnswerGenerator, ConversationChain, OpenAIGenerator, QueryClassifier, RetrievedContext};
use crate::transcript::{create_source, parse_video_id, TranscriptSource};
use crate::vector_store::{create_index, VectorIndex};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answer returned when a video has no usable transcript.
pub const NO_TRANSCRIPT_ANSWER: &str = "No transcript available for this video.";

/// Answers questions about videos, one conversation per session.
pub struct ChatOrchestrator {
    videos: Arc<VideoIndexCache>,
    index: Arc<dyn VectorIndex>,
    classifier: QueryClassifier,
    chain: ConversationChain,
    top_k: usize,
}

impl ChatOrchestrator {
    /// Build the production pipeline from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let source: Arc<dyn TranscriptSource> = Arc::new(create_source(settings)?);
        let index: Arc<dyn VectorIndex> = Arc::new(create_index(settings)?);
        let generator: Arc<dyn AnswerGenerator> = Arc::new(OpenAIGenerator::new(&settings.rag, prompts)?);

        info!(
            "Using {} vector store, {} for answers",
            settings.vector_store.provider, settings.rag.model
        );

        Self::with_components(settings, source, index, generator)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: &Settings,
        source: Arc<dyn TranscriptSource>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        let classifier = QueryClassifier::with_patterns(&settings.retrieval.extra_broad_patterns)?;

        let videos = Arc::new(VideoIndexCache::new(
            source,
            index.clone(),
            ChunkingConfig::from(&settings.chunking),
            settings.cache.video_policy(),
        ));
        let sessions = Arc::new(SessionHistoryStore::new(settings.cache.session_policy()));

        Ok(Self {
            videos,
            index,
            classifier,
            chain: ConversationChain::new(generator, sessions),
            top_k: settings.retrieval.top_k,
        })
    }

    pub fn videos(&self) -> &Arc<VideoIndexCache> {
        &self.videos
    }

    pub fn sessions(&self) -> &Arc<SessionHistoryStore> {
        self.chain.sessions()
    }

    /// Answer `question` about `video_id` within `session_id`.
    ///
    /// `video_id` may also be a YouTube URL.
    #[instrument(skip(self, question), fields(video = %video_id, session = %session_id))]
    pub async fn answer(&self, video_id: &str, session_id: &str, question: &str) -> Result<String> {
        let video_id = normalize_video_id(video_id)?;
        if question.trim().is_empty() {
            return Err(SporError::InvalidInput("Question is empty".to_string()));
        }

        let entry = match self.videos.get_or_build(&video_id).await? {
            IndexLookup::Ready(entry) => entry,
            IndexLookup::NoTranscript => return Ok(NO_TRANSCRIPT_ANSWER.to_string()),
        };

        let context = self.select_context(&entry, question).await?;
        let answer = self.chain.invoke(session_id, question, &context).await?;

        debug!("[Video: {}] Q: {} -> A: {}", video_id, question, answer);
        Ok(answer)
    }

    /// Full transcript for broad questions, retrieved passages otherwise.
    pub async fn select_context(&self, entry: &VideoIndexEntry, question: &str) -> Result<RetrievedContext> {
        if let Some(rule) = self.classifier.matching_rule(question) {
            info!(
                "[Video: {}] Broad query detected ({}), using full transcript",
                entry.video_id, rule
            );
            return Ok(RetrievedContext::FullTranscript(entry.full_text.clone()));
        }

        let passages = self.index.retrieve(&entry.handle, question, self.top_k).await?;
        debug!("Retrieved {} passages for {}", passages.len(), entry.video_id);
        Ok(RetrievedContext::Passages(passages))
    }
}

/// Accept bare ids and YouTube URLs; anything else is used as given.
fn normalize_video_id(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SporError::InvalidInput("Video id is empty".to_string()));
    }
    Ok(parse_video_id(trimmed).unwrap_or_else(|| trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{lecture, RecordingIndex, ScriptedSource};
    use crate::rag::testing::EchoGenerator;
    use crate::transcript::RawSegment;
    use crate::vector_store::Passage;
    use std::time::Duration;

    struct Fixture {
        source: Arc<ScriptedSource>,
        index: Arc<RecordingIndex>,
        generator: Arc<EchoGenerator>,
        orchestrator: ChatOrchestrator,
    }

    fn fixture(source: Arc<ScriptedSource>) -> Fixture {
        let index = Arc::new(RecordingIndex {
            passages: vec![Passage {
                text: "Deltas form at the coast.".to_string(),
                start: 10.0,
                duration: 5.0,
                score: 0.9,
            }],
            ..Default::default()
        });
        let generator = Arc::new(EchoGenerator::default());
        let orchestrator =
            ChatOrchestrator::with_components(&Settings::default(), source.clone(), index.clone(), generator.clone())
                .unwrap();

        Fixture {
            source,
            index,
            generator,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_broad_question_uses_full_transcript() {
        let f = fixture(ScriptedSource::with(lecture()));

        let answer = f.orchestrator.answer("vid", "s1", "Can you summarize this video?").await.unwrap();
        assert_eq!(answer, "answer to: Can you summarize this video?");

        let calls = f.generator.calls();
        assert_eq!(calls[0].question, "Can you summarize this video?");
        assert_eq!(
            calls[0].context,
            RetrievedContext::FullTranscript("Rivers carve valleys. Deltas form at the coast.".to_string())
        );
        assert_eq!(f.index.retrievals(), 0);
    }

    #[tokio::test]
    async fn test_specific_question_uses_retrieval() {
        let f = fixture(ScriptedSource::with(lecture()));

        f.orchestrator.answer("vid", "s1", "What does she say at 2:15?").await.unwrap();

        let calls = f.generator.calls();
        assert!(matches!(&calls[0].context, RetrievedContext::Passages(p) if p.len() == 1));
        assert_eq!(f.index.retrievals(), 1);
    }

    #[tokio::test]
    async fn test_retrieval_failure_propagates_without_history() {
        let index = Arc::new(RecordingIndex {
            fail_retrieve: true,
            ..Default::default()
        });
        let generator = Arc::new(EchoGenerator::default());
        let orchestrator = ChatOrchestrator::with_components(
            &Settings::default(),
            ScriptedSource::with(lecture()),
            index.clone(),
            generator.clone(),
        )
        .unwrap();

        let err = orchestrator.answer("vid", "s1", "What does she say at 2:15?").await.unwrap_err();
        assert!(matches!(err, SporError::VectorStore(_)));
        assert_eq!(index.retrievals(), 1);
        assert!(generator.calls().is_empty());

        let history = orchestrator.sessions().get_or_create("s1").await;
        assert!(history.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_questions_reuse_index_and_grow_history() {
        let f = fixture(ScriptedSource::with(lecture()));

        f.orchestrator.answer("vid", "s1", "first question").await.unwrap();
        f.orchestrator.answer("vid", "s1", "second question").await.unwrap();
        f.orchestrator.answer("vid", "s2", "other session").await.unwrap();

        assert_eq!(f.source.calls(), 1);
        assert_eq!(f.index.upserts(), 1);

        let histories: Vec<usize> = f.generator.calls().iter().map(|c| c.history_len).collect();
        assert_eq!(histories, vec![0, 2, 0]);

        let s1 = f.orchestrator.sessions().get_or_create("s1").await;
        assert_eq!(s1.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_transcript_gives_fixed_answer() {
        let f = fixture(ScriptedSource::with(vec![
            RawSegment::new("fine", 0.0, 1.0),
            RawSegment::new("broken", f64::NAN, 1.0),
        ]));

        let answer = f.orchestrator.answer("vid", "s1", "summarize").await.unwrap();
        assert_eq!(answer, NO_TRANSCRIPT_ANSWER);
        assert!(f.generator.calls().is_empty());
        assert_eq!(f.index.upserts(), 0);

        let history = f.orchestrator.sessions().get_or_create("s1").await;
        assert!(history.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_transcript_is_retried() {
        let f = fixture(ScriptedSource::failing());

        assert_eq!(f.orchestrator.answer("vid", "s1", "q").await.unwrap(), NO_TRANSCRIPT_ANSWER);
        assert_eq!(f.orchestrator.answer("vid", "s1", "q").await.unwrap(), NO_TRANSCRIPT_ANSWER);
        assert_eq!(f.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_index_once() {
        let source = Arc::new(ScriptedSource {
            segments: Some(lecture()),
            delay: Duration::from_millis(30),
            calls: Default::default(),
        });
        let f = fixture(source);
        let orchestrator = Arc::new(f.orchestrator);

        let a = {
            let o = orchestrator.clone();
            tokio::spawn(async move { o.answer("vid", "s1", "question one").await })
        };
        let b = {
            let o = orchestrator.clone();
            tokio::spawn(async move { o.answer("vid", "s2", "question two").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(f.index.upserts(), 1);
        assert_eq!(f.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_url_and_input_validation() {
        let f = fixture(ScriptedSource::with(lecture()));

        f.orchestrator
            .answer("https://youtu.be/dQw4w9WgXcQ", "s1", "summarize")
            .await
            .unwrap();
        assert_eq!(
            f.orchestrator.videos().state("dQw4w9WgXcQ").await,
            crate::cache::IndexState::Ready
        );

        assert!(matches!(
            f.orchestrator.answer("  ", "s1", "q").await,
            Err(SporError::InvalidInput(_))
        ));
        assert!(matches!(
            f.orchestrator.answer("vid", "s1", " ").await,
            Err(SporError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_extra_broad_pattern_from_settings() {
        let mut settings = Settings::default();
        settings.retrieval.extra_broad_patterns = vec!["key takeaways".to_string()];
        let index = Arc::new(RecordingIndex::default());
        let orchestrator = ChatOrchestrator::with_components(
            &settings,
            ScriptedSource::with(lecture()),
            index.clone(),
            Arc::new(EchoGenerator::default()),
        )
        .unwrap();

        orchestrator.answer("vid", "s", "What are the key takeaways?").await.unwrap();
        assert_eq!(index.retrievals(), 0);

        settings.retrieval.extra_broad_patterns = vec!["[".to_string()];
        assert!(ChatOrchestrator::with_components(
            &settings,
            ScriptedSource::with(lecture()),
            index,
            Arc::new(EchoGenerator::default()),
        )
        .is_err());
    }
}
