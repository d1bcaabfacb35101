//! Session orchestration: the build and query phases, and the state a chat
//! front end keeps between turns.
//!
//! Work is split into `begin_*` / `run` / `finish_*` steps so a UI can run
//! the slow part on another thread while keeping the session itself on its
//! event loop. `process` and `ask` chain the steps for synchronous callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::build_prompt::{build_prompt, excerpt, FALLBACK_ANSWER, NOT_READY_MESSAGE};
use crate::chunk_text::chunk_pages;
use crate::config::Config;
use crate::embed_chunks::{with_retry, Embedder};
use crate::error::{IndexError, ProcessingError, QueryError};
use crate::generate::Generator;
use crate::load_pdf::{Document, DocumentLoader};
use crate::retrieve_chunks::Retriever;
use crate::transcript::{Role, Transcript};
use crate::vector_index::{Hit, VectorIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Processing,
    Ready,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildProgress {
    Loaded { filename: String, pages: usize },
    LoadFailed { filename: String, reason: String },
    Chunked { chunks: usize },
    Embedded { done: usize, total: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedDocument {
    pub filename: String,
    pub reason: String,
}

#[derive(Clone, Debug)]
pub struct ProcessReport {
    pub documents: usize,
    pub failed: Vec<FailedDocument>,
    pub pages: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub elapsed: Duration,
}

pub struct BuiltIndex {
    pub index: VectorIndex,
    pub report: ProcessReport,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceRef {
    pub source_filename: String,
    pub page_number: usize,
    pub excerpt: String,
    pub score: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub elapsed_seconds: f64,
}

/// The injected services plus configuration. Cloning is cheap.
#[derive(Clone)]
pub struct Pipeline {
    cfg: Arc<Config>,
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
}

impl Pipeline {
    pub fn new(
        cfg: Config,
        loader: Arc<dyn DocumentLoader>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            cfg: Arc::new(cfg),
            loader,
            embedder,
            generator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Load, chunk, embed and index `documents`. A document that fails to
    /// load is reported and skipped; every other failure aborts the build.
    pub fn build_index(
        &self,
        documents: &[Document],
        progress: &mut dyn FnMut(BuildProgress),
        cancel: &AtomicBool,
    ) -> Result<BuiltIndex, ProcessingError> {
        if documents.is_empty() {
            return Err(ProcessingError::NoDocuments);
        }
        let started = Instant::now();

        let mut pages = Vec::new();
        let mut failed = Vec::new();
        for doc in documents {
            if cancel.load(Ordering::Relaxed) {
                return Err(ProcessingError::Cancelled);
            }
            match self.loader.load(doc) {
                Ok(doc_pages) => {
                    info!(file = %doc.filename, pages = doc_pages.len(), "loaded document");
                    progress(BuildProgress::Loaded {
                        filename: doc.filename.clone(),
                        pages: doc_pages.len(),
                    });
                    pages.extend(doc_pages);
                }
                Err(err) => {
                    warn!(file = %doc.filename, error = %err, "failed to load document");
                    let reason = err.to_string();
                    progress(BuildProgress::LoadFailed {
                        filename: doc.filename.clone(),
                        reason: reason.clone(),
                    });
                    failed.push(FailedDocument {
                        filename: doc.filename.clone(),
                        reason,
                    });
                }
            }
        }

        let chunks = chunk_pages(&pages, self.cfg.chunk_size, self.cfg.chunk_overlap);
        info!(pages = pages.len(), chunks = chunks.len(), "chunked documents");
        progress(BuildProgress::Chunked {
            chunks: chunks.len(),
        });
        if chunks.is_empty() {
            return Err(IndexError::Empty.into());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.cfg.embed_batch_size.max(1)) {
            if cancel.load(Ordering::Relaxed) {
                return Err(ProcessingError::Cancelled);
            }
            vectors.extend(with_retry(self.cfg.embed_retries, || {
                self.embedder.embed_batch(batch)
            })?);
            progress(BuildProgress::Embedded {
                done: vectors.len(),
                total: texts.len(),
            });
        }

        let chunk_count = chunks.len();
        let index = VectorIndex::build(chunks, vectors)?;
        let report = ProcessReport {
            documents: documents.len() - failed.len(),
            failed,
            pages: pages.len(),
            chunks: chunk_count,
            dimension: index.dim(),
            elapsed: started.elapsed(),
        };
        info!(
            documents = report.documents,
            failed = report.failed.len(),
            chunks = report.chunks,
            dimension = report.dimension,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "index built"
        );
        Ok(BuiltIndex { index, report })
    }

    /// Retrieve, assemble the prompt and generate. Returns the answer text
    /// and the hits it was conditioned on.
    pub fn answer(
        &self,
        index: &VectorIndex,
        question: &str,
    ) -> Result<(String, Vec<Hit>), QueryError> {
        let hits = Retriever::new(index, self.embedder.as_ref(), self.cfg.top_k)
            .with_retries(self.cfg.embed_retries)
            .retrieve(question)?;
        let prompt = build_prompt(question, &hits);
        let answer = self.generator.generate(&prompt)?;
        Ok((answer, hits))
    }

    fn to_answer(&self, answer: String, hits: &[Hit], elapsed: Duration) -> Answer {
        Answer {
            answer,
            sources: hits
                .iter()
                .map(|hit| SourceRef {
                    source_filename: hit.chunk.source.clone(),
                    page_number: hit.chunk.page_number,
                    excerpt: excerpt(&hit.chunk.text, self.cfg.excerpt_chars),
                    score: hit.score,
                })
                .collect(),
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }
}

/// An index build handed out by [`Session::begin_processing`].
#[derive(Clone)]
pub struct BuildJob {
    id: u64,
    pipeline: Pipeline,
    cancel: Arc<AtomicBool>,
}

impl BuildJob {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn run(
        &self,
        documents: &[Document],
        mut progress: impl FnMut(BuildProgress),
    ) -> Result<BuiltIndex, ProcessingError> {
        self.pipeline
            .build_index(documents, &mut progress, &self.cancel)
    }
}

/// A question handed out by [`Session::begin_query`].
pub enum QueryJob {
    /// No index is ready; the answer is already known.
    Immediate(Answer),
    Pending {
        pipeline: Pipeline,
        index: Arc<VectorIndex>,
        question: String,
    },
}

impl QueryJob {
    /// Never fails: service errors come back as the answer text.
    pub fn run(self) -> Answer {
        match self {
            QueryJob::Immediate(answer) => answer,
            QueryJob::Pending {
                pipeline,
                index,
                question,
            } => {
                let started = Instant::now();
                match pipeline.answer(&index, &question) {
                    Ok((text, hits)) => {
                        let answer = pipeline.to_answer(text, &hits, started.elapsed());
                        info!(
                            sources = answer.sources.len(),
                            elapsed_seconds = answer.elapsed_seconds,
                            fallback = answer.answer == FALLBACK_ANSWER,
                            "answered question"
                        );
                        answer
                    }
                    Err(err) => {
                        warn!(error = %err, "query failed");
                        Answer {
                            answer: format!("Error generating response: {err}"),
                            sources: vec![],
                            elapsed_seconds: started.elapsed().as_secs_f64(),
                        }
                    }
                }
            }
        }
    }
}

/// One user's state: at most one index, the transcript and the phase.
pub struct Session {
    pipeline: Pipeline,
    phase: SessionPhase,
    index: Option<Arc<VectorIndex>>,
    transcript: Transcript,
    next_build: u64,
    active_build: Option<BuildJob>,
}

impl Session {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            phase: SessionPhase::Empty,
            index: None,
            transcript: Transcript::default(),
            next_build: 0,
            active_build: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    pub fn index(&self) -> Option<&Arc<VectorIndex>> {
        self.index.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Enters `Processing`. The current index is dropped: queries are
    /// refused until the new one is installed.
    pub fn begin_processing(&mut self) -> BuildJob {
        if let Some(previous) = self.active_build.take() {
            previous.cancel();
        }
        self.next_build += 1;
        let job = BuildJob {
            id: self.next_build,
            pipeline: self.pipeline.clone(),
            cancel: Arc::new(AtomicBool::new(false)),
        };
        self.phase = SessionPhase::Processing;
        self.index = None;
        self.active_build = Some(job.clone());
        job
    }

    /// Installs a finished build. Results from a superseded build are
    /// discarded as cancelled.
    pub fn finish_processing(
        &mut self,
        build_id: u64,
        result: Result<BuiltIndex, ProcessingError>,
    ) -> Result<ProcessReport, ProcessingError> {
        match &self.active_build {
            Some(job) if job.id == build_id => {}
            _ => return Err(ProcessingError::Cancelled),
        }
        self.active_build = None;
        match result {
            Ok(built) => {
                self.index = Some(Arc::new(built.index));
                self.phase = SessionPhase::Ready;
                Ok(built.report)
            }
            Err(err) => {
                warn!(error = %err, "index build failed");
                self.index = None;
                self.phase = SessionPhase::Empty;
                Err(err)
            }
        }
    }

    /// Requests cancellation of the build in flight, if any.
    pub fn cancel_processing(&self) {
        if let Some(job) = &self.active_build {
            job.cancel();
        }
    }

    pub fn process(&mut self, documents: &[Document]) -> Result<ProcessReport, ProcessingError> {
        let job = self.begin_processing();
        let result = job.run(documents, |_| {});
        self.finish_processing(job.id(), result)
    }

    /// Records the question and hands back the work needed to answer it.
    pub fn begin_query(&mut self, question: &str) -> QueryJob {
        self.transcript.push(Role::User, question);
        match (&self.phase, &self.index) {
            (SessionPhase::Ready, Some(index)) => QueryJob::Pending {
                pipeline: self.pipeline.clone(),
                index: Arc::clone(index),
                question: question.to_string(),
            },
            _ => {
                info!(error = %QueryError::NotReady, "question before documents were processed");
                QueryJob::Immediate(Answer {
                    answer: NOT_READY_MESSAGE.to_string(),
                    sources: vec![],
                    elapsed_seconds: 0.0,
                })
            }
        }
    }

    pub fn finish_query(&mut self, answer: &Answer) {
        self.transcript.push(Role::Assistant, answer.answer.clone());
    }

    pub fn ask(&mut self, question: &str) -> Answer {
        let answer = self.begin_query(question).run();
        self.finish_query(&answer);
        answer
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }
}
