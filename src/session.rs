//! Session context: one document, its relevance index, and the chat history.
//!
//! A [`Session`] owns everything one interactive conversation needs. The
//! chunk sequence and the index fitted over it live together in a
//! [`DocumentIndex`] and are only ever replaced as a unit, so a stale
//! index can never be queried against a newer chunk sequence. History
//! grows without bound and dies with the session; nothing persists.

use sha2::{Digest, Sha256};

use crate::chunk::chunk_text;
use crate::error::ChatError;
use crate::extract::{extract_text, FileKind};
use crate::generate::Generator;
use crate::models::{Chunk, RankedChunk, Turn};
use crate::prompt;
use crate::rank::RelevanceIndex;

/// A chunk sequence and the relevance index fitted over it, bundled so the
/// pairing invariant holds by construction.
#[derive(Debug)]
pub struct DocumentIndex {
    name: String,
    chunks: Vec<Chunk>,
    index: RelevanceIndex,
    fingerprint: String,
}

impl DocumentIndex {
    /// Chunk `text` and fit the index in one step.
    pub fn from_text(name: &str, text: &str, chunk_width: usize) -> Result<Self, ChatError> {
        let chunks = chunk_text(text, chunk_width)?;
        let index = RelevanceIndex::fit(&chunks)?;

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let fingerprint = format!("{:x}", hasher.finalize());

        Ok(Self {
            name: name.to_string(),
            chunks,
            index,
            fingerprint,
        })
    }

    /// Decode `bytes` (kind inferred from `name`) and build the index.
    pub fn from_bytes(name: &str, bytes: &[u8], chunk_width: usize) -> Result<Self, ChatError> {
        let text = extract_text(bytes, FileKind::from_name(name))?;
        Self::from_text(name, &text, chunk_width)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// SHA-256 hex digest of the extracted document text.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Top-`k` chunks for `question`, best first, with their texts attached.
    pub fn top_chunks(&self, question: &str, k: usize) -> Vec<RankedChunk> {
        self.index
            .query(question, k)
            .into_iter()
            .map(|scored| RankedChunk {
                index: scored.index,
                score: scored.score,
                text: self.chunks[scored.index].text.clone(),
            })
            .collect()
    }
}

/// Retrieval knobs for one question.
#[derive(Debug, Clone, Copy)]
pub struct AskOptions {
    /// Chunks fed into the prompt context.
    pub top_k: usize,
    /// Recent turns included in the prompt.
    pub history_turns: usize,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            history_turns: 3,
        }
    }
}

/// A generated answer plus the context that grounded it.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// The retrieved chunks, in rank order.
    pub context: Vec<RankedChunk>,
}

/// One interactive conversation's state.
#[derive(Default)]
pub struct Session {
    document: Option<DocumentIndex>,
    history: Vec<Turn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current document (and its index) with a freshly built
    /// one. On failure the previous document stays in place untouched.
    pub fn load_document(
        &mut self,
        name: &str,
        bytes: &[u8],
        chunk_width: usize,
    ) -> Result<&DocumentIndex, ChatError> {
        let doc = DocumentIndex::from_bytes(name, bytes, chunk_width)?;
        Ok(self.document.insert(doc))
    }

    pub fn document(&self) -> Option<&DocumentIndex> {
        self.document.as_ref()
    }

    /// Answer one question: rank chunks, compose the prompt, call the
    /// generator once, and append the completed turn.
    ///
    /// Fails with [`ChatError::NotReady`] before a successful upload. A
    /// failed generation leaves the history unchanged, so the same
    /// question can be retried safely.
    pub async fn ask(
        &mut self,
        generator: &dyn Generator,
        question: &str,
        options: AskOptions,
    ) -> Result<Answer, ChatError> {
        let doc = self.document.as_ref().ok_or(ChatError::NotReady)?;

        let context = doc.top_chunks(question, options.top_k);
        let context_texts: Vec<String> = context.iter().map(|c| c.text.clone()).collect();
        let prompt = prompt::compose(question, &context_texts, self.tail(options.history_turns));

        let answer_text = generator.generate(&prompt).await?;

        self.history.push(Turn::new(question, answer_text.as_str()));
        Ok(Answer {
            text: answer_text,
            context,
        })
    }

    /// The last `n` turns, oldest first. All of them if fewer exist.
    pub fn tail(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Full history in insertion order.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Turns most-recent-first, for transcript rendering.
    pub fn transcript(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed answer and records the prompts it saw.
    struct ScriptedGenerator {
        answer: String,
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                prompts: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        fn model_name(&self) -> &str {
            "scripted"
        }
        async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.clone())
        }
    }

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyGenerator {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for FlakyGenerator {
        fn model_name(&self) -> &str {
            "flaky"
        }
        async fn generate(&self, _prompt: &str) -> Result<String, ChatError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ChatError::Generation("quota exceeded".to_string()))
            } else {
                Ok("recovered answer".to_string())
            }
        }
    }

    const DOC: &str = "Hostel fees are due by March 1. Course registration opens February 15.";

    #[tokio::test]
    async fn ask_before_upload_is_not_ready() {
        let mut session = Session::new();
        let gen = ScriptedGenerator::new("whatever");
        let err = session.ask(&gen, "hello?", AskOptions::default()).await.unwrap_err();
        assert!(matches!(err, ChatError::NotReady));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn empty_document_cannot_be_loaded() {
        let mut session = Session::new();
        let err = session.load_document("empty.txt", b"", 300).unwrap_err();
        assert!(matches!(err, ChatError::InsufficientData));
        assert!(session.document().is_none());
    }

    #[tokio::test]
    async fn failed_upload_keeps_previous_document() {
        let mut session = Session::new();
        session.load_document("doc.txt", DOC.as_bytes(), 300).unwrap();
        let old_fingerprint = session.document().unwrap().fingerprint().to_string();

        assert!(session.load_document("bad.txt", &[0xff, 0xfe], 300).is_err());
        assert_eq!(session.document().unwrap().fingerprint(), old_fingerprint);
    }

    #[tokio::test]
    async fn successful_turns_accumulate_in_order() {
        let mut session = Session::new();
        session.load_document("doc.txt", DOC.as_bytes(), 300).unwrap();
        let gen = ScriptedGenerator::new("March 1.");

        session.ask(&gen, "When are fees due?", AskOptions::default()).await.unwrap();
        session.ask(&gen, "And registration?", AskOptions::default()).await.unwrap();

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "When are fees due?");
        assert_eq!(history[1].question, "And registration?");

        // Transcript renders most-recent-first.
        let first = session.transcript().next().unwrap();
        assert_eq!(first.question, "And registration?");
    }

    #[tokio::test]
    async fn third_prompt_contains_both_prior_turns() {
        let mut session = Session::new();
        session.load_document("doc.txt", DOC.as_bytes(), 300).unwrap();
        let gen = ScriptedGenerator::new("ok");

        session.ask(&gen, "q1", AskOptions::default()).await.unwrap();
        session.ask(&gen, "q2", AskOptions::default()).await.unwrap();
        session.ask(&gen, "q3", AskOptions::default()).await.unwrap();

        let prompts = gen.prompts.lock().unwrap();
        let third = &prompts[2];
        let q1_pos = third.find("User: q1\nBot: ok").unwrap();
        let q2_pos = third.find("User: q2\nBot: ok").unwrap();
        assert!(q1_pos < q2_pos, "history must be chronological");
    }

    #[tokio::test]
    async fn failed_generation_leaves_history_unchanged_and_retry_works() {
        let mut session = Session::new();
        session.load_document("doc.txt", DOC.as_bytes(), 300).unwrap();
        let ok_gen = ScriptedGenerator::new("A1");
        session.ask(&ok_gen, "Q1", AskOptions::default()).await.unwrap();

        let flaky = FlakyGenerator {
            failures: 1,
            calls: AtomicUsize::new(0),
        };
        let err = session.ask(&flaky, "Q2", AskOptions::default()).await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));
        assert_eq!(session.history().len(), 1, "failed call must not append a turn");

        let answer = session.ask(&flaky, "Q2", AskOptions::default()).await.unwrap();
        assert_eq!(answer.text, "recovered answer");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].question, "Q2");
    }

    #[tokio::test]
    async fn single_chunk_document_grounds_every_question() {
        let mut session = Session::new();
        session.load_document("doc.txt", DOC.as_bytes(), 300).unwrap();
        let gen = ScriptedGenerator::new("March 1.");

        let answer = session
            .ask(&gen, "When are hostel fees due?", AskOptions::default())
            .await
            .unwrap();
        assert_eq!(answer.context.len(), 1);
        assert_eq!(answer.context[0].text, DOC);

        let prompts = gen.prompts.lock().unwrap();
        assert!(prompts[0].contains(DOC));
    }

    #[test]
    fn tail_returns_last_n_oldest_first() {
        let mut session = Session::new();
        for i in 0..5 {
            session.history.push(Turn::new(format!("q{}", i), "a"));
        }
        let tail = session.tail(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].question, "q2");
        assert_eq!(tail[2].question, "q4");
        assert_eq!(session.tail(10).len(), 5);
    }
}
