//! Query pipeline
//!
//! Embeds free text and searches the session's index. Each run is
//! independent; [`ResultBoard`] keeps whichever result should be on display.

use crate::pipeline::{PipelineError, PipelineResult, DEFAULT_TOP_K};
use crate::session::Session;
use crate::vector::Neighbor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Ranked results of one query
#[derive(Debug, Clone)]
pub struct QueryResults {
    /// Issue order of the query within its pipeline
    pub ticket: u64,
    /// Index generation that was searched
    pub generation: u64,
    pub query: String,
    pub neighbors: Vec<Neighbor>,
}

/// Embeds a query and returns the `k` nearest documents
#[derive(Debug)]
pub struct QueryPipeline {
    k: usize,
    tickets: AtomicU64,
}

impl Default for QueryPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl QueryPipeline {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            tickets: AtomicU64::new(0),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Run one query. An unbuilt or empty index, or blank text, yields no
    /// neighbors.
    pub async fn run(&self, session: &Session, text: &str) -> PipelineResult<QueryResults> {
        let handles = session.handles()?;
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed) + 1;

        if text.trim().is_empty() {
            return Ok(QueryResults {
                ticket,
                generation: handles.index.generation(),
                query: text.to_string(),
                neighbors: Vec::new(),
            });
        }

        let vector = handles
            .provider
            .embed(text)
            .await
            .map_err(PipelineError::QueryEmbed)?;

        // One snapshot per query: the reported generation is the one searched
        let snapshot = handles.index.snapshot();
        let neighbors = handles.index.search_in(&snapshot, &vector, self.k)?;

        debug!(
            ticket,
            generation = snapshot.generation(),
            hits = neighbors.len(),
            "query answered"
        );
        Ok(QueryResults {
            ticket,
            generation: snapshot.generation(),
            query: text.to_string(),
            neighbors,
        })
    }
}

/// Holds the results currently on display.
///
/// Results from a query issued earlier than the displayed one, or computed
/// against an older generation, are discarded. Tickets are only comparable
/// within one `QueryPipeline`.
#[derive(Debug, Default)]
pub struct ResultBoard {
    current: Mutex<Option<QueryResults>>,
}

impl ResultBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display `results` if they are newer than what is shown.
    /// Returns whether they were accepted.
    pub fn publish(&self, results: QueryResults) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let newer = match current.as_ref() {
            None => true,
            Some(shown) => results.ticket > shown.ticket && results.generation >= shown.generation,
        };
        if newer {
            *current = Some(results);
        } else {
            debug!(ticket = results.ticket, "discarding stale query results");
        }
        newer
    }

    pub fn current(&self) -> Option<QueryResults> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
