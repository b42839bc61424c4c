//! Ties the pieces together: dataset, prompt construction, model call,
//! payload extraction, and execution.

use color_eyre::Result;
use std::path::Path;
use tracing::debug;

use crate::chart::ChartSpec;
use crate::exec::{self, QueryOutcome};
use crate::extract;
use crate::llm::{CompletionClient, CHART_MAX_TOKENS, QUERY_MAX_TOKENS};
use crate::prompt;
use crate::store::{LoadOptions, TabularStore};

/// A question answered through SQL.
pub struct Answer {
    /// The SQL the model produced, after extraction.
    pub sql: String,
    pub outcome: QueryOutcome,
}

/// A chart request carried through to a rendered file.
pub struct ChartAnswer {
    /// The plotting script the model produced, after extraction.
    pub script: String,
    pub spec: ChartSpec,
}

/// One loaded dataset plus everything needed to answer questions about it.
pub struct Session {
    store: TabularStore,
    columns: String,
}

impl Session {
    pub fn open(path: &Path, options: &LoadOptions) -> Result<Self> {
        let store = TabularStore::open(path, options)?;
        let columns = store.columns_description();
        Ok(Self { store, columns })
    }

    pub fn from_store(store: TabularStore) -> Self {
        let columns = store.columns_description();
        Self { store, columns }
    }

    pub fn store(&self) -> &TabularStore {
        &self.store
    }

    pub fn columns_description(&self) -> &str {
        &self.columns
    }

    /// Answer a natural-language question: prompt the model for SQL, extract
    /// the statement, and run it against the dataset.
    pub fn ask(&self, client: &CompletionClient, question: &str) -> Result<Answer> {
        let prompt = prompt::query_prompt(question, &self.columns);
        let reply = client.complete(&prompt, QUERY_MAX_TOKENS)?;
        let sql = extract::extract_payload(&reply);
        debug!(sql = %sql, "extracted query");
        let outcome = exec::run_query(&self.store, &sql)?;
        Ok(Answer { sql, outcome })
    }

    /// Produce a chart for a natural-language request: prompt the model for a
    /// plotting script, extract it, and render a PNG at `output`.
    pub fn chart(
        &self,
        client: &CompletionClient,
        request: &str,
        output: &Path,
        size: (u32, u32),
    ) -> Result<ChartAnswer> {
        let prompt = prompt::chart_prompt(request, &self.columns);
        let reply = client.complete(&prompt, CHART_MAX_TOKENS)?;
        let script = extract::extract_payload(&reply);
        debug!(script = %script, "extracted plotting script");
        let spec = exec::run_chart_script(&self.store, &script, output, size)?;
        Ok(ChartAnswer { script, spec })
    }
}
