//! Connection management and server-side paged extraction.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sync_core::{retry, Record, RecordSource, RecordStream, RetryPolicy};
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};

use crate::row::record_from_row;

/// Name of the server-side cursor used for paged extraction. One cursor
/// instance serves one extraction at a time, so a fixed name is safe.
const CURSOR_NAME: &str = "search_sync_records";

/// Attempt ceiling for statement-level retries. Unlike connection
/// establishment, a statement that keeps failing (e.g. a cursor lost with
/// its connection) cannot recover by waiting, so the cycle must fail and
/// let the next cycle re-extract.
const STATEMENT_ATTEMPTS: u32 = 5;

/// Manages one PostgreSQL connection and executes extraction queries.
///
/// The connection is established on first use. Before each extraction the
/// handle is health-checked; a closed connection, a failed probe, or a
/// previous extraction that ended uncleanly (and may have left an aborted
/// transaction behind) all cause the handle to be dropped and a fresh
/// connection established under the retry policy.
pub struct PostgresCursor {
    conn_string: String,
    retry_policy: RetryPolicy,
    client: Option<Arc<Mutex<Client>>>,
    /// Set while an extraction stream is open; cleared on clean exhaustion.
    extraction_open: Arc<AtomicBool>,
}

impl PostgresCursor {
    /// Create a cursor for the given connection string. No I/O happens here.
    pub fn new(conn_string: impl Into<String>, retry_policy: RetryPolicy) -> Self {
        Self {
            conn_string: conn_string.into(),
            retry_policy,
            client: None,
            extraction_open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The retry policy for individual statements: same delays as the
    /// configured policy, but with a bounded attempt count.
    fn statement_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: Some(STATEMENT_ATTEMPTS),
            ..self.retry_policy.clone()
        }
    }

    async fn connect(&self) -> Result<Client> {
        let conn_string = self.conn_string.clone();
        let client = retry(&self.retry_policy, "postgresql connect", || {
            let conn_string = conn_string.clone();
            async move {
                let (client, connection) = tokio_postgres::connect(&conn_string, NoTls)
                    .await
                    .context("postgresql connection failed")?;

                // The connection object drives the socket; it runs until
                // the client is dropped.
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("PostgreSQL connection error: {e}");
                    }
                });

                Ok(client)
            }
        })
        .await?;

        tracing::debug!("Connected to PostgreSQL");
        Ok(client)
    }

    /// Return a live connection handle, replacing any stale one.
    async fn ensure_connected(&mut self) -> Result<Arc<Mutex<Client>>> {
        let reusable = match &self.client {
            Some(client) => {
                if self.extraction_open.load(Ordering::SeqCst) {
                    // The previous stream never ran to completion; its
                    // transaction state is unknown, so the connection must
                    // not be reused.
                    tracing::warn!(
                        "Previous extraction did not complete; discarding its connection"
                    );
                    false
                } else {
                    let guard = client.lock().await;
                    !guard.is_closed() && guard.simple_query("SELECT 1").await.is_ok()
                }
            }
            None => false,
        };

        if !reusable {
            if self.client.take().is_some() {
                tracing::info!("Replacing stale PostgreSQL connection");
            }
            self.extraction_open.store(false, Ordering::SeqCst);
            let client = self.connect().await?;
            self.client = Some(Arc::new(Mutex::new(client)));
        }

        self.client
            .clone()
            .ok_or_else(|| anyhow::anyhow!("postgresql connection unavailable"))
    }
}

#[async_trait::async_trait]
impl RecordSource for PostgresCursor {
    async fn extract(&mut self, query: &str, chunk_size: usize) -> Result<Box<dyn RecordStream>> {
        let client = self.ensure_connected().await?;
        let statement_policy = self.statement_policy();

        let declare = format!("DECLARE {CURSOR_NAME} NO SCROLL CURSOR FOR {query}");
        let opened = retry(&statement_policy, "extraction query", || {
            let client = client.clone();
            let declare = declare.clone();
            async move {
                let guard = client.lock().await;
                guard
                    .batch_execute("BEGIN")
                    .await
                    .context("failed to open extraction transaction")?;
                guard
                    .batch_execute(&declare)
                    .await
                    .context("failed to declare extraction cursor")?;
                Ok(())
            }
        })
        .await;

        if let Err(e) = opened {
            // The transaction state on this connection is now unknown;
            // drop it so the next extraction starts from a fresh one.
            self.client = None;
            return Err(e);
        }

        self.extraction_open.store(true, Ordering::SeqCst);
        Ok(Box::new(PostgresRecordStream {
            client,
            retry_policy: statement_policy,
            chunk_size: chunk_size.max(1),
            buffer: VecDeque::new(),
            done: false,
            extraction_open: self.extraction_open.clone(),
        }))
    }
}

/// Forward-only stream over a server-side cursor.
///
/// Each refill issues one `FETCH FORWARD` round trip for the next page;
/// exhaustion closes the cursor and commits the read transaction.
pub struct PostgresRecordStream {
    client: Arc<Mutex<Client>>,
    retry_policy: RetryPolicy,
    chunk_size: usize,
    buffer: VecDeque<Record>,
    done: bool,
    extraction_open: Arc<AtomicBool>,
}

impl PostgresRecordStream {
    async fn refill(&mut self) -> Result<()> {
        let fetch = format!("FETCH FORWARD {} FROM {CURSOR_NAME}", self.chunk_size);
        let rows = retry(&self.retry_policy, "extraction fetch", || {
            let client = self.client.clone();
            let fetch = fetch.clone();
            async move {
                let guard = client.lock().await;
                guard
                    .query(&fetch, &[])
                    .await
                    .context("failed to fetch next page from extraction cursor")
            }
        })
        .await?;

        if rows.is_empty() {
            let guard = self.client.lock().await;
            guard
                .batch_execute(&format!("CLOSE {CURSOR_NAME}; COMMIT"))
                .await
                .context("failed to close extraction cursor")?;
            self.done = true;
            self.extraction_open.store(false, Ordering::SeqCst);
            return Ok(());
        }

        for row in rows {
            match record_from_row(&row) {
                Ok(record) => self.buffer.push_back(record),
                // A malformed row is logged and skipped; it must not take
                // the whole extraction down.
                Err(e) => {
                    tracing::warn!("Skipping row that does not match the record shape: {e:#}")
                }
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStream for PostgresRecordStream {
    async fn next(&mut self) -> Option<Result<Record>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.refill().await {
                // Leave the extraction marked open so the cursor discards
                // this connection instead of reusing it.
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
