mod output;

pub use output::{output_paths, OutputPair};

use crate::model::{InputRecord, TweetId};
use crate::twitter::{LookupError, TweetLookup};
use anyhow::Context;
use clap::ValueEnum;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Pause before every lookup call, enough to stay inside the 900 requests per
/// 15 minute window of `statuses/lookup`.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(16);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Response contained tweet {0}, which was not requested in this batch")]
    UnknownTweetId(TweetId),
    #[error(transparent)]
    Lookup(anyhow::Error),
    #[error("Error whilst writing output: {0}")]
    Output(#[from] std::io::Error),
}

/// What to do with a returned tweet whose id was not in the batch.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnknownIdPolicy {
    /// Log a warning and drop the tweet
    Skip,
    /// Stop the run with an error
    Abort,
}

#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub delay: Duration,
    pub batch_size: usize,
    pub on_unknown_id: UnknownIdPolicy,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub batches_requested: usize,
    pub batches_skipped: usize,
    pub tweets_written: usize,
    pub unknown_dropped: usize,
}

/// Split `items` into `len / size + 1` consecutive slices. When `len` is a
/// multiple of `size` the final slice is empty.
pub fn batches<T>(items: &[T], size: usize) -> impl Iterator<Item = &[T]> + '_ {
    let rounds = items.len() / size + 1;
    (0..rounds).map(move |i| {
        let start = (i * size).min(items.len());
        let end = ((i + 1) * size).min(items.len());
        &items[start..end]
    })
}

/// Number of lookup calls `batches` leads to, the empty trailing slice aside.
pub fn request_count(len: usize, size: usize) -> usize {
    (len + size - 1) / size
}

/// Everything the fetch phase needs, built once by the loader.
pub struct Fetcher {
    client: Box<dyn TweetLookup>,
    records: Vec<InputRecord>,
    options: FetchOptions,
}

impl Fetcher {
    pub fn new(
        client: Box<dyn TweetLookup>,
        records: Vec<InputRecord>,
        options: FetchOptions,
    ) -> Self {
        Self {
            client,
            records,
            options,
        }
    }

    /// Look up every record and write `<input>.data.json` and
    /// `<input>.label.json`. Whatever was written is flushed even when the run
    /// fails part way.
    pub async fn run(&self, input: &Path) -> anyhow::Result<FetchSummary> {
        let (data_path, label_path) = output_paths(input);
        let mut outputs = OutputPair::create(&data_path, &label_path)
            .await
            .with_context(|| format!("Unable to create output files for {}", input.display()))?;

        let mut summary = FetchSummary::default();
        let result = self.fetch_all(&mut outputs, &mut summary).await;
        let flushed = outputs.flush().await;
        result?;
        flushed.context("Unable to flush output files")?;
        summary.tweets_written = outputs.written();
        Ok(summary)
    }

    async fn fetch_all(
        &self,
        outputs: &mut OutputPair,
        summary: &mut FetchSummary,
    ) -> Result<(), FetchError> {
        let size = self.options.batch_size;
        let rounds = request_count(self.records.len(), size);
        for (index, batch) in batches(&self.records, size).enumerate() {
            if batch.is_empty() {
                continue;
            }
            log::info!(
                "Batch {}/{}: looking up {} tweets",
                index + 1,
                rounds,
                batch.len()
            );
            self.fetch_batch(index, batch, outputs, summary).await?;
        }
        Ok(())
    }

    async fn fetch_batch(
        &self,
        index: usize,
        batch: &[InputRecord],
        outputs: &mut OutputPair,
        summary: &mut FetchSummary,
    ) -> Result<(), FetchError> {
        let labels: HashMap<&TweetId, &InputRecord> =
            batch.iter().map(|record| (&record.id, record)).collect();
        let ids: Vec<TweetId> = batch.iter().map(|r| r.id.clone()).collect();

        tokio::time::sleep(self.options.delay).await;
        summary.batches_requested += 1;
        let tweets = match self.client.lookup(&ids).await {
            Ok(tweets) => tweets,
            Err(LookupError::Timeout(e)) => {
                let size = self.options.batch_size;
                log::error!("{}", e);
                log::warn!(
                    "tweet {} to {} were skipped.",
                    index * size,
                    (index + 1) * size
                );
                summary.batches_skipped += 1;
                return Ok(());
            }
            Err(LookupError::Fatal(e)) => return Err(FetchError::Lookup(e)),
        };

        for tweet in tweets {
            match labels.get(&tweet.id) {
                Some(record) => outputs.write(&tweet.raw, &record.fields).await?,
                None => match self.options.on_unknown_id {
                    UnknownIdPolicy::Skip => {
                        log::warn!("Dropping tweet {} which was not requested", tweet.id);
                        summary.unknown_dropped += 1;
                    }
                    UnknownIdPolicy::Abort => return Err(FetchError::UnknownTweetId(tweet.id)),
                },
            }
        }
        Ok(())
    }
}
