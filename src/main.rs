mod fetch;
mod input;
mod model;
mod twitter;

use crate::fetch::{FetchOptions, Fetcher, UnknownIdPolicy};
use crate::input::{load_records, Credentials};
use crate::twitter::v1::TwitterClientV1;
use crate::twitter::v2::TwitterClientV2;
use crate::twitter::{ClientOptions, TweetLookup, MAX_LOOKUP_NUMBER};
use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(version, about = "Download tweets by id, keeping each tweet's label alongside it")]
struct Args {
    /// Credential file holding, one per line: consumer key, consumer secret,
    /// access token, access token secret
    #[clap(short, long)]
    credentials: PathBuf,
    /// Newline-delimited JSON, one object with a tweet id per line
    #[clap(short, long)]
    inputfile: PathBuf,
    /// Seconds to wait before each lookup request
    #[clap(long, default_value_t = fetch::DEFAULT_DELAY.as_secs())]
    delay_secs: u64,
    /// Tweets per lookup request (at most 100)
    #[clap(long, default_value_t = MAX_LOOKUP_NUMBER)]
    batch_size: usize,
    /// Field of each input object holding the tweet id
    #[clap(long, default_value = "tweet_id")]
    id_field: String,
    /// What to do when the API returns a tweet that was not requested
    #[clap(long, value_enum, default_value = "skip")]
    on_unknown_id: UnknownIdPolicy,
    /// Give up on a batch after this many seconds and move on to the next one
    #[clap(long)]
    request_timeout: Option<u64>,
    /// Use Twitter API 2 with an app-only bearer token
    #[clap(long)]
    api_v2: bool,
    /// Request untruncated tweet text (API v1.1 only)
    #[clap(long)]
    extended: bool,
}

impl Args {
    fn fetch_options(&self) -> anyhow::Result<FetchOptions> {
        if self.batch_size == 0 || self.batch_size > MAX_LOOKUP_NUMBER {
            bail!("Batch size must be between 1 and {}", MAX_LOOKUP_NUMBER);
        }
        Ok(FetchOptions {
            delay: Duration::from_secs(self.delay_secs),
            batch_size: self.batch_size,
            on_unknown_id: self.on_unknown_id,
        })
    }

    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: self.request_timeout.map(Duration::from_secs),
            extended: self.extended,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = main2().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn main2() -> anyhow::Result<()> {
    let args: Args = Args::parse();
    let options = args.fetch_options()?;
    let credentials = Credentials::load(&args.credentials)
        .await
        .context("Unable to load credentials")?;
    let records = load_records(&args.inputfile, &args.id_field)
        .await
        .context("Unable to load input file")?;
    log::info!(
        "Loaded {} tweet ids from {}",
        records.len(),
        args.inputfile.display()
    );

    let client: Box<dyn TweetLookup> = if args.api_v2 {
        Box::new(TwitterClientV2::new(&credentials, args.client_options()).await?)
    } else {
        Box::new(TwitterClientV1::new(&credentials, args.client_options()))
    };
    log::info!("Using {}", client.name());

    let summary = Fetcher::new(client, records, options)
        .run(&args.inputfile)
        .await?;
    log::info!(
        "Wrote {} tweets over {} requests ({} skipped batches, {} unrequested tweets dropped)",
        summary.tweets_written,
        summary.batches_requested,
        summary.batches_skipped,
        summary.unknown_dropped
    );
    Ok(())
}
