pub mod v1;
pub mod v2;

use crate::model::{RemoteTweet, TweetId};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// The API accepts at most this many ids per lookup call.
pub const MAX_LOOKUP_NUMBER: usize = 100;

#[derive(Debug, Error)]
pub enum LookupError {
    /// The request took too long. The batch can be skipped and the run continued.
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    /// Upper bound on a single lookup call, `None` leaves it to the transport
    pub request_timeout: Option<Duration>,
    /// Ask v1.1 for untruncated `full_text`
    pub extended: bool,
}

#[async_trait]
pub trait TweetLookup: Send + Sync {
    /// Fetch the tweets for `ids`. Ids that no longer exist are simply absent
    /// from the result, and the order is whatever the API returns.
    async fn lookup(&self, ids: &[TweetId]) -> Result<Vec<RemoteTweet>, LookupError>;

    fn name(&self) -> &'static str;
}

pub(crate) fn join_ids(ids: &[TweetId]) -> String {
    ids.iter()
        .map(TweetId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn is_timeout_io(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::TimedOut
}

/// Serve `reply` to every connection, then hold the socket open without
/// sending anything more. Returns the url to point a client at.
#[cfg(test)]
pub(crate) async fn stalling_server(reply: &[u8]) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let reply = reply.to_vec();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let reply = reply.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(&reply).await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });
    format!("http://{}/lookup", addr)
}
