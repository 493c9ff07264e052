use crate::input::Credentials;
use crate::model::{RemoteTweet, TweetId};
use crate::twitter::{is_timeout_io, join_ids, ClientOptions, LookupError, TweetLookup};
use anyhow::anyhow;
use async_trait::async_trait;
use egg_mode::error::Error as EggError;
use egg_mode::raw::ParamList;
use egg_mode::Token;
use serde_json::Value;

const LOOKUP_URL: &str = "https://api.twitter.com/1.1/statuses/lookup.json";
const ID_FIELD: &str = "id_str";

pub struct TwitterClientV1 {
    token: Token,
    options: ClientOptions,
    lookup_url: String,
}

impl TwitterClientV1 {
    pub fn new(credentials: &Credentials, options: ClientOptions) -> Self {
        Self {
            token: credentials.token(),
            options,
            lookup_url: LOOKUP_URL.to_string(),
        }
    }

    fn params(&self, ids: &[TweetId]) -> ParamList {
        let params = ParamList::new().add_param("id", join_ids(ids));
        if self.options.extended {
            params.add_param("tweet_mode", "extended")
        } else {
            params
        }
    }

    async fn send(&self, ids: &[TweetId]) -> Result<Vec<Value>, EggError> {
        let params = self.params(ids);
        let request = egg_mode::raw::request_get(&self.lookup_url, &self.token, Some(&params));
        let response = egg_mode::raw::response_json::<Vec<Value>>(request).await?;
        log::debug!(
            "statuses/lookup rate limit: {} remaining",
            response.rate_limit_status.remaining
        );
        Ok(response.response)
    }
}

#[async_trait]
impl TweetLookup for TwitterClientV1 {
    async fn lookup(&self, ids: &[TweetId]) -> Result<Vec<RemoteTweet>, LookupError> {
        let result = match self.options.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.send(ids))
                .await
                .map_err(|_| {
                    LookupError::Timeout(format!("no response after {}s", limit.as_secs_f32()))
                })?,
            None => self.send(ids).await,
        };
        let objects = result.map_err(classify)?;
        objects
            .into_iter()
            .map(|raw| {
                RemoteTweet::from_value(raw, ID_FIELD).ok_or_else(|| {
                    LookupError::Fatal(anyhow!("Tweet object is missing `{}`", ID_FIELD))
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "Twitter API v1.1"
    }
}

fn classify(e: EggError) -> LookupError {
    let timed_out = match &e {
        EggError::NetError(net) => net.is_timeout(),
        EggError::IOError(io) => is_timeout_io(io),
        _ => false,
    };
    if timed_out {
        LookupError::Timeout(e.to_string())
    } else {
        LookupError::Fatal(anyhow::Error::new(e).context("Unable to look up tweets"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::stalling_server;
    use std::time::Duration;

    fn credentials() -> Credentials {
        Credentials {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            access_token: "at".into(),
            access_token_secret: "as".into(),
        }
    }

    #[test]
    fn io_timeouts_are_recoverable() {
        let e = EggError::IOError(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "operation timed out",
        ));
        assert!(matches!(classify(e), LookupError::Timeout(_)));
    }

    #[test]
    fn other_errors_are_fatal() {
        let e = EggError::IOError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(classify(e), LookupError::Fatal(_)));
        assert!(matches!(classify(EggError::BadUrl), LookupError::Fatal(_)));
    }

    #[test]
    fn credentials_become_an_access_token() {
        let client = TwitterClientV1::new(&credentials(), ClientOptions::default());
        assert!(matches!(client.token, Token::Access { .. }));
    }

    #[tokio::test]
    async fn stalled_lookup_times_out() {
        let options = ClientOptions {
            request_timeout: Some(Duration::from_millis(300)),
            extended: false,
        };
        let mut client = TwitterClientV1::new(&credentials(), options);
        client.lookup_url = stalling_server(b"").await;
        let result = client.lookup(&[TweetId::new("1")]).await;
        assert!(matches!(result, Err(LookupError::Timeout(_))));
    }
}
