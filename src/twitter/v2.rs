//! Lookup through API v2 with an app-only bearer token.
//!
//! egg-mode only speaks v1.1, so this goes through reqwest directly and only
//! borrows egg-mode for the bearer token exchange.

use crate::input::Credentials;
use crate::model::{RemoteTweet, TweetId};
use crate::twitter::{join_ids, ClientOptions, LookupError, TweetLookup};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use egg_mode::Token;
use maplit::hashmap;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

const LOOKUP_URL: &str = "https://api.twitter.com/2/tweets";
const ID_FIELD: &str = "id";

#[derive(Clone)]
pub struct TwitterClientV2 {
    client: Client,
    lookup_url: String,
}

#[derive(Debug, Deserialize)]
struct GetTweetsResponse {
    // Absent when none of the requested tweets exist
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    errors: Vec<Value>,
}

impl TwitterClientV2 {
    pub async fn new(credentials: &Credentials, options: ClientOptions) -> anyhow::Result<Self> {
        let bearer = match egg_mode::auth::bearer_token(&credentials.consumer())
            .await
            .context("Unable to obtain bearer token")?
        {
            Token::Bearer(bearer) => bearer,
            Token::Access { .. } => bail!("Expected a bearer token"),
        };
        Self::with_bearer(&bearer, options)
    }

    fn with_bearer(bearer: &str, options: ClientOptions) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let value = format!("Bearer {}", bearer);
        let value = HeaderValue::from_str(&value)?;
        headers.insert(AUTHORIZATION, value);
        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            lookup_url: LOOKUP_URL.to_string(),
        })
    }
}

fn deserialize_response(status: StatusCode, text: String) -> anyhow::Result<GetTweetsResponse> {
    if !status.is_success() {
        let code = status.as_u16();
        bail!(format!("Response was not successful: {code}\n{text}"))
    }
    match serde_json::from_str::<GetTweetsResponse>(&text) {
        Ok(ok) => Ok(ok),
        Err(e) => match serde_json::from_str::<Value>(&text) {
            Ok(pretty) => {
                let pretty = serde_json::to_string_pretty(&pretty).unwrap_or(text);
                bail!(format!(
                    "Unable to deserialize due to: {e}\nContents:\n{pretty}"
                ))
            }
            Err(_) => bail!("Invalid JSON"),
        },
    }
}

fn classify(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout(e.to_string())
    } else {
        LookupError::Fatal(anyhow::Error::new(e).context("Unable to look up tweets"))
    }
}

#[async_trait]
impl TweetLookup for TwitterClientV2 {
    // https://developer.twitter.com/en/docs/twitter-api/tweets/lookup/api-reference/get-tweets
    async fn lookup(&self, ids: &[TweetId]) -> Result<Vec<RemoteTweet>, LookupError> {
        let url = Url::from_str(&self.lookup_url).context("Bad lookup url")?;
        let query = hashmap! {
            "ids" => join_ids(ids),
            "tweet.fields" => "author_id,created_at,lang,public_metrics".to_string(),
        };
        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        // The client timeout also covers reading the body
        let text = response.text().await.map_err(classify)?;
        let response = deserialize_response(status, text)?;
        if !response.errors.is_empty() {
            log::debug!("{} requested tweets were not returned", response.errors.len());
        }
        response
            .data
            .into_iter()
            .map(|raw| {
                RemoteTweet::from_value(raw, ID_FIELD).ok_or_else(|| {
                    LookupError::Fatal(anyhow!("Tweet object is missing `{}`", ID_FIELD))
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "Twitter API v2"
    }
}
