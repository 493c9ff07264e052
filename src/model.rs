use serde_json::{Map, Value};
use std::fmt;

/// A tweet identifier in its decimal string form.
///
/// Input files carry ids either as JSON strings or as bare integers, while
/// the API always reports `id_str`/`id` as strings, so everything is joined
/// on the string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweetId(String);

impl TweetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self::new(s.as_str())),
            Value::Number(n) => n.as_u64().map(|n| Self::new(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TweetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line of the input file, kept verbatim so it can be written back out as
/// the label for the matching tweet.
#[derive(Clone, Debug, PartialEq)]
pub struct InputRecord {
    pub id: TweetId,
    pub fields: Map<String, Value>,
}

/// A tweet object as returned by the API, written through untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteTweet {
    pub id: TweetId,
    pub raw: Value,
}

impl RemoteTweet {
    /// Read the join key out of `raw`, returning `None` if it is absent.
    pub fn from_value(raw: Value, id_field: &str) -> Option<Self> {
        let id = raw.get(id_field).and_then(TweetId::from_value)?;
        Some(Self { id, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tweet_id_accepts_strings_and_integers() {
        assert_eq!(
            TweetId::from_value(&json!("470363741880463362")),
            Some(TweetId::new("470363741880463362"))
        );
        assert_eq!(
            TweetId::from_value(&json!(470363741880463362u64)),
            Some(TweetId::new("470363741880463362"))
        );
    }

    #[test]
    fn tweet_id_rejects_other_types() {
        assert_eq!(TweetId::from_value(&json!(null)), None);
        assert_eq!(TweetId::from_value(&json!(-5)), None);
        assert_eq!(TweetId::from_value(&json!(1.5)), None);
        assert_eq!(TweetId::from_value(&json!("")), None);
        assert_eq!(TweetId::from_value(&json!(["1"])), None);
    }

    #[test]
    fn remote_tweet_reads_its_id_field() {
        let raw = json!({"id": 1, "id_str": "1", "text": "hi"});
        let tweet = RemoteTweet::from_value(raw.clone(), "id_str").unwrap();
        assert_eq!(tweet.id, TweetId::new("1"));
        assert_eq!(tweet.raw, raw);

        assert!(RemoteTweet::from_value(json!({"text": "hi"}), "id_str").is_none());
    }
}
