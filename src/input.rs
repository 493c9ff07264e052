use crate::model::{InputRecord, TweetId};
use egg_mode::{KeyPair, Token};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Credential file {} must contain four lines, found {found}", path.display())]
    MissingCredentials { path: PathBuf, found: usize },
    #[error("Invalid JSON on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Line {line} is not a JSON object")]
    NotAnObject { line: usize },
    #[error("Line {line} has no `{field}` field")]
    MissingId { line: usize, field: String },
    #[error("Line {line} has a `{field}` that is not a tweet id: {value}")]
    InvalidId {
        line: usize,
        field: String,
        value: Value,
    },
}

/// OAuth 1.0a secrets, in the order they appear in the credential file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Credentials {
    pub async fn load(path: &Path) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Read {
                path: path.to_owned(),
                source,
            })?;
        Self::parse(&text).ok_or_else(|| LoadError::MissingCredentials {
            path: path.to_owned(),
            found: text.lines().count(),
        })
    }

    /// Lines are taken by position: key, secret, token, token secret.
    fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines().map(|l| l.trim().to_string());
        Some(Self {
            consumer_key: lines.next()?,
            consumer_secret: lines.next()?,
            access_token: lines.next()?,
            access_token_secret: lines.next()?,
        })
    }

    pub fn consumer(&self) -> KeyPair {
        KeyPair::new(self.consumer_key.clone(), self.consumer_secret.clone())
    }

    pub fn token(&self) -> Token {
        Token::Access {
            consumer: self.consumer(),
            access: KeyPair::new(self.access_token.clone(), self.access_token_secret.clone()),
        }
    }
}

pub async fn load_records(path: &Path, id_field: &str) -> Result<Vec<InputRecord>, LoadError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Read {
            path: path.to_owned(),
            source,
        })?;
    parse_records(&text, id_field)
}

fn parse_records(text: &str, id_field: &str) -> Result<Vec<InputRecord>, LoadError> {
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|source| LoadError::Parse {
            line: line_no,
            source,
        })?;
        let fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(LoadError::NotAnObject { line: line_no }),
        };
        let raw_id = fields.get(id_field).ok_or_else(|| LoadError::MissingId {
            line: line_no,
            field: id_field.to_string(),
        })?;
        let id = TweetId::from_value(raw_id).ok_or_else(|| LoadError::InvalidId {
            line: line_no,
            field: id_field.to_string(),
            value: raw_id.clone(),
        })?;
        records.push(InputRecord { id, fields });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn credentials_are_positional_and_trimmed() {
        let creds = Credentials::parse("  key \nsecret\n\ttoken\ntoken-secret  \n").unwrap();
        assert_eq!(creds.consumer_key, "key");
        assert_eq!(creds.consumer_secret, "secret");
        assert_eq!(creds.access_token, "token");
        assert_eq!(creds.access_token_secret, "token-secret");

        match creds.token() {
            Token::Access { consumer, access } => {
                assert_eq!(consumer.key, Cow::from("key"));
                assert_eq!(consumer.secret, Cow::from("secret"));
                assert_eq!(access.key, Cow::from("token"));
                assert_eq!(access.secret, Cow::from("token-secret"));
            }
            Token::Bearer(_) => panic!("expected an access token"),
        }
    }

    #[test]
    fn swapping_credential_lines_changes_the_token() {
        let a = Credentials::parse("a\nb\nc\nd").unwrap();
        let b = Credentials::parse("b\na\nc\nd").unwrap();
        assert_ne!(a, b);
        match (a.token(), b.token()) {
            (Token::Access { consumer: ca, .. }, Token::Access { consumer: cb, .. }) => {
                assert_ne!(ca.key, cb.key);
            }
            _ => panic!("expected access tokens"),
        }
    }

    #[test]
    fn extra_credential_lines_are_ignored() {
        let creds = Credentials::parse("a\nb\nc\nd\ne\n").unwrap();
        assert_eq!(creds.access_token_secret, "d");
    }

    #[tokio::test]
    async fn short_credential_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.txt");
        std::fs::write(&path, "a\nb\nc\n").unwrap();
        let err = Credentials::load(&path).await.unwrap_err();
        assert!(matches!(err, LoadError::MissingCredentials { found: 3, .. }));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_records(&dir.path().join("nope.tids"), "tweet_id")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[test]
    fn records_keep_order_and_fields() {
        let text = "{\"tweet_id\":\"2\",\"label\":\"b\"}\n  {\"tweet_id\":1,\"label\":\"a\"}  \n";
        let records = parse_records(text, "tweet_id").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, TweetId::new("2"));
        assert_eq!(records[1].id, TweetId::new("1"));
        assert_eq!(records[1].fields["label"], "a");
        let keys: Vec<_> = records[0].fields.keys().cloned().collect();
        assert_eq!(keys, vec!["tweet_id", "label"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let records = parse_records("\n{\"tweet_id\":\"1\"}\n   \n", "tweet_id").unwrap();
        assert_eq!(records.len(), 1);
        assert!(parse_records("", "tweet_id").unwrap().is_empty());
    }

    #[test]
    fn malformed_line_fails_the_load() {
        let err = parse_records("{\"tweet_id\":\"1\"}\n{not json\n", "tweet_id").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }));
    }

    #[test]
    fn records_need_an_id() {
        let err = parse_records("[1, 2]", "tweet_id").unwrap_err();
        assert!(matches!(err, LoadError::NotAnObject { line: 1 }));

        let err = parse_records("{\"id\":\"1\"}", "tweet_id").unwrap_err();
        assert!(matches!(err, LoadError::MissingId { line: 1, .. }));

        let err = parse_records("{\"tweet_id\":true}", "tweet_id").unwrap_err();
        assert!(matches!(err, LoadError::InvalidId { line: 1, .. }));
    }

    #[test]
    fn id_field_is_configurable() {
        let records = parse_records("{\"sid\":\"9\"}", "sid").unwrap();
        assert_eq!(records[0].id, TweetId::new("9"));
    }
}
