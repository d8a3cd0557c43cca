//! Protocol messages for the polling request channel
//!
//! The transport delivers named operations with positional string
//! arguments and expects a string or a list of strings back - no
//! structured objects cross the wire.

use serde::{Deserialize, Serialize};

/// A named request delivered by the polling transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id assigned by the client, echoed back in the reply.
    pub id: String,
    pub name: String,
    pub args: Vec<String>,
}

/// A reply to a polled request: plain text or a list of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Text(String),
    List(Vec<String>),
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Text(s)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

impl From<Vec<String>> for Reply {
    fn from(items: Vec<String>) -> Self {
        Reply::List(items)
    }
}

impl From<i64> for Reply {
    fn from(n: i64) -> Self {
        Reply::Text(n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_convert_from_common_shapes() {
        assert_eq!(Reply::from("pong"), Reply::Text("pong".to_string()));
        assert_eq!(Reply::from(70i64), Reply::Text("70".to_string()));
        assert_eq!(
            Reply::from(vec!["a".to_string()]),
            Reply::List(vec!["a".to_string()])
        );
    }
}
