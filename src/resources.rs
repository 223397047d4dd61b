//! Log drain recipients.
//!
//! Every drain shares one lifecycle; only the recipient payload differs by
//! kind. The payload is a tagged union dispatched on `kind` when decoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discriminant of a drain recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    Http,
    SyslogTcp,
    SyslogUdp,
    Datadog,
    NewRelic,
    Elasticsearch,
}

impl RecipientKind {
    /// Every recipient kind, in display order.
    pub const ALL: [Self; 6] = [
        Self::Http,
        Self::SyslogTcp,
        Self::SyslogUdp,
        Self::Datadog,
        Self::NewRelic,
        Self::Elasticsearch,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::SyslogTcp => "syslog_tcp",
            Self::SyslogUdp => "syslog_udp",
            Self::Datadog => "datadog",
            Self::NewRelic => "new_relic",
            Self::Elasticsearch => "elasticsearch",
        }
    }
}

impl fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipientKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown drain recipient kind '{s}'"))
    }
}

/// Where a log drain sends its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrainRecipient {
    Http {
        url: String,
    },
    SyslogTcp {
        host: String,
        port: u16,
    },
    SyslogUdp {
        host: String,
        port: u16,
    },
    Datadog {
        /// Intake URL, including the API key query parameter.
        url: String,
    },
    NewRelic {
        url: String,
    },
    Elasticsearch {
        url: String,
        #[serde(default)]
        index: Option<String>,
        #[serde(default)]
        username: Option<String>,
    },
}

impl DrainRecipient {
    /// Get the recipient kind.
    pub const fn kind(&self) -> RecipientKind {
        match self {
            Self::Http { .. } => RecipientKind::Http,
            Self::SyslogTcp { .. } => RecipientKind::SyslogTcp,
            Self::SyslogUdp { .. } => RecipientKind::SyslogUdp,
            Self::Datadog { .. } => RecipientKind::Datadog,
            Self::NewRelic { .. } => RecipientKind::NewRelic,
            Self::Elasticsearch { .. } => RecipientKind::Elasticsearch,
        }
    }

    /// Where lines end up, for display.
    pub fn target(&self) -> String {
        match self {
            Self::SyslogTcp { host, port } => format!("tcp://{host}:{port}"),
            Self::SyslogUdp { host, port } => format!("udp://{host}:{port}"),
            Self::Elasticsearch {
                url,
                index: Some(index),
                ..
            } => format!("{url}/{index}"),
            Self::Http { url }
            | Self::Datadog { url }
            | Self::NewRelic { url }
            | Self::Elasticsearch { url, .. } => url.clone(),
        }
    }

    /// Check the payload is usable.
    ///
    /// # Errors
    ///
    /// Returns a message naming the bad field.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::SyslogTcp { host, port } | Self::SyslogUdp { host, port } => {
                if host.trim().is_empty() {
                    Err(format!("{}: host must not be empty", self.kind()))
                } else if *port == 0 {
                    Err(format!("{}: port must not be 0", self.kind()))
                } else {
                    Ok(())
                }
            }
            Self::Http { url }
            | Self::Datadog { url }
            | Self::NewRelic { url }
            | Self::Elasticsearch { url, .. } => {
                if url.starts_with("https://") || url.starts_with("http://") {
                    Ok(())
                } else {
                    Err(format!("{}: url must be http(s), got '{url}'", self.kind()))
                }
            }
        }
    }
}
