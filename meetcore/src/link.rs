//! Shareable call-invite links: `{origin}/call/{session_id}?targetUserId={id}`.
//!
//! The `targetUserId` parameter is the explicit counterpart context; a link
//! without it still works because the session id can be decoded.

use crate::session_id::{SessionId, UserId};
use std::fmt;
use thiserror::Error;

const CALL_SEGMENT: &str = "/call/";
const TARGET_PARAM: &str = "targetUserId";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("link has no /call/{{id}} segment: {0}")]
    MissingSessionSegment(String),
    #[error("invalid link: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallLink {
    pub origin: String,
    pub session_id: SessionId,
    pub target: Option<UserId>,
}

impl CallLink {
    pub fn new(origin: impl Into<String>, session_id: SessionId, target: Option<UserId>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        Self {
            origin,
            session_id,
            target,
        }
    }

    /// Route path of the call page, without origin.
    pub fn path(&self) -> String {
        let mut path = format!(
            "{CALL_SEGMENT}{}",
            urlencoding::encode(self.session_id.as_str())
        );
        if let Some(target) = &self.target {
            path.push_str(&format!(
                "?{TARGET_PARAM}={}",
                urlencoding::encode(target.as_str())
            ));
        }
        path
    }

    /// Accepts a full URL or a bare route path.
    pub fn parse(url: &str) -> Result<Self, LinkError> {
        let without_fragment = url.split('#').next().unwrap_or_default();
        let (location, query) = match without_fragment.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (without_fragment, None),
        };

        let start = location
            .find(CALL_SEGMENT)
            .ok_or_else(|| LinkError::MissingSessionSegment(url.to_string()))?;
        let origin = &location[..start];
        let raw_segment = location[start + CALL_SEGMENT.len()..]
            .split('/')
            .next()
            .unwrap_or_default();
        if raw_segment.is_empty() {
            return Err(LinkError::MissingSessionSegment(url.to_string()));
        }
        let segment = decode_component(raw_segment, url)?;
        let session_id =
            SessionId::parse(segment).map_err(|e| LinkError::InvalidUrl(e.to_string()))?;

        let mut target = None;
        for pair in query.unwrap_or_default().split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if key == TARGET_PARAM && !value.is_empty() {
                let value = decode_component(value, url)?;
                target = UserId::new(value).ok();
            }
        }

        Ok(Self {
            origin: origin.to_string(),
            session_id,
            target,
        })
    }
}

fn decode_component(raw: &str, url: &str) -> Result<String, LinkError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| LinkError::InvalidUrl(url.to_string()))
}

impl fmt::Display for CallLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin, self.path())
    }
}
