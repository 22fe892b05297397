//! Method/action routing table
//!
//! Every action travels with exactly one transport method. The actuator checks
//! inbound pairs against [`ROUTING_TABLE`] before dispatching, and the proxy
//! picks the method for outbound commands from the same table.

use crate::Action;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    pub fn for_action(action: Action) -> Method {
        ROUTING_TABLE
            .iter()
            .find(|(_, routed)| *routed == action)
            .map(|(method, _)| *method)
            .unwrap_or(Method::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed (method, action) pairs; anything absent is unsupported
pub const ROUTING_TABLE: [(Method, Action); 5] = [
    (Method::Post, Action::Create),
    (Method::Post, Action::Start),
    (Method::Post, Action::Stop),
    (Method::Post, Action::Delete),
    (Method::Get, Action::Query),
];

pub fn route_allows(method: Method, action: Action) -> bool {
    ROUTING_TABLE.contains(&(method, action))
}
