//! Static connection policy.
//!
//! Ports are matched by exact policy name (`node.name:port.name` on PipeWire).
//! Both lists are fixed at startup and read without locking afterwards.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Monitored ports and the destinations they may be linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    monitored: Vec<String>,
    approved: Vec<String>,
}

impl AllowList {
    /// Build the policy. The approved list may be shorter, longer or empty
    /// relative to the monitored set; the monitored set may not be empty.
    pub fn new<M, A>(monitored: M, approved: A) -> Result<Self>
    where
        M: IntoIterator,
        M::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let monitored: Vec<String> = monitored.into_iter().map(Into::into).collect();
        let approved: Vec<String> = approved.into_iter().map(Into::into).collect();

        if monitored.is_empty() {
            return Err(Error::Config("no monitored ports configured".into()));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = monitored.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(Error::Config(format!("monitored port listed twice: {dup}")));
        }

        Ok(Self {
            monitored,
            approved,
        })
    }

    pub fn monitored(&self) -> &[String] {
        &self.monitored
    }

    pub fn approved(&self) -> &[String] {
        &self.approved
    }

    pub fn is_monitored(&self, name: &str) -> bool {
        self.monitored.iter().any(|m| m == name)
    }

    pub fn is_approved(&self, name: &str) -> bool {
        self.approved.iter().any(|a| a == name)
    }
}
