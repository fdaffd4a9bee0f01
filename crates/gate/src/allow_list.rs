//! Allow-list of identities permitted through the gate

/// Configured identity identifiers. Empty means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    identities: Vec<String>,
}

impl AllowList {
    pub fn new(identities: Vec<String>) -> Self {
        Self { identities }
    }

    /// Whether an identity lookup is needed at all.
    pub fn is_restricted(&self) -> bool {
        !self.identities.is_empty()
    }

    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    pub fn is_allowed(&self, identity: &str) -> bool {
        is_allowed(identity, &self.identities)
    }
}

impl From<Vec<String>> for AllowList {
    fn from(identities: Vec<String>) -> Self {
        Self::new(identities)
    }
}

/// Exact-match membership. An empty list allows everyone.
pub fn is_allowed(identity: &str, allow_list: &[String]) -> bool {
    allow_list.is_empty() || allow_list.iter().any(|allowed| allowed == identity)
}
