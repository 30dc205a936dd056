use serde::{Deserialize, Serialize};

/// Whether a method only reads state or goes through consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Query,
    Update,
}

impl MethodKind {
    /// Replica endpoint segment for this kind of call.
    pub fn endpoint(&self) -> &'static str {
        match self {
            MethodKind::Query => "query",
            MethodKind::Update => "call",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub kind: MethodKind,
}

/// The callable surface of a canister.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn query(mut self, method: impl Into<String>) -> Self {
        self.methods.push(MethodDescriptor {
            name: method.into(),
            kind: MethodKind::Query,
        });
        self
    }

    pub fn update(mut self, method: impl Into<String>) -> Self {
        self.methods.push(MethodDescriptor {
            name: method.into(),
            kind: MethodKind::Update,
        });
        self
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Interface of the NFT canister this client mints through.
    pub fn nft_canister() -> Self {
        Self::new("nft_canister")
            .update("mint")
            .query("tokens_of")
            .query("token_metadata")
    }
}
