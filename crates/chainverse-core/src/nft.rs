//! Minting through the NFT canister.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentError, RemoteActor};

/// Largest file accepted for a single mint (2 MiB, the ingress message limit).
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintRequest {
    pub name: String,
    pub description: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MintReceipt {
    pub token_id: u64,
}

impl MintRequest {
    /// Read `path` and build a request for it.
    pub fn from_file(path: &Path, name: &str, description: &str) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let request = Self {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            content_type: content_type_for(path).to_string(),
            data,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Name is required");
        }
        if self.data.is_empty() {
            anyhow::bail!("File is empty");
        }
        if self.data.len() > MAX_UPLOAD_BYTES {
            anyhow::bail!(
                "File is {} bytes, the limit is {} bytes",
                self.data.len(),
                MAX_UPLOAD_BYTES
            );
        }
        Ok(())
    }
}

/// Guess a MIME type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Call `mint` on the actor and return the new token.
pub async fn mint(actor: &dyn RemoteActor, request: &MintRequest) -> Result<MintReceipt, AgentError> {
    let arg = serde_json::to_value(request)
        .map_err(|e| AgentError::InvalidResponse(format!("encoding mint request: {}", e)))?;
    let reply: Value = actor.call("mint", arg).await?;
    serde_json::from_value(reply)
        .map_err(|e| AgentError::InvalidResponse(format!("mint reply: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::agent::{CanisterActor, HttpAgent, ServiceDescriptor};
    use crate::config::DeploymentMode;
    use crate::testing::{identity_for, FakeTransport};

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/b/cat.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(content_type_for(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn test_from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("object.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let request = MintRequest::from_file(&path, "  Object #1 ", "first").unwrap();
        assert_eq!(request.name, "Object #1");
        assert_eq!(request.content_type, "image/gif");
        assert_eq!(request.data, b"GIF89a".to_vec());

        assert!(MintRequest::from_file(&path, " ", "").is_err());
        assert!(MintRequest::from_file(&dir.path().join("missing.png"), "x", "").is_err());
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let request = MintRequest {
            name: "big".to_string(),
            description: String::new(),
            content_type: "image/png".to_string(),
            data: vec![0; MAX_UPLOAD_BYTES + 1],
        };
        assert!(request.validate().is_err());
    }

    #[tokio::test]
    async fn test_mint_parses_receipt() {
        let transport = Arc::new(FakeTransport::replying(json!({"token_id": 42})));
        let agent = HttpAgent::new(
            transport.clone(),
            Arc::new(identity_for("abcd1234-xyz", 60)),
            DeploymentMode::Production,
        );
        let actor = CanisterActor::new(agent, "ryjl3-tyaaa-aaaaa-aaaba-cai", ServiceDescriptor::nft_canister());

        let request = MintRequest {
            name: "Object".to_string(),
            description: "desc".to_string(),
            content_type: "image/png".to_string(),
            data: vec![1, 2, 3],
        };
        let receipt = mint(&actor, &request).await.unwrap();
        assert_eq!(receipt, MintReceipt { token_id: 42 });

        let submitted = transport.submitted();
        assert_eq!(submitted[0].0.arg["name"], "Object");
        assert_eq!(submitted[0].0.arg["data"], json!([1, 2, 3]));
    }
}
