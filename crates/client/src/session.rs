use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use common::env::ensure_data_dir;
use common::types::Role;

use crate::errors::ClientError;
use crate::http::GateClient;

/// Saved login for the gate CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub base_url: String,
    pub email: String,
    pub role: Role,
    pub token: String,
}

impl Session {
    pub async fn load(path: &Path) -> Result<Self, ClientError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ClientError::NoSession),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), ClientError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_data_dir(parent).await.map_err(|e| ClientError::Io(std::io::Error::other(e.to_string())))?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?).await?;
        Ok(())
    }

    pub fn client(&self) -> Result<GateClient, ClientError> {
        Ok(GateClient::new(&self.base_url)?.with_token(self.token.clone()))
    }
}
