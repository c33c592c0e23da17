use crate::error::CatalogError;
use anyhow::Result;

pub const DEFAULT_TOKEN_VAR: &str = "EE_ACCESS_TOKEN";

/// Source of OAuth bearer tokens for catalog requests. Obtaining the token
/// (e.g. `gcloud auth print-access-token`) happens outside this crate.
pub trait CredentialProvider {
    async fn access_token(self: &Self) -> Result<String>;
}

pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

impl CredentialProvider for StaticToken {
    async fn access_token(self: &Self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every request, so a
/// refreshed token is picked up without restarting.
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: &str) -> Self {
        Self {
            var: var.to_string(),
        }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_VAR)
    }
}

impl CredentialProvider for EnvToken {
    async fn access_token(self: &Self) -> Result<String> {
        let token = std::env::var(&self.var)
            .map_err(|e| CatalogError::Credentials(format!("{}: {}", self.var, e)))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(CatalogError::Credentials(format!("{} is empty", self.var)).into());
        }
        Ok(token.to_string())
    }
}
