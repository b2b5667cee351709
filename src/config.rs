use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Environment-driven settings. The folder id is not a secret, just a
/// reference; access control lives in the OAuth tokens.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub wedding_folder_id: String,
    pub service_account_key_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: env::var("REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:3000/api/callback".to_string()),
            wedding_folder_id: env::var("WEDDING_FOLDER_ID").unwrap_or_default(),
            service_account_key_path: env::var("GOOGLE_SERVICE_ACCOUNT_KEY")
                .ok()
                .map(PathBuf::from),
        };

        if config.wedding_folder_id.is_empty() {
            warn!("WEDDING_FOLDER_ID is not set; uploads have no destination folder");
        }
        if config.service_account_key_path.is_none() {
            warn!("GOOGLE_SERVICE_ACCOUNT_KEY is not set; the gallery will be unavailable");
        }

        config
    }

    pub fn can_sign_in(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_redirect_uri_falls_back_to_the_local_callback() {
        env::remove_var("REDIRECT_URI");
        let config = AppConfig::from_env();
        assert_eq!(config.redirect_uri, "http://localhost:3000/api/callback");
    }

    #[test]
    fn sign_in_needs_both_client_id_and_secret() {
        let mut config = AppConfig::default();
        assert!(!config.can_sign_in());
        config.client_id = "id".to_string();
        assert!(!config.can_sign_in());
        config.client_secret = "secret".to_string();
        assert!(config.can_sign_in());
    }
}
