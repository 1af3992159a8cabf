use tracing::info;

use spacenote_core::{LoginRequest, Profile, Result, Space};

use crate::client::SpaceNoteClient;

impl SpaceNoteClient {
    /// Start a session. The session cookie is kept by the client.
    pub async fn login(&self, username: &str, password: &str) -> Result<Profile> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.mutate_unit("login", self.post("auth/login").json(&body), &[])
            .await?;
        // Anything cached belonged to the previous session.
        self.cache().clear();
        info!(
            subsystem = "client",
            component = "auth",
            username,
            "Logged in"
        );
        self.profile().await
    }

    pub async fn logout(&self) -> Result<()> {
        self.mutate_unit("logout", self.post("auth/logout"), &[])
            .await?;
        self.cache().clear();
        info!(subsystem = "client", component = "auth", "Logged out");
        Ok(())
    }

    /// Current user. Fails with `Unauthorized` without a session.
    pub async fn profile(&self) -> Result<Profile> {
        self.query("profile", "profile", Vec::new()).await
    }

    /// Profile and visible spaces, fetched concurrently.
    pub async fn bootstrap(&self) -> Result<(Profile, Vec<Space>)> {
        futures::try_join!(self.profile(), self.list_spaces())
    }
}
