use spacenote_core::{CreateUserRequest, Result, User};

use crate::client::{seg, SpaceNoteClient};

impl SpaceNoteClient {
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.query("list_users", "users", Vec::new()).await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User> {
        self.mutate_json(
            "create_user",
            self.post("users").json(request),
            &["users".to_string()],
        )
        .await
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        self.mutate_unit(
            "delete_user",
            self.delete(&format!("users/{}", seg(username))),
            &["users".to_string()],
        )
        .await
    }
}
