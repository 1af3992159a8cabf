//! Spaces and their configuration: fields, saved filters, members,
//! templates and settings.
//!
//! Any change to a space's configuration invalidates every cached key
//! under `spaces`, since fields and filters shape note listings too.

use serde_json::json;

use spacenote_core::{
    CreateSpaceRequest, Filter, Result, Space, SpaceField, UpdateSpaceRequest,
};

use crate::client::{seg, SpaceNoteClient};

fn space_path(slug: &str) -> String {
    format!("spaces/{}", seg(slug))
}

fn spaces_key() -> [String; 1] {
    ["spaces".to_string()]
}

impl SpaceNoteClient {
    pub async fn list_spaces(&self) -> Result<Vec<Space>> {
        self.query("list_spaces", "spaces", Vec::new()).await
    }

    pub async fn get_space(&self, slug: &str) -> Result<Space> {
        self.query("get_space", &space_path(slug), Vec::new()).await
    }

    pub async fn create_space(&self, request: &CreateSpaceRequest) -> Result<Space> {
        self.mutate_json(
            "create_space",
            self.post("spaces").json(request),
            &spaces_key(),
        )
        .await
    }

    pub async fn update_space(&self, slug: &str, request: &UpdateSpaceRequest) -> Result<Space> {
        self.mutate_json(
            "update_space",
            self.patch(&space_path(slug)).json(request),
            &spaces_key(),
        )
        .await
    }

    pub async fn delete_space(&self, slug: &str) -> Result<()> {
        self.mutate_unit("delete_space", self.delete(&space_path(slug)), &spaces_key())
            .await
    }

    pub async fn add_field(&self, slug: &str, field: &SpaceField) -> Result<Space> {
        self.mutate_json(
            "add_field",
            self.post(&format!("{}/fields", space_path(slug))).json(field),
            &spaces_key(),
        )
        .await
    }

    pub async fn remove_field(&self, slug: &str, name: &str) -> Result<Space> {
        self.mutate_json(
            "remove_field",
            self.delete(&format!("{}/fields/{}", space_path(slug), seg(name))),
            &spaces_key(),
        )
        .await
    }

    pub async fn create_filter(&self, slug: &str, filter: &Filter) -> Result<Space> {
        self.mutate_json(
            "create_filter",
            self.post(&format!("{}/filters", space_path(slug))).json(filter),
            &spaces_key(),
        )
        .await
    }

    /// Replace the filter called `name`; `filter.name` may rename it.
    pub async fn update_filter(&self, slug: &str, name: &str, filter: &Filter) -> Result<Space> {
        self.mutate_json(
            "update_filter",
            self.put(&format!("{}/filters/{}", space_path(slug), seg(name)))
                .json(filter),
            &spaces_key(),
        )
        .await
    }

    pub async fn delete_filter(&self, slug: &str, name: &str) -> Result<Space> {
        self.mutate_json(
            "delete_filter",
            self.delete(&format!("{}/filters/{}", space_path(slug), seg(name))),
            &spaces_key(),
        )
        .await
    }

    pub async fn add_member(&self, slug: &str, username: &str) -> Result<Space> {
        self.mutate_json(
            "add_member",
            self.post(&format!("{}/members", space_path(slug)))
                .json(&json!({ "username": username })),
            &spaces_key(),
        )
        .await
    }

    pub async fn remove_member(&self, slug: &str, username: &str) -> Result<Space> {
        self.mutate_json(
            "remove_member",
            self.delete(&format!("{}/members/{}", space_path(slug), seg(username))),
            &spaces_key(),
        )
        .await
    }

    /// Set a display template such as `note:detail`. Empty content removes it.
    pub async fn set_template(&self, slug: &str, name: &str, content: &str) -> Result<Space> {
        self.mutate_json(
            "set_template",
            self.put(&format!("{}/templates/{}", space_path(slug), seg(name)))
                .json(&json!({ "content": content })),
            &spaces_key(),
        )
        .await
    }

    pub async fn set_hidden_fields_on_create(
        &self,
        slug: &str,
        fields: Vec<String>,
    ) -> Result<Space> {
        let request = UpdateSpaceRequest {
            hidden_fields_on_create: Some(fields),
            ..UpdateSpaceRequest::default()
        };
        self.update_space(slug, &request).await
    }
}
