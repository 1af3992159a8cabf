//! Subcommand implementations. Each prints its result to stdout.

use anyhow::{bail, Context, Result};
use chrono::{Local, Offset};
use std::path::Path;
use tracing::info;

use spacenote_client::{NotesQuery, SpaceNoteClient, Upload};
use spacenote_core::query::{build_query_string, parse_query};
use spacenote_core::widgets::{display_value, input_widget};
use spacenote_core::{
    CommentForm, DisplayContext, Note, NoteForm, NoteView, ResolveContext, Space, SpaceField,
};

use crate::io::{file_name, guess_mime, read_bytes, read_text, write_output};

/// Template used by the `template` note view.
const NOTE_DETAIL_TEMPLATE: &str = "note:detail";

pub async fn login(client: &SpaceNoteClient, username: &str, password: &str) -> Result<()> {
    let profile = client.login(username, password).await?;
    let role = if profile.is_admin { "admin" } else { "user" };
    println!("Logged in as {} ({})", profile.username, role);
    Ok(())
}

pub async fn spaces(client: &SpaceNoteClient) -> Result<()> {
    let (profile, spaces) = client.bootstrap().await?;
    for space in spaces {
        let marker = if space.is_member(&profile.username) { "*" } else { " " };
        println!("{} {:<24} {}", marker, space.slug, space.title);
    }
    Ok(())
}

pub async fn fields(client: &SpaceNoteClient, slug: &str) -> Result<()> {
    let space = client.get_space(slug).await?;
    for field in &space.fields {
        let widget = input_widget(field, &space.members);
        println!(
            "{:<20} {:<10} {}{}",
            field.name,
            field.field_type(),
            serde_json::to_string(&widget)?,
            if field.required { " (required)" } else { "" }
        );
    }
    for filter in &space.filters {
        let q = filter_query(&space, &filter.name)?.unwrap_or_default();
        println!("filter {:<13} {}", filter.name, q);
    }
    Ok(())
}

fn display_context(client: &SpaceNoteClient, note: &Note) -> DisplayContext {
    DisplayContext {
        base_url: client.config().origin().to_string(),
        space_slug: note.space_slug.clone(),
        note_number: note.number,
        offset: Local::now().offset().fix(),
    }
}

/// Columns of a listing: the saved filter's defaults, else every field.
fn columns<'a>(space: &'a Space, filter: Option<&str>) -> Vec<&'a SpaceField> {
    let schema_columns = filter
        .and_then(|name| space.filter(name))
        .map(|f| f.default_columns.as_slice())
        .unwrap_or_default();
    if schema_columns.is_empty() {
        return space.fields.iter().collect();
    }
    schema_columns
        .iter()
        .filter_map(|name| space.fields.iter().find(|f| &f.name == name))
        .collect()
}

pub async fn notes(
    client: &SpaceNoteClient,
    slug: &str,
    query: NotesQuery,
) -> Result<()> {
    let (space, page) = futures::try_join!(client.get_space(slug), client.list_notes(slug, &query))?;
    let columns = columns(&space, query.filter.as_deref());

    for note in &page.items {
        let ctx = display_context(client, note);
        let cells: Vec<String> = columns
            .iter()
            .map(|field| display_value(field, note.field(&field.name), &ctx).to_string())
            .collect();
        println!("#{:<5} {}", note.number, cells.join(" | "));
    }
    let shown = page.offset + page.items.len() as u64;
    println!("-- {} of {} (page {})", shown, page.total, query.page);
    Ok(())
}

pub async fn show_note(
    client: &SpaceNoteClient,
    slug: &str,
    number: i64,
    view: NoteView,
) -> Result<()> {
    let (space, note) = futures::try_join!(client.get_space(slug), client.get_note(slug, number))?;
    match view {
        NoteView::Json => println!("{}", serde_json::to_string_pretty(&note)?),
        NoteView::Template => {
            let template = space
                .templates
                .get(NOTE_DETAIL_TEMPLATE)
                .with_context(|| format!("Space '{}' has no {} template", slug, NOTE_DETAIL_TEMPLATE))?;
            println!("{}", template);
        }
        NoteView::Default => {
            let ctx = display_context(client, &note);
            println!("#{} by {} at {}", note.number, note.author, note.created_at);
            for field in &space.fields {
                println!(
                    "{:<20} {}",
                    field.name,
                    display_value(field, note.field(&field.name), &ctx)
                );
            }
            for comment in client.list_comments(slug, number).await? {
                println!("  [{}] {}: {}", comment.number, comment.author, comment.content);
            }
        }
    }
    Ok(())
}

/// Upload each image to the pending area and bind it to its field.
async fn attach_images(
    client: &SpaceNoteClient,
    form: &mut NoteForm,
    images: &[(String, String)],
) -> Result<()> {
    for (field, path) in images {
        let path = Path::new(path);
        let upload = Upload::new(file_name(path), guess_mime(path), read_bytes(path)?);
        let pending = client.upload_pending(upload).await?;
        let filled = form.attach_image(field, &pending)?;
        info!(
            subsystem = "cli",
            op = "attach_image",
            field = %field,
            attachment = pending.number,
            filled = ?filled,
            "Image attached"
        );
    }
    Ok(())
}

fn apply_fields(form: &mut NoteForm, fields: &[(String, String)]) -> Result<()> {
    for (name, value) in fields {
        form.set_text(name, value)
            .with_context(|| format!("Invalid value for '{}'", name))?;
    }
    Ok(())
}

pub async fn create_note(
    client: &SpaceNoteClient,
    slug: &str,
    fields: &[(String, String)],
    images: &[(String, String)],
) -> Result<()> {
    let (profile, space) = futures::try_join!(client.profile(), client.get_space(slug))?;
    let mut form = NoteForm::create(&space, &ResolveContext::now_for(profile.username));
    attach_images(client, &mut form, images).await?;
    apply_fields(&mut form, fields)?;
    let note = client.submit_note_form(&form).await?;
    println!("Created note #{} in {}", note.number, slug);
    Ok(())
}

pub async fn edit_note(
    client: &SpaceNoteClient,
    slug: &str,
    number: i64,
    fields: &[(String, String)],
    images: &[(String, String)],
) -> Result<()> {
    let (profile, space, note) = futures::try_join!(
        client.profile(),
        client.get_space(slug),
        client.get_note(slug, number)
    )?;
    let mut form = NoteForm::edit(&space, &note, &ResolveContext::now_for(profile.username));
    attach_images(client, &mut form, images).await?;
    apply_fields(&mut form, fields)?;
    if !form.is_dirty() {
        println!("No changes");
        return Ok(());
    }
    let changed = form.dirty_fields();
    client.submit_note_form(&form).await?;
    println!("Updated note #{}: {}", number, changed.join(", "));
    Ok(())
}

pub async fn delete_note(client: &SpaceNoteClient, slug: &str, number: i64) -> Result<()> {
    client.delete_note(slug, number).await?;
    println!("Deleted note #{}", number);
    Ok(())
}

pub async fn comment(
    client: &SpaceNoteClient,
    slug: &str,
    note: i64,
    text: &str,
    reply_to: Option<i64>,
) -> Result<()> {
    let mut form = CommentForm::create(reply_to);
    form.set_content(text);
    match client.submit_comment_form(slug, note, &form).await? {
        Some(comment) => println!("Added comment {} to note #{}", comment.number, note),
        None => println!("No changes"),
    }
    Ok(())
}

pub async fn upload(
    client: &SpaceNoteClient,
    slug: &str,
    path: &Path,
    note: Option<i64>,
) -> Result<()> {
    let upload = Upload::new(file_name(path), guess_mime(path), read_bytes(path)?);
    let attachment = match note {
        Some(number) => client.upload_to_note(slug, number, upload).await?,
        None => client.upload_to_space(slug, upload).await?,
    };
    println!(
        "Uploaded {} as attachment {} ({} bytes)",
        attachment.filename, attachment.number, attachment.size
    );
    Ok(())
}

pub async fn export(
    client: &SpaceNoteClient,
    slug: &str,
    include_data: bool,
    out: Option<&Path>,
) -> Result<()> {
    let document = client.export_space(slug, include_data).await?;
    write_output(out, &serde_json::to_string_pretty(&document)?)?;
    if let Some(out) = out {
        println!("Exported {} to {}", slug, out.display());
    }
    Ok(())
}

pub async fn import(client: &SpaceNoteClient, path: &Path) -> Result<()> {
    let space = client.import_space(&read_text(path)?).await?;
    println!("Imported space {} ({})", space.slug, space.title);
    Ok(())
}

/// Print each condition of `q` and the normalized query string.
pub fn parse(q: &str) {
    let conditions = parse_query(q);
    for condition in &conditions {
        let marker = if condition.is_complete() { " " } else { "!" };
        println!("{} {}", marker, condition.badge());
    }
    match build_query_string(&conditions) {
        Some(normalized) => println!("q={}", normalized),
        None => println!("(no usable conditions)"),
    }
}

/// The `q` string equivalent to a saved filter.
fn filter_query(space: &Space, name: &str) -> Result<Option<String>> {
    let Some(filter) = space.filter(name) else {
        bail!("Space '{}' has no filter '{}'", space.slug, name);
    };
    Ok(build_query_string(&filter.query_conditions()))
}

pub async fn filter(client: &SpaceNoteClient, slug: &str, name: &str) -> Result<()> {
    let space = client.get_space(slug).await?;
    match filter_query(&space, name)? {
        Some(q) => println!("q={}", q),
        None => println!("(filter has no conditions)"),
    }
    Ok(())
}
