use anyhow::{Context, Result, anyhow, bail};
use dialoguer::Confirm;
use log::info;

use crate::client::{ServerClient, check_response};

pub fn delete_work(client: &ServerClient, id: &str, yes: bool) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        bail!("Work id cannot be empty");
    }
    confirm(&format!("Delete work {} and its file?", id), yes)?;

    let response = client
        .http()
        .delete(client.url(&work_path(id)))
        .send()
        .context("Failed to send delete request")?;
    check_response(response, "Delete")?;

    info!("Work deleted: {}", id);
    Ok(())
}

fn work_path(id: &str) -> String {
    format!("/api/works/{}", urlencoding::encode(id))
}

fn confirm(prompt: &str, yes: bool) -> Result<()> {
    if yes {
        return Ok(());
    }
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| anyhow!("prompt failed: {e}"))?;
    if confirmed {
        Ok(())
    } else {
        bail!("aborted by user")
    }
}
