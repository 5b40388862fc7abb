use anyhow::{Context, Result};

use crate::client::{ServerClient, Work, check_response};

pub fn list_works(client: &ServerClient, category: Option<&str>) -> Result<Vec<Work>> {
    let mut request = client.http().get(client.url("/api/works"));
    if let Some(category) = category.filter(|c| !c.is_empty()) {
        request = request.query(&[("category", category)]);
    }

    let response = request.send().context("Failed to send list request")?;
    let response = check_response(response, "List works")?;
    response.json().context("Failed to parse works list")
}

/// One line per work: id, date, category, title, file path.
pub fn format_work(work: &Work) -> String {
    let date = work
        .created_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let category = if work.category.is_empty() {
        "misc"
    } else {
        work.category.as_str()
    };
    let title = if work.title.is_empty() {
        work.original_name.as_str()
    } else {
        work.title.as_str()
    };
    format!("{}  {}  [{}]  {}  {}", work.id, date, category, title, work.file_path)
}
