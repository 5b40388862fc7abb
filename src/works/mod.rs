use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::{client::ServerClient, config::ClientConfig};

mod delete;
mod list;
mod upload;

pub use delete::delete_work;
pub use list::{format_work, list_works};
pub use upload::{MAX_FILE_SIZE, upload_work};

#[derive(Subcommand)]
pub enum WorksAction {
    /// List works, newest first
    List {
        /// Only show works in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Server URL (e.g. http://localhost:3000)
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Upload a file as a new work
    Upload {
        /// File to upload
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Title shown on the site
        #[arg(short, long, default_value = "")]
        title: String,

        /// Category, also the upload sub-directory (defaults to misc on the server)
        #[arg(short, long, default_value = "")]
        category: String,

        /// Description shown on the site
        #[arg(short, long, default_value = "")]
        description: String,

        /// Server URL (e.g. http://localhost:3000)
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Delete a work and its file
    Delete {
        /// Work id
        #[arg(value_name = "ID")]
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Server URL (e.g. http://localhost:3000)
        #[arg(short, long)]
        server: Option<String>,
    },
}

/// Fields of the upload form besides the file.
#[derive(Debug, Clone, Default)]
pub struct WorkFields {
    pub title: String,
    pub category: String,
    pub description: String,
}

pub fn run(action: WorksAction, config: Option<&ClientConfig>) -> Result<()> {
    let resolve = |server: Option<String>| {
        let config = config.cloned().unwrap_or_default().merge_cli(server);
        ServerClient::new(&config)
    };

    match action {
        WorksAction::List { category, server } => {
            let client = resolve(server)?;
            let works = list_works(&client, category.as_deref())?;
            if works.is_empty() {
                println!("No works found.");
            }
            for work in &works {
                println!("{}", format_work(work));
            }
            Ok(())
        }
        WorksAction::Upload {
            path,
            title,
            category,
            description,
            server,
        } => {
            let client = resolve(server)?;
            let fields = WorkFields {
                title,
                category,
                description,
            };
            let work = upload_work(&client, &path, &fields)?;
            println!("{}", work.id);
            println!("{}", client.url(&work.file_path));
            Ok(())
        }
        WorksAction::Delete { id, yes, server } => {
            let client = resolve(server)?;
            delete_work(&client, &id, yes)
        }
    }
}
