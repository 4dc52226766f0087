//! CLI for the profile endpoints.
//!
//! Signs in, opens the profile through `HttpGateway` and drives the same
//! save and password flows the dashboard uses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fleetdash_api::HttpGateway;
use fleetdash_core::field::BaseUrlResolver;
use fleetdash_core::profile::{Credentials, AVATAR, FIRST_NAME, LAST_NAME, PHONE};
use fleetdash_core::{FieldValue, FileRef, FormConfig, PendingFile, SubmitScope};
use fleetdash_runtime::{open_profile, PasswordForm, Reconciler, SaveOutcome, SessionContext};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the profile tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Account email
    #[arg(long)]
    email: String,

    /// Account password
    #[arg(long)]
    password: String,

    /// Response timeout in milliseconds
    #[arg(long, default_value_t = 10000)]
    response_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored profile
    Show,
    /// Edit profile fields and save them
    Edit {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long, conflicts_with = "clear_phone")]
        phone: Option<String>,
        /// Remove the phone number
        #[arg(long)]
        clear_phone: bool,
        /// Image file to upload as the new avatar
        #[arg(long)]
        avatar: Option<PathBuf>,
        /// Send every editable field instead of only the changed ones
        #[arg(long)]
        full_payload: bool,
    },
    /// Change the account password
    ChangePassword {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let mut config = FormConfig {
        response_timeout_ms: args.response_timeout_ms,
        ..Default::default()
    };
    if let Command::Edit {
        full_payload: true, ..
    } = &args.command
    {
        config.submit_scope = SubmitScope::FullFieldSet;
    }

    let gateway = HttpGateway::new(&args.url, Arc::new(SessionContext::new()), &config)?;
    gateway
        .sign_in(&Credentials {
            email: args.email.clone(),
            password: args.password.clone(),
        })
        .await
        .context("Sign-in failed")?;
    tracing::info!("Signed in to {}", args.url);

    match args.command {
        Command::Show => {
            let editor = open_profile(&gateway, config).await?;
            print_record(&editor, &args.url)?;
        }
        Command::Edit {
            first_name,
            last_name,
            phone,
            clear_phone,
            avatar,
            ..
        } => {
            let mut editor = open_profile(&gateway, config).await?;
            if let Some(value) = first_name {
                editor.edit(FIRST_NAME, FieldValue::Text(value))?;
            }
            if let Some(value) = last_name {
                editor.edit(LAST_NAME, FieldValue::Text(value))?;
            }
            if clear_phone {
                editor.edit(PHONE, FieldValue::OptionalText(None))?;
            } else if let Some(value) = phone {
                editor.edit(PHONE, FieldValue::OptionalText(Some(value)))?;
            }
            if let Some(path) = avatar {
                let file = pending_file(&path)?;
                editor.edit(AVATAR, FieldValue::File(Some(FileRef::Pending(file))))?;
            }

            let changed: Vec<&str> = editor.changes().iter().collect();
            println!("Changed fields: {:?}", changed);

            match editor.save(&gateway).await {
                SaveOutcome::Saved => {
                    println!("Saved.");
                    print_record(&editor, &args.url)?;
                }
                SaveOutcome::NothingToSave => println!("Nothing to save."),
                SaveOutcome::AlreadySaving => println!("A save is already in progress."),
                SaveOutcome::Failed(failure) => {
                    bail!("Save failed ({:?}): {}", failure.kind, failure.message)
                }
            }
        }
        Command::ChangePassword { old, new, confirm } => {
            let mut form = PasswordForm::new(config);
            form.set_old_password(old);
            form.set_new_password(new);
            form.set_confirmation(confirm);
            match form.submit(&gateway).await {
                SaveOutcome::Saved => println!("Password changed."),
                SaveOutcome::Failed(failure) => {
                    bail!("Password change failed ({:?}): {}", failure.kind, failure.message)
                }
                other => println!("{:?}", other),
            }
        }
    }

    Ok(())
}

fn print_record(editor: &Reconciler, base_url: &str) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&editor.current().to_json())?;
    println!("{}", json);
    let resolver = BaseUrlResolver::new(format!("{}/files", base_url.trim_end_matches('/')));
    if let Some(url) = editor.current().file_url(AVATAR, &resolver) {
        println!("Avatar URL: {}", url);
    }
    Ok(())
}

/// Describes a local file as a pending upload.
fn pending_file(path: &Path) -> anyhow::Result<PendingFile> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Cannot read avatar file {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("Avatar path has no file name")?
        .to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let content_type = match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    Ok(PendingFile {
        file_name,
        content_type: content_type.to_string(),
        size: metadata.len(),
    })
}
