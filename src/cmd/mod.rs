use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::{
    pkg::{
        client::{ApiClient, ClientError, submitter::Submitter},
        internal::{
            bids::group_bids,
            workflow::{JobDraft, JobStep, Staged, Wizard, encode, job_draft::Attachment},
        },
        server::listen,
    },
    prelude::{AppError, Result},
};

mod migrate;

#[derive(Parser)]
#[command(about = "freelance marketplace service and client")]
struct Cmd {
    #[command(subcommand)]
    command: Option<SubCommandType>,
}

#[derive(Subcommand)]
enum SubCommandType {
    Listen,
    Migrate,
    /// Walks a draft through every posting step and the submission checks
    Validate { draft: PathBuf },
    /// Encodes a draft and posts it to API_BASE_URL
    Submit {
        draft: PathBuf,
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    /// Prints the grouped bids of a job
    Bids { job_id: String },
}

pub async fn run() -> Result<()> {
    let args = Cmd::parse();
    match args.command {
        Some(SubCommandType::Listen) => {
            listen().await?;
        }
        Some(SubCommandType::Migrate) => {
            migrate::apply().await?;
        }
        Some(SubCommandType::Validate { draft }) => {
            validate(&read_draft(&draft).await?)?;
        }
        Some(SubCommandType::Submit { draft, attachments }) => {
            let mut draft = read_draft(&draft).await?;
            for path in &attachments {
                draft.attachments.push(read_attachment(path).await?);
            }
            let submitter = Submitter::new(ApiClient::from_settings());
            let job = submitter
                .submit(&draft, Utc::now().date_naive())
                .await
                .map_err(client_failure)?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Some(SubCommandType::Bids { job_id }) => {
            let client = ApiClient::from_settings();
            let job = client.get_job(&job_id).await.map_err(client_failure)?;
            let bids = client.job_bids(&job_id).await.map_err(client_failure)?;
            println!("{}", serde_json::to_string_pretty(&group_bids(&job, bids))?);
        }
        None => {
            tracing::error!("no subcommand passed");
        }
    }
    Ok(())
}

async fn read_draft(path: &Path) -> Result<JobDraft> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

async fn read_attachment(path: &Path) -> Result<Attachment> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment")
        .to_string();
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    Ok(Attachment {
        name,
        size: bytes.len() as u64,
        mime_type,
        url: None,
        content: Some(bytes),
    })
}

fn validate(draft: &JobDraft) -> Result<()> {
    let mut wizard = Wizard::new(draft.clone());
    loop {
        let step = wizard.step();
        let check = draft.validate_step(step);
        match &check.error {
            None => println!("{:<22} ok", format!("{:?}", step)),
            Some(error) => println!("{:<22} {}", format!("{:?}", step), error),
        }
        if wizard.is_last() || !wizard.next().is_valid {
            break;
        }
    }
    if let Some((step, check)) = draft.first_invalid() {
        return Err(AppError::field(
            &format!("{:?}", step),
            check.error.unwrap_or_default(),
        ));
    }
    draft.validate_for_submission(Utc::now().date_naive())?;
    let payload = encode(draft)?;
    for (key, value) in &payload.fields {
        println!("{} = {}", key, value);
    }
    for file in &payload.files {
        println!("{} = <{} bytes, {}>", file.key, file.bytes.len(), file.content_type);
    }
    println!("{} steps passed", JobStep::ALL.len());
    Ok(())
}

fn client_failure(err: ClientError) -> AppError {
    match err {
        ClientError::Invalid(fields) => AppError::Validation(fields),
        ClientError::StepBlocked { step, message } => AppError::field(&step, message),
        other => {
            tracing::error!("request failed: {:?}", &other);
            AppError::bad_request(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_attachment_guesses_type() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cases = [
            ("brief.pdf", "application/pdf"),
            ("logo.svg", "image/svg+xml"),
            ("assets.zip", "application/zip"),
            ("notes.unknownext", "application/octet-stream"),
        ];
        for (name, expected) in cases {
            let path = dir.path().join(name);
            tokio::fs::write(&path, b"abc").await?;
            let attachment = read_attachment(&path).await?;
            assert_eq!(attachment.name, name);
            assert_eq!(attachment.mime_type, expected);
            assert_eq!(attachment.size, 3);
            assert_eq!(attachment.content.as_deref(), Some(&b"abc"[..]));
            assert!(attachment.url.is_none());
        }
        Ok(())
    }
}
