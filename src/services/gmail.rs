use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::backend::AppState;
use crate::database::db::{gmail as gmail_db, queries};
use crate::database::models::{GmailConnection, SyncStatus};
use crate::services::{sanitize_filename, vision};

/*
Inbox ingestion over the Gmail REST API. A scan walks every message with an
attachment since the cutoff date, pulls down anything that looks like a
receipt, runs it through vision analysis and files a receipt row per
attachment. The scan is fire-and-forget: the trigger handler has already
answered 202, so the connection's sync_status and the rows it writes are the
only outputs. One failing attachment never stops the rest.
 */

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub emails_scanned: u32,
    pub receipts_found: u32,
    pub receipts_processed: u32,
    pub receipts_failed: u32,
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("gmail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gmail API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("access token expired and no refresh token is stored")]
    NoRefreshToken,
    #[error("attachment has neither inline data nor an attachment id")]
    MissingAttachmentBody,
    #[error("attachment decode failed: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("could not store attachment: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("analysis failed: {0}")]
    Analysis(String),
}

/*==========Gmail API payloads=========== */

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    payload: MessagePart,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePart {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    body: PartBody,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
struct PartBody {
    #[serde(rename = "attachmentId")]
    attachment_id: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentBody {
    data: String,
}

#[derive(Debug)]
struct Attachment {
    filename: String,
    mime_type: String,
    attachment_id: Option<String>,
    inline_data: Option<String>,
}

/*==========Scan driver=========== */

/// Background entry point. Flips the connection to syncing, runs the scan and
/// records the outcome; nothing propagates past this function.
pub async fn run_scan(
    state: AppState,
    connection: GmailConnection,
    project_id: i64,
    since: NaiveDate,
) {
    let connection_id = connection.connection_id;
    if let Err(err) =
        gmail_db::update_sync_status(&state.db, connection_id, SyncStatus::Syncing, None).await
    {
        tracing::error!(connection_id, %err, "could not mark connection as syncing");
        return;
    }

    match scan(&state, &connection, project_id, since).await {
        Ok(report) => {
            tracing::info!(
                connection_id,
                emails = report.emails_scanned,
                found = report.receipts_found,
                processed = report.receipts_processed,
                failed = report.receipts_failed,
                "gmail scan finished"
            );
            let summary = if report.errors.is_empty() {
                None
            } else {
                Some(report.errors.join("; "))
            };
            if let Err(err) = gmail_db::update_sync_status(
                &state.db,
                connection_id,
                SyncStatus::Success,
                summary.as_deref(),
            )
            .await
            {
                tracing::error!(connection_id, %err, "could not record scan result");
            }
        }
        Err(err) => {
            tracing::warn!(connection_id, %err, "gmail scan failed");
            if let Err(db_err) = gmail_db::update_sync_status(
                &state.db,
                connection_id,
                SyncStatus::Error,
                Some(&err.to_string()),
            )
            .await
            {
                tracing::error!(connection_id, %db_err, "could not record scan failure");
            }
        }
    }
}

fn search_query(since: NaiveDate) -> String {
    format!("has:attachment after:{}", since.format("%Y/%m/%d"))
}

async fn scan(
    state: &AppState,
    connection: &GmailConnection,
    project_id: i64,
    since: NaiveDate,
) -> Result<ScanReport, ScanError> {
    let mut token = connection.access_token.clone();
    let mut report = ScanReport::default();
    let query = search_query(since);
    let mut page_token: Option<String> = None;

    loop {
        let mut params = vec![("q", query.clone())];
        if let Some(page) = &page_token {
            params.push(("pageToken", page.clone()));
        }

        let list: MessageList = get_json(
            state,
            connection,
            &mut token,
            &format!("{GMAIL_API}/messages"),
            &params,
        )
        .await?;

        for message_ref in &list.messages {
            report.emails_scanned += 1;

            let message: Message = match get_json(
                state,
                connection,
                &mut token,
                &format!("{GMAIL_API}/messages/{}", message_ref.id),
                &[("format", "full".to_string())],
            )
            .await
            {
                Ok(message) => message,
                Err(err) => {
                    report.errors.push(format!("message {}: {err}", message_ref.id));
                    continue;
                }
            };

            let mut attachments = Vec::new();
            collect_attachments(&message.payload, &mut attachments);

            for attachment in attachments {
                report.receipts_found += 1;

                // Re-scans of overlapping windows must not duplicate rows.
                if queries::gmail_receipt_exists(&state.db, &message.id, &attachment.filename)
                    .await?
                {
                    continue;
                }

                match ingest_attachment(
                    state,
                    connection,
                    &mut token,
                    project_id,
                    &message.id,
                    &attachment,
                )
                .await
                {
                    Ok(()) => report.receipts_processed += 1,
                    Err(err) => {
                        report.receipts_failed += 1;
                        report.errors.push(format!("{}: {err}", attachment.filename));
                    }
                }
            }
        }

        page_token = list.next_page_token;
        if page_token.is_none() {
            break;
        }
    }

    Ok(report)
}

fn is_receipt_mime(mime: &str) -> bool {
    mime.starts_with("image/") || mime == "application/pdf"
}

fn collect_attachments(part: &MessagePart, out: &mut Vec<Attachment>) {
    if !part.filename.is_empty() && is_receipt_mime(&part.mime_type) {
        out.push(Attachment {
            filename: part.filename.clone(),
            mime_type: part.mime_type.clone(),
            attachment_id: part.body.attachment_id.clone(),
            inline_data: part.body.data.clone(),
        });
    }
    for child in &part.parts {
        collect_attachments(child, out);
    }
}

/// Download, store, file and analyze one attachment. The receipt row is
/// created before analysis so a vision failure still leaves an error row
/// behind for the user to retry from.
async fn ingest_attachment(
    state: &AppState,
    connection: &GmailConnection,
    token: &mut String,
    project_id: i64,
    message_id: &str,
    attachment: &Attachment,
) -> Result<(), ScanError> {
    let encoded = match (&attachment.inline_data, &attachment.attachment_id) {
        // Small attachments arrive inline with the message.
        (Some(data), _) => data.clone(),
        (None, Some(attachment_id)) => {
            let body: AttachmentBody = get_json(
                state,
                connection,
                token,
                &format!("{GMAIL_API}/messages/{message_id}/attachments/{attachment_id}"),
                &[],
            )
            .await?;
            body.data
        }
        (None, None) => return Err(ScanError::MissingAttachmentBody),
    };
    let bytes = decode_attachment(&encoded)?;

    let stored_name = format!("{message_id}_{}", sanitize_filename(&attachment.filename));
    let path = state.config.upload_dir.join(&stored_name);
    tokio::fs::write(&path, &bytes).await?;

    let receipt = queries::insert_receipt(
        &state.db,
        project_id,
        "gmail",
        path.to_string_lossy().as_ref(),
        Some(&attachment.filename),
        Some(message_id),
    )
    .await?;

    let mime = if attachment.mime_type.is_empty() {
        vision::mime_for(&attachment.filename)
    } else {
        &attachment.mime_type
    };

    vision::process_receipt(state, receipt.receipt_id, &bytes, mime)
        .await
        .map_err(|err| ScanError::Analysis(err.to_string()))
}

// Gmail hands out URL-safe base64, padded or not depending on the endpoint.
fn decode_attachment(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
}

/*==========Authenticated requests=========== */

/// GET with the current access token, refreshing it once on a 401 and
/// retrying. The refreshed token is written back to the connection row so the
/// rest of the scan (and the next one) uses it.
async fn get_json<T: DeserializeOwned>(
    state: &AppState,
    connection: &GmailConnection,
    token: &mut String,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, ScanError> {
    let mut refreshed = false;
    loop {
        let response = state
            .http
            .get(url)
            .query(query)
            .bearer_auth(&*token)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED && !refreshed {
            refreshed = true;
            *token = refresh_access_token(state, connection).await?;
            continue;
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Api { status, body });
        }

        return Ok(response.json().await?);
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

async fn refresh_access_token(
    state: &AppState,
    connection: &GmailConnection,
) -> Result<String, ScanError> {
    let refresh_token = connection
        .refresh_token
        .as_deref()
        .ok_or(ScanError::NoRefreshToken)?;
    let oauth = &state.config.gmail_oauth;

    let params = [
        ("client_id", oauth.client_id.as_str()),
        ("client_secret", oauth.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let response = state
        .http
        .post(TOKEN_URL)
        .form(&params)
        .timeout(Duration::from_secs(30))
        .send()
        .await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ScanError::Api { status, body });
    }

    let token: TokenResponse = response.json().await?;
    gmail_db::update_access_token(&state.db, connection.connection_id, &token.access_token).await?;
    tracing::info!(connection_id = connection.connection_id, "gmail access token refreshed");

    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_uses_gmail_date_format() {
        let since = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(search_query(since), "has:attachment after:2024/03/05");
    }

    fn part(mime: &str, filename: &str, children: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: mime.to_string(),
            filename: filename.to_string(),
            body: PartBody {
                attachment_id: Some("att-1".to_string()),
                data: None,
            },
            parts: children,
        }
    }

    #[test]
    fn attachments_are_collected_from_nested_parts() {
        let payload = part(
            "multipart/mixed",
            "",
            vec![
                part("text/plain", "", vec![]),
                part(
                    "multipart/alternative",
                    "",
                    vec![part("image/jpeg", "receipt.jpg", vec![])],
                ),
                part("application/pdf", "invoice.pdf", vec![]),
            ],
        );

        let mut found = Vec::new();
        collect_attachments(&payload, &mut found);

        let names: Vec<&str> = found.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, ["receipt.jpg", "invoice.pdf"]);
    }

    #[test]
    fn non_receipt_attachments_are_skipped() {
        let payload = part(
            "multipart/mixed",
            "",
            vec![part("application/zip", "archive.zip", vec![])],
        );

        let mut found = Vec::new();
        collect_attachments(&payload, &mut found);
        assert!(found.is_empty());
    }

    #[test]
    fn attachment_decode_accepts_padded_and_unpadded_data() {
        let padded = URL_SAFE.encode(b"receipt bytes");
        let unpadded = URL_SAFE_NO_PAD.encode(b"receipt bytes");

        assert_eq!(decode_attachment(&padded).unwrap(), b"receipt bytes");
        assert_eq!(decode_attachment(&unpadded).unwrap(), b"receipt bytes");
    }
}
