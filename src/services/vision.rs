use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::backend::AppState;
use crate::database::db::queries;

/*
Receipt extraction through an OpenAI-compatible vision endpoint. The image
goes up as a base64 data URL, the model is told to answer with nothing but a
JSON object, and the reply is parsed into ReceiptAnalysis. Callers persist
failures onto the receipt row; nothing here reaches the uploader directly.
 */

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("vision request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vision API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("vision API returned no choices")]
    EmptyReply,
    #[error("could not parse analysis reply: {0}")]
    BadReply(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiptAnalysis {
    pub vendor: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineItem {
    pub description: String,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

impl ReceiptAnalysis {
    /// Models answer with a handful of date shapes; anything unparseable is
    /// dropped rather than guessed at.
    pub fn receipt_date(&self) -> Option<NaiveDate> {
        let raw = self.date.as_deref()?.trim();
        for format in ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return Some(date);
            }
        }
        None
    }
}

const EXTRACT_PROMPT: &str = "You read photos of construction-related receipts and invoices. \
Reply with a single JSON object and nothing else, using this shape: \
{\"vendor\": string|null, \"date\": \"YYYY-MM-DD\"|null, \
\"line_items\": [{\"description\": string, \"quantity\": number|null, \
\"unit\": string|null, \"price\": number|null, \"total\": number|null}], \
\"subtotal\": number|null, \"tax\": number|null, \"total\": number|null}. \
Use null for anything you cannot read.";

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub async fn analyze(
    http: &reqwest::Client,
    config: &VisionConfig,
    image: &[u8],
    mime: &str,
) -> Result<ReceiptAnalysis, AnalysisError> {
    let url = format!("{}/chat/completions", config.api_url.trim_end_matches('/'));
    let data_url = format!("data:{};base64,{}", mime, STANDARD.encode(image));

    let body = serde_json::json!({
        "model": config.model,
        "temperature": 0,
        "messages": [
            { "role": "system", "content": EXTRACT_PROMPT },
            { "role": "user", "content": [
                { "type": "image_url", "image_url": { "url": data_url } }
            ]}
        ]
    });

    let mut request = http.post(&url).json(&body).timeout(Duration::from_secs(60));
    if !config.api_key.is_empty() {
        request = request.header("Authorization", format!("Bearer {}", config.api_key));
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(AnalysisError::Api { status, body });
    }

    let reply: ChatResponse = response.json().await?;
    let content = reply
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or(AnalysisError::EmptyReply)?;

    parse_reply(&content)
}

/// Parses the model's reply, tolerating a wrapping markdown code fence.
pub fn parse_reply(content: &str) -> Result<ReceiptAnalysis, AnalysisError> {
    let trimmed = strip_code_fence(content.trim());
    serde_json::from_str(trimmed).map_err(|err| AnalysisError::BadReply(err.to_string()))
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Drop the language tag line, then the closing fence.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.rsplit_once("```").map(|(body, _)| body).unwrap_or(rest).trim()
}

/// Best-effort MIME guess from the filename; the vision API wants one in the
/// data URL and Gmail does not always supply it.
pub fn mime_for(filename: &str) -> &'static str {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "image/jpeg",
    }
}

/// Analyze a stored receipt image and write the outcome onto the row. The
/// outcome is already persisted when this returns; the result only tells
/// callers that keep a tally (the inbox scan) how the analysis went.
pub async fn process_receipt(
    state: &AppState,
    receipt_id: i64,
    image: &[u8],
    mime: &str,
) -> Result<(), AnalysisError> {
    match analyze(&state.http, &state.config.vision, image, mime).await {
        Ok(analysis) => {
            let line_items = serde_json::to_value(&analysis.line_items)
                .unwrap_or_else(|_| serde_json::Value::Array(Vec::new()));
            let result = queries::mark_receipt_processed(
                &state.db,
                receipt_id,
                analysis.vendor.as_deref(),
                analysis.receipt_date(),
                analysis.subtotal,
                analysis.tax,
                analysis.total,
                &line_items,
            )
            .await;
            if let Err(err) = result {
                tracing::error!(receipt_id, %err, "failed to store receipt analysis");
            }
            Ok(())
        }
        Err(err) => {
            tracing::warn!(receipt_id, %err, "receipt analysis failed");
            if let Err(db_err) =
                queries::mark_receipt_error(&state.db, receipt_id, &err.to_string()).await
            {
                tracing::error!(receipt_id, %db_err, "failed to store receipt analysis error");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_a_plain_json_reply() {
        let reply = r#"{"vendor": "Home Depot", "date": "2024-03-15",
            "line_items": [{"description": "2x4 lumber", "quantity": 24, "unit": "ea",
                            "price": 4.25, "total": 102.00}],
            "subtotal": 102.00, "tax": 13.26, "total": 115.26}"#;

        let analysis = parse_reply(reply).unwrap();
        assert_eq!(analysis.vendor.as_deref(), Some("Home Depot"));
        assert_eq!(analysis.receipt_date(), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(analysis.line_items.len(), 1);
        assert_eq!(analysis.total, Some(Decimal::from_str("115.26").unwrap()));
    }

    #[test]
    fn parses_a_reply_wrapped_in_a_code_fence() {
        let reply = "```json\n{\"vendor\": \"ACME\", \"date\": null, \"line_items\": [],\n\"subtotal\": null, \"tax\": null, \"total\": 50}\n```";

        let analysis = parse_reply(reply).unwrap();
        assert_eq!(analysis.vendor.as_deref(), Some("ACME"));
        assert_eq!(analysis.total, Some(Decimal::from(50)));
    }

    #[test]
    fn missing_optional_fields_default_to_none() {
        let analysis = parse_reply(r#"{"vendor": null, "date": null}"#).unwrap();
        assert!(analysis.vendor.is_none());
        assert!(analysis.line_items.is_empty());
        assert!(analysis.total.is_none());
    }

    #[test]
    fn garbage_reply_is_an_error_not_a_panic() {
        assert!(parse_reply("I could not read this receipt, sorry!").is_err());
    }

    #[test]
    fn slash_dates_are_understood() {
        let analysis = parse_reply(r#"{"date": "03/15/2024"}"#).unwrap();
        assert_eq!(analysis.receipt_date(), NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn mime_is_guessed_from_the_extension() {
        assert_eq!(mime_for("receipt.PNG"), "image/png");
        assert_eq!(mime_for("scan.pdf"), "application/pdf");
        assert_eq!(mime_for("photo"), "image/jpeg");
    }
}
