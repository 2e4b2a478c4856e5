//! Message translation

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use super::client::MispaClient;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translation: String,
}

/// Translate text to the target language.
pub async fn translate_data(
    client: &MispaClient,
    text: &str,
    target_language: &str,
) -> Result<String> {
    let body = json!({
        "text": text,
        "target_language": target_language,
    });

    let resp = client.post_json("/api/translate", &body).await?;
    let body: TranslateResponse = resp
        .json()
        .await
        .context("Failed to parse translate response")?;

    Ok(body.translation)
}

/// Translate text (prints to stdout).
pub async fn translate(text: &str, target_language: &str) -> Result<()> {
    let client = MispaClient::new()?;
    let translation = translate_data(&client, text, target_language).await?;
    println!("{}", translation);
    Ok(())
}

/// List languages the server can translate to (prints to stdout).
pub async fn list_languages() -> Result<()> {
    let client = MispaClient::new()?;
    let resp = client.get("/api/languages").await?;
    let langs: serde_json::Value = resp
        .json()
        .await
        .context("Failed to parse languages response")?;

    match langs {
        serde_json::Value::Object(map) => {
            for (code, name) in map {
                println!("{:>6}  {}", code, name.as_str().unwrap_or_default());
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                println!("{}", item.as_str().unwrap_or_default());
            }
        }
        other => println!("{}", other),
    }

    Ok(())
}
