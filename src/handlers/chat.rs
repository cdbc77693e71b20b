use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
    #[validate(length(max = 50, message = "History too long"))]
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatTurn {
    pub sender: ChatSender,
    pub text: String,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Assistant,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub source: String, // "gemini" or "fallback"
}

const FALLBACK_REPLY: &str =
    "Sorry, there was an issue with processing your request. Please try again later.";

pub async fn chat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if let Err(e) = body.validate() {
        return Err(AppError::Validation(e.to_string()));
    }

    let prompt = build_prompt(&body);

    // Degrade to a canned apology when the upstream model is unreachable —
    // the chat UI treats that reply like any other turn
    let response = match call_gemini(&state, &prompt).await {
        Ok(reply) => ChatResponse {
            reply,
            source: "gemini".into(),
        },
        Err(e) => {
            tracing::warn!(user_id = %auth_user.id, error = %e, "Gemini API unavailable, using fallback reply");
            ChatResponse {
                reply: FALLBACK_REPLY.into(),
                source: "fallback".into(),
            }
        }
    };

    Ok(Json(response))
}

/// Fixed system prompt constraining the assistant to short, safe, OTC-only
/// recommendations, followed by the prior turns and the new user input.
fn build_prompt(body: &ChatRequest) -> String {
    let formatted_history: Vec<String> = body
        .history
        .iter()
        .map(|turn| {
            let who = match turn.sender {
                ChatSender::User => "User",
                ChatSender::Assistant => "FharmaBot",
            };
            format!("{}: {}", who, turn.text)
        })
        .collect();

    format!(
        r#"You are a medical AI assistant named FharmaBot, trained to help rural and urban users by providing accurate, safe, and general over-the-counter medicine recommendations based on symptoms provided.

Rules:
- Recommend only 1-2 widely available OTC (over-the-counter) medicines.
- Mention home/natural remedies if appropriate.
- Do NOT suggest controlled substances or prescriptions.
- Keep responses short, safe, and easy to understand.
- Warn users to consult a doctor for chronic/serious conditions.
- Ask follow-up questions if symptoms are vague.

Conversation History:
{}

New User Input: {}

Your Response (FharmaBot):"#,
        formatted_history.join("\n"),
        body.message
    )
}

async fn call_gemini(state: &AppState, prompt: &str) -> Result<String, anyhow::Error> {
    if state.config.gemini_api_key.is_empty() {
        anyhow::bail!("Gemini API key not configured");
    }

    // 30-second timeout to prevent indefinite hangs
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
        state.config.gemini_model
    );

    let response = client
        .post(&url)
        .header("x-goog-api-key", &state.config.gemini_api_key)
        .header("content-type", "application/json")
        .json(&serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Gemini API error {}: {}", status, body);
    }

    let gemini_response: serde_json::Value = response.json().await?;
    let text = gemini_response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Gemini response missing candidate text"))?;

    Ok(text.trim().to_string())
}
