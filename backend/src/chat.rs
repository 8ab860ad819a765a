use axum::extract::{rejection::JsonRejection, Json, State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::ApiError;
use crate::routes::AppState;
use crate::services::{json_body, present};

pub const SYSTEM_PROMPT: &str = "Eres FinAIcer, una IA de asistencia financiera. Siempre responde \
presentándote como FinAIcer cuando te pregunten quién eres o tu identidad. Tus respuestas deben ser \
concisas, amigables y serviciales. Usa formato Markdown (negritas, listas, tablas, etc.) y agrega al \
menos un emoji relevante en cada respuesta para hacerla más visual y comprensible.";

pub const NO_RESPONSE: &str = "No hay respuesta.";

/// Stateless client for Gemini `generateContent`.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub respuesta: String,
    pub detalle: JsonValue, // raw provider payload
}

impl ChatClient {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        let endpoint = format!(
            "{}/v1/models/{}:generateContent?key={}",
            base_url.trim_end_matches('/'),
            model,
            api_key
        );
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    pub async fn ask(&self, message: &str) -> Result<ChatReply, reqwest::Error> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(message) }] }]
        });
        let data: JsonValue = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        Ok(ChatReply::from_provider(data))
    }
}

pub fn build_prompt(message: &str) -> String {
    format!("{SYSTEM_PROMPT}\nUsuario: {message}")
}

impl ChatReply {
    pub fn from_provider(data: JsonValue) -> Self {
        match first_candidate_text(&data) {
            Some(text) => Self {
                respuesta: text.to_string(),
                detalle: data,
            },
            None => {
                tracing::warn!(payload = %data, "provider returned no candidate text");
                Self {
                    respuesta: NO_RESPONSE.to_string(),
                    detalle: data,
                }
            }
        }
    }
}

fn first_candidate_text(data: &JsonValue) -> Option<&str> {
    data.pointer("/candidates/0/content/parts/0/text")?
        .as_str()
        .filter(|t| !t.is_empty())
}

#[derive(Deserialize)]
pub struct ChatReq {
    pub mensaje: Option<String>,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatReq>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let req = json_body(payload)?;
    let mensaje = present(req.mensaje).ok_or_else(|| ApiError::validation("Mensaje requerido"))?;
    let reply = state
        .chat
        .ask(&mensaje)
        .await
        .map_err(|e| ApiError::Infrastructure(format!("Error comunicando con Gemini: {e}")))?;
    Ok(Json(reply))
}
