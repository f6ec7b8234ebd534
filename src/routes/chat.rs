use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiResponse, AppError};
use crate::helper::chat_helpers;
use crate::models::{Actor, ChatMessage};
use crate::AppState;

#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/chat", web::post().to(chat));
}

async fn chat(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, AppError> {
    let client = state.chat_client.as_ref().ok_or(AppError::ChatUnavailable)?;
    chat_helpers::validate_messages(&body.messages)?;
    log::debug!("User {} sent a {}-message conversation to the assistant.", actor.id, body.messages.len());
    let reply = client.complete(&body.messages).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "reply": reply }))))
}
