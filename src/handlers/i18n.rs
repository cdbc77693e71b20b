use axum::{extract::Path, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::i18n::{self, Language};

/// GET /api/i18n/:lang — the full translation dictionary for one locale.
pub async fn get_dictionary(Path(lang): Path<String>) -> AppResult<Json<Value>> {
    let language: Language = lang
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unknown language: {}", lang)))?;

    Ok(Json(json!({
        "language": language,
        "translations": i18n::dictionary(language),
    })))
}

/// GET /api/i18n/:lang/:key — a single translated string.
pub async fn get_translation(
    Path((lang, key)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let language: Language = lang
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unknown language: {}", lang)))?;
    let value = i18n::translate(language, &key)
        .ok_or_else(|| AppError::NotFound(format!("Unknown translation key: {}", key)))?;

    Ok(Json(json!({ "key": key, "value": value })))
}
