use crate::dtos::UploadResponse;
use crate::middleware::SessionKey;
use crate::models::{parse_flashcards, Flashcard, MediaReference, Part, Turn};
use crate::services::StagedMedia;
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use service_core::error::AppError;

/// Multipart field carrying the media file.
const FILE_FIELD: &str = "file";

/// Prompt sent alongside the uploaded media.
pub const ANALYSIS_PROMPT: &str = "Analyze this media. Extract 4 deep scholarly concepts as \
'Flashcards'. Return ONLY a JSON array of objects: [{\"title\": \"...\", \"description\": \"...\"}]";

/// Canned model turn that closes the seed history.
pub const ACKNOWLEDGEMENT: &str = "I have assimilated the media. We may begin our inquiry.";

struct UploadedFile {
    filename: String,
    mime_type: String,
    data: Bytes,
}

pub async fn upload_media(
    State(state): State<AppState>,
    session: SessionKey,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_file_field(&mut multipart).await?;

    tracing::info!(
        session = %session.as_str(),
        filename = %upload.filename,
        mime_type = %upload.mime_type,
        size = upload.data.len(),
        "Media upload started"
    );

    let staged = state.media_store.store(&upload.data, &upload.filename).await?;
    let outcome = extract_flashcards(&state, &staged, &upload).await;
    let released = staged.release().await;

    let (media, flashcards) = outcome?;
    released?;

    let history = vec![
        Turn::user(vec![
            Part::text(format!("Context: {}", upload.filename)),
            Part::media(media),
        ]),
        Turn::model_text(ACKNOWLEDGEMENT),
    ];

    let key = session.as_str();
    match state.sessions.conversation_lock(key) {
        Some(lock) => {
            let _guard = lock.lock().await;
            state.sessions.reset(key, history, flashcards.clone());
        }
        None => state.sessions.reset(key, history, flashcards.clone()),
    }

    tracing::info!(
        session = %key,
        flashcard_count = flashcards.len(),
        "Media upload completed"
    );

    Ok(Json(UploadResponse { flashcards }))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        let data = field.bytes().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
        })?;

        return Ok(UploadedFile {
            filename,
            mime_type,
            data,
        });
    }

    Err(AppError::BadRequest(anyhow::anyhow!("No file uploaded")))
}

async fn extract_flashcards(
    state: &AppState,
    staged: &StagedMedia,
    upload: &UploadedFile,
) -> Result<(MediaReference, Vec<Flashcard>), AppError> {
    let media = state
        .gateway
        .upload_media(staged.path(), &upload.mime_type, &upload.filename)
        .await
        .map_err(|e| {
            tracing::error!(filename = %upload.filename, error = %e, "Media upload to provider failed");
            e
        })?;

    let raw = state
        .gateway
        .converse(&[Part::text(ANALYSIS_PROMPT), Part::media(media.clone())], &[])
        .await?;

    Ok((media, parse_flashcards(&raw)))
}
