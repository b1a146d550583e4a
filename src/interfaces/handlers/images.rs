use actix_multipart::form::MultipartForm;
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use tracing::instrument;
use validator::Validate;

use crate::{
    entities::image::{
        DownloadQuery, GetImageQuery, ImageUploadForm, ImageUploadRequest, ListImagesQuery,
        PermanentDeleteQuery, ScopedListQuery, DEFAULT_DOWNLOAD_TTL_SECS, DEFAULT_PAGE_LIMIT,
    },
    errors::AppError,
    use_cases::extractors::OwnerIdentity,
    AppState,
};

/// Splits the comma-separated `tags` form field, dropping empty entries the
/// same way a trailing comma produces them.
fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|value| !value.is_empty())
}

#[post("/images")]
#[instrument(skip(state, form))]
pub async fn upload_image(
    state: web::Data<AppState>,
    form: MultipartForm<ImageUploadForm>,
) -> Result<impl Responder, AppError> {
    let form = form.into_inner();

    let file_name = form
        .file
        .file_name
        .clone()
        .unwrap_or_else(|| "unknown.jpg".to_string());

    let request = ImageUploadRequest {
        title: non_empty(form.title.map(|t| t.into_inner())),
        description: non_empty(form.description.map(|t| t.into_inner())),
        tags: form.tags.map(|t| split_tags(&t.into_inner())),
        owner_id: form.owner_id.into_inner(),
    };

    let receipt = state
        .upload_handler
        .upload(form.file.data.to_vec(), &file_name, request)
        .await?;

    Ok(HttpResponse::Ok().json(receipt))
}

#[get("/images")]
#[instrument(skip(state, query))]
pub async fn list_images(
    state: web::Data<AppState>,
    query: web::Query<ListImagesQuery>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    query.validate()?;

    let response = state
        .query_handler
        .list_images(
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            query.page_token.as_deref(),
            query.owner_id.as_deref(),
            query.tag.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

#[get("/images/{id}/download")]
#[instrument(skip(state, query))]
pub async fn download_image(
    state: web::Data<AppState>,
    id: web::Path<String>,
    query: web::Query<DownloadQuery>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    query.validate()?;

    let link = state
        .query_handler
        .download_link(&id, query.expires_in.unwrap_or(DEFAULT_DOWNLOAD_TTL_SECS))
        .await?;

    Ok(HttpResponse::Ok().json(link))
}

#[get("/images/{id}")]
#[instrument(skip(state, query))]
pub async fn get_image(
    state: web::Data<AppState>,
    id: web::Path<String>,
    query: web::Query<GetImageQuery>,
) -> Result<impl Responder, AppError> {
    let include_url = query.include_url.unwrap_or(true);
    let response = state.query_handler.get_image(&id, include_url).await?;

    Ok(HttpResponse::Ok().json(response))
}

#[delete("/images/{id}/permanent")]
#[instrument(skip(state, owner, query))]
pub async fn permanent_delete_image(
    state: web::Data<AppState>,
    id: web::Path<String>,
    owner: OwnerIdentity,
    query: web::Query<PermanentDeleteQuery>,
) -> Result<impl Responder, AppError> {
    let receipt = state
        .lifecycle_handler
        .permanent_delete(&id, &owner.0, query.confirm.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(receipt))
}

#[delete("/images/{id}")]
#[instrument(skip(state, owner))]
pub async fn delete_image(
    state: web::Data<AppState>,
    id: web::Path<String>,
    owner: OwnerIdentity,
) -> Result<impl Responder, AppError> {
    let receipt = state.lifecycle_handler.soft_delete(&id, &owner.0).await?;

    Ok(HttpResponse::Ok().json(receipt))
}

#[get("/users/{owner_id}/images")]
#[instrument(skip(state, query))]
pub async fn list_user_images(
    state: web::Data<AppState>,
    owner_id: web::Path<String>,
    query: web::Query<ScopedListQuery>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    query.validate()?;

    let response = state
        .query_handler
        .list_images(
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            query.page_token.as_deref(),
            Some(&owner_id),
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

#[get("/tags/{tag}/images")]
#[instrument(skip(state, query))]
pub async fn list_tag_images(
    state: web::Data<AppState>,
    tag: web::Path<String>,
    query: web::Query<ScopedListQuery>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    query.validate()?;

    let response = state
        .query_handler
        .list_images(
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            query.page_token.as_deref(),
            None,
            Some(&tag),
        )
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_trims_and_drops_empties() {
        assert_eq!(split_tags("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(split_tags("solo"), vec!["solo"]);
        assert_eq!(split_tags("a,,b,"), vec!["a", "b"]);
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ").is_empty());
    }

    #[test]
    fn non_empty_maps_blank_form_fields_to_none() {
        assert_eq!(non_empty(Some("title".to_string())), Some("title".to_string()));
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(None), None);
    }
}
