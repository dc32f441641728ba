// Gazette - A content backend for online publications
// Copyright (C) 2025 Gazette Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.


use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use gazette_core::{Article, ArticleInput, Category, Pagination};
use gazette_db::{ArticleRepository, ArticleSearch, LikeOutcome};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::uploads::{discard_on_error, prepare_image, read_content_form, ContentForm};
use crate::article_cache::ListingQuery;
use crate::auth::{CurrentUser, RequireWriter};
use crate::error::{AppError, AppResult};
use crate::AppState;

const SINGLE_ARTICLE_CACHE_CONTROL: &str = "public, max-age=3600, stale-while-revalidate";

type RawQuery = Query<HashMap<String, String>>;

fn flag(query: &HashMap<String, String>, name: &str) -> bool {
    query.get(name).map(|v| v == "true").unwrap_or(false)
}

fn parse_category(raw: Option<&str>) -> AppResult<Option<Category>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<Category>().map(Some).map_err(AppError::bad_request),
    }
}

fn parse_categories(raw: &str) -> AppResult<Vec<Category>> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| c.parse::<Category>().map_err(AppError::bad_request))
        .collect()
}

fn parse_date(raw: Option<&str>, message: &str) -> AppResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|_| AppError::bad_request(message)),
    }
}

/// Format a timestamp as an HTTP-date
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn not_found_by_meta_title(meta_title: &str) -> AppError {
    AppError::not_found(format!("No article with meta title: {} found.", meta_title))
}

fn article_input(form: &ContentForm) -> ArticleInput {
    ArticleInput {
        title: form.text("title"),
        meta_title: form.text("metaTitle"),
        category: form.text("category").filter(|c| !c.trim().is_empty()),
        summary: form.text("summary"),
        article_body: form.text("articleBody"),
        position: form.text("position").filter(|p| !p.trim().is_empty()),
        image_url: None,
    }
}

/// GET /api/articles
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): RawQuery,
) -> AppResult<Json<Value>> {
    let listing = ListingQuery {
        category: parse_category(query.get("category").map(String::as_str))?,
        pagination: Pagination::from_raw(
            query.get("page").map(String::as_str),
            query.get("count").map(String::as_str),
        ),
        include_html: flag(&query, "includeHTML"),
        include_trending: flag(&query, "includeTrending"),
    };

    let page = state.articles.listing(&listing).await?;

    let mut body = json!({
        "success": true,
        "message": "Articles fetched successfully",
        "articles": page.articles,
    });
    if let Some(trending) = page.trending {
        body["trending"] = json!(trending);
    }

    Ok(Json(body))
}

/// POST /api/articles
pub async fn create_article(
    State(state): State<AppState>,
    RequireWriter(current): RequireWriter,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut form = read_content_form(multipart, state.config.upload.max_size).await?;
    let mut draft = article_input(&form)
        .into_draft()
        .map_err(AppError::bad_request)?;

    let mut stored_key = None;
    if let Some(image) = form.image.take() {
        let pending = prepare_image(&state, image, "articles", None)?;
        stored_key = Some(pending.key.clone());
        draft.image_url = Some(pending.store(&state).await?);
    }

    let created = async {
        let mut article =
            Article::new(current.user_id(), draft).map_err(AppError::bad_request)?;
        let id = ArticleRepository::new(state.db.clone())
            .create(&article)
            .await?;
        article.id = Some(id);
        Ok::<_, AppError>((id, article))
    }
    .await;
    let (id, article) = discard_on_error(&state, stored_key.as_deref(), created).await?;
    state.articles.invalidate();

    tracing::info!(
        article_id = id,
        meta_title = %article.meta_title,
        author = %current.user.username,
        "Article created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Article created successfully",
            "article": article,
        })),
    ))
}

/// GET /api/articles/{metaTitle}
pub async fn get_article(
    State(state): State<AppState>,
    Path(meta_title): Path<String>,
) -> AppResult<Response> {
    let article = ArticleRepository::new(state.db.clone())
        .find_by_meta_title(&meta_title)
        .await?
        .ok_or_else(|| AppError::not_found("Article not found"))?;

    let mut response = Json(json!({
        "success": true,
        "message": "Article fetched successfully",
        "article": article,
    }))
    .into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(SINGLE_ARTICLE_CACHE_CONTROL),
    );

    Ok(response)
}

/// PATCH /api/articles/{metaTitle}
pub async fn edit_article(
    State(state): State<AppState>,
    RequireWriter(current): RequireWriter,
    Path(meta_title): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let repo = ArticleRepository::new(state.db.clone());
    let mut article = repo
        .find_by_meta_title(&meta_title)
        .await?
        .ok_or_else(|| not_found_by_meta_title(&meta_title))?;

    let mut form = read_content_form(multipart, state.config.upload.max_size).await?;
    let mut draft = article_input(&form)
        .into_draft()
        .map_err(AppError::bad_request)?;

    // A reused key is only overwritten once the edit is saved. A fresh key is
    // written first and removed again if the save fails.
    let mut stored_key = None;
    let mut replacement = None;
    if let Some(image) = form.image.take() {
        let pending = prepare_image(&state, image, "articles", article.image_url.as_deref())?;
        if pending.reuses_existing {
            draft.image_url = Some(pending.url(&state));
            replacement = Some(pending);
        } else {
            stored_key = Some(pending.key.clone());
            draft.image_url = Some(pending.store(&state).await?);
        }
    }

    article.apply(draft);
    let updated = repo.update(&article).await.map_err(AppError::from);
    discard_on_error(&state, stored_key.as_deref(), updated).await?;
    if let Some(pending) = replacement {
        pending.store(&state).await?;
    }
    state.articles.invalidate();

    tracing::info!(
        meta_title = %article.meta_title,
        editor = %current.user.username,
        "Article updated"
    );

    let last_modified = http_date(article.last_updated);
    let mut response = Json(json!({
        "success": true,
        "message": "Article updated successfully",
        "article": article,
    }))
    .into_response();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        response.headers_mut().insert(header::LAST_MODIFIED, value);
    }

    Ok(response)
}

/// DELETE /api/articles/{metaTitle}
pub async fn delete_article(
    State(state): State<AppState>,
    RequireWriter(current): RequireWriter,
    Path(meta_title): Path<String>,
) -> AppResult<Json<Value>> {
    let article = ArticleRepository::new(state.db.clone())
        .delete_by_meta_title(&meta_title)
        .await?
        .ok_or_else(|| not_found_by_meta_title(&meta_title))?;
    state.articles.invalidate();

    if let Some(image_url) = article.image_url.as_deref() {
        match state.store.key_from_url(image_url) {
            Some(key) => {
                if let Err(e) = state.store.delete(&key).await {
                    tracing::warn!(key = %key, error = %e, "Failed to delete article image");
                }
            }
            None => {
                tracing::warn!(url = %image_url, "Article image is not a stored object, skipping");
            }
        }
    }

    let id = article.id.unwrap_or_default();
    tracing::info!(article_id = id, user = %current.user.username, "Article deleted");

    Ok(Json(json!({
        "success": true,
        "message": format!("Article with id: {} deleted.", id),
        "article": Value::Null,
    })))
}

fn like_response(outcome: LikeOutcome, done: &str, unchanged: &str) -> Response {
    if outcome.changed {
        return Json(json!({
            "success": true,
            "message": done,
            "likes": outcome.likes,
        }))
        .into_response();
    }

    let error = AppError::bad_request(unchanged);
    let mut body = error.body();
    body["likes"] = json!(outcome.likes);
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

async fn liked_article_id(state: &AppState, meta_title: &str) -> AppResult<i64> {
    ArticleRepository::new(state.db.clone())
        .find_by_meta_title(meta_title)
        .await?
        .and_then(|article| article.id)
        .ok_or_else(|| AppError::not_found("Article not found"))
}

/// POST /api/articles/{metaTitle}/like
pub async fn like_article(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(meta_title): Path<String>,
) -> AppResult<Response> {
    let article_id = liked_article_id(&state, &meta_title).await?;
    let outcome = ArticleRepository::new(state.db.clone())
        .like(article_id, current.user_id())
        .await?;

    if outcome.changed {
        state.articles.invalidate();
    }
    Ok(like_response(
        outcome,
        "Article liked successfully",
        "Article already liked",
    ))
}

/// DELETE /api/articles/{metaTitle}/like
pub async fn unlike_article(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(meta_title): Path<String>,
) -> AppResult<Response> {
    let article_id = liked_article_id(&state, &meta_title).await?;
    let outcome = ArticleRepository::new(state.db.clone())
        .unlike(article_id, current.user_id())
        .await?;

    if outcome.changed {
        state.articles.invalidate();
    }
    Ok(like_response(
        outcome,
        "Article unliked successfully",
        "Article already not liked",
    ))
}

/// Build repository search filters from the raw query string
pub fn search_filters(query: &HashMap<String, String>) -> AppResult<ArticleSearch> {
    let terms = query
        .get("search")
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let categories = match query.get("categories").filter(|c| !c.trim().is_empty()) {
        Some(raw) => parse_categories(raw)?,
        None => parse_category(query.get("category").map(String::as_str))?
            .into_iter()
            .collect(),
    };

    let start = parse_date(
        query.get("startDate").map(String::as_str),
        "Invalid start date format",
    )?;
    let end = parse_date(
        query.get("endDate").map(String::as_str),
        "Invalid end date format",
    )?;

    let pagination = Pagination::from_raw(
        query.get("page").map(String::as_str),
        query.get("count").map(String::as_str),
    );

    Ok(ArticleSearch {
        terms,
        categories,
        start,
        end,
        offset: pagination.offset(),
        limit: pagination.limit(),
    })
}

/// GET /api/articles/search
pub async fn search_articles(
    State(state): State<AppState>,
    Query(query): RawQuery,
) -> AppResult<Json<Value>> {
    let search = search_filters(&query)?;
    let articles = ArticleRepository::new(state.db.clone())
        .search(&search)
        .await?;

    tracing::debug!(
        terms = ?search.terms,
        results = articles.len(),
        "Article search"
    );

    let listings: Vec<_> = articles.iter().map(|a| a.listing(false)).collect();
    Ok(Json(json!({
        "success": true,
        "message": "Articles searched and fetched successfully",
        "articles": listings,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_http_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(http_date(at), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn test_search_filters_defaults() {
        let search = search_filters(&query(&[])).unwrap();
        assert!(search.terms.is_empty());
        assert!(search.categories.is_empty());
        assert_eq!(search.start, None);
        assert_eq!(search.end, None);
        assert_eq!(search.offset, 0);
        assert_eq!(search.limit, 20);
    }

    #[test]
    fn test_search_filters_full_offset() {
        let search = search_filters(&query(&[("page", "3"), ("count", "5")])).unwrap();
        assert_eq!(search.offset, 10);
        assert_eq!(search.limit, 5);
    }

    #[test]
    fn test_search_filters_terms_split_on_whitespace() {
        let search = search_filters(&query(&[("search", "  rates   inflation ")])).unwrap();
        assert_eq!(search.terms, vec!["rates", "inflation"]);
    }

    #[test]
    fn test_categories_take_precedence() {
        let search = search_filters(&query(&[
            ("category", "Finance"),
            ("categories", "Business, Economic"),
        ]))
        .unwrap();
        assert_eq!(
            search.categories,
            vec![Category::Business, Category::Economic]
        );

        let search = search_filters(&query(&[("category", "Finance")])).unwrap();
        assert_eq!(search.categories, vec![Category::Finance]);
    }

    #[test]
    fn test_search_filters_invalid_category() {
        let err = search_filters(&query(&[("categories", "Finance,Sports")])).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_search_filters_dates() {
        let search = search_filters(&query(&[
            ("startDate", "2024-01-01T00:00:00Z"),
            ("endDate", "2024-02-01T12:00:00+02:00"),
        ]))
        .unwrap();
        assert_eq!(
            search.start,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            search.end,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap())
        );

        let err = search_filters(&query(&[("startDate", "yesterday")])).unwrap_err();
        assert_eq!(err.message, "Invalid start date format");

        let err = search_filters(&query(&[("endDate", "2024-13-01")])).unwrap_err();
        assert_eq!(err.message, "Invalid end date format");
    }

    #[test]
    fn test_like_response_unchanged_carries_count() {
        let response = like_response(
            LikeOutcome {
                changed: false,
                likes: 4,
            },
            "Article liked successfully",
            "Article already liked",
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_article_input_ignores_blank_optionals() {
        let mut form = ContentForm::default();
        form.fields.insert("title".into(), "Title".into());
        form.fields.insert("category".into(), "  ".into());
        form.fields.insert("position".into(), "".into());

        let input = article_input(&form);
        assert_eq!(input.title.as_deref(), Some("Title"));
        assert_eq!(input.category, None);
        assert_eq!(input.position, None);
        assert_eq!(input.image_url, None);
    }
}
