//! Certification catalog and favorites.
//!
//! Endpoints:
//! - GET /certificates - Search certifications (public, cached)
//! - GET /certificates/{id} - Get one certification (public)
//! - GET /certificates/recommended - Interest-based recommendations
//! - GET /certificates/saved - Saved certifications
//! - GET|POST|DELETE /certificates/{id}/save - Favorite state of one certification

use std::sync::Arc;

use lambda_http::{Body, Request, Response};
use serde::Serialize;
use serde_json::json;
use shared::http::ok;
use shared::item::{user_key, ItemBuilder};
use shared::models::sort_key;
use shared::{AuthenticatedUser, Certification, Favorite, Query, Result};
use tracing::{info, warn};

use super::{auth, not_found, query_param};
use crate::recommend;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    certificates: Vec<Certification>,
    total: usize,
    page: usize,
    limit: usize,
    total_pages: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedCertification {
    #[serde(flatten)]
    certification: Certification,
    saved_at: chrono::DateTime<chrono::Utc>,
}

/// All certifications in the catalog.
pub async fn load_catalog(state: &AppState) -> Result<Vec<Certification>> {
    state
        .store
        .scan(&state.tables.certifications)
        .await?
        .iter()
        .map(Certification::from_item)
        .collect()
}

pub async fn get_certification(state: &AppState, id: &str) -> Result<Option<Certification>> {
    let key = ItemBuilder::new().s("id", id).build();
    match state
        .store
        .get_item(&state.tables.certifications, key)
        .await?
    {
        Some(item) => Ok(Some(Certification::from_item(&item)?)),
        None => Ok(None),
    }
}

pub async fn search(state: &AppState, event: &Request) -> Result<Response<Body>> {
    let q = query_param(event, "q").unwrap_or_default().to_string();
    let category = query_param(event, "category").map(String::from);
    let page = query_param(event, "page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = query_param(event, "limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let cache_key = format!(
        "certificates:{}:{}:{}:{}",
        q.to_lowercase(),
        category.as_deref().unwrap_or_default(),
        page,
        limit
    );
    if let Some(cached) = state.cache.get(&cache_key).await {
        match serde_json::from_str::<serde_json::Value>(&cached) {
            Ok(data) => return ok(200, data),
            Err(e) => warn!("Ignoring unreadable cache entry {}: {}", cache_key, e),
        }
    }

    let mut matches: Vec<Certification> = load_catalog(state)
        .await?
        .into_iter()
        .filter(|cert| category.as_deref().map_or(true, |c| cert.category == c))
        .filter(|cert| cert.matches(&q))
        .collect();
    matches.sort_by(|a, b| a.name.cmp(&b.name));

    let total = matches.len();
    let certificates = matches
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();
    let response = SearchResponse {
        certificates,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    };

    state
        .cache
        .set(&cache_key, serde_json::to_string(&response)?, state.cache_ttl)
        .await;
    ok(200, response)
}

pub async fn get(state: &AppState, id: &str) -> Result<Response<Body>> {
    match get_certification(state, id).await? {
        Some(cert) => ok(200, cert),
        None => not_found("Certification"),
    }
}

pub async fn recommended(state: &AppState, user: &AuthenticatedUser) -> Result<Response<Body>> {
    let profile = auth::load_profile(state, user).await;
    let ids = recommend::ids_for_interests(&profile.interests);

    let certificates = if ids.is_empty() {
        recommend::defaults()
    } else {
        let ids = ids.into_iter().map(String::from).collect();
        recommend::resolve(
            Arc::clone(&state.store),
            &state.tables.certifications,
            ids,
            recommend::Missing::UseBuiltin,
        )
        .await?
    };

    ok(
        200,
        json!({
            "certificates": certificates,
            "interests": profile.interests,
        }),
    )
}

async fn favorites(state: &AppState, user_id: &str) -> Result<Vec<Favorite>> {
    state
        .store
        .query(
            &state.tables.users,
            Query::partition("userId", user_id).begins_with("type", sort_key::FAVORITE),
        )
        .await?
        .iter()
        .map(Favorite::from_item)
        .collect()
}

pub async fn saved(state: &AppState, user: &AuthenticatedUser) -> Result<Response<Body>> {
    let favorites = favorites(state, &user.user_id).await?;
    let ids = favorites.iter().map(|f| f.cert_id.clone()).collect();
    let certs = recommend::resolve(
        Arc::clone(&state.store),
        &state.tables.certifications,
        ids,
        recommend::Missing::Skip,
    )
    .await?;

    let saved: Vec<SavedCertification> = certs
        .into_iter()
        .filter_map(|certification| {
            let saved_at = favorites
                .iter()
                .find(|f| f.cert_id == certification.id)?
                .saved_at;
            Some(SavedCertification {
                certification,
                saved_at,
            })
        })
        .collect();

    ok(200, json!({ "certificates": saved, "total": saved.len() }))
}

pub async fn is_saved(
    state: &AppState,
    user: &AuthenticatedUser,
    cert_id: &str,
) -> Result<Response<Body>> {
    let key = user_key(&user.user_id, &Favorite::sort_key(cert_id));
    let saved = state
        .store
        .get_item(&state.tables.users, key)
        .await?
        .is_some();
    ok(200, json!({ "certId": cert_id, "saved": saved }))
}

pub async fn save(
    state: &AppState,
    user: &AuthenticatedUser,
    cert_id: &str,
) -> Result<Response<Body>> {
    if get_certification(state, cert_id).await?.is_none() {
        return not_found("Certification");
    }

    let favorite = Favorite::new(&user.user_id, cert_id);
    let saved_at = favorite.saved_at;
    state
        .store
        .put_item(&state.tables.users, favorite.into_item())
        .await?;

    info!(user_id = %user.user_id, %cert_id, "saved certification");
    ok(
        201,
        json!({ "certId": cert_id, "saved": true, "savedAt": saved_at }),
    )
}

pub async fn unsave(
    state: &AppState,
    user: &AuthenticatedUser,
    cert_id: &str,
) -> Result<Response<Body>> {
    let key = user_key(&user.user_id, &Favorite::sort_key(cert_id));
    state.store.delete_item(&state.tables.users, key).await?;
    ok(200, json!({ "certId": cert_id, "saved": false }))
}
