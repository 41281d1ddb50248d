//! Offline asset cache for the front end.
//!
//! Assets are cached in generations keyed by a tag. Startup installs the
//! precache list under the configured tag, then activates it, which purges
//! every other generation. Requests for static files are answered from the
//! active generation first and fall through to disk on a miss.
//!
//! State is in-memory (`Arc<RwLock<AssetCache>>`), written at startup and
//! read per request.

use axum::body::Bytes;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// Default cache generation tag. Bump when the asset list or contents change.
pub const DEFAULT_CACHE_TAG: &str = "moti-v1";

/// Assets precached at install, as request paths.
pub const PRECACHE_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/style.css",
    "/script.js",
    "/manifest.json",
    "/icons/icon-192x192.png",
    "/icons/icon-512x512.png",
];

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("asset path '{0}' is not a plain relative path")]
    InvalidPath(String),

    #[error("failed to read asset '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CachedAsset {
    pub body: Bytes,
    pub content_type: &'static str,
}

impl IntoResponse for CachedAsset {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

#[derive(Debug, Default)]
pub struct AssetCache {
    generations: HashMap<String, BTreeMap<String, CachedAsset>>,
    active: Option<String>,
}

/// Shared asset cache handle.
pub type SharedAssetCache = Arc<RwLock<AssetCache>>;

/// Snapshot of the cache, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheStatus {
    /// Generation currently serving requests
    pub active: Option<String>,
    /// All installed generations, sorted
    pub generations: Vec<String>,
    /// Request paths cached in the active generation
    pub assets: Vec<String>,
}

/// Map a request path to a file path relative to the static root.
///
/// `/` maps to `index.html`. Anything that could escape the root is rejected.
fn relative_file(request_path: &str) -> Option<String> {
    let trimmed = request_path.trim_start_matches('/');
    let file = if trimmed.is_empty() { "index.html" } else { trimmed };
    let plain = file
        .split('/')
        .all(|part| !part.is_empty() && part != "." && part != ".." && !part.contains('\\'));
    plain.then(|| file.to_string())
}

fn content_type_for(file: &str) -> &'static str {
    match file.rsplit('.').next().unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "webmanifest" => "application/manifest+json",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a generation built elsewhere (see `load_generation`).
    pub fn insert_generation(&mut self, tag: &str, assets: BTreeMap<String, CachedAsset>) {
        tracing::info!("Installed asset cache '{}' ({} assets)", tag, assets.len());
        self.generations.insert(tag.to_string(), assets);
    }

    /// Make `tag` current and purge every other generation.
    ///
    /// Returns the evicted tags, sorted.
    pub fn activate(&mut self, tag: &str) -> Vec<String> {
        let mut evicted: Vec<String> = self
            .generations
            .keys()
            .filter(|k| k.as_str() != tag)
            .cloned()
            .collect();
        evicted.sort();

        for old in &evicted {
            self.generations.remove(old);
            tracing::info!("Evicted stale asset cache '{}'", old);
        }

        if self.generations.contains_key(tag) {
            self.active = Some(tag.to_string());
        } else {
            tracing::warn!("Activated asset cache '{}' has not been installed", tag);
            self.active = None;
        }
        evicted
    }

    /// Cache-first lookup in the active generation.
    pub fn lookup(&self, request_path: &str) -> Option<CachedAsset> {
        let generation = self.generations.get(self.active.as_deref()?)?;
        generation.get(request_path).cloned()
    }

    pub fn active_tag(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn status(&self) -> CacheStatus {
        let mut generations: Vec<String> = self.generations.keys().cloned().collect();
        generations.sort();
        let assets = self
            .active
            .as_ref()
            .and_then(|tag| self.generations.get(tag))
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default();

        CacheStatus {
            active: self.active.clone(),
            generations,
            assets,
        }
    }
}

/// Read every asset from `root`. All-or-nothing: the first unreadable asset
/// aborts the load.
pub async fn load_generation(
    root: &Path,
    assets: &[&str],
) -> Result<BTreeMap<String, CachedAsset>, CacheError> {
    let mut generation = BTreeMap::new();

    for &request_path in assets {
        let file = relative_file(request_path)
            .ok_or_else(|| CacheError::InvalidPath(request_path.to_string()))?;
        let body = tokio::fs::read(root.join(&file))
            .await
            .map_err(|source| CacheError::Read {
                path: request_path.to_string(),
                source,
            })?;

        generation.insert(
            request_path.to_string(),
            CachedAsset {
                body: Bytes::from(body),
                content_type: content_type_for(&file),
            },
        );
    }

    Ok(generation)
}

/// Install `assets` from `root` under `tag`, then activate it.
///
/// On failure the cache is left untouched and the error is returned.
pub async fn install_and_activate(
    cache: &SharedAssetCache,
    tag: &str,
    root: &Path,
    assets: &[&str],
) -> Result<Vec<String>, CacheError> {
    // Read outside the lock; a failed install must not disturb live generations.
    let generation = load_generation(root, assets).await?;

    let mut cache = cache.write().await;
    cache.insert_generation(tag, generation);
    Ok(cache.activate(tag))
}
