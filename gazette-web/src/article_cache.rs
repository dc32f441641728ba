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


//! In-process cache of article listings
//!
//! Each cache entry is a snapshot of every article in one category filter,
//! sorted twice (newest first, most liked first). Listing requests are paged
//! out of the snapshot. A hit on a snapshot older than the refresh threshold
//! is served as is and triggers one background reload for that key. Writes
//! bump a generation counter that is part of the key, so snapshots loaded
//! before a write are never served after it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use gazette_core::{Article, ArticleListing, Category, Pagination};
use gazette_db::{ArticleRepository, ArticleSort};
use moka::future::Cache;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::configuration::CacheConfig;

/// Where snapshots and direct pages come from
#[async_trait]
pub trait ArticleSource: Send + Sync + 'static {
    /// Every article matching the filter, newest first
    async fn load_snapshot(&self, category: Option<Category>) -> Result<Vec<Article>>;

    async fn list_page(
        &self,
        category: Option<Category>,
        sort: ArticleSort,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Article>>;
}

#[async_trait]
impl ArticleSource for ArticleRepository {
    async fn load_snapshot(&self, category: Option<Category>) -> Result<Vec<Article>> {
        self.list_all(category).await
    }

    async fn list_page(
        &self,
        category: Option<Category>,
        sort: ArticleSort,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Article>> {
        self.list(category, sort, offset, limit).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
    pub refresh_threshold: Duration,
    pub refresh_interval: Option<Duration>,
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.ttl(),
            refresh_threshold: config.refresh_threshold(),
            refresh_interval: config.refresh_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    category: Option<Category>,
    generation: u64,
}

#[derive(Debug)]
pub struct ArticleSnapshot {
    pub by_date: Vec<Article>,
    pub by_likes: Vec<Article>,
    pub loaded_at: Instant,
}

impl ArticleSnapshot {
    pub fn new(mut articles: Vec<Article>) -> Self {
        articles.sort_by(|a, b| {
            b.date_published
                .cmp(&a.date_published)
                .then_with(|| b.id.cmp(&a.id))
        });

        // Stable sort keeps newest-first among equal like counts
        let mut by_likes = articles.clone();
        by_likes.sort_by(|a, b| b.likes_count.cmp(&a.likes_count));

        Self {
            by_date: articles,
            by_likes,
            loaded_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListingQuery {
    pub category: Option<Category>,
    pub pagination: Pagination,
    pub include_html: bool,
    pub include_trending: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub articles: Vec<ArticleListing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trending: Option<Vec<ArticleListing>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
    pub refresh_failures: u64,
}

struct Inner {
    source: Arc<dyn ArticleSource>,
    cache: Cache<CacheKey, Arc<ArticleSnapshot>>,
    settings: CacheSettings,
    generation: AtomicU64,
    refreshing: Mutex<HashSet<CacheKey>>,
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
}

#[derive(Clone)]
pub struct ArticleCache {
    inner: Arc<Inner>,
}

impl ArticleCache {
    pub fn new(source: Arc<dyn ArticleSource>, settings: CacheSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(settings.ttl)
            .build();

        Self {
            inner: Arc::new(Inner {
                source,
                cache,
                settings,
                generation: AtomicU64::new(0),
                refreshing: Mutex::new(HashSet::new()),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                refreshes: AtomicU64::new(0),
                refresh_failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.inner.settings
    }

    /// One page of articles, from the cached snapshot when enabled
    pub async fn listing(&self, query: &ListingQuery) -> Result<ListingPage> {
        if !self.inner.settings.enabled {
            return self.direct_listing(query).await;
        }

        let snapshot = self.snapshot(query.category).await?;
        Ok(page_from_snapshot(&snapshot, query))
    }

    /// Fetch the snapshot for a filter, loading it on a miss
    pub async fn snapshot(&self, category: Option<Category>) -> Result<Arc<ArticleSnapshot>> {
        let key = self.inner.key_for(category);
        let source = Arc::clone(&self.inner.source);

        let entry = self
            .inner
            .cache
            .entry(key)
            .or_try_insert_with(async move { load(source.as_ref(), category).await })
            .await
            .map_err(|e| anyhow!("Failed to load article snapshot: {:#}", e))?;

        if entry.is_fresh() {
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(category = ?category, "Article cache miss");
        } else {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(category = ?category, "Article cache hit");
        }

        let snapshot = entry.into_value();
        if snapshot.age() >= self.inner.settings.refresh_threshold {
            self.spawn_refresh(key).await;
        }

        Ok(snapshot)
    }

    /// Drop every snapshot, called after any article write
    pub fn invalidate(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.cache.invalidate_all();
        tracing::debug!(generation, "Article cache invalidated");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            refreshes: self.inner.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.inner.refresh_failures.load(Ordering::Relaxed),
        }
    }

    /// Reload every snapshot cached under the current generation
    pub async fn refresh_all(&self) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let keys: Vec<CacheKey> = self
            .inner
            .cache
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| key.generation == generation)
            .collect();

        for key in keys {
            if self.inner.claim_refresh(key).await {
                self.inner.refresh(key).await;
                self.inner.release_refresh(key).await;
            }
        }
    }

    /// Start the periodic refresh task when an interval is configured
    pub fn spawn_scheduled_refresh(&self) -> Option<JoinHandle<()>> {
        let settings = self.inner.settings;
        let period = settings.refresh_interval.filter(|_| settings.enabled)?;
        let cache = self.clone();

        tracing::info!(?period, "Scheduled article cache refresh enabled");
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.refresh_all().await;
            }
        }))
    }

    async fn spawn_refresh(&self, key: CacheKey) {
        if !self.inner.claim_refresh(key).await {
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.refresh(key).await;
            inner.release_refresh(key).await;
        });
    }

    async fn direct_listing(&self, query: &ListingQuery) -> Result<ListingPage> {
        let offset = query.pagination.offset();
        let limit = query.pagination.limit();
        let source = &self.inner.source;

        let articles = source
            .list_page(query.category, ArticleSort::Newest, offset, limit)
            .await?;

        let trending = if query.include_trending {
            let liked = source
                .list_page(query.category, ArticleSort::MostLiked, offset, limit)
                .await?;
            Some(to_listings(&liked, query.include_html))
        } else {
            None
        };

        Ok(ListingPage {
            articles: to_listings(&articles, query.include_html),
            trending,
        })
    }
}

impl Inner {
    fn key_for(&self, category: Option<Category>) -> CacheKey {
        CacheKey {
            category,
            generation: self.generation.load(Ordering::SeqCst),
        }
    }

    async fn claim_refresh(&self, key: CacheKey) -> bool {
        let mut refreshing = self.refreshing.lock().await;
        refreshing.insert(key)
    }

    async fn release_refresh(&self, key: CacheKey) {
        let mut refreshing = self.refreshing.lock().await;
        refreshing.remove(&key);
    }

    async fn refresh(&self, key: CacheKey) {
        match load(self.source.as_ref(), key.category).await {
            Ok(snapshot) => {
                if self.generation.load(Ordering::SeqCst) != key.generation {
                    tracing::debug!(category = ?key.category, "Discarding refresh of invalidated snapshot");
                    return;
                }
                self.cache.insert(key, snapshot).await;
                self.refreshes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(category = ?key.category, "Article snapshot refreshed");
            }
            Err(e) => {
                self.refresh_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    category = ?key.category,
                    error = %e,
                    "Article snapshot refresh failed, keeping stale snapshot"
                );
            }
        }
    }
}

async fn load(source: &dyn ArticleSource, category: Option<Category>) -> Result<Arc<ArticleSnapshot>> {
    let articles = source.load_snapshot(category).await?;
    Ok(Arc::new(ArticleSnapshot::new(articles)))
}

fn to_listings(articles: &[Article], include_html: bool) -> Vec<ArticleListing> {
    articles
        .iter()
        .map(|article| article.listing(include_html))
        .collect()
}

fn page_from_snapshot(snapshot: &ArticleSnapshot, query: &ListingQuery) -> ListingPage {
    let articles = to_listings(query.pagination.slice(&snapshot.by_date), query.include_html);
    let trending = query
        .include_trending
        .then(|| to_listings(query.pagination.slice(&snapshot.by_likes), query.include_html));

    ListingPage { articles, trending }
}
