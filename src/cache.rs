//! Caller-owned memoization of stage outputs
//!
//! Stages stay pure; the cache sits beside them and is keyed by image
//! identity, stage and a hash of every parameter that influences the
//! stage or anything upstream of it.

use serde::Serialize;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::config::PipelineParams;
use crate::error::{Result, Stage};
use crate::models::Matrix;
use crate::pipeline::{Analysis, Classification, analyze_with, classify_with};
use crate::utils::Deadline;

/// Identity of an input image: a hash of its dimensions and pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

impl ImageId {
    /// Hash an 8-bit image
    pub fn of(image: &Matrix<u8>) -> Self {
        let mut hasher = DefaultHasher::new();
        image.dimensions().hash(&mut hasher);
        image.as_slice().hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Cache key for one stage output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageKey {
    /// Input image
    pub image: ImageId,
    /// Stage that produced the value
    pub stage: Stage,
    /// Hash of the stage parameters chained with its upstream hashes
    pub params: u64,
}

/// Chain upstream parameter hashes with this stage's parameters
pub fn chain_hash<P: Serialize>(upstream: &[u64], params: &P) -> Result<u64> {
    let mut hasher = DefaultHasher::new();
    upstream.hash(&mut hasher);
    serde_json::to_string(params)?.hash(&mut hasher);
    Ok(hasher.finish())
}

/// Distinct images a cache keeps by default
pub const DEFAULT_IMAGE_CAPACITY: usize = 8;

/// Type-erased store of `Arc`-shared stage outputs
///
/// Holds the outputs of at most `image_capacity` distinct images. Storing
/// a value for one more image evicts every entry of the least recently
/// inserted image.
pub struct StageCache {
    entries: HashMap<StageKey, Arc<dyn Any + Send + Sync>>,
    images: VecDeque<ImageId>,
    image_capacity: usize,
    hits: usize,
    misses: usize,
}

impl Default for StageCache {
    fn default() -> Self {
        Self::with_image_capacity(DEFAULT_IMAGE_CAPACITY)
    }
}

impl StageCache {
    /// Create an empty cache with the default capacity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding up to `capacity` images (at least one)
    pub fn with_image_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            images: VecDeque::new(),
            image_capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a value of type `T`
    pub fn get<T: Any + Send + Sync>(&mut self, key: &StageKey) -> Option<Arc<T>> {
        let found = self
            .entries
            .get(key)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok());
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Store a value
    pub fn insert<T: Any + Send + Sync>(&mut self, key: StageKey, value: Arc<T>) {
        if !self.images.contains(&key.image) {
            if self.images.len() == self.image_capacity {
                if let Some(oldest) = self.images.pop_front() {
                    self.entries.retain(|k, _| k.image != oldest);
                    log::debug!("stage cache: evicted {oldest:?}");
                }
            }
            self.images.push_back(key.image);
        }
        self.entries.insert(key, value);
    }

    /// Number of distinct images with stored values
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation or the last clear
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    /// Drop every stored value and reset the counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.images.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

impl std::fmt::Debug for StageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageCache")
            .field("entries", &self.entries.len())
            .field("images", &self.images.len())
            .field("image_capacity", &self.image_capacity)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

/// Analyzer with fixed parameters and an optional stage cache
///
/// Re-analyzing the same image with parameters that only touch late
/// stages reuses every earlier stage from the cache.
#[derive(Debug, Default)]
pub struct Analyzer {
    params: PipelineParams,
    /// Optional stage cache for repeated analyses
    cache: Option<StageCache>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Analyzer {
    /// Create an analyzer with the given parameters and no cache
    pub fn new(params: PipelineParams) -> Self {
        Self {
            params,
            cache: None,
            cancel: None,
        }
    }

    /// Create an analyzer that memoizes stage outputs of the last
    /// [`DEFAULT_IMAGE_CAPACITY`] images
    pub fn with_cache(params: PipelineParams) -> Self {
        Self::with_cache_capacity(params, DEFAULT_IMAGE_CAPACITY)
    }

    /// Create an analyzer whose cache keeps the last `images` images
    pub fn with_cache_capacity(params: PipelineParams, images: usize) -> Self {
        Self {
            params,
            cache: Some(StageCache::with_image_capacity(images)),
            cancel: None,
        }
    }

    /// Abort running analyses once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Current parameters
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Replace the parameters; cached stages whose inputs are unchanged stay valid
    pub fn set_params(&mut self, params: PipelineParams) {
        self.params = params;
    }

    fn deadline(&self) -> Deadline {
        let deadline = Deadline::from_budget_ms(self.params.time_budget_ms);
        match &self.cancel {
            Some(flag) => deadline.with_cancel_flag(Arc::clone(flag)),
            None => deadline,
        }
    }

    /// Run the full pipeline
    pub fn analyze(&mut self, image: &Matrix<u8>) -> Result<Analysis> {
        let deadline = self.deadline();
        analyze_with(image, &self.params, deadline, self.cache.as_mut())
    }

    /// Run only the stages needed for the class
    pub fn classify(&mut self, image: &Matrix<u8>) -> Result<Classification> {
        let deadline = self.deadline();
        classify_with(image, &self.params, deadline, self.cache.as_mut())
    }

    /// Cache hit/miss counters, `None` without a cache
    pub fn cache_stats(&self) -> Option<(usize, usize)> {
        self.cache.as_ref().map(StageCache::stats)
    }

    /// Drop every cached stage output (keeps the cache enabled)
    pub fn clear_cache(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.clear();
        }
    }
}
