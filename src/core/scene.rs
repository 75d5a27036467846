//! Scene catalog and scene-transition broadcast
//!
//! The catalog resolves load requests (by name, by index, or "next") against
//! the list of known scenes. The [`TransitionHub`] is the pre-unload signal:
//! anything that must act before a scene graph is torn down subscribes to it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a scene is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadMode {
    /// Replace every loaded scene
    #[default]
    Single,
    /// Load alongside the scenes already loaded
    Additive,
}

/// A request to load a scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneRequest {
    /// Load by catalog name
    ByName(String, LoadMode),
    /// Load by catalog index
    ByIndex(usize, LoadMode),
    /// Replace the active scene with the one after it in the catalog
    Next,
}

impl SceneRequest {
    /// Single-mode load by name
    pub fn named(name: impl Into<String>) -> Self {
        Self::ByName(name.into(), LoadMode::Single)
    }

    /// Single-mode load by index
    pub fn index(index: usize) -> Self {
        Self::ByIndex(index, LoadMode::Single)
    }
}

/// A resolved scene load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneChange {
    /// Catalog index of the scene
    pub index: usize,
    /// Scene name
    pub name: String,
    /// Load mode
    pub mode: LoadMode,
}

impl SceneChange {
    /// Whether this load tears down the current scene graph
    pub fn unloads_current(&self) -> bool {
        self.mode == LoadMode::Single
    }
}

/// Errors that can occur while resolving scene loads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// No scene with this name in the catalog
    #[error("unknown scene: {0}")]
    UnknownScene(String),
    /// Index past the end of the catalog
    #[error("scene index {index} out of range (catalog has {len} scenes)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Ordered list of scenes, plus which ones are currently loaded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneCatalog {
    /// Scene names in build order
    pub scenes: Vec<String>,
    /// Index of the active scene
    #[serde(default)]
    active: Option<usize>,
    /// Indices of every loaded scene
    #[serde(default)]
    loaded: Vec<usize>,
}

impl SceneCatalog {
    /// Create a catalog from scene names in build order
    pub fn new<I, S>(scenes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scenes: scenes.into_iter().map(Into::into).collect(),
            active: None,
            loaded: Vec::new(),
        }
    }

    /// Resolve a request into a scene change.
    ///
    /// `Next` past the last scene resolves to `Ok(None)`.
    pub fn resolve(&self, request: &SceneRequest) -> Result<Option<SceneChange>, SceneError> {
        let (index, mode) = match request {
            SceneRequest::ByName(name, mode) => {
                let index = self
                    .scenes
                    .iter()
                    .position(|s| s == name)
                    .ok_or_else(|| SceneError::UnknownScene(name.clone()))?;
                (index, *mode)
            }
            SceneRequest::ByIndex(index, mode) => {
                if *index >= self.scenes.len() {
                    return Err(SceneError::IndexOutOfRange {
                        index: *index,
                        len: self.scenes.len(),
                    });
                }
                (*index, *mode)
            }
            SceneRequest::Next => {
                let index = self.active.map_or(0, |active| active + 1);
                if index >= self.scenes.len() {
                    return Ok(None);
                }
                (index, LoadMode::Single)
            }
        };

        Ok(Some(SceneChange {
            index,
            name: self.scenes[index].clone(),
            mode,
        }))
    }

    /// Record that a resolved change was applied
    pub fn apply(&mut self, change: &SceneChange) {
        match change.mode {
            LoadMode::Single => {
                self.active = Some(change.index);
                self.loaded = vec![change.index];
            }
            LoadMode::Additive => {
                if !self.loaded.contains(&change.index) {
                    self.loaded.push(change.index);
                }
                if self.active.is_none() {
                    self.active = Some(change.index);
                }
            }
        }
    }

    /// Name of the active scene
    pub fn active(&self) -> Option<&str> {
        self.active.map(|index| self.scenes[index].as_str())
    }

    /// Index of the active scene
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Indices of every loaded scene
    pub fn loaded(&self) -> &[usize] {
        &self.loaded
    }
}

/// Identifies one subscription to a [`TransitionHub`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscribers to the pre-unload signal.
///
/// Subscriptions are explicit: whoever subscribes must unsubscribe when it
/// goes away, otherwise it keeps being notified.
#[derive(Debug)]
pub struct TransitionHub<K> {
    subscribers: Vec<(SubscriptionId, K)>,
    next_id: u64,
}

impl<K: Clone> TransitionHub<K> {
    /// Create a hub with no subscribers
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe `key` to the pre-unload signal
    pub fn subscribe(&mut self, key: K) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, key));
        id
    }

    /// Remove a subscription. Returns `false` if it was not present.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Fire the signal: every subscribed key, in subscription order
    pub fn broadcast(&self) -> Vec<K> {
        self.subscribers.iter().map(|(_, key)| key.clone()).collect()
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if nobody is subscribed
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<K: Clone> Default for TransitionHub<K> {
    fn default() -> Self {
        Self::new()
    }
}
