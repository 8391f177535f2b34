//! Options bag
//!
//! Options are persisted as a flat key/value map by the browser's storage
//! area. [`Options`] is the typed, read-through cache the engine works from:
//! every key always has a value, falling back to its documented default when
//! storage is missing the key or holds something malformed.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::channel::{Channel, StoredChannel};
use crate::duration;
use crate::platform::{Platform, PLATFORMS};
use crate::types::{Concern, SfmMode};

/// Storage-area representation of options.
pub type OptionMap = Map<String, Value>;

/// Error loading a whole options document.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("Invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Options document must be a JSON object")]
    NotAnObject,
}

// =============================================================================
// Option Keys
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    SfmMode,
    EnabledChannels,
    EnabledPlatforms,
    PlayerHideDuration,
    PlayerJumpDistance,
    ListHideTitle,
    ListHidePreview,
    ListHideDuration,
    TheatreMode,
}

impl OptionKey {
    pub const ALL: [OptionKey; 9] = [
        Self::SfmMode,
        Self::EnabledChannels,
        Self::EnabledPlatforms,
        Self::PlayerHideDuration,
        Self::PlayerJumpDistance,
        Self::ListHideTitle,
        Self::ListHidePreview,
        Self::ListHideDuration,
        Self::TheatreMode,
    ];

    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::SfmMode => "sfmOptionEnabled",
            Self::EnabledChannels => "sfmOptionEnabledChannels",
            Self::EnabledPlatforms => "sfmOptionEnabledPlatforms",
            Self::PlayerHideDuration => "sfmOptionHideDurationInPlayer",
            Self::PlayerJumpDistance => "sfmOptionJumpDistance",
            Self::ListHideTitle => "sfmOptionHideTitleInList",
            Self::ListHidePreview => "sfmOptionHidePreviewInList",
            Self::ListHideDuration => "sfmOptionHideDurationInList",
            Self::TheatreMode => "sfmOptionTheatreMode",
        }
    }

    pub fn from_storage_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.storage_key() == key)
    }

    /// Whether a change to this key can change the derived SFM state.
    pub fn affects_sfm_state(self) -> bool {
        matches!(self, Self::SfmMode | Self::EnabledChannels | Self::EnabledPlatforms)
    }

    /// DOM features that read this key directly.
    pub fn concerns(self) -> Concern {
        match self {
            Self::SfmMode | Self::EnabledChannels | Self::EnabledPlatforms => Concern::SFM_DEPENDENT,
            Self::PlayerHideDuration => Concern::PLAYER_DURATION,
            Self::PlayerJumpDistance => Concern::PLAYER_TOOLBAR,
            Self::ListHideTitle => Concern::LIST_TITLE,
            Self::ListHidePreview => Concern::LIST_PREVIEW,
            Self::ListHideDuration => Concern::LIST_DURATION,
            Self::TheatreMode => Concern::THEATRE,
        }
    }
}

// =============================================================================
// Options
// =============================================================================

pub const DEFAULT_JUMP_DISTANCE: &str = "2m";

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub sfm_mode: SfmMode,
    /// Set semantics keyed by qualified name, kept in insertion order
    pub enabled_channels: Vec<Channel>,
    pub enabled_platforms: HashMap<Platform, SfmMode>,
    pub player_hide_duration: bool,
    pub player_jump_distance: String,
    pub list_hide_title: bool,
    pub list_hide_preview: bool,
    pub list_hide_duration: bool,
    pub theatre_mode: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sfm_mode: SfmMode::Always,
            enabled_channels: Vec::new(),
            enabled_platforms: HashMap::new(),
            player_hide_duration: true,
            player_jump_distance: DEFAULT_JUMP_DISTANCE.to_string(),
            list_hide_title: false,
            list_hide_preview: false,
            list_hide_duration: true,
            theatre_mode: false,
        }
    }
}

impl Options {
    /// Build options from a storage map, merging over defaults.
    pub fn from_storage(map: &OptionMap) -> Self {
        let mut options = Self::default();
        for key in OptionKey::ALL {
            options.set_from_value(key, map.get(key.storage_key()));
        }
        options
    }

    /// Parse a JSON object document (as dumped from storage).
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Ok(Self::from_storage(&map)),
            _ => Err(OptionsError::NotAnObject),
        }
    }

    /// Full storage map, every key present.
    pub fn to_storage(&self) -> OptionMap {
        OptionKey::ALL
            .iter()
            .map(|&key| (key.storage_key().to_string(), self.value_of(key)))
            .collect()
    }

    pub fn value_of(&self, key: OptionKey) -> Value {
        match key {
            OptionKey::SfmMode => Value::from(self.sfm_mode.as_str()),
            OptionKey::EnabledChannels => Value::Array(
                self.enabled_channels
                    .iter()
                    .filter_map(|c| serde_json::to_value(c.to_stored()).ok())
                    .collect(),
            ),
            OptionKey::EnabledPlatforms => Value::Object(
                PLATFORMS
                    .iter()
                    .filter_map(|p| {
                        self.enabled_platforms
                            .get(p)
                            .map(|mode| (p.name().to_string(), Value::from(mode.as_str())))
                    })
                    .collect(),
            ),
            OptionKey::PlayerHideDuration => Value::Bool(self.player_hide_duration),
            OptionKey::PlayerJumpDistance => Value::from(self.player_jump_distance.as_str()),
            OptionKey::ListHideTitle => Value::Bool(self.list_hide_title),
            OptionKey::ListHidePreview => Value::Bool(self.list_hide_preview),
            OptionKey::ListHideDuration => Value::Bool(self.list_hide_duration),
            OptionKey::TheatreMode => Value::Bool(self.theatre_mode),
        }
    }

    /// Apply a storage-change delta. A `null` value means the key was
    /// removed and reverts to its default. Returns the keys whose value
    /// actually changed.
    pub fn apply_changes(&mut self, changes: &OptionMap) -> Vec<OptionKey> {
        let mut changed = Vec::new();
        for (name, value) in changes {
            let Some(key) = OptionKey::from_storage_key(name) else {
                continue;
            };
            let value = if value.is_null() { None } else { Some(value) };
            if self.set_from_value(key, value) {
                changed.push(key);
            }
        }
        changed
    }

    /// Set one key from its stored value. Returns whether it changed.
    fn set_from_value(&mut self, key: OptionKey, value: Option<&Value>) -> bool {
        let defaults = Self::default();
        let before = self.value_of(key);

        match key {
            OptionKey::SfmMode => {
                self.sfm_mode = match value {
                    None => defaults.sfm_mode,
                    Some(v) => match v.as_str().and_then(SfmMode::from_str) {
                        Some(mode) => mode,
                        None => {
                            malformed(key, v);
                            defaults.sfm_mode
                        }
                    },
                }
            }
            OptionKey::EnabledChannels => {
                self.enabled_channels = match value {
                    None => defaults.enabled_channels,
                    Some(v) => parse_channel_list(key, v),
                }
            }
            OptionKey::EnabledPlatforms => {
                self.enabled_platforms = match value {
                    None => defaults.enabled_platforms,
                    Some(v) => parse_platform_map(key, v),
                }
            }
            OptionKey::PlayerHideDuration => {
                self.player_hide_duration = bool_value(key, value, defaults.player_hide_duration)
            }
            OptionKey::PlayerJumpDistance => {
                self.player_jump_distance = match value {
                    None => defaults.player_jump_distance,
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => {
                        malformed(key, other);
                        defaults.player_jump_distance
                    }
                }
            }
            OptionKey::ListHideTitle => {
                self.list_hide_title = bool_value(key, value, defaults.list_hide_title)
            }
            OptionKey::ListHidePreview => {
                self.list_hide_preview = bool_value(key, value, defaults.list_hide_preview)
            }
            OptionKey::ListHideDuration => {
                self.list_hide_duration = bool_value(key, value, defaults.list_hide_duration)
            }
            OptionKey::TheatreMode => {
                self.theatre_mode = bool_value(key, value, defaults.theatre_mode)
            }
        }

        self.value_of(key) != before
    }

    /// Jump distance in seconds; 0 when the stored string is invalid.
    pub fn jump_distance_secs(&self) -> u64 {
        duration::parse(&self.player_jump_distance)
    }

    pub fn is_channel_enabled(&self, channel: &Channel) -> bool {
        self.enabled_channels.iter().any(|c| c == channel)
    }

    /// Per-platform mode; platforms without an entry defer to channels.
    pub fn platform_mode(&self, platform: Platform) -> SfmMode {
        self.enabled_platforms.get(&platform).copied().unwrap_or(SfmMode::Custom)
    }

    // =========================================================================
    // Mutation helpers (popup / options page)
    // =========================================================================

    /// Storage delta adding or removing `channel` from the enabled set.
    pub fn with_channel_enabled(&self, channel: &Channel, enabled: bool) -> OptionMap {
        let mut next = self.clone();
        next.enabled_channels.retain(|c| c != channel);
        if enabled {
            next.enabled_channels.push(channel.clone());
        }
        next.delta(OptionKey::EnabledChannels)
    }

    /// Storage delta setting a platform's mode. `Custom` removes the entry.
    pub fn with_platform_mode(&self, platform: Platform, mode: SfmMode) -> OptionMap {
        let mut next = self.clone();
        match mode {
            SfmMode::Custom => {
                next.enabled_platforms.remove(&platform);
            }
            mode => {
                next.enabled_platforms.insert(platform, mode);
            }
        }
        next.delta(OptionKey::EnabledPlatforms)
    }

    pub fn with_mode(&self, mode: SfmMode) -> OptionMap {
        let mut next = self.clone();
        next.sfm_mode = mode;
        next.delta(OptionKey::SfmMode)
    }

    fn delta(&self, key: OptionKey) -> OptionMap {
        let mut map = OptionMap::new();
        map.insert(key.storage_key().to_string(), self.value_of(key));
        map
    }
}

fn bool_value(key: OptionKey, value: Option<&Value>, default: bool) -> bool {
    match value {
        None => default,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            malformed(key, other);
            default
        }
    }
}

fn malformed(key: OptionKey, value: &Value) {
    log::warn!("Malformed value for option '{}': {}; using default", key.storage_key(), value);
}

fn parse_channel_list(key: OptionKey, value: &Value) -> Vec<Channel> {
    let Some(items) = value.as_array() else {
        malformed(key, value);
        return Vec::new();
    };

    let mut channels: Vec<Channel> = Vec::with_capacity(items.len());
    for item in items {
        let channel = serde_json::from_value::<StoredChannel>(item.clone())
            .ok()
            .and_then(|stored| stored.resolve());
        match channel {
            Some(channel) if !channels.contains(&channel) => channels.push(channel),
            Some(_) => {}
            None => log::warn!("Dropping unparseable stored channel {}", item),
        }
    }
    channels
}

fn parse_platform_map(key: OptionKey, value: &Value) -> HashMap<Platform, SfmMode> {
    let Some(entries) = value.as_object() else {
        malformed(key, value);
        return HashMap::new();
    };

    let mut map = HashMap::new();
    for (name, mode) in entries {
        let platform = Platform::from_name(name);
        let mode = mode.as_str().and_then(SfmMode::from_str);
        match (platform, mode) {
            (Some(platform), Some(mode)) => {
                map.insert(platform, mode);
            }
            _ => log::warn!("Dropping platform mode entry {}: {}", name, mode_debug(mode)),
        }
    }
    map
}

fn mode_debug(mode: Option<SfmMode>) -> &'static str {
    mode.map(SfmMode::as_str).unwrap_or("<invalid>")
}
