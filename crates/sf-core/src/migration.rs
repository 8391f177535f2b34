//! One-time storage migration
//!
//! Version 1 stored options under unprefixed keys and kept enabled channels
//! as a flat list of Twitch channel names. Version 2 prefixes every key and
//! stores channels as `{qualifiedName, displayName}` objects.
//!
//! [`plan`] is pure: it inspects a storage dump and returns what to write and
//! what to delete. Applying a plan and planning again yields an empty plan.

use serde_json::Value;

use crate::channel::StoredChannel;
use crate::duration;
use crate::options::{OptionKey, OptionMap};
use crate::platform::Platform;
use crate::types::SfmMode;

/// Storage key holding the last migrated schema version.
pub const VERSION_KEY: &str = "sfmMigratedVersion";

/// Current storage schema version.
pub const CURRENT_VERSION: u64 = 2;

type Transform = fn(&Value) -> Option<Value>;

/// Legacy key, replacement, value transform.
const LEGACY_KEYS: &[(&str, OptionKey, Transform)] = &[
    ("sfmEnabled", OptionKey::SfmMode, migrate_mode),
    ("sfmEnabledChannels", OptionKey::EnabledChannels, migrate_channels),
    ("hideSeekBar", OptionKey::PlayerHideDuration, migrate_bool),
    ("jumpDistance", OptionKey::PlayerJumpDistance, migrate_jump_distance),
    ("hideVideoTitles", OptionKey::ListHideTitle, migrate_bool),
    ("hideVideoPreviews", OptionKey::ListHidePreview, migrate_bool),
    ("hideVideoDurations", OptionKey::ListHideDuration, migrate_bool),
    ("theatreMode", OptionKey::TheatreMode, migrate_bool),
];

/// Storage writes and removals that bring a dump up to date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    pub set: OptionMap,
    pub remove: Vec<String>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Apply to an in-memory storage dump.
    pub fn apply(&self, storage: &mut OptionMap) {
        for key in &self.remove {
            storage.remove(key);
        }
        for (key, value) in &self.set {
            storage.insert(key.clone(), value.clone());
        }
    }
}

pub fn stored_version(storage: &OptionMap) -> u64 {
    storage.get(VERSION_KEY).and_then(Value::as_u64).unwrap_or(0)
}

/// Compute the migration for a storage dump.
pub fn plan(storage: &OptionMap) -> MigrationPlan {
    let mut plan = MigrationPlan::default();
    if stored_version(storage) >= CURRENT_VERSION {
        return plan;
    }

    for &(old_key, new_key, transform) in LEGACY_KEYS {
        let Some(old_value) = storage.get(old_key) else {
            continue;
        };

        let new_name = new_key.storage_key();
        if storage.contains_key(new_name) {
            log::debug!("Legacy key '{}' superseded by existing '{}'", old_key, new_name);
        } else {
            match transform(old_value) {
                Some(value) => {
                    plan.set.insert(new_name.to_string(), value);
                }
                None => log::warn!("Discarding unmigratable legacy value {}={}", old_key, old_value),
            }
        }
        plan.remove.push(old_key.to_string());
    }

    plan.set.insert(VERSION_KEY.to_string(), Value::from(CURRENT_VERSION));
    plan
}

fn migrate_bool(value: &Value) -> Option<Value> {
    value.as_bool().map(Value::Bool)
}

fn migrate_mode(value: &Value) -> Option<Value> {
    let mode = match value {
        Value::Bool(true) => SfmMode::Always,
        Value::Bool(false) => SfmMode::Never,
        Value::String(s) => SfmMode::from_str(&s.to_ascii_lowercase())?,
        _ => return None,
    };
    Some(Value::from(mode.as_str()))
}

/// v1 jump distance: minutes as a number, or a duration string.
fn migrate_jump_distance(value: &Value) -> Option<Value> {
    let seconds = match value {
        Value::Number(n) => n.as_u64()?.checked_mul(60)?,
        Value::String(s) => duration::parse(s),
        _ => return None,
    };
    (seconds > 0).then(|| Value::from(duration::format(seconds)))
}

/// v1 channels were bare Twitch names; tolerate already-structured entries.
fn migrate_channels(value: &Value) -> Option<Value> {
    let items = value.as_array()?;
    let mut out: Vec<StoredChannel> = Vec::with_capacity(items.len());

    for item in items {
        let channel = match item {
            Value::String(name) => Platform::Twitch.parse_channel_by_name(name),
            Value::Object(_) => serde_json::from_value::<StoredChannel>(item.clone())
                .ok()
                .and_then(|stored| stored.resolve()),
            _ => None,
        };
        match channel {
            Some(channel) => {
                let stored = channel.to_stored();
                if !out.iter().any(|c| c.qualified_name == stored.qualified_name) {
                    out.push(stored);
                }
            }
            None => log::warn!("Dropping legacy channel entry {}", item),
        }
    }

    serde_json::to_value(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use serde_json::json;

    fn legacy_storage() -> OptionMap {
        json!({
            "sfmEnabled": "custom",
            "sfmEnabledChannels": ["ESL_CSGO", "overwatchleague", "_bad"],
            "hideSeekBar": false,
            "jumpDistance": 5,
            "hideVideoTitles": true,
            "theatreMode": "yes",
            "unrelated": 1,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_migrates_legacy_keys() {
        let mut storage = legacy_storage();
        let plan = plan(&storage);
        plan.apply(&mut storage);

        assert_eq!(storage.get("sfmOptionEnabled"), Some(&json!("custom")));
        assert_eq!(
            storage.get("sfmOptionEnabledChannels"),
            Some(&json!([
                {"qualifiedName": "twitch/esl_csgo"},
                {"qualifiedName": "twitch/overwatchleague"},
            ]))
        );
        assert_eq!(storage.get("sfmOptionHideDurationInPlayer"), Some(&json!(false)));
        assert_eq!(storage.get("sfmOptionJumpDistance"), Some(&json!("05m")));
        assert_eq!(storage.get("sfmOptionHideTitleInList"), Some(&json!(true)));
        // Malformed legacy value is dropped, new key left to its default.
        assert_eq!(storage.get("sfmOptionTheatreMode"), None);
        assert_eq!(storage.get(VERSION_KEY), Some(&json!(CURRENT_VERSION)));
        assert_eq!(storage.get("unrelated"), Some(&json!(1)));

        for (old_key, _, _) in LEGACY_KEYS {
            assert!(!storage.contains_key(*old_key), "{} still present", old_key);
        }

        let options = Options::from_storage(&storage);
        assert_eq!(options.sfm_mode, SfmMode::Custom);
        assert_eq!(options.enabled_channels.len(), 2);
        assert_eq!(options.jump_distance_secs(), 300);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let mut once = legacy_storage();
        plan(&once).apply(&mut once);

        let mut twice = legacy_storage();
        plan(&twice).apply(&mut twice);
        let second = plan(&twice);
        assert!(second.is_empty());
        second.apply(&mut twice);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_rerun_without_marker_keeps_values() {
        let mut storage = legacy_storage();
        plan(&storage).apply(&mut storage);
        let before = storage.clone();

        storage.remove(VERSION_KEY);
        plan(&storage).apply(&mut storage);
        assert_eq!(storage, before);
    }

    #[test]
    fn test_new_key_wins_over_legacy() {
        let mut storage = json!({"sfmEnabled": "never", "sfmOptionEnabled": "always"})
            .as_object()
            .cloned()
            .unwrap();
        plan(&storage).apply(&mut storage);
        assert_eq!(storage.get("sfmOptionEnabled"), Some(&json!("always")));
        assert!(!storage.contains_key("sfmEnabled"));
    }

    #[test]
    fn test_fresh_install_only_sets_marker() {
        let plan = plan(&OptionMap::new());
        assert!(plan.remove.is_empty());
        assert_eq!(plan.set.len(), 1);
        assert!(plan.set.contains_key(VERSION_KEY));
    }

    #[test]
    fn test_value_transforms() {
        assert_eq!(migrate_mode(&json!(true)), Some(json!("always")));
        assert_eq!(migrate_mode(&json!("NEVER")), Some(json!("never")));
        assert_eq!(migrate_mode(&json!(3)), None);
        assert_eq!(migrate_jump_distance(&json!("90s")), Some(json!("01m30s")));
        assert_eq!(migrate_jump_distance(&json!(0)), None);
    }
}
