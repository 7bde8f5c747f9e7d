// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::num::NonZeroUsize;

use enum_map::EnumMap;
use gl_backend::{enums::*, GLenum};
use serde::{Deserialize, Serialize};

use crate::{allocator::ObjectKind, GmlError};

/// The most worker threads a [`Gml`](crate::Gml) context can be configured
/// for.
pub const MAX_WORKERS: usize = 32;

/// One worker per CPU core, at most [`MAX_WORKERS`]. The default of
/// [`GmlConfig::max_workers`].
pub fn cpu_worker_count() -> usize {
    std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(MAX_WORKERS)
}

/// Size and prefetch depth of one item server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemServerConfig {
    /// Amount of slots in the ring. At least 2.
    pub capacity: usize,
    /// How many names are kept generated ahead of the requests. Less than
    /// `capacity`.
    pub pregenerate: usize,
}

impl ItemServerConfig {
    #[allow(missing_docs)]
    pub const fn new(capacity: usize, pregenerate: usize) -> ItemServerConfig {
        ItemServerConfig {
            capacity,
            pregenerate,
        }
    }
}

/// Runtime configuration of a [`Gml`](crate::Gml) context. Every field has a
/// default, so a configuration file only needs the fields it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GmlConfig {
    /// Amount of worker queues, at most [`MAX_WORKERS`]. Defaults to
    /// [`cpu_worker_count`].
    pub max_workers: usize,
    /// Initial capacity of each worker queue buffer in bytes.
    pub initial_queue_bytes: usize,
    /// Initial capacity of each auxiliary queue buffer in bytes.
    pub aux_queue_bytes: usize,
    /// The size a queue buffer may grow to before its producer has to wait for
    /// the server to drain it.
    pub max_queue_bytes: usize,
    /// Whether the `cached_*` parameters are read once when the server is
    /// created and answered from memory afterwards.
    pub use_cache: bool,
    #[allow(missing_docs)]
    pub cached_integers: Vec<GLenum>,
    #[allow(missing_docs)]
    pub cached_floats: Vec<GLenum>,
    #[allow(missing_docs)]
    pub cached_strings: Vec<GLenum>,
    /// Compile, link and framebuffer status queries return success without
    /// waiting for the server.
    pub optimistic_status: bool,
    /// `get_error` returns `NO_ERROR` without waiting for the server.
    pub assume_no_error: bool,
    /// The server refreshes the item servers every this many iterations, or
    /// sooner if this many items have been requested since the last refresh.
    pub update_servers_interval: usize,
    /// Log every call made from the auxiliary queue.
    pub call_debug: bool,
    #[allow(missing_docs)]
    pub item_servers: EnumMap<ObjectKind, ItemServerConfig>,
    /// The pool that single display lists are handed out from.
    pub display_lists: ItemServerConfig,
    /// The pool that display list ranges are handed out from.
    pub display_lists_large: ItemServerConfig,
}

impl Default for GmlConfig {
    fn default() -> Self {
        GmlConfig {
            max_workers: cpu_worker_count(),
            initial_queue_bytes: 10,
            aux_queue_bytes: 128 * 1024,
            max_queue_bytes: 64 * 1024 * 1024,
            use_cache: true,
            cached_integers: vec![
                MAX_TEXTURE_SIZE,
                MAX_TEXTURE_UNITS,
                MAX_TEXTURE_IMAGE_UNITS,
                MAX_TEXTURE_COORDS,
                UNPACK_ALIGNMENT,
            ],
            cached_floats: vec![MAX_TEXTURE_MAX_ANISOTROPY],
            cached_strings: vec![VERSION, VENDOR, RENDERER, EXTENSIONS],
            optimistic_status: true,
            assume_no_error: true,
            update_servers_interval: 10,
            call_debug: false,
            item_servers: EnumMap::from_fn(|kind| match kind {
                ObjectKind::Texture | ObjectKind::Quadric => ItemServerConfig::new(100, 25),
                _ => ItemServerConfig::new(2, 0),
            }),
            display_lists: ItemServerConfig::new(100, 25),
            display_lists_large: ItemServerConfig::new(20, 5),
        }
    }
}

impl GmlConfig {
    /// Checks that the values are usable together.
    pub fn validate(&self) -> Result<(), GmlError> {
        if self.max_workers == 0 || self.max_workers > MAX_WORKERS {
            return Err(GmlError::Config(format!(
                "max_workers must be between 1 and {MAX_WORKERS}, got {}",
                self.max_workers
            )));
        }
        if self.initial_queue_bytes > self.max_queue_bytes
            || self.aux_queue_bytes > self.max_queue_bytes
        {
            return Err(GmlError::Config(String::from(
                "initial queue sizes must not exceed max_queue_bytes",
            )));
        }
        if self.max_queue_bytes < crate::record::HEADER_SIZE {
            return Err(GmlError::Config(String::from(
                "max_queue_bytes is too small to fit a single record",
            )));
        }
        if self.update_servers_interval == 0 {
            return Err(GmlError::Config(String::from(
                "update_servers_interval must be at least 1",
            )));
        }
        let servers = self
            .item_servers
            .iter()
            .map(|(kind, config)| (format!("{kind:?}"), config))
            .chain([
                (String::from("display_lists"), &self.display_lists),
                (String::from("display_lists_large"), &self.display_lists_large),
            ]);
        for (name, server) in servers {
            if server.capacity < 2 || server.pregenerate >= server.capacity {
                return Err(GmlError::Config(format!(
                    "item server {name}: capacity must be at least 2 and larger than pregenerate, got {}/{}",
                    server.capacity, server.pregenerate
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{allocator::ObjectKind, GmlError};

    use super::{cpu_worker_count, GmlConfig, ItemServerConfig, MAX_WORKERS};

    #[test]
    fn defaults_are_valid() {
        let config = GmlConfig::default();
        assert_eq!(Ok(()), config.validate());
        assert_eq!(cpu_worker_count(), config.max_workers);
        assert!((1..=MAX_WORKERS).contains(&config.max_workers));
        assert_eq!(
            ItemServerConfig::new(100, 25),
            config.item_servers[ObjectKind::Texture]
        );
        assert_eq!(
            ItemServerConfig::new(2, 0),
            config.item_servers[ObjectKind::Program]
        );
    }

    #[test]
    fn rejects_inconsistent_values() {
        let mut config = GmlConfig {
            max_workers: 33,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GmlError::Config(_))));
        config.max_workers = 4;
        config.item_servers[ObjectKind::Buffer] = ItemServerConfig::new(4, 4);
        assert!(matches!(config.validate(), Err(GmlError::Config(_))));
        config.item_servers[ObjectKind::Buffer] = ItemServerConfig::new(4, 3);
        config.initial_queue_bytes = config.max_queue_bytes + 1;
        assert!(matches!(config.validate(), Err(GmlError::Config(_))));
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: GmlConfig =
            serde_json::from_str(r#"{ "max_workers": 4, "assume_no_error": false }"#).unwrap();
        assert_eq!(4, config.max_workers);
        assert!(!config.assume_no_error);
        assert_eq!(GmlConfig::default().max_queue_bytes, config.max_queue_bytes);
    }

    #[test]
    fn unknown_fields_are_errors() {
        let result = serde_json::from_str::<GmlConfig>(r#"{ "max_wrokers": 4 }"#);
        assert!(result.is_err());
    }
}
