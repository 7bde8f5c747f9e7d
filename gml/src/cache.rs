use std::collections::BTreeMap;

use arrayvec::ArrayVec;
use gl_backend::{GLenum, GLfloat, GLint, GlBackend};

use crate::config::GmlConfig;

/// The most values a cached parameter can have, enough for `VIEWPORT`-like
/// parameters.
const MAX_VALUES: usize = 4;

/// Answers for `get_*` queries whose values don't change after the context
/// is created, so producers don't have to wait for the server to ask.
#[derive(Debug, Default)]
pub struct StateCache {
    integers: BTreeMap<GLenum, ArrayVec<GLint, MAX_VALUES>>,
    floats: BTreeMap<GLenum, ArrayVec<GLfloat, MAX_VALUES>>,
    strings: BTreeMap<GLenum, String>,
}

impl StateCache {
    /// Queries the configured parameters from `backend`. Returns an empty
    /// cache if caching is disabled.
    pub fn fill<B: GlBackend + ?Sized>(backend: &mut B, config: &GmlConfig) -> StateCache {
        let mut cache = StateCache::default();
        if !config.use_cache {
            return cache;
        }
        for &pname in &config.cached_integers {
            let mut values = [0; MAX_VALUES];
            backend.get_integer_v(pname, &mut values);
            cache.integers.insert(pname, ArrayVec::from(values));
        }
        for &pname in &config.cached_floats {
            let mut values = [0.0; MAX_VALUES];
            backend.get_float_v(pname, &mut values);
            cache.floats.insert(pname, ArrayVec::from(values));
        }
        for &name in &config.cached_strings {
            cache.strings.insert(name, backend.get_string(name));
        }
        tracing::debug!(
            "cached {} integer, {} float and {} string parameters",
            cache.integers.len(),
            cache.floats.len(),
            cache.strings.len()
        );
        cache
    }

    /// Copies the cached values into `params`. Returns false if `pname` isn't
    /// cached.
    pub fn integers(&self, pname: GLenum, params: &mut [GLint]) -> bool {
        Self::copy(self.integers.get(&pname), params)
    }

    /// Copies the cached values into `params`. Returns false if `pname` isn't
    /// cached.
    pub fn floats(&self, pname: GLenum, params: &mut [GLfloat]) -> bool {
        Self::copy(self.floats.get(&pname), params)
    }

    pub fn string(&self, name: GLenum) -> Option<&str> {
        self.strings.get(&name).map(String::as_str)
    }

    fn copy<T: Copy>(values: Option<&ArrayVec<T, MAX_VALUES>>, params: &mut [T]) -> bool {
        let Some(values) = values else {
            return false;
        };
        let len = params.len().min(values.len());
        params[..len].copy_from_slice(&values[..len]);
        true
    }
}

#[cfg(test)]
mod tests {
    use gl_backend::{enums::*, RecordingBackend};

    use crate::config::GmlConfig;

    use super::StateCache;

    #[test]
    fn answers_from_memory_after_filling() {
        let mut gl = RecordingBackend::new();
        gl.set_integers(MAX_TEXTURE_SIZE, &[4096]);
        let cache = StateCache::fill(&mut gl, &GmlConfig::default());
        let queries = gl.calls.len();

        let mut size = [0];
        assert!(cache.integers(MAX_TEXTURE_SIZE, &mut size));
        assert_eq!([4096], size);
        let mut anisotropy = [0.0];
        assert!(cache.floats(MAX_TEXTURE_MAX_ANISOTROPY, &mut anisotropy));
        assert_eq!([16.0], anisotropy);
        assert_eq!(Some("recording backend"), cache.string(RENDERER));
        assert!(!cache.integers(VIEWPORT, &mut [0; 4]));
        assert_eq!(queries, gl.calls.len());
    }

    #[test]
    fn disabled_cache_is_empty() {
        let mut gl = RecordingBackend::new();
        let config = GmlConfig {
            use_cache: false,
            ..Default::default()
        };
        let cache = StateCache::fill(&mut gl, &config);
        assert_eq!(None, cache.string(VERSION));
        assert!(gl.calls.is_empty());
    }
}
