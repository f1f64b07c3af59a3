//! JSON-snapshot [`ConfigSource`] that re-reads its file whenever it changes on disk.

// std
use std::{
	fs,
	path::{Path, PathBuf},
	time::SystemTime,
};
// self
use crate::{
	_prelude::*,
	config::{ConfigFuture, ConfigSnapshot, ConfigSource},
	error::ConfigError,
	model::{
		ApiCode, ApiDefinition, ApiDefinitionId, ParameterMapping, RateLimitConfig, TenantCode,
		TenantId, TenantRecord,
	},
};

#[derive(Debug, Default)]
struct Loaded {
	modified: Option<SystemTime>,
	snapshot: ConfigSnapshot,
}

/// Reads configuration from a [`ConfigSnapshot`] JSON document.
///
/// The file's modification time is checked on every lookup, so edits are observed on the
/// next message without a restart. A file that disappears or fails to parse surfaces as
/// [`ConfigError::Backend`], which the pipeline treats as retryable.
#[derive(Clone, Debug)]
pub struct FileConfig {
	path: PathBuf,
	inner: Arc<RwLock<Loaded>>,
}
impl FileConfig {
	/// Opens the snapshot at `path`, loading it eagerly.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
		let path = path.into();
		let (modified, snapshot) = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(Loaded { modified, snapshot })) })
	}

	/// Path of the backing document.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<(Option<SystemTime>, ConfigSnapshot), ConfigError> {
		let modified = Self::modified(path)?;
		let bytes = fs::read(path).map_err(|e| ConfigError::Backend {
			message: format!("failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok((modified, ConfigSnapshot::default()));
		}

		let de = &mut serde_json::Deserializer::from_slice(&bytes);
		let snapshot = serde_path_to_error::deserialize(de).map_err(|e| ConfigError::Backend {
			message: format!("failed to parse {} at `{}`: {}", path.display(), e.path(), e.inner()),
		})?;

		Ok((modified, snapshot))
	}

	fn modified(path: &Path) -> Result<Option<SystemTime>, ConfigError> {
		let metadata = path.metadata().map_err(|e| ConfigError::Backend {
			message: format!("failed to inspect {}: {e}", path.display()),
		})?;

		Ok(metadata.modified().ok())
	}

	fn refresh(&self) -> Result<(), ConfigError> {
		let modified = Self::modified(&self.path)?;

		if modified.is_some() && self.inner.read().modified == modified {
			return Ok(());
		}

		let (modified, snapshot) = Self::load_snapshot(&self.path)?;

		tracing::debug!(path = %self.path.display(), "reloaded configuration snapshot");

		*self.inner.write() = Loaded { modified, snapshot };

		Ok(())
	}

	fn with_snapshot<T>(&self, f: impl FnOnce(&ConfigSnapshot) -> T) -> Result<T, ConfigError> {
		self.refresh()?;

		Ok(f(&self.inner.read().snapshot))
	}
}
impl ConfigSource for FileConfig {
	fn active_tenant<'a>(&'a self, code: &'a TenantCode) -> ConfigFuture<'a, TenantRecord> {
		Box::pin(async move { self.with_snapshot(|s| s.active_tenant(code))? })
	}

	fn active_api_definition<'a>(
		&'a self,
		tenant: &'a TenantCode,
		api: &'a ApiCode,
	) -> ConfigFuture<'a, ApiDefinition> {
		Box::pin(async move { self.with_snapshot(|s| s.active_api_definition(tenant, api))? })
	}

	fn parameter_mappings(&self, api: ApiDefinitionId) -> ConfigFuture<'_, Vec<ParameterMapping>> {
		Box::pin(async move { self.with_snapshot(|s| s.parameter_mappings(api)) })
	}

	fn rate_limit_config<'a>(
		&'a self,
		tenant: TenantId,
		api: Option<&'a ApiCode>,
	) -> ConfigFuture<'a, Option<RateLimitConfig>> {
		Box::pin(async move { self.with_snapshot(|s| s.rate_limit_config(tenant, api)) })
	}
}
