//! Two-stage resolution of versioned artifacts to local paths.
//!
//! A request is first looked up in the cache, then fetched from the remote.
//! When the fetch fails for a non-default name, the default name is tried
//! once more. The outcome is a [Resolution], so callers can branch on the
//! fallback without error handling.
use std::fmt::{self, Display};
use std::fs::{create_dir_all, remove_file, rename};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use lisa_core::RunLog;

use super::consts::{DEFAULT_RESOURCE_EXT, DEFAULT_RESOURCE_NAME, PARTIAL_DOWNLOAD_EXT};
use super::errors::{ResolverError, Result, TransportError};
use super::transport::{HttpTransport, Transport};
use super::utils::{expand_path, get_default_cache_folder, get_default_remote_template};

/// Parameterization of one artifact, e.g. `hg38 / 2.0 / basic`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceSpec {
    pub species: String,
    pub version: String,
    pub name: String,
}

impl ResourceSpec {
    pub fn new(species: &str, version: &str, name: &str) -> Self {
        ResourceSpec {
            species: species.to_string(),
            version: version.to_string(),
            name: name.to_string(),
        }
    }

    /// Same species and version, different name.
    pub fn with_name(&self, name: &str) -> Self {
        ResourceSpec {
            name: name.to_string(),
            ..self.clone()
        }
    }
}

impl Display for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.species, self.version, self.name)
    }
}

/// Outcome of [ResourceResolver::resolve].
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Resolved(PathBuf),
    Fallback {
        path: PathBuf,
        requested: ResourceSpec,
        reason: String,
    },
    Failed {
        attempted: Vec<ResourceSpec>,
        reason: String,
    },
}

impl Resolution {
    /// Usable path, if there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(path) | Resolution::Fallback { path, .. } => Some(path),
            Resolution::Failed { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<PathBuf> {
        match self {
            Resolution::Resolved(path) | Resolution::Fallback { path, .. } => Ok(path),
            Resolution::Failed { attempted, reason } => {
                Err(ResolverError::ResourceUnavailable { attempted, reason })
            }
        }
    }
}

/// Builder for a [ResourceResolver].
///
/// ```rust,no_run
/// use lisa_cache::resolver::{ResourceResolver, ResourceSpec};
///
/// # fn main() -> Result<(), lisa_cache::errors::ResolverError> {
/// let resolver = ResourceResolver::builder()
///     .with_cache_folder("/tmp/lisa_cache".into())
///     .finish()?;
/// let path = resolver
///     .resolve(&ResourceSpec::new("hg38", "2.0", "enhanced_10K"))
///     .into_result()?;
/// # Ok(())
/// # }
/// ```
pub struct ResourceResolverBuilder<T: Transport = HttpTransport> {
    cache_folder: Option<PathBuf>,
    remote_template: Option<String>,
    default_name: Option<String>,
    transport: T,
}

impl Default for ResourceResolverBuilder<HttpTransport> {
    fn default() -> Self {
        ResourceResolverBuilder {
            cache_folder: None,
            remote_template: None,
            default_name: None,
            transport: HttpTransport,
        }
    }
}

impl ResourceResolverBuilder<HttpTransport> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Transport> ResourceResolverBuilder<T> {
    pub fn with_cache_folder(mut self, path: PathBuf) -> Self {
        self.cache_folder = Some(path);
        self
    }

    /// Remote URL template with `{species}`, `{version}` and `{name}` placeholders.
    pub fn with_remote_template(mut self, template: String) -> Self {
        self.remote_template = Some(template);
        self
    }

    /// Name substituted when the requested one cannot be fetched.
    pub fn with_default_name(mut self, name: String) -> Self {
        self.default_name = Some(name);
        self
    }

    pub fn with_transport<U: Transport>(self, transport: U) -> ResourceResolverBuilder<U> {
        ResourceResolverBuilder {
            cache_folder: self.cache_folder,
            remote_template: self.remote_template,
            default_name: self.default_name,
            transport,
        }
    }

    pub fn finish(self) -> Result<ResourceResolver<T>> {
        let cache_folder = expand_path(self.cache_folder.unwrap_or_else(get_default_cache_folder));
        create_dir_all(&cache_folder)?;

        Ok(ResourceResolver {
            cache_folder,
            remote_template: self.remote_template.unwrap_or_else(get_default_remote_template),
            default_name: self
                .default_name
                .unwrap_or_else(|| DEFAULT_RESOURCE_NAME.to_string()),
            transport: self.transport,
        })
    }
}

///
/// Resolves [ResourceSpec]s to files under a cache folder laid out as
/// `{cache}/{species}/{version}/{name}.mtx`. Artifacts already present are
/// returned without touching the transport.
///
pub struct ResourceResolver<T: Transport = HttpTransport> {
    pub cache_folder: PathBuf,
    pub remote_template: String,
    pub default_name: String,
    transport: T,
}

impl ResourceResolver<HttpTransport> {
    pub fn builder() -> ResourceResolverBuilder<HttpTransport> {
        ResourceResolverBuilder::new()
    }
}

impl<T: Transport> ResourceResolver<T> {
    pub fn local_path(&self, spec: &ResourceSpec) -> PathBuf {
        self.cache_folder
            .join(&spec.species)
            .join(&spec.version)
            .join(format!("{}{}", spec.name, DEFAULT_RESOURCE_EXT))
    }

    pub fn remote_url(&self, spec: &ResourceSpec) -> String {
        self.remote_template
            .replace("{species}", &spec.species)
            .replace("{version}", &spec.version)
            .replace("{name}", &spec.name)
    }

    fn resolve_once(&self, spec: &ResourceSpec) -> std::result::Result<PathBuf, TransportError> {
        let local_path = self.local_path(spec);
        if local_path.is_file() {
            debug!("{} found in cache at {}", spec, local_path.display());
            return Ok(local_path);
        }

        if let Some(parent) = local_path.parent() {
            create_dir_all(parent)?;
        }

        // download next to the target and move it into place once complete
        let mut partial = local_path.clone().into_os_string();
        partial.push(PARTIAL_DOWNLOAD_EXT);
        let partial = PathBuf::from(partial);

        let remote = self.remote_url(spec);
        info!("Downloading {} from {}", spec, remote);

        let fetched = self
            .transport
            .fetch(&remote, &partial, remote.ends_with(".gz"))
            .and_then(|_| rename(&partial, &local_path).map_err(TransportError::from));

        if fetched.is_err() && partial.exists() {
            let _ = remove_file(&partial);
        }
        fetched.map(|_| local_path)
    }

    ///
    /// Resolve `spec`, falling back once to the default name.
    ///
    /// A request for the default name itself is not retried.
    ///
    pub fn resolve(&self, spec: &ResourceSpec) -> Resolution {
        let first = match self.resolve_once(spec) {
            Ok(path) => return Resolution::Resolved(path),
            Err(e) => e.to_string(),
        };

        if spec.name == self.default_name {
            return Resolution::Failed {
                attempted: vec![spec.clone()],
                reason: first,
            };
        }

        let fallback = spec.with_name(&self.default_name);
        match self.resolve_once(&fallback) {
            Ok(path) => Resolution::Fallback {
                path,
                requested: spec.clone(),
                reason: first,
            },
            Err(e) => Resolution::Failed {
                attempted: vec![spec.clone(), fallback],
                reason: format!("{}; {}", first, e),
            },
        }
    }

    /// Resolve `spec` alone, without falling back to the default name.
    pub fn resolve_exact(&self, spec: &ResourceSpec) -> Result<PathBuf> {
        self.resolve_once(spec)
            .map_err(|e| ResolverError::ResourceUnavailable {
                attempted: vec![spec.clone()],
                reason: e.to_string(),
            })
    }

    /// [Self::resolve], recording a fallback as a single warning in `log`.
    pub fn resolve_logged(&self, spec: &ResourceSpec, log: &mut RunLog) -> Result<PathBuf> {
        let resolution = self.resolve(spec);
        if let Resolution::Fallback {
            requested, reason, ..
        } = &resolution
        {
            log.warn(&format!(
                "Could not fetch {} ({}). Falling back to the \"{}\" map.",
                requested, reason, self.default_name
            ));
        }
        resolution.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs::{read_to_string, write};
    use std::sync::Mutex;

    /// Records every requested URL and refuses anything mentioning `refuse`.
    struct MockTransport {
        refuse: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn refusing(refuse: &[&'static str]) -> Self {
            MockTransport {
                refuse: refuse.to_vec(),
                calls: Mutex::new(vec![]),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for &MockTransport {
        fn fetch(
            &self,
            remote: &str,
            local_path: &Path,
            _is_archive: bool,
        ) -> std::result::Result<(), TransportError> {
            self.calls.lock().unwrap().push(remote.to_string());
            if self.refuse.iter().any(|r| remote.contains(r)) {
                return Err(TransportError::NotFound(remote.to_string()));
            }
            write(local_path, remote)?;
            Ok(())
        }
    }

    fn resolver<'a>(
        cache: &Path,
        transport: &'a MockTransport,
    ) -> ResourceResolver<&'a MockTransport> {
        ResourceResolverBuilder::new()
            .with_cache_folder(cache.to_path_buf())
            .with_remote_template("mirror://{species}_{version}/{name}.mtx".to_string())
            .with_default_name("basic".to_string())
            .with_transport(transport)
            .finish()
            .unwrap()
    }

    #[rstest]
    fn test_local_hit_skips_transport() {
        let cache = tempfile::tempdir().unwrap();
        let transport = MockTransport::refusing(&[]);
        let resolver = resolver(cache.path(), &transport);

        let spec = ResourceSpec::new("hg38", "v1", "basic");
        let local = resolver.local_path(&spec);
        create_dir_all(local.parent().unwrap()).unwrap();
        write(&local, "cached").unwrap();

        let resolution = resolver.resolve(&spec);
        assert_eq!(resolution, Resolution::Resolved(local));
        assert!(transport.calls().is_empty());
    }

    #[rstest]
    fn test_fetch_persists_and_is_not_repeated() {
        let cache = tempfile::tempdir().unwrap();
        let transport = MockTransport::refusing(&[]);
        let resolver = resolver(cache.path(), &transport);
        let spec = ResourceSpec::new("mm10", "2.0", "enhanced_10K");

        let path = resolver.resolve(&spec).into_result().unwrap();
        assert_eq!(path, cache.path().join("mm10/2.0/enhanced_10K.mtx"));
        assert_eq!(read_to_string(&path).unwrap(), "mirror://mm10_2.0/enhanced_10K.mtx");

        resolver.resolve(&spec).into_result().unwrap();
        assert_eq!(transport.calls().len(), 1);
    }

    #[rstest]
    fn test_fallback_to_default_logs_one_warning() {
        let cache = tempfile::tempdir().unwrap();
        let transport = MockTransport::refusing(&["custom"]);
        let resolver = resolver(cache.path(), &transport);
        let mut log = RunLog::new();

        let path = resolver
            .resolve_logged(&ResourceSpec::new("hg38", "v1", "custom"), &mut log)
            .unwrap();

        assert_eq!(path, cache.path().join("hg38/v1/basic.mtx"));
        assert_eq!(log.warnings().len(), 1);
        assert!(log.warnings()[0].contains("hg38/v1/custom"));
        assert!(!cache.path().join("hg38/v1/custom.mtx.part").exists());
    }

    #[rstest]
    fn test_double_failure_is_unavailable() {
        let cache = tempfile::tempdir().unwrap();
        let transport = MockTransport::refusing(&["custom", "basic"]);
        let resolver = resolver(cache.path(), &transport);

        let result = resolver
            .resolve(&ResourceSpec::new("hg38", "v1", "custom"))
            .into_result();

        match result {
            Err(ResolverError::ResourceUnavailable { attempted, .. }) => {
                let names: Vec<&str> = attempted.iter().map(|s| s.name.as_str()).collect();
                assert_eq!(names, vec!["custom", "basic"]);
            }
            other => panic!("expected ResourceUnavailable, got {:?}", other),
        }
        assert_eq!(transport.calls().len(), 2);
    }

    #[rstest]
    fn test_default_name_is_not_retried() {
        let cache = tempfile::tempdir().unwrap();
        let transport = MockTransport::refusing(&["basic"]);
        let resolver = resolver(cache.path(), &transport);

        let resolution = resolver.resolve(&ResourceSpec::new("hg38", "v1", "basic"));
        assert!(resolution.path().is_none());
        assert_eq!(transport.calls().len(), 1);
    }

    #[rstest]
    fn test_exact_resolution_never_requests_default() {
        let cache = tempfile::tempdir().unwrap();
        let transport = MockTransport::refusing(&["custom"]);
        let resolver = resolver(cache.path(), &transport);

        match resolver.resolve_exact(&ResourceSpec::new("hg38", "v1", "custom")) {
            Err(ResolverError::ResourceUnavailable { attempted, .. }) => {
                let names: Vec<&str> = attempted.iter().map(|s| s.name.as_str()).collect();
                assert_eq!(names, vec!["custom"]);
            }
            other => panic!("expected ResourceUnavailable, got {:?}", other),
        }
        assert_eq!(transport.calls(), vec!["mirror://hg38_v1/custom.mtx".to_string()]);
        assert!(!resolver.local_path(&ResourceSpec::new("hg38", "v1", "basic")).exists());
    }

    #[rstest]
    fn test_exact_resolution_fetches_requested() {
        let cache = tempfile::tempdir().unwrap();
        let transport = MockTransport::refusing(&[]);
        let resolver = resolver(cache.path(), &transport);

        let path = resolver
            .resolve_exact(&ResourceSpec::new("hg38", "v1", "custom"))
            .unwrap();
        assert_eq!(read_to_string(path).unwrap(), "mirror://hg38_v1/custom.mtx");
    }

    #[rstest]
    #[case("basic", "http://host/hg38_2.0/rp_maps/basic.mtx.gz")]
    #[case("enhanced_10K", "http://host/hg38_2.0/rp_maps/enhanced_10K.mtx.gz")]
    fn test_remote_url(#[case] name: &str, #[case] expected: &str) {
        let cache = tempfile::tempdir().unwrap();
        let transport = MockTransport::refusing(&[]);
        let resolver = ResourceResolverBuilder::new()
            .with_cache_folder(cache.path().to_path_buf())
            .with_remote_template(
                "http://host/{species}_{version}/rp_maps/{name}.mtx.gz".to_string(),
            )
            .with_transport(&transport)
            .finish()
            .unwrap();

        assert_eq!(
            resolver.remote_url(&ResourceSpec::new("hg38", "2.0", name)),
            expected
        );
    }
}
