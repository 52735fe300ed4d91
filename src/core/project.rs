//! Project discovery and on-disk layout
//!
//! Two storage roots exist: the user-wide global directory and the
//! working-directory-local `.linctl/` project directory.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::alias::Scope;
use crate::core::config::{Config, LiveConfig};

/// Name of the per-project directory
pub const PROJECT_DIR: &str = ".linctl";

/// Environment variable overriding the global directory
pub const HOME_ENV: &str = "LINCTL_HOME";

/// Represents a linctl project (a directory holding `.linctl/`)
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .linctl/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Discover a project from `start`, or treat `start` itself as the root
    ///
    /// Project-scope aliases may be written before `linctl init` ran; the
    /// directory is then created on first write.
    pub fn discover_or_at(start: &Path) -> Self {
        Self::discover_from(start).unwrap_or_else(|_| Self {
            root: start.to_path_buf(),
        })
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let project_dir = root.join(PROJECT_DIR);
        if project_dir.exists() {
            return Err(ProjectError::AlreadyExists(root.clone()));
        }

        std::fs::create_dir_all(&project_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        let config_path = project_dir.join("config.yaml");
        std::fs::write(&config_path, Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# linctl project configuration
# Values here override the global config (see `linctl config path`)

# Minutes before cached entity lists are refetched (default: 60)
# cache_ttl_minutes: 60

# Keep entity lists in memory for the duration of a command (default: true)
# entity_cache: true

# Persist entity lists between invocations (default: false)
# persistent_cache: false
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .linctl directory
    pub fn linctl_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }
}

/// Resolve the global (user-wide) directory
///
/// `LINCTL_HOME` wins; otherwise the platform config directory.
pub fn global_dir() -> Result<PathBuf, ProjectError> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    directories::ProjectDirs::from("", "", "linctl")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(ProjectError::NoHomeDirectory)
}

/// Both storage roots for one command invocation
#[derive(Debug, Clone)]
pub struct Workspace {
    global_dir: PathBuf,
    project: Project,
}

impl Workspace {
    /// Build a workspace from explicit roots
    pub fn new(global_dir: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            global_dir: global_dir.into(),
            project: Project {
                root: project_root.into(),
            },
        }
    }

    /// Discover both roots from the environment and `start` (or the current directory)
    pub fn discover(start: Option<&Path>) -> Result<Self, ProjectError> {
        let start = match start {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?,
        };
        Ok(Self {
            global_dir: global_dir()?,
            project: Project::discover_or_at(&start),
        })
    }

    pub fn global_dir(&self) -> &Path {
        &self.global_dir
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Alias document for a scope
    pub fn alias_path(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::Global => self.global_dir.join("aliases.json"),
            Scope::Project => self.project.linctl_dir().join("aliases.json"),
        }
    }

    /// Persistent tier of the entity cache
    pub fn entity_cache_path(&self) -> PathBuf {
        self.global_dir.join("cache").join("entities.json")
    }

    /// Name-to-ID cache used by the project resolver
    pub fn project_name_cache_path(&self) -> PathBuf {
        self.global_dir.join("cache").join("project-names.json")
    }

    pub fn global_config_path(&self) -> PathBuf {
        self.global_dir.join("config.yaml")
    }

    pub fn project_config_path(&self) -> PathBuf {
        self.project.linctl_dir().join("config.yaml")
    }

    /// Load the merged configuration once
    pub fn config(&self) -> Config {
        Config::load_from(&self.global_config_path(), Some(&self.project_config_path()))
    }

    /// Configuration handle that re-reads the files on every query
    pub fn live_config(&self) -> LiveConfig {
        LiveConfig::new(self.global_config_path(), Some(self.project_config_path()))
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a linctl project (searched from {searched_from:?}). Run 'linctl init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("linctl project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("could not determine a home directory; set LINCTL_HOME")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.linctl_dir().is_dir());
        assert!(project.linctl_dir().join("config.yaml").exists());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_discover_finds_linctl_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_or_at_falls_back_to_start() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));

        let project = Project::discover_or_at(tmp.path());
        assert_eq!(project.root(), tmp.path());
    }

    #[test]
    fn test_workspace_paths_are_split_by_scope() {
        let ws = Workspace::new("/home/u/.config/linctl", "/work/repo");
        assert_eq!(
            ws.alias_path(Scope::Global),
            PathBuf::from("/home/u/.config/linctl/aliases.json")
        );
        assert_eq!(
            ws.alias_path(Scope::Project),
            PathBuf::from("/work/repo/.linctl/aliases.json")
        );
        assert!(ws.entity_cache_path().starts_with("/home/u/.config/linctl"));
    }
}
