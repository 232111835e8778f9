//! FileDestination - writes uploads into a local directory

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use contracts::{ByteStream, ContractError, Destination};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Configuration for FileDestination
#[derive(Debug, Clone)]
pub struct FileDestinationConfig {
    /// Directory uploads are written into
    pub dir: PathBuf,
    /// Create `dir` (and parents) if missing
    pub create_dirs: bool,
}

impl FileDestinationConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let dir = params
            .get("dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./uploads"));
        let create_dirs = params
            .get("create_dirs")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        Self { dir, create_dirs }
    }
}

/// Destination that stores each upload as `<dir>/<name>`
#[derive(Debug)]
pub struct FileDestination {
    name: String,
    dir: PathBuf,
}

impl FileDestination {
    /// Create a new FileDestination
    ///
    /// The directory must exist (unless `create_dirs` is set), be a
    /// directory and be writable.
    pub fn new(name: impl Into<String>, config: FileDestinationConfig) -> Result<Self, ContractError> {
        let name = name.into();

        if config.create_dirs {
            fs::create_dir_all(&config.dir)?;
        }

        let meta = fs::metadata(&config.dir).map_err(|e| {
            ContractError::destination_creation(
                &name,
                format!("cannot stat '{}': {e}", config.dir.display()),
            )
        })?;
        if !meta.is_dir() {
            return Err(ContractError::destination_creation(
                &name,
                format!("'{}' is not a directory", config.dir.display()),
            ));
        }
        if meta.permissions().readonly() {
            return Err(ContractError::destination_creation(
                &name,
                format!("'{}' is not writable", config.dir.display()),
            ));
        }

        Ok(Self {
            name,
            dir: config.dir,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        Self::new(name, FileDestinationConfig::from_params(params))
    }

    /// Directory uploads are written into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve an upload name to a path inside `dir`
    fn target_path(&self, upload: &str) -> Result<PathBuf, ContractError> {
        let mut components = Path::new(upload).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Ok(self.dir.join(file)),
            _ => Err(ContractError::destination_write(
                &self.name,
                format!("invalid upload name '{upload}'"),
            )),
        }
    }

    async fn write_stream(
        &self,
        path: &Path,
        stream: &mut ByteStream,
    ) -> std::io::Result<u64> {
        let mut file: File = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;

        let bytes = tokio::io::copy(stream, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(bytes)
    }
}

impl Destination for FileDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_destination_save",
        skip(self, stream),
        fields(destination = %self.name)
    )]
    async fn save(&self, name: &str, mut stream: ByteStream) -> Result<u64, ContractError> {
        let path = self.target_path(name)?;
        let started = Instant::now();

        match self.write_stream(&path, &mut stream).await {
            Ok(bytes) => {
                info!(
                    destination = %self.name,
                    bytes,
                    path = %path.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Copied upload to disk"
                );
                Ok(bytes)
            }
            Err(e) => {
                warn!(destination = %self.name, path = %path.display(), error = %e, "Write failed");
                drop(stream);
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    debug!(path = %path.display(), error = %remove_err, "Partial file not removed");
                }
                Err(ContractError::destination_write(&self.name, e.to_string()))
            }
        }
    }
}
