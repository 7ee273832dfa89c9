use std::collections::BTreeMap;
use std::io;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Read/write access used by the engine. Documents are independent so
/// implementations must be shareable across threads.
pub trait FileSystem: Send + Sync {
	fn read_to_string(&self, path: &Path) -> io::Result<String>;

	/// Replace the whole file in one logical write.
	fn write(&self, path: &Path, content: &str) -> io::Result<()>;

	/// Read a file, mapping "not found" to `None`.
	fn read_optional(&self, path: &Path) -> io::Result<Option<String>> {
		match self.read_to_string(path) {
			Ok(content) => Ok(Some(content)),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e),
		}
	}
}

/// Resolve `.` and `..` components without touching the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();

	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				if !normalized.pop() {
					normalized.push(component);
				}
			}
			other => normalized.push(other),
		}
	}

	normalized
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
	fn read_to_string(&self, path: &Path) -> io::Result<String> {
		std::fs::read_to_string(path)
	}

	fn write(&self, path: &Path, content: &str) -> io::Result<()> {
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}

		let temp_path = path.with_extension(format!(
			"docweave.tmp-{}-{}",
			std::process::id(),
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.map_or(0, |duration| duration.as_nanos())
		));

		std::fs::write(&temp_path, content)?;
		if let Err(e) = std::fs::rename(&temp_path, path) {
			let _ = std::fs::remove_file(&temp_path);
			return Err(e);
		}

		Ok(())
	}
}

/// An in-memory file system. Counts writes so tests can assert that check
/// runs never mutate anything.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
	files: Mutex<BTreeMap<PathBuf, String>>,
	writes: AtomicUsize,
}

impl MemoryFileSystem {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a file without counting it as a write.
	pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
		self.lock().insert(path.into(), content.into());
	}

	pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
		self.lock().get(path.as_ref()).cloned()
	}

	/// Number of calls to [`FileSystem::write`] so far.
	pub fn write_count(&self) -> usize {
		self.writes.load(Ordering::SeqCst)
	}

	/// A copy of every file.
	pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
		self.lock().clone()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>> {
		self.files.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl FileSystem for MemoryFileSystem {
	fn read_to_string(&self, path: &Path) -> io::Result<String> {
		self.lock().get(path).cloned().ok_or_else(|| {
			io::Error::new(
				io::ErrorKind::NotFound,
				format!("{} does not exist", path.display()),
			)
		})
	}

	fn write(&self, path: &Path, content: &str) -> io::Result<()> {
		self.writes.fetch_add(1, Ordering::SeqCst);
		self.lock().insert(path.to_path_buf(), content.to_string());
		Ok(())
	}
}
