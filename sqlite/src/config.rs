//! Store configuration.
//!
//! Names the database file and the CSV files used to bootstrap the
//! reference tables. Stored as YAML; every field has a default, so an empty
//! file is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! database: madang.db
//! sources:
//!   book: data/Book.csv
//!   customer: data/Customer.csv
//!   orders: data/Orders.csv   # or null to always start with no orders
//! ```
//!
//! Relative paths in a loaded file are resolved against the directory that
//! contains the file.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default database file name.
pub const DEFAULT_DATABASE: &str = "madang.db";

/// CSV files used to create the tables on first open.
///
/// `book` and `customer` are required when their tables do not exist yet.
/// `orders` is optional: when absent, or when the file does not exist,
/// `Orders` starts empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSources {
    /// CSV with at least `bookid` and `bookname` columns.
    pub book: PathBuf,
    /// CSV with at least `custid` and `name` columns.
    pub customer: PathBuf,
    /// CSV with `orderid, custid, bookid, saleprice, orderdate` columns.
    pub orders: Option<PathBuf>,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            book: PathBuf::from("Book.csv"),
            customer: PathBuf::from("Customer.csv"),
            orders: Some(PathBuf::from("Orders.csv")),
        }
    }
}

impl DataSources {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::default().resolved_against(dir.as_ref())
    }

    /// Joins relative paths onto `base`; absolute paths are kept.
    pub fn resolved_against(self, base: &Path) -> Self {
        Self {
            book: resolve(base, self.book),
            customer: resolve(base, self.customer),
            orders: self.orders.map(|p| resolve(base, p)),
        }
    }
}

/// Top-level store configuration.
///
/// # Examples
///
/// ```
/// use madang_sqlite::StoreConfig;
///
/// let config: StoreConfig = serde_yaml::from_str("database: shop.db").unwrap();
/// assert_eq!(config.database.to_str(), Some("shop.db"));
/// assert_eq!(config.sources.book.to_str(), Some("Book.csv"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file, fixed for the lifetime of a store handle.
    pub database: PathBuf,
    /// Bootstrap sources.
    pub sources: DataSources,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            sources: DataSources::default(),
        }
    }
}

impl StoreConfig {
    /// Default database and CSV file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::default().resolved_against(dir.as_ref())
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::StoreError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let config: StoreConfig = serde_yaml::from_reader(BufReader::new(file))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolved_against(base))
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Joins relative paths onto `base`; absolute paths are kept.
    pub fn resolved_against(self, base: &Path) -> Self {
        Self {
            database: resolve(base, self.database),
            sources: self.sources.resolved_against(base),
        }
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: StoreConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.sources.orders, Some(PathBuf::from("Orders.csv")));
    }

    #[test]
    fn test_null_orders_disables_seeding() {
        let yaml = r#"
database: shop.db
sources:
  book: books.csv
  orders: null
"#;
        let config: StoreConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sources.book, PathBuf::from("books.csv"));
        assert_eq!(config.sources.customer, PathBuf::from("Customer.csv"));
        assert!(config.sources.orders.is_none());
    }

    #[test]
    fn test_in_dir_resolves_all_paths() {
        let config = StoreConfig::in_dir("/srv/madang");
        assert_eq!(config.database, PathBuf::from("/srv/madang/madang.db"));
        assert_eq!(config.sources.book, PathBuf::from("/srv/madang/Book.csv"));
        assert_eq!(
            config.sources.orders,
            Some(PathBuf::from("/srv/madang/Orders.csv"))
        );
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let sources = DataSources {
            book: PathBuf::from("/data/Book.csv"),
            ..DataSources::default()
        }
        .resolved_against(Path::new("/srv"));
        assert_eq!(sources.book, PathBuf::from("/data/Book.csv"));
        assert_eq!(sources.customer, PathBuf::from("/srv/Customer.csv"));
    }

    #[test]
    fn test_load_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("madang.yml");
        std::fs::write(&path, "database: shop.db\n").unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.database, dir.path().join("shop.db"));
        assert_eq!(config.sources.customer, dir.path().join("Customer.csv"));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("madang.yml");
        let original = StoreConfig::in_dir(dir.path());
        original.save(&path).unwrap();

        let loaded = StoreConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = StoreConfig::load("/nonexistent/madang.yml").unwrap_err();
        assert!(matches!(err, crate::StoreError::IoError(_)));
    }
}
