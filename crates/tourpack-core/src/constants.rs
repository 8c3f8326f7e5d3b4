//! Pipeline-wide constants.

/// Prefix under which every archive namespace is created.
pub const TOURS_PREFIX: &str = "tours/";

/// Extension (lowercase) an uploaded object must carry to be treated as an archive.
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// `eventSource` value of storage upload notifications.
pub const S3_EVENT_SOURCE: &str = "aws:s3";

/// Content type used when an entry's extension is not in the MIME table.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Default cap on a downloaded archive (1 GiB).
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 1024 * 1024 * 1024;

/// Default cap on a single decompressed entry (256 MiB).
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Leaf names recognised as a tour's entry point, in priority order of discovery.
pub const ENTRY_POINT_NAMES: [&str; 3] = ["index.html", "tour.html", "main.html"];

/// Leaf names recognised as a tour's configuration file.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["tour.json", "config.json", "manifest.json"];

/// Metadata keys attached to every extracted object.
pub const META_ORIGINAL_ARCHIVE: &str = "original_zip";
pub const META_EXTRACTION_TIME: &str = "extraction_time";
pub const META_TOUR_NAME: &str = "tour_name";
