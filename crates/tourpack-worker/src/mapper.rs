//! Archive entry → destination key mapping.
//!
//! Every archive gets its own namespace, `tours/{archive base name}/`, and every kept
//! entry lands directly inside it under its leaf name. Directory structure inside the
//! archive is discarded, so two entries sharing a leaf name map to the same key and
//! the one extracted last wins.

use tourpack_core::constants::{DEFAULT_CONTENT_TYPE, TOURS_PREFIX};

/// Why an entry is not extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Directory,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryMapping {
    Extract {
        destination_key: String,
        leaf: String,
        content_type: &'static str,
    },
    Skip(SkipReason),
}

/// Maps the entries of one archive into its namespace
#[derive(Debug, Clone)]
pub struct EntryMapper {
    tour_name: String,
    namespace: String,
}

impl EntryMapper {
    pub fn new(archive_key: &str) -> Self {
        let tour_name = tour_name(archive_key).to_string();
        let namespace = format!("{}{}/", TOURS_PREFIX, tour_name);
        Self {
            tour_name,
            namespace,
        }
    }

    /// `tours/{base}/`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Archive base name without its last extension
    pub fn tour_name(&self) -> &str {
        &self.tour_name
    }

    /// Decide what happens to the entry at `entry_path`.
    ///
    /// `is_dir` is the container's own directory flag; paths ending in a separator are
    /// treated as directories regardless.
    pub fn map_entry(&self, entry_path: &str, is_dir: bool) -> EntryMapping {
        if is_dir || entry_path.ends_with('/') || entry_path.ends_with('\\') {
            return EntryMapping::Skip(SkipReason::Directory);
        }

        let leaf = leaf_name(entry_path);
        if leaf.is_empty() {
            return EntryMapping::Skip(SkipReason::Directory);
        }
        // Also covers "." and ".."
        if leaf.starts_with('.') {
            return EntryMapping::Skip(SkipReason::Hidden);
        }

        EntryMapping::Extract {
            destination_key: format!("{}{}", self.namespace, leaf),
            leaf: leaf.to_string(),
            content_type: content_type_for(leaf),
        }
    }
}

/// Last path component, splitting on both `/` and `\`.
pub fn leaf_name(entry_path: &str) -> &str {
    entry_path.rsplit(['/', '\\']).next().unwrap_or(entry_path)
}

/// Object key base name with the last extension removed (`uploads/My Tour.zip` → `My Tour`).
pub fn tour_name(archive_key: &str) -> &str {
    let base = archive_key.rsplit('/').next().unwrap_or(archive_key);
    match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    }
}

/// MIME type for a file name, by extension
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = match filename.rfind('.') {
        Some(dot) => filename[dot + 1..].to_lowercase(),
        None => return DEFAULT_CONTENT_TYPE,
    };

    match extension.as_str() {
        // Documents
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "m4v" => "video/x-m4v",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        // 3D / tour assets
        "wasm" => "application/wasm",
        "glb" => "model/gltf-binary",
        "gltf" => "model/gltf+json",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_key(mapping: EntryMapping) -> String {
        match mapping {
            EntryMapping::Extract {
                destination_key, ..
            } => destination_key,
            EntryMapping::Skip(reason) => panic!("unexpected skip: {:?}", reason),
        }
    }

    #[test]
    fn namespace_from_archive_base_name() {
        assert_eq!(EntryMapper::new("uploads/My Tour.zip").namespace(), "tours/My Tour/");
        assert_eq!(EntryMapper::new("a.b.zip").namespace(), "tours/a.b/");
        assert_eq!(EntryMapper::new("deep/path/x.ZIP").tour_name(), "x");
        // A bare extension is kept as the name
        assert_eq!(tour_name(".zip"), ".zip");
    }

    #[test]
    fn flattens_nested_paths() {
        let mapper = EntryMapper::new("uploads/demo.zip");
        assert_eq!(
            extract_key(mapper.map_entry("a/b/x.html", false)),
            "tours/demo/x.html"
        );
        assert_eq!(
            extract_key(mapper.map_entry("c\\x.html", false)),
            "tours/demo/x.html"
        );
    }

    #[test]
    fn skips_directories() {
        let mapper = EntryMapper::new("demo.zip");
        assert_eq!(mapper.map_entry("assets/", false), EntryMapping::Skip(SkipReason::Directory));
        assert_eq!(mapper.map_entry("assets\\", false), EntryMapping::Skip(SkipReason::Directory));
        assert_eq!(mapper.map_entry("assets", true), EntryMapping::Skip(SkipReason::Directory));
    }

    #[test]
    fn skips_hidden_leaves() {
        let mapper = EntryMapper::new("demo.zip");
        assert_eq!(mapper.map_entry(".DS_Store", false), EntryMapping::Skip(SkipReason::Hidden));
        assert_eq!(
            mapper.map_entry("__MACOSX/img/._pano.jpg", false),
            EntryMapping::Skip(SkipReason::Hidden)
        );
        assert_eq!(mapper.map_entry("a/..", false), EntryMapping::Skip(SkipReason::Hidden));
        assert_eq!(mapper.map_entry("..", false), EntryMapping::Skip(SkipReason::Hidden));
    }

    #[test]
    fn keys_never_escape_namespace() {
        let mapper = EntryMapper::new("uploads/demo.zip");
        let paths = [
            "../../etc/passwd",
            "/abs/path/file.js",
            "..\\..\\win.ini",
            "a/../../b.css",
            "C:\\tour\\index.html",
        ];
        for path in paths {
            if let EntryMapping::Extract {
                destination_key, ..
            } = mapper.map_entry(path, false)
            {
                let rest = destination_key
                    .strip_prefix("tours/demo/")
                    .unwrap_or_else(|| panic!("{} escaped: {}", path, destination_key));
                assert!(!rest.contains('/') && !rest.contains('\\'), "{}", destination_key);
                assert!(!rest.is_empty());
            }
        }
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("index.HTML"), "text/html");
        assert_eq!(content_type_for("style.css"), "text/css");
        assert_eq!(content_type_for("tour.json"), "application/json");
        assert_eq!(content_type_for("pano.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("blob.xyz"), "application/octet-stream");
        assert_eq!(content_type_for("Makefile"), "application/octet-stream");
    }
}
