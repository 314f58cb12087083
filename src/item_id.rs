/// Stable item identifiers for documents on the device.
///
/// The firmware refers to every document in `collections.json` by an opaque
/// token. Purchased books carry their ASIN and content type in the file name
/// (`Title-asin_B000FC1PJI-type_EBOK-v_0.azw`) and are identified as
/// `#<ASIN>^<TYPE>`. Everything else is identified by the SHA-1 of its path as
/// the device sees it (`/mnt/us/<relative path>`), prefixed with `*`.
///
/// # Examples
///
/// ```
/// use kindle_collections::item_id::derive_item_id;
///
/// let id = derive_item_id("documents/Dune-asin_B00B7NPRY8-type_EBOK-v_0.azw");
/// assert_eq!(id.as_str(), "#B00B7NPRY8^EBOK");
///
/// let id = derive_item_id("documents/notes.txt");
/// assert!(id.as_str().starts_with('*'));
/// ```
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::sync::LazyLock;

/// Mount point of the user partition on the device.
const DEVICE_ROOT: &str = "/mnt/us/";

static STRUCTURED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*?-asin_([a-zA-Z0-9_]+)-type_([a-zA-Z0-9_]+)-v_([0-9]+)\.([^[:space:].]+)$")
        .expect("structured name pattern is valid")
});

/// Identifier of one document inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps an identifier read from an existing mapping.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for identifiers derived from an ASIN file name.
    pub fn is_structured(&self) -> bool {
        self.0.starts_with('#')
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Derives the identifier for a file given its path relative to the scan root.
///
/// Both `/` and `\` are accepted as separators. The result depends only on
/// the path string; file contents are never read.
pub fn derive_item_id(relative_path: &str) -> ItemId {
    let base_name = relative_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(relative_path);

    if let Some(caps) = STRUCTURED_NAME.captures(base_name) {
        return ItemId(format!("#{}^{}", &caps[1], &caps[2]));
    }

    let device_path = format!("{}{}", DEVICE_ROOT, relative_path.replace('\\', "/"));
    let mut hasher = Sha1::new();
    hasher.update(device_path.as_bytes());
    ItemId(format!("*{}", hex::encode(hasher.finalize())))
}
