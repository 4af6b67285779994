use serde::Deserialize;
use serde::Serialize;
use strum_macros::AsRefStr;
use strum_macros::EnumIter;
use strum_macros::EnumString;
use strum_macros::IntoStaticStr;

/// The closed set of things a context reference can point at.
///
/// The serialized form doubles as the kind segment of the reference URI.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    File,
    Folder,
    Web,
    Symbol,
    Image,
    Terminal,
    Problems,
    Git,
    Selection,
    Workspace,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Whether references of this kind carry a primary URI segment.
    pub fn has_payload(self) -> bool {
        matches!(
            self,
            ReferenceKind::File
                | ReferenceKind::Folder
                | ReferenceKind::Web
                | ReferenceKind::Symbol
                | ReferenceKind::Image
        )
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed pointer to something the user attached to a message.
///
/// Optional string fields are expected to be non-empty when present: the URI
/// encoding omits empty parameters, so `Some("")` decodes back as `None`.
/// Likewise a file `column` is only encoded alongside a `line`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextReference {
    File {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
    },
    Folder {
        path: String,
    },
    Web {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Symbol {
        /// Short name shown on the chip.
        name: String,
        qualified_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Image {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime: Option<String>,
    },
    Terminal,
    Problems,
    Git,
    Selection,
    Workspace,
}

impl ContextReference {
    pub fn file(path: impl Into<String>) -> Self {
        ContextReference::File {
            path: path.into(),
            line: None,
            column: None,
        }
    }

    pub fn folder(path: impl Into<String>) -> Self {
        ContextReference::Folder { path: path.into() }
    }

    pub fn web(url: impl Into<String>) -> Self {
        ContextReference::Web {
            url: url.into(),
            title: None,
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        match self {
            ContextReference::File { .. } => ReferenceKind::File,
            ContextReference::Folder { .. } => ReferenceKind::Folder,
            ContextReference::Web { .. } => ReferenceKind::Web,
            ContextReference::Symbol { .. } => ReferenceKind::Symbol,
            ContextReference::Image { .. } => ReferenceKind::Image,
            ContextReference::Terminal => ReferenceKind::Terminal,
            ContextReference::Problems => ReferenceKind::Problems,
            ContextReference::Git => ReferenceKind::Git,
            ContextReference::Selection => ReferenceKind::Selection,
            ContextReference::Workspace => ReferenceKind::Workspace,
        }
    }

    /// Human-readable chip label.
    pub fn display_label(&self) -> String {
        match self {
            ContextReference::File { path, line, .. } => match line {
                Some(line) => format!("{}:{line}", basename(path)),
                None => basename(path).to_string(),
            },
            ContextReference::Folder { path } | ContextReference::Image { path, .. } => {
                basename(path).to_string()
            }
            ContextReference::Web { url, title } => match title {
                Some(title) if !title.is_empty() => title.clone(),
                _ => host_without_www(url),
            },
            ContextReference::Symbol { name, .. } => name.clone(),
            ContextReference::Terminal => "terminal".to_string(),
            ContextReference::Problems => "problems".to_string(),
            ContextReference::Git => "git".to_string(),
            ContextReference::Selection => "selection".to_string(),
            ContextReference::Workspace => "workspace".to_string(),
        }
    }

    pub fn to_uri(&self) -> String {
        crate::encode_reference(self)
    }

    pub fn to_inline_markup(&self) -> String {
        crate::render_inline_markup(self)
    }
}

impl std::str::FromStr for ContextReference {
    type Err = crate::ReferenceUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse_reference_uri(s)
    }
}

/// Final path component, tolerating trailing separators and Windows paths.
fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() => name,
        _ => path,
    }
}

fn host_without_www(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    match parsed.host_str() {
        Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
        None => url.to_string(),
    }
}
