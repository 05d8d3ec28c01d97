//! Image urls
//!
//! A url is classified by its protocol (`dali://` texture ids, `enbuf://`
//! encoded buffers, remote schemes, everything else local) and by the image
//! type its suffix names.

use crate::error::{TextureError, TextureResult};
use crate::types::TextureId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolType {
    #[default]
    Local,
    Texture,
    Remote,
    Buffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UrlType {
    #[default]
    RegularImage,
    NPatch,
    Svg,
    Gif,
}

const TEXTURE_PREFIX: &str = "dali://";
const BUFFER_PREFIX: &str = "enbuf://";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VisualUrl {
    url: String,
    url_type: UrlType,
    protocol: ProtocolType,
}

fn scheme_matches(url: &[u8], scheme: &str) -> bool {
    let length = scheme.len();
    url.len() > length + 2
        && &url[length..length + 3] == b"://"
        && url[..length].eq_ignore_ascii_case(scheme.as_bytes())
}

fn resolve_location(url: &str) -> ProtocolType {
    let bytes = url.as_bytes();
    if scheme_matches(bytes, "https") {
        ProtocolType::Remote
    } else if scheme_matches(bytes, "enbuf") {
        ProtocolType::Buffer
    } else if scheme_matches(bytes, "http") {
        ProtocolType::Remote
    } else if scheme_matches(bytes, "dali") {
        ProtocolType::Texture
    } else if scheme_matches(bytes, "ftp") || scheme_matches(bytes, "ssh") {
        ProtocolType::Remote
    } else {
        ProtocolType::Local
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Suffix,
    Hash,
    HashDot,
}

/// Scans the url backwards. `.svg` and `.gif` suffixes name their types and
/// `.#.png` or `.9.png` names an n-patch.
fn resolve_type(url: &str) -> UrlType {
    let lower = url.to_ascii_lowercase();
    let bytes = lower.as_bytes();

    if bytes.ends_with(b".svg") {
        return UrlType::Svg;
    }
    if bytes.ends_with(b".gif") {
        return UrlType::Gif;
    }

    let mut state = ScanState::Suffix;
    for &byte in bytes.iter().rev() {
        match state {
            ScanState::Suffix => {
                if byte == b'.' {
                    state = ScanState::Hash;
                }
            }
            ScanState::Hash => {
                if byte == b'#' || byte == b'9' {
                    state = ScanState::HashDot;
                } else {
                    return UrlType::RegularImage;
                }
            }
            ScanState::HashDot => {
                if byte == b'.' {
                    return UrlType::NPatch;
                }
                return UrlType::RegularImage;
            }
        }
    }
    UrlType::RegularImage
}

impl VisualUrl {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        if url.is_empty() {
            return Self::default();
        }
        let protocol = resolve_location(&url);
        let url_type = if protocol == ProtocolType::Texture {
            UrlType::RegularImage
        } else {
            resolve_type(&url)
        };
        Self {
            url,
            url_type,
            protocol,
        }
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn url_type(&self) -> UrlType {
        self.url_type
    }

    #[inline]
    pub fn protocol_type(&self) -> ProtocolType {
        self.protocol
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.url.is_empty()
    }

    pub fn is_local_resource(&self) -> bool {
        self.protocol == ProtocolType::Local
    }

    pub fn is_buffer_resource(&self) -> bool {
        self.protocol == ProtocolType::Buffer
    }

    /// The part after `://`, or the whole url
    pub fn location(&self) -> &str {
        match self.url.find("://") {
            Some(position) => &self.url[position + 3..],
            None => &self.url,
        }
    }

    /// Texture or buffer id named by a `dali://` or `enbuf://` url
    pub fn resource_id(&self) -> TextureResult<TextureId> {
        if !matches!(self.protocol, ProtocolType::Texture | ProtocolType::Buffer) {
            return Err(TextureError::InvalidUrl(self.url.clone()));
        }
        self.location()
            .parse::<u32>()
            .map(TextureId)
            .map_err(|_| TextureError::InvalidUrl(self.url.clone()))
    }

    pub fn create_texture_url(location: &str) -> String {
        format!("{TEXTURE_PREFIX}{location}")
    }

    /// The buffer url is the prefix followed by `location` and `extension`
    pub fn create_buffer_url(location: &str, extension: &str) -> String {
        format!("{BUFFER_PREFIX}{location}{extension}")
    }
}

impl From<&str> for VisualUrl {
    fn from(url: &str) -> Self {
        VisualUrl::new(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocols() {
        assert_eq!(VisualUrl::new("HTTPS://x/a.png").protocol_type(), ProtocolType::Remote);
        assert_eq!(VisualUrl::new("http://x/a.png").protocol_type(), ProtocolType::Remote);
        assert_eq!(VisualUrl::new("ftp://x/a.png").protocol_type(), ProtocolType::Remote);
        assert_eq!(VisualUrl::new("ssh://x/a.png").protocol_type(), ProtocolType::Remote);
        assert_eq!(VisualUrl::new("dali://12").protocol_type(), ProtocolType::Texture);
        assert_eq!(VisualUrl::new("enbuf://3").protocol_type(), ProtocolType::Buffer);
        assert_eq!(VisualUrl::new("/tmp/a.png").protocol_type(), ProtocolType::Local);
        assert_eq!(VisualUrl::new("dali:/12").protocol_type(), ProtocolType::Local);
    }

    #[test]
    fn types() {
        assert_eq!(VisualUrl::new("a.SVG").url_type(), UrlType::Svg);
        assert_eq!(VisualUrl::new("a.gif").url_type(), UrlType::Gif);
        assert_eq!(VisualUrl::new("button.9.png").url_type(), UrlType::NPatch);
        assert_eq!(VisualUrl::new("button.#.png").url_type(), UrlType::NPatch);
        assert_eq!(VisualUrl::new("button9.png").url_type(), UrlType::RegularImage);
        assert_eq!(VisualUrl::new("a.png").url_type(), UrlType::RegularImage);
        assert_eq!(VisualUrl::new("dali://5.svg").url_type(), UrlType::RegularImage);
    }

    #[test]
    fn locations() {
        assert_eq!(VisualUrl::new("dali://1234").location(), "1234");
        assert_eq!(VisualUrl::new("a/b.png").location(), "a/b.png");
        assert_eq!(VisualUrl::new("dali://1234").resource_id().unwrap(), TextureId(1234));
        assert!(VisualUrl::new("a.png").resource_id().is_err());
    }

    #[test]
    fn created_urls() {
        assert_eq!(VisualUrl::create_texture_url("1234"), "dali://1234");
        assert_eq!(VisualUrl::create_buffer_url("1234", "567"), "enbuf://1234567");
    }

    #[test]
    fn empty_url_is_invalid() {
        assert!(!VisualUrl::new("").is_valid());
    }
}
