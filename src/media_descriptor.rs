//! Media descriptor construction for a cast attempt.

use std::path::Path;

use crate::capabilities::MediaElement;
use crate::protocol::{ContentType, MediaDescriptor};

/// Source URL the page is playing: the first child `<source>` wins over `src`.
pub fn resolve_source_url(element: &dyn MediaElement) -> String {
    element
        .first_source_url()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| element.src().trim().to_string())
}

fn strip_query_and_fragment(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Classifies a source by the extension of its URL path.
pub fn content_type_for_url(url: &str) -> ContentType {
    let path = strip_query_and_fragment(url.trim());
    let ext = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => ContentType::Mp4,
        "m3u8" => ContentType::Hls,
        "webm" => ContentType::WebM,
        _ => ContentType::Unknown,
    }
}

/// Builds the descriptor for the element, `None` when it has no playable source.
pub fn build_descriptor(element: &dyn MediaElement) -> Option<MediaDescriptor> {
    let source_url = resolve_source_url(element);
    let content_type = content_type_for_url(&source_url);
    MediaDescriptor::new(&source_url, content_type)
}

#[cfg(test)]
mod tests {
    use super::{build_descriptor, content_type_for_url, resolve_source_url};
    use crate::protocol::ContentType;
    use crate::simulated::SimulatedMediaElement;

    #[test]
    fn test_content_type_follows_extension() {
        assert_eq!(content_type_for_url("movie.mp4"), ContentType::Mp4);
        assert_eq!(content_type_for_url("stream.m3u8"), ContentType::Hls);
        assert_eq!(content_type_for_url("clip.webm"), ContentType::WebM);
        assert_eq!(content_type_for_url("track.ogv"), ContentType::Unknown);
        assert_eq!(content_type_for_url("no_extension"), ContentType::Unknown);
    }

    #[test]
    fn test_content_type_ignores_query_fragment_and_case() {
        assert_eq!(
            content_type_for_url("https://cdn.example/v/Movie.MP4?token=a.webm"),
            ContentType::Mp4
        );
        assert_eq!(
            content_type_for_url("https://cdn.example/live/index.m3u8#t=10"),
            ContentType::Hls
        );
    }

    #[test]
    fn test_child_source_wins_over_src_attribute() {
        let element = SimulatedMediaElement::new("fallback.webm");
        element.set_first_source(Some("primary.m3u8"));
        assert_eq!(resolve_source_url(&element), "primary.m3u8");

        let descriptor = build_descriptor(&element).expect("descriptor should build");
        assert_eq!(descriptor.content_type(), ContentType::Hls);
    }

    #[test]
    fn test_blank_child_source_falls_back_to_src() {
        let element = SimulatedMediaElement::new("clip.webm");
        element.set_first_source(Some("  "));
        let descriptor = build_descriptor(&element).expect("descriptor should build");
        assert_eq!(descriptor.source_url(), "clip.webm");
        assert_eq!(descriptor.content_type(), ContentType::WebM);
    }

    #[test]
    fn test_element_without_source_has_no_descriptor() {
        let element = SimulatedMediaElement::new("");
        assert!(build_descriptor(&element).is_none());
    }
}
