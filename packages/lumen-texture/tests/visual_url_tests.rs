use lumen_texture::{ProtocolType, UrlType, VisualUrl};

fn classify(url: &str) -> (UrlType, ProtocolType) {
    let url = VisualUrl::new(url);
    (url.url_type(), url.protocol_type())
}

#[cfg(test)]
mod visual_url_tests {
    use super::*;

    #[test]
    fn gif_file_is_local_gif() {
        assert_eq!(classify("foobar.gif"), (UrlType::Gif, ProtocolType::Local));
    }

    #[test]
    fn texture_url_is_regular_image() {
        assert_eq!(
            classify("dali://1"),
            (UrlType::RegularImage, ProtocolType::Texture)
        );
    }

    #[test]
    fn n_patch_infix_survives_trailing_garbage() {
        assert_eq!(classify("foobar.9.9.jpg[]=$$").0, UrlType::NPatch);
        assert_eq!(classify("foobar.#.png").0, UrlType::NPatch);
    }

    #[test]
    fn remote_needs_literal_scheme() {
        assert_eq!(classify("http://bar.org/x.png").1, ProtocolType::Remote);
        assert_eq!(classify("HTTPS://bar.org/x.png").1, ProtocolType::Remote);
        assert_eq!(classify("htp://bar.org/x.png").1, ProtocolType::Local);
        assert_eq!(classify("http:/bar.org/x.png").1, ProtocolType::Local);
    }

    #[test]
    fn buffer_url_is_buffer() {
        let url = VisualUrl::new("enbuf://42");
        assert!(url.is_buffer_resource());
        assert_eq!(url.location(), "42");
    }

    #[test]
    fn created_urls_round_trip() {
        let texture = VisualUrl::create_texture_url("1234");
        assert_eq!(texture, "dali://1234");
        assert_eq!(VisualUrl::new(texture).protocol_type(), ProtocolType::Texture);

        let buffer = VisualUrl::create_buffer_url("1234", "567");
        assert_eq!(buffer, "enbuf://1234567");
        assert_eq!(VisualUrl::new(buffer).protocol_type(), ProtocolType::Buffer);
    }
}
