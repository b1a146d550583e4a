use std::io::Cursor;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imagehost_backend::{
    errors::AppError,
    pagination::{decode_page_token, encode_page_token, StoreCursor},
    validation::{content, metadata},
};

/// Pixel noise keeps the encoded file over the 1KB floor even at small
/// dimensions.
fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut seed: u32 = 0x2545f491;
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let [a, b, c, _] = seed.to_le_bytes();
        Rgb([a, b, c])
    }));

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).expect("image encode");
    buf.into_inner()
}

#[test]
fn decoded_facts_come_from_pixels_not_claims() {
    // The extension says jpg; the bytes say png. The bytes win.
    let bytes = image_bytes(300, 150, ImageFormat::Png);
    assert!(content::validate_extension("misnamed.jpg").is_ok());

    let decoded = content::validate_content(&bytes).unwrap();
    assert_eq!(decoded.format, "png");
    assert_eq!((decoded.width, decoded.height), (300, 150));
}

#[test]
fn jpeg_and_png_are_both_accepted() {
    for format in [ImageFormat::Jpeg, ImageFormat::Png] {
        let decoded = content::validate_content(&image_bytes(200, 200, format)).unwrap();
        assert_eq!((decoded.width, decoded.height), (200, 200));
    }
}

#[test]
fn non_image_payloads_fail_with_validation_error() {
    let candidates: [&[u8]; 3] = [
        b"plain text pretending to be an image",
        &[0u8; 64],
        b"%PDF-1.7 not an image at all",
    ];
    for bytes in candidates {
        assert!(matches!(
            content::validate_content(bytes),
            Err(AppError::Validation(_))
        ));
    }
}

#[test]
fn dimension_policy_applies_regardless_of_file_size() {
    // A perfectly decodable image that is simply too small on one axis.
    let bytes = image_bytes(800, 20, ImageFormat::Png);
    assert!(content::validate_size(bytes.len()).is_ok());
    assert!(content::validate_content(&bytes).is_err());
}

#[test]
fn size_policy_bounds_are_enforced() {
    assert!(content::validate_size(10).is_err());
    assert!(content::validate_size(1024).is_ok());
    assert!(content::validate_size(10 * 1024 * 1024).is_ok());
    assert!(content::validate_size(10 * 1024 * 1024 + 1).is_err());
}

#[test]
fn extension_check_is_suffix_only_and_case_insensitive() {
    assert!(content::validate_extension("IMG_0001.JPG").is_ok());
    assert!(content::validate_extension("archive.backup.webp").is_ok());
    assert!(content::validate_extension("no_extension").is_err());
    assert!(content::validate_extension("").is_err());
    assert!(content::validate_extension("script.sh").is_err());
}

#[test]
fn metadata_field_checks_are_independent() {
    // Each check only looks at its own field, in any order.
    assert!(metadata::validate_owner_id("user-1").is_ok());
    assert!(metadata::validate_title(Some("A title")).is_ok());
    assert!(metadata::validate_description(None).is_ok());
    assert!(metadata::validate_tags(Some(&["one".to_string()])).is_ok());

    assert!(metadata::validate_owner_id("bad owner!").is_err());
    assert!(metadata::validate_title(Some(&"t".repeat(201))).is_err());
    assert!(metadata::validate_tags(Some(&["ok".to_string(), "%bad%".to_string()])).is_err());
}

#[test]
fn page_token_round_trips_arbitrary_cursors() {
    let cursors = [
        StoreCursor::from([("image_id".to_string(), "a".to_string())]),
        StoreCursor::from([
            ("image_id".to_string(), "b3c".to_string()),
            ("created_at".to_string(), "2026-08-08T12:00:00.000001Z".to_string()),
        ]),
        StoreCursor::from([
            ("image_id".to_string(), "x".to_string()),
            ("created_at".to_string(), "t".to_string()),
            ("owner_id".to_string(), "owner_with-dashes_and_underscores".to_string()),
        ]),
    ];

    for cursor in cursors {
        let token = encode_page_token(&cursor).unwrap();
        assert_eq!(decode_page_token(&token).unwrap(), cursor);
    }
}

#[test]
fn page_token_decode_fails_closed() {
    for bad in ["", "   ", "!!!", "AAAA", "bm90IGpzb24"] {
        assert!(decode_page_token(bad).is_err(), "accepted {bad:?}");
    }

    // Valid base64 carrying the wrong JSON shape.
    for payload in [&b"[]"[..], b"{}", b"42", b"null", b"\"s\""] {
        let token = URL_SAFE_NO_PAD.encode(payload);
        assert!(decode_page_token(&token).is_err());
    }
}

#[test]
fn page_token_decode_never_panics_on_fuzzed_input() {
    let samples = [
        "e30!", "=====", "\u{1F600}", "a", "ab", "abc",
        "eyJrIjoidiJ9eyJrIjoidiJ9", "////", "----", "____",
    ];
    for sample in samples {
        let _ = decode_page_token(sample);
    }
}
