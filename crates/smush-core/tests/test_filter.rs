mod common;

use smush_core::error::SmushError;
use smush_core::frame::{DecodedImage, PixelData, PixelLayout};
use smush_core::io::filter::{Extent, FilterChain, FilterStep, PixelFormat, Rotation};

use common::solid;

#[test]
fn test_parse_default_proxy_filter() {
    let chain = FilterChain::parse("crop=in_w*.5:in_h*.5:in_w*.25:in_h*.25,scale=32:32").unwrap();
    assert_eq!(
        chain.steps(),
        &[
            FilterStep::Crop {
                width: Extent::InputWidth(0.5),
                height: Extent::InputHeight(0.5),
                x: Extent::InputWidth(0.25),
                y: Extent::InputHeight(0.25),
            },
            FilterStep::Scale {
                width: Some(32),
                height: Some(32),
            },
        ]
    );
}

#[test]
fn test_parse_other_steps() {
    let chain: FilterChain = "transpose=1,transpose=2,format=gray,scale=-1:100,crop=in_w/2:10:0:0"
        .parse()
        .unwrap();
    assert_eq!(chain.steps()[0], FilterStep::Transpose(Rotation::Clockwise));
    assert_eq!(chain.steps()[1], FilterStep::Transpose(Rotation::CounterClockwise));
    assert_eq!(chain.steps()[2], FilterStep::Format(PixelFormat::Gray));
    assert_eq!(
        chain.steps()[3],
        FilterStep::Scale {
            width: None,
            height: Some(100)
        }
    );
    assert_eq!(
        chain.steps()[4],
        FilterStep::Crop {
            width: Extent::InputWidth(0.5),
            height: Extent::Pixels(10),
            x: Extent::Pixels(0),
            y: Extent::Pixels(0),
        }
    );
}

#[test]
fn test_empty_chain() {
    let chain = FilterChain::parse("").unwrap();
    assert!(chain.is_empty());
    let frame = solid(3, 3, [1, 2, 3]);
    assert_eq!(chain.apply(frame.clone()).unwrap(), frame);
}

#[test]
fn test_parse_errors() {
    for text in [
        "blur=3",
        "crop=1:2:3",
        "scale=0:10",
        "scale=-1:-1",
        "crop=in_w*x:1:0:0",
        "crop=in_w/0:1:0:0",
        "transpose=3",
        "scale",
    ] {
        assert!(
            matches!(FilterChain::parse(text), Err(SmushError::InvalidFilter(_))),
            "{text}"
        );
    }
}

#[test]
fn test_display_roundtrip() {
    let text = "crop=in_w*0.5:in_h*0.5:in_w*0.25:in_h*0.25,scale=32:-1,transpose=1,format=bgr24";
    let chain = FilterChain::parse(text).unwrap();
    let reparsed = FilterChain::parse(&chain.to_string()).unwrap();
    assert_eq!(chain, reparsed);
}

#[test]
fn test_crop_and_scale_dimensions() {
    let frame = DecodedImage::from_fn(64, 48, |x, y| [x as u8, y as u8, 0]).unwrap();
    let chain = FilterChain::parse("crop=in_w*.5:in_h*.5:in_w*.25:in_h*.25").unwrap();
    let cropped = chain.apply(frame.clone()).unwrap();
    assert_eq!((cropped.width(), cropped.height()), (32, 24));
    // Top-left of the crop is source pixel (16, 12).
    assert_eq!(cropped.rgb(0), [16, 12, 0]);

    let scaled = FilterChain::parse("scale=16:-1").unwrap().apply(frame).unwrap();
    assert_eq!((scaled.width(), scaled.height()), (16, 12));
}

#[test]
fn test_crop_out_of_bounds() {
    let chain = FilterChain::parse("crop=10:10:5:0").unwrap();
    assert!(matches!(
        chain.apply(solid(12, 12, [0, 0, 0])),
        Err(SmushError::InvalidFilter(_))
    ));
}

#[test]
fn test_transpose_swaps_dimensions() {
    // Red pixel in the top-left corner.
    let frame = DecodedImage::from_fn(4, 2, |x, y| {
        if x == 0 && y == 0 {
            [255, 0, 0]
        } else {
            [0, 0, 0]
        }
    })
    .unwrap();
    let cw = FilterChain::parse("transpose=1").unwrap().apply(frame.clone()).unwrap();
    assert_eq!((cw.width(), cw.height()), (2, 4));
    // Clockwise moves the top-left corner to the top-right.
    assert_eq!(cw.rgb(1), [255, 0, 0]);

    let ccw = FilterChain::parse("transpose=2").unwrap().apply(frame).unwrap();
    // Counter-clockwise moves it to the bottom-left.
    assert_eq!(ccw.rgb(6), [255, 0, 0]);
}

#[test]
fn test_format_conversions_keep_metadata() {
    let mut frame = solid(2, 2, [100, 100, 100]);
    frame.metadata.frame_index = 9;

    let gray = FilterChain::parse("format=gray").unwrap().apply(frame).unwrap();
    assert_eq!(gray.layout(), PixelLayout::ByteGray);
    assert_eq!(gray.luma(0), 100);
    assert_eq!(gray.metadata.frame_index, 9);

    let bgr = FilterChain::parse("format=bgr24").unwrap().apply(gray).unwrap();
    assert_eq!(bgr.layout(), PixelLayout::ThreeByteBgr);
    assert_eq!(bgr.data(), &PixelData::Bytes(vec![100; 12]));
    assert_eq!(bgr.metadata.frame_index, 9);
}

#[test]
fn test_then_appends_step() {
    let chain = FilterChain::default().then(FilterStep::Format(PixelFormat::Bgr24));
    assert_eq!(chain.to_string(), "format=bgr24");
}
