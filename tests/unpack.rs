//! End-to-end unpacking of synthetic boot images built by the inverse
//! (pack) operation.

use std::io::{Cursor, Seek, SeekFrom, Write};

use binrw::BinWrite;
use bootimg_parse::{
    digest::image_digest, BootImage, Header, Segments, UnpackError, UnpackOptions, Verdict,
};

const CMDLINE: &str = "console=ttyMSM0 androidboot.hardware=qcom";

fn base_header(page_size: u32, cmdline: &str) -> Header {
    let mut cmdline_buf = Box::new([0u8; 512]);
    cmdline_buf[..cmdline.len()].copy_from_slice(cmdline.as_bytes());
    let mut name = [0u8; 16];
    name[..4].copy_from_slice(b"surf");
    Header {
        kernel_size: 0,
        kernel_addr: 0x1000_8000,
        ramdisk_size: 0,
        ramdisk_addr: 0x1100_0000,
        second_size: 0,
        second_addr: 0x1010_0000,
        tags_addr: 0x1000_0100,
        page_size,
        unused: [0; 2],
        name,
        cmdline: cmdline_buf,
        id: [0; 20],
        extra_cmdline: Box::new([0; 1024]),
    }
}

fn pad_to(buf: &mut Vec<u8>, page: usize) {
    while buf.len() % page != 0 {
        buf.push(0);
    }
}

/// Inverse (pack) operation: assembles an image from its parts, optionally
/// sealing the header id with the matching digest.
fn build_image(
    header: &mut Header,
    prefix: usize,
    page: u32,
    kernel: &[u8],
    ramdisk: &[u8],
    second: &[u8],
    seal: bool,
) -> Vec<u8> {
    header.kernel_size = kernel.len() as u32;
    header.ramdisk_size = ramdisk.len() as u32;
    header.second_size = second.len() as u32;
    if seal {
        let segments = Segments {
            kernel: kernel.to_vec(),
            ramdisk: ramdisk.to_vec(),
            second: second.to_vec(),
        };
        header.id = image_digest(header, &segments);
    }

    let mut body = Cursor::new(Vec::new());
    header.write(&mut body).unwrap();
    let mut body = body.into_inner();
    pad_to(&mut body, page as usize);
    body.extend_from_slice(kernel);
    pad_to(&mut body, page as usize);
    body.extend_from_slice(ramdisk);
    pad_to(&mut body, page as usize);
    body.extend_from_slice(second);

    let mut image = vec![0x55u8; prefix];
    image.extend(body);
    image
}

#[test]
fn round_trips_a_sealed_image() {
    let mut header = base_header(2048, CMDLINE);
    let image = build_image(
        &mut header,
        0,
        2048,
        b"fake kernel payload",
        b"\x1f\x8b fake ramdisk",
        b"2nd",
        true,
    );

    let unpacked = BootImage::unpack(&mut Cursor::new(image), &UnpackOptions::default()).unwrap();
    assert_eq!(unpacked.magic_offset, 0);
    assert_eq!(unpacked.page_size, 2048);
    assert_eq!(unpacked.header.cmdline(), CMDLINE.as_bytes());
    assert_eq!(unpacked.header.kernel_base(), 0x1000_0000);
    assert_eq!(unpacked.segments.kernel, b"fake kernel payload");
    assert_eq!(unpacked.segments.ramdisk, b"\x1f\x8b fake ramdisk");
    assert_eq!(unpacked.segments.second, b"2nd");
    assert_eq!(unpacked.checksum.verdict, Verdict::Ok);
    assert_eq!(unpacked.checksum.hex().len(), 40);
}

#[test]
fn finds_the_magic_after_leading_junk() {
    let mut header = base_header(2048, CMDLINE);
    let image = build_image(&mut header, 57, 2048, b"krnl", b"rd", b"", true);

    let unpacked = BootImage::unpack(&mut Cursor::new(image), &UnpackOptions::default()).unwrap();
    assert_eq!(unpacked.magic_offset, 57);
    assert_eq!(unpacked.segments.kernel, b"krnl");
    assert_eq!(unpacked.checksum.verdict, Verdict::Ok);
}

#[test]
fn zeroed_id_still_unpacks_but_reports_wrong() {
    let mut header = base_header(2048, CMDLINE);
    let image = build_image(&mut header, 0, 2048, b"krnl", b"rd", b"", false);

    let unpacked = BootImage::unpack(&mut Cursor::new(image), &UnpackOptions::default()).unwrap();
    assert_eq!(unpacked.checksum.verdict, Verdict::Mismatch);
    // Extraction is complete despite the mismatch.
    assert_eq!(unpacked.segments.kernel, b"krnl");
    assert_eq!(unpacked.segments.ramdisk, b"rd");
    assert_eq!(unpacked.checksum.hex().len(), 40);
}

#[test]
fn unpacking_twice_yields_identical_results() {
    let mut header = base_header(2048, CMDLINE);
    let image = build_image(&mut header, 0, 2048, b"krnl", b"rd", b"2nd", true);

    let first = BootImage::unpack(&mut Cursor::new(image.clone()), &UnpackOptions::default())
        .unwrap();
    let second = BootImage::unpack(&mut Cursor::new(image), &UnpackOptions::default()).unwrap();
    assert_eq!(first.segments, second.segments);
    assert_eq!(first.checksum.hex(), second.checksum.hex());
}

#[test]
fn truncated_ramdisk_aborts_the_unpack() {
    let mut header = base_header(2048, CMDLINE);
    let mut image = build_image(&mut header, 0, 2048, &[1; 4], &[2; 16], &[], false);
    // Header page + kernel page + 14 of the 16 declared ramdisk bytes.
    image.truncate(2048 + 2048 + 14);

    let err = BootImage::unpack(&mut Cursor::new(image), &UnpackOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        UnpackError::TruncatedInput { section: "ramdisk" }
    ));
}

#[test]
fn page_size_override_substitutes_for_a_zero_declaration() {
    let mut header = base_header(0, CMDLINE);
    let image = build_image(&mut header, 0, 4096, b"krnl", b"rd", b"", true);

    let err = BootImage::unpack(&mut Cursor::new(image.clone()), &UnpackOptions::default())
        .unwrap_err();
    assert!(matches!(err, UnpackError::InvalidPageSize(0)));

    let options = UnpackOptions {
        page_size: Some(4096),
        ..UnpackOptions::default()
    };
    let unpacked = BootImage::unpack(&mut Cursor::new(image), &options).unwrap();
    assert_eq!(unpacked.page_size, 4096);
    // The digest covers the declared page size field, not the override.
    assert_eq!(unpacked.checksum.verdict, Verdict::Ok);
}

#[test]
fn unpacks_from_a_file() {
    let mut header = base_header(2048, CMDLINE);
    let image = build_image(&mut header, 0, 2048, b"krnl", b"rd", b"", true);

    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&image).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let unpacked = BootImage::unpack(&mut file, &UnpackOptions::default()).unwrap();
    assert_eq!(unpacked.segments.kernel, b"krnl");
    assert_eq!(unpacked.checksum.verdict, Verdict::Ok);
}
