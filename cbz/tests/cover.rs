use std::{
    fs,
    io::{Cursor, Write},
};

use camino::{Utf8Path, Utf8PathBuf};
use cbz::{extract_cover, CbzRead, CbzReader, Error};
use tempfile::TempDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

fn utf8(tmp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap()
}

fn write_cbz(path: &Utf8Path, files: &[(&str, &[u8])]) {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (index, (name, bytes)) in files.iter().enumerate() {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default()).unwrap();
            continue;
        }
        let method = if index % 2 == 0 {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        writer
            .start_file(*name, FileOptions::default().compression_method(method))
            .unwrap();
        writer.write_all(bytes).unwrap();
    }
    fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
}

fn dir_names(dir: &Utf8Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    names
}

struct Setup {
    _tmp: TempDir,
    archive: Utf8PathBuf,
    outdir: Utf8PathBuf,
}

fn setup(archive_name: &str, files: &[(&str, &[u8])]) -> Setup {
    let tmp = TempDir::new().unwrap();
    let root = utf8(&tmp);
    let archive = root.join(archive_name);
    let outdir = root.join("out");
    fs::create_dir(&outdir).unwrap();
    write_cbz(&archive, files);

    Setup {
        _tmp: tmp,
        archive,
        outdir,
    }
}

#[test]
fn extracts_smallest_image_name() {
    let setup = setup(
        "Zatanna (2017).cbz",
        &[
            ("ComicInfo.xml", b"<ComicInfo/>"),
            ("pages/", b""),
            ("pages/002.jpg", b"second page"),
            ("pages/001.png", b"first page"),
            ("pages/003.webp", b"third page"),
            ("!readme.txt", b"read me"),
        ],
    );

    let cover = extract_cover(&setup.archive, &setup.outdir).unwrap();

    assert_eq!(cover, setup.outdir.join("Zatanna (2017).png"));
    assert_eq!(fs::read(&cover).unwrap(), b"first page");
    assert_eq!(dir_names(&setup.outdir), vec!["Zatanna (2017).png"]);
}

#[test]
fn keeps_entry_extension() {
    let setup = setup(
        "volume.cbz",
        &[("b.png", b"png"), ("a.jpeg", b"jpeg"), ("c.jpg", b"jpg")],
    );

    let cover = extract_cover(&setup.archive, &setup.outdir).unwrap();

    assert_eq!(cover.file_name(), Some("volume.jpeg"));
    assert_eq!(fs::read(&cover).unwrap(), b"jpeg");
}

#[test]
fn uppercase_extensions_are_not_images() {
    let setup = setup("volume.cbz", &[("A.PNG", b"upper"), ("b.webp", b"lower")]);

    let cover = extract_cover(&setup.archive, &setup.outdir).unwrap();

    assert_eq!(cover.file_name(), Some("volume.webp"));
    assert_eq!(fs::read(&cover).unwrap(), b"lower");
}

#[test]
fn overwrites_previous_cover() {
    let setup = setup("volume.cbz", &[("01.png", b"new")]);
    fs::write(setup.outdir.join("volume.png"), b"old and longer").unwrap();

    let cover = extract_cover(&setup.archive, &setup.outdir).unwrap();

    assert_eq!(fs::read(&cover).unwrap(), b"new");
    assert_eq!(dir_names(&setup.outdir), vec!["volume.png"]);
}

#[test]
fn repeated_extraction_is_idempotent() {
    let setup = setup("volume.cbz", &[("01.png", b"cover")]);

    let first = extract_cover(&setup.archive, &setup.outdir).unwrap();
    let second = extract_cover(&setup.archive, &setup.outdir).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"cover");
    assert_eq!(dir_names(&setup.outdir), vec!["volume.png"]);
}

#[test]
fn large_entries_are_streamed_whole() {
    let content = (0..200_000u32)
        .map(|i| u8::try_from(i % 251).unwrap())
        .collect::<Vec<_>>();
    let setup = setup("big.cbz", &[("01.jpg", &content)]);

    let cover = extract_cover(&setup.archive, &setup.outdir).unwrap();

    assert_eq!(fs::read(cover).unwrap(), content);
}

#[test]
fn no_image_creates_nothing() {
    let setup = setup(
        "text.cbz",
        &[("a.txt", b"a"), ("images/", b""), ("b.gif", b"gif")],
    );

    let result = extract_cover(&setup.archive, &setup.outdir);

    assert!(matches!(result, Err(Error::NoImageFound(path)) if path == setup.archive));
    assert!(dir_names(&setup.outdir).is_empty());
}

#[test]
fn empty_archive_has_no_image() {
    let setup = setup("empty.cbz", &[]);

    assert!(matches!(
        extract_cover(&setup.archive, &setup.outdir),
        Err(Error::NoImageFound(_))
    ));
}

#[test]
fn invalid_archive_fails_to_open() {
    let setup = setup("volume.cbz", &[]);
    fs::write(&setup.archive, b"this is not a zip file").unwrap();

    assert!(matches!(
        extract_cover(&setup.archive, &setup.outdir),
        Err(Error::Open(_))
    ));
    assert!(dir_names(&setup.outdir).is_empty());
}

#[test]
fn missing_archive_fails_to_open() {
    let setup = setup("volume.cbz", &[]);

    assert!(matches!(
        extract_cover(setup.archive.with_file_name("missing.cbz"), &setup.outdir),
        Err(Error::Open(_))
    ));
}

#[test]
fn missing_outdir_is_a_write_error() {
    let setup = setup("volume.cbz", &[("01.png", b"cover")]);

    assert!(matches!(
        extract_cover(&setup.archive, setup.outdir.join("missing")),
        Err(Error::Write(_))
    ));
    assert!(dir_names(&setup.outdir).is_empty());
}

#[test]
fn corrupt_cover_entry_is_a_read_error() {
    let content = b"cover bytes that will be damaged";
    // odd indexes are stored, so the content sits verbatim in the archive
    let setup = setup("volume.cbz", &[("notes.txt", b"notes"), ("01.png", content)]);
    let mut bytes = fs::read(&setup.archive).unwrap();
    let position = bytes
        .windows(content.len())
        .position(|window| window == content)
        .unwrap();
    bytes[position + 3] ^= 0xFF;
    fs::write(&setup.archive, bytes).unwrap();

    let result = extract_cover(&setup.archive, &setup.outdir);

    assert!(matches!(result, Err(Error::Read(_))));
    assert!(dir_names(&setup.outdir).is_empty());
}

#[test]
fn archive_can_be_listed_after_extraction() {
    let setup = setup("volume.cbz", &[("01.png", b"cover"), ("02.png", b"page")]);

    extract_cover(&setup.archive, &setup.outdir).unwrap();
    let mut cbz = CbzReader::from_path(&setup.archive).unwrap();

    assert_eq!(cbz.cover_name().unwrap().as_deref(), Some("01.png"));
    assert_eq!(cbz.entries().unwrap().len(), 2);
}
