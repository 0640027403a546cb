//! End-to-end scenarios checked against the on-disk invariants (ECMA-119 and
//! the El Torito addendum): an image is built in memory, written to a
//! `Cursor`, then independently re-parsed and walked back out.

use std::io::Cursor;

use iso9660::types::Endian;
use iso9660::{ElToritoOptions, IsoImage, MediaType, NewOptions, PlatformId};

const BLOCK: u64 = 2048;

fn write_to_buffer(image: &mut IsoImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write(&mut buf).unwrap();
    buf.into_inner()
}

#[test]
fn empty_image_matches_ground_truth() {
    let mut image = IsoImage::new(NewOptions::default());
    let bytes = write_to_buffer(&mut image);
    assert_eq!(bytes.len() as u64, 24 * BLOCK);

    let parsed = iso9660::parser::parse(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(parsed.primary.volume_space_size.read(), 24);
    assert_eq!(parsed.primary.path_table_size.read(), 10);
    assert_eq!(parsed.primary.type_l_path_table.get(), 19);
    assert_eq!(parsed.primary.type_m_path_table.get(), 21);
    assert_eq!(parsed.pvd_tree.node(iso9660::tree::Tree::ROOT).data_length, 2048);
    assert_eq!(parsed.pvd_tree.node(iso9660::tree::Tree::ROOT).extent, 23);
}

#[test]
fn one_file_round_trips_through_get_and_write() {
    let mut image = IsoImage::new(NewOptions::default());
    image.add_file(b"foo\n".to_vec(), "/foo").unwrap();
    let bytes = write_to_buffer(&mut image);
    assert_eq!(bytes.len() as u64, 25 * BLOCK);

    let parsed = iso9660::parser::parse(&mut Cursor::new(bytes.clone())).unwrap();
    assert_eq!(parsed.primary.volume_space_size.read(), 25);
    assert_eq!(parsed.primary.path_table_size.read(), 10);
    assert_eq!(parsed.primary.type_l_path_table.get(), 19);
    assert_eq!(parsed.primary.type_m_path_table.get(), 21);

    let root = iso9660::tree::Tree::ROOT;
    let foo = parsed.pvd_tree.find_child(root, b"FOO.;1").expect("FOO.;1 present");
    let node = parsed.pvd_tree.node(foo);
    assert_eq!(node.extent, 24);
    assert!(!node.is_directory());

    let mut opened = IsoImage::open(&mut Cursor::new(bytes)).unwrap();
    let mut out = Vec::new();
    opened.get_and_write("/FOO.;1", &mut out).unwrap();
    assert_eq!(out, b"foo\n");
}

#[test]
fn one_directory_matches_ground_truth() {
    let mut image = IsoImage::new(NewOptions::default());
    image.add_directory("/dir1").unwrap();
    let bytes = write_to_buffer(&mut image);
    assert_eq!(bytes.len() as u64, 25 * BLOCK);

    let parsed = iso9660::parser::parse(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(parsed.primary.path_table_size.read(), 22);
    assert_eq!(parsed.primary.type_l_path_table.get(), 19);
    assert_eq!(parsed.primary.type_m_path_table.get(), 21);

    let root = iso9660::tree::Tree::ROOT;
    let dir1 = parsed.pvd_tree.find_child(root, b"DIR1").expect("DIR1 present");
    let node = parsed.pvd_tree.node(dir1);
    assert!(node.is_directory());
    assert_eq!(parsed.pvd_tree.children(dir1).len(), 0);
}

#[test]
fn two_level_deep_file_round_trips() {
    let mut image = IsoImage::new(NewOptions::default());
    image.add_directory("/dir1").unwrap();
    image.add_directory("/dir1/subdir1").unwrap();
    image.add_file(b"foo\n".to_vec(), "/dir1/subdir1/foo").unwrap();
    let bytes = write_to_buffer(&mut image);
    assert_eq!(bytes.len() as u64, 27 * BLOCK);

    let parsed = iso9660::parser::parse(&mut Cursor::new(bytes.clone())).unwrap();
    assert_eq!(parsed.primary.path_table_size.read(), 38);
    assert_eq!(parsed.primary.type_m_path_table.get(), 21);

    let root = iso9660::tree::Tree::ROOT;
    let dir1 = parsed.pvd_tree.find_child(root, b"DIR1").unwrap();
    let subdir1 = parsed.pvd_tree.find_child(dir1, b"SUBDIR1").unwrap();
    let foo = parsed.pvd_tree.find_child(subdir1, b"FOO.;1").unwrap();
    assert_eq!(parsed.pvd_tree.node(foo).extent, 26);

    let mut opened = IsoImage::open(&mut Cursor::new(bytes)).unwrap();
    let mut out = Vec::new();
    opened
        .get_and_write("/DIR1/SUBDIR1/FOO.;1", &mut out)
        .unwrap();
    assert_eq!(out, b"foo\n");
}

#[test]
fn many_directories_overflow_one_path_table_extent() {
    let mut image = IsoImage::new(NewOptions::default());
    for i in 0..295 {
        image.add_directory(&format!("/dir{i}")).unwrap();
    }
    let bytes = write_to_buffer(&mut image);
    assert_eq!(bytes.len() as u64, 328 * BLOCK);

    let parsed = iso9660::parser::parse(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(parsed.primary.volume_space_size.read(), 328);
    assert_eq!(parsed.primary.path_table_size.read(), 4122);
    assert_eq!(parsed.primary.type_l_path_table.get(), 19);
    // The LE path table spans more than one block (4122 bytes), so the BE
    // copy is relocated past it rather than immediately following at 20.
    assert_eq!(parsed.primary.type_m_path_table.get(), 23);

    let root = iso9660::tree::Tree::ROOT;
    assert_eq!(parsed.pvd_tree.node(root).data_length, 12288);
    assert_eq!(parsed.pvd_tree.node(root).extent, 27);
    assert_eq!(parsed.pvd_tree.children(root).len(), 295);
}

#[test]
fn eltorito_with_no_additional_files() {
    let mut image = IsoImage::new(NewOptions::default());
    image.add_file(vec![0u8; 2048], "/boot").unwrap();
    image
        .add_eltorito(
            "/BOOT.;1",
            "/boot.cat",
            ElToritoOptions {
                load_segment: 0x07C0,
                boot_media_type: MediaType::NoEmulation,
                platform_id: PlatformId::X80X86,
            },
        )
        .unwrap();
    let bytes = write_to_buffer(&mut image);
    assert_eq!(bytes.len() as u64, 27 * BLOCK);

    let parsed = iso9660::parser::parse(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(parsed.primary.volume_space_size.read(), 27);
    assert_eq!(parsed.primary.path_table_size.read(), 10);
    assert_eq!(parsed.primary.type_l_path_table.get(), 20);
    assert_eq!(parsed.primary.type_m_path_table.get(), 22);

    let boot_record = parsed.boot_record.expect("boot record present");
    assert_eq!(
        &boot_record.boot_system_identifier[..24],
        b"EL TORITO SPECIFICATION"
    );
    assert_eq!(boot_record.catalog_ptr.get(), 25);

    let root = iso9660::tree::Tree::ROOT;
    let boot = parsed.pvd_tree.find_child(root, b"BOOT.;1").expect("BOOT.;1 present");
    let bootcat = parsed
        .pvd_tree
        .find_child(root, b"BOOT.CAT;1")
        .expect("BOOT.CAT;1 present");
    assert_eq!(parsed.pvd_tree.node(bootcat).extent, 25);
    assert_eq!(parsed.pvd_tree.node(boot).extent, 26);
}

#[test]
fn joliet_mirrors_the_primary_tree() {
    let mut options = NewOptions::default();
    options.joliet = Some(iso9660::JolietLevel::Level3);
    let mut image = IsoImage::new(options);
    image.add_directory("/docs").unwrap();
    image.add_file(b"hello\n".to_vec(), "/docs/readme").unwrap();
    let bytes = write_to_buffer(&mut image);
    assert_eq!(bytes.len() as u64, 33 * BLOCK);

    let parsed = iso9660::parser::parse(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(parsed.primary.volume_space_size.read(), 33);
    assert_eq!(parsed.primary.path_table_size.read(), 22);
    assert_eq!(parsed.primary.type_l_path_table.get(), 20);
    assert_eq!(parsed.primary.type_m_path_table.get(), 22);

    let svd = parsed
        .supplementary
        .as_ref()
        .expect("supplementary volume descriptor present");
    assert_eq!(svd.path_table_size.read(), 26);
    assert_eq!(svd.type_l_path_table.get(), 24);
    assert_eq!(svd.type_m_path_table.get(), 26);

    let root = iso9660::tree::Tree::ROOT;
    let pvd_docs = parsed.pvd_tree.find_child(root, b"DOCS").expect("DOCS present");
    assert_eq!(parsed.pvd_tree.node(pvd_docs).extent, 29);
    let pvd_readme = parsed
        .pvd_tree
        .find_child(pvd_docs, b"README.;1")
        .expect("README.;1 present");
    assert_eq!(parsed.pvd_tree.node(pvd_readme).extent, 32);

    let joliet_tree = parsed.joliet_tree.expect("joliet tree present");
    let docs_name = iso9660::types::ucs2::encode("docs").unwrap();
    let joliet_docs = joliet_tree.find_child(root, &docs_name).expect("docs present");
    assert_eq!(joliet_tree.node(joliet_docs).extent, 31);
    let readme_name = iso9660::types::ucs2::encode("readme").unwrap();
    let joliet_readme = joliet_tree
        .find_child(joliet_docs, &readme_name)
        .expect("readme present");
    let readme_node = joliet_tree.node(joliet_readme);
    assert_eq!(readme_node.extent, 32);
    assert_eq!(readme_node.data_length, 6);
}

#[test]
fn missing_path_fails_not_found() {
    let mut image = IsoImage::new(NewOptions::default());
    image.add_file(b"foo\n".to_vec(), "/foo").unwrap();
    let mut out = Vec::new();
    let err = image.get_and_write("/MISSING.;1", &mut out).unwrap_err();
    assert!(matches!(err, iso9660::IsoError::NotFound(_)));
}

#[test]
fn reading_a_directory_fails_not_a_file() {
    let mut image = IsoImage::new(NewOptions::default());
    image.add_directory("/dir1").unwrap();
    let mut out = Vec::new();
    let err = image.get_and_write("/DIR1", &mut out).unwrap_err();
    assert!(matches!(err, iso9660::IsoError::NotAFile(_)));
}

#[test]
fn closed_image_rejects_further_operations() {
    let mut image = IsoImage::new(NewOptions::default());
    image.close();
    let err = image.add_directory("/dir1").unwrap_err();
    assert!(matches!(err, iso9660::IsoError::NotOpen));
}
