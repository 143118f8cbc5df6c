use std::io::{Cursor, Seek, Write};

use zipwright::read::{open_archive, read_entry_content};

// Crafts a minimal ZIP64 archive by hand with one STORE entry using a
// data descriptor, a Central Directory entry carrying a ZIP64 extra
// field, a ZIP64-EOCD record, locator, and classic EOCD with sentinel
// placeholders. Then opens it with the library's reader.
#[test]
fn read_zip64_crafted() {
    let mut f = Cursor::new(Vec::new());

    // Local file header for a.txt (no sizes, using data descriptor).
    f.write_all(&[0x50, 0x4b, 0x03, 0x04]).unwrap(); // signature
    f.write_all(&[20, 0]).unwrap(); // version needed
    f.write_all(&[8, 0]).unwrap(); // flags, bit 3 (data descriptor) set
    f.write_all(&[0, 0]).unwrap(); // compression method: stored
    f.write_all(&[0, 0, 0, 0]).unwrap(); // mod time/date
    f.write_all(&0u32.to_le_bytes()).unwrap(); // crc placeholder
    f.write_all(&0xFFFFFFFFu32.to_le_bytes()).unwrap(); // compressed size placeholder
    f.write_all(&0xFFFFFFFFu32.to_le_bytes()).unwrap(); // uncompressed size placeholder
    f.write_all(&(5u16).to_le_bytes()).unwrap(); // name length
    f.write_all(&0u16.to_le_bytes()).unwrap(); // extra length
    f.write_all(b"a.txt").unwrap();

    let data = b"hello";
    f.write_all(data).unwrap();

    let crc = crc32fast::hash(data);
    f.write_all(&[0x50, 0x4b, 0x07, 0x08]).unwrap(); // data descriptor signature
    f.write_all(&crc.to_le_bytes()).unwrap();
    f.write_all(&(data.len() as u64).to_le_bytes()).unwrap(); // compressed size (64-bit)
    f.write_all(&(data.len() as u64).to_le_bytes()).unwrap(); // uncompressed size (64-bit)

    let cd_start = f.stream_position().unwrap();

    f.write_all(&[0x50, 0x4b, 0x01, 0x02]).unwrap(); // central directory signature
    f.write_all(&[20, 0]).unwrap(); // version made by
    f.write_all(&[20, 0]).unwrap(); // version needed
    f.write_all(&[8, 0]).unwrap(); // flags
    f.write_all(&[0, 0]).unwrap(); // compression method
    f.write_all(&[0, 0, 0, 0]).unwrap(); // mod time/date
    f.write_all(&crc.to_le_bytes()).unwrap();
    f.write_all(&0xFFFFFFFFu32.to_le_bytes()).unwrap(); // compressed size sentinel
    f.write_all(&0xFFFFFFFFu32.to_le_bytes()).unwrap(); // uncompressed size sentinel
    f.write_all(&(5u16).to_le_bytes()).unwrap(); // name len
    f.write_all(&(28u16).to_le_bytes()).unwrap(); // extra len: header(4) + data(24)
    f.write_all(&0u16.to_le_bytes()).unwrap(); // comment len
    f.write_all(&0u16.to_le_bytes()).unwrap(); // disk start
    f.write_all(&0u16.to_le_bytes()).unwrap(); // internal attrs
    f.write_all(&0u32.to_le_bytes()).unwrap(); // external attrs
    f.write_all(&0xFFFFFFFFu32.to_le_bytes()).unwrap(); // relative offset sentinel
    f.write_all(b"a.txt").unwrap();
    f.write_all(&0x0001u16.to_le_bytes()).unwrap(); // ZIP64 extra header id
    f.write_all(&(24u16).to_le_bytes()).unwrap(); // payload length
    f.write_all(&(data.len() as u64).to_le_bytes()).unwrap(); // uncompressed size
    f.write_all(&(data.len() as u64).to_le_bytes()).unwrap(); // compressed size
    f.write_all(&0u64.to_le_bytes()).unwrap(); // local header offset (entry is first in file)

    let cd_end = f.stream_position().unwrap();
    let cd_size = cd_end - cd_start;

    let zip64_eocd_start = f.stream_position().unwrap();
    f.write_all(&[0x50, 0x4b, 0x06, 0x06]).unwrap(); // ZIP64 EOCD signature
    f.write_all(&(44u64).to_le_bytes()).unwrap(); // size of remaining record
    f.write_all(&[20, 0]).unwrap(); // version made by
    f.write_all(&[20, 0]).unwrap(); // version needed
    f.write_all(&0u32.to_le_bytes()).unwrap(); // disk number
    f.write_all(&0u32.to_le_bytes()).unwrap(); // disk with CD start
    f.write_all(&(1u64).to_le_bytes()).unwrap(); // entries on this disk
    f.write_all(&(1u64).to_le_bytes()).unwrap(); // total entries
    f.write_all(&cd_size.to_le_bytes()).unwrap();
    f.write_all(&cd_start.to_le_bytes()).unwrap();

    f.write_all(&[0x50, 0x4b, 0x06, 0x07]).unwrap(); // ZIP64 locator signature
    f.write_all(&0u32.to_le_bytes()).unwrap(); // disk with ZIP64 EOCD
    f.write_all(&zip64_eocd_start.to_le_bytes()).unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap(); // total disks

    f.write_all(&[0x50, 0x4b, 0x05, 0x06]).unwrap(); // classic EOCD signature
    f.write_all(&0u16.to_le_bytes()).unwrap(); // disk
    f.write_all(&0u16.to_le_bytes()).unwrap(); // disk with CD
    f.write_all(&0xFFFFu16.to_le_bytes()).unwrap(); // entries on disk (sentinel)
    f.write_all(&0xFFFFu16.to_le_bytes()).unwrap(); // total entries (sentinel)
    f.write_all(&0xFFFFFFFFu32.to_le_bytes()).unwrap(); // cd size (sentinel)
    f.write_all(&0xFFFFFFFFu32.to_le_bytes()).unwrap(); // cd offset (sentinel)
    f.write_all(&0u16.to_le_bytes()).unwrap(); // comment len

    let bytes = f.into_inner();
    let model = open_archive(Cursor::new(bytes.clone())).expect("should open crafted zip64");
    let entries = model.entries();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.name, "a.txt");
    assert_eq!(e.uncompressed_size, data.len() as u64);

    let plain = read_entry_content(Cursor::new(&bytes), e, None).unwrap();
    assert_eq!(plain, data);
}
