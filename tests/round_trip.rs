use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use compressed_list::{
    write_list, write_list_with_config, CompressedList, Error, I64Codec, ListConfig, ListSummary,
    ListWriter, Record, RecordCodec, StringCodec,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

fn write_file<T, C: compressed_list::Codec<T>>(
    path: &Path,
    items: &[T],
    codec: C,
    threshold: usize,
) -> ListSummary {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .expect("open list file");
    write_list(&mut file, items, codec, threshold).expect("write list")
}

#[test]
fn empty_list_has_no_chunks() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("empty.clist");
    let summary = write_file::<i64, _>(&path, &[], I64Codec, 333);
    assert_eq!(summary.num_chunks, 0);

    let list = CompressedList::<i64, _>::open_path(&path, I64Codec, 0).expect("open");
    assert_eq!(list.len(), 0);
    assert!(list.is_empty());
    assert_eq!(list.num_chunks(), 0);
    assert_eq!(list.toc_bytes(), 0);
    assert!(matches!(list.get(0), Err(Error::OutOfRange { index: 0, len: 0 })));
    assert_eq!(list.iter().count(), 0);
}

#[test]
fn single_element_any_threshold() {
    let dir = tempdir().expect("tempdir");
    for threshold in [1usize, 7, 8, 333, 1 << 20] {
        let path = dir.path().join(format!("one_{threshold}.clist"));
        write_file(&path, &[1i64], I64Codec, threshold);
        let list = CompressedList::open_path(&path, I64Codec, 0).expect("open");
        assert_eq!(list.len(), 1);
        assert_eq!(list.num_chunks(), 1);
        assert_eq!(list.get(0).expect("get"), 1);
    }
}

#[test]
fn two_elements_split_or_share_a_chunk() {
    let dir = tempdir().expect("tempdir");
    let values = [1i64, 7];

    let path = dir.path().join("two_chunks.clist");
    write_file(&path, &values, I64Codec, 1);
    let list = CompressedList::open_path(&path, I64Codec, 0).expect("open");
    assert_eq!(list.num_chunks(), 2);
    assert_eq!(list.get(0).expect("get"), 1);
    assert_eq!(list.get(1).expect("get"), 7);

    let path = dir.path().join("one_chunk.clist");
    write_file(&path, &values, I64Codec, 1000);
    let list = CompressedList::open_path(&path, I64Codec, 0).expect("open");
    assert_eq!(list.num_chunks(), 1);
    assert_eq!(list.get(0).expect("get"), 1);
    assert_eq!(list.get(1).expect("get"), 7);
}

#[test]
fn chunk_boundaries_follow_threshold() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("boundaries.clist");
    let values: Vec<i64> = (0..1_000).map(|n| n * 1_000_003).collect();
    // 8-byte elements: a chunk is flushed once it holds 98 elements (784 > 777).
    write_file(&path, &values, I64Codec, 777);

    let list = CompressedList::open_path(&path, I64Codec, 0).expect("open");
    assert_eq!(list.num_chunks(), 11);
    for (chunk, (first, last)) in list.chunk_ranges().enumerate() {
        let expected_len = if chunk == 10 { 1_000 - 10 * 98 } else { 98 };
        assert_eq!(last - first, expected_len, "chunk {chunk}");
        assert_eq!(list.get(first).expect("first"), values[first]);
        assert_eq!(list.get(last - 1).expect("last"), values[last - 1]);
    }
}

#[test]
fn variable_width_strings_round_trip() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("words.clist");
    let words: Vec<String> = (0..500)
        .map(|n| "w".repeat(n % 37) + &n.to_string())
        .chain(std::iter::once(String::new()))
        .chain(std::iter::once("ü".repeat(2_000)))
        .collect();
    write_file(&path, &words, StringCodec, 256);

    let list = CompressedList::open_path(&path, StringCodec, 0).expect("open");
    assert_eq!(list.len(), words.len());
    let read: Vec<String> = list.iter().collect::<Result<_, _>>().expect("iter");
    assert_eq!(read, words);
}

#[test]
fn permuted_reads_match_sequential() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("perm.clist");
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<i64> = (0..3_000).map(|_| rng.gen()).collect();
    write_file(&path, &values, I64Codec, 500);

    let list = CompressedList::open_path(&path, I64Codec, 0).expect("open");
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.shuffle(&mut rng);
    for i in order {
        assert_eq!(list.get(i).expect("get"), values[i]);
    }
}

#[test]
fn independent_readers_agree() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("shared.clist");
    let values: Vec<i64> = (0..2_000).map(|n| n * n - 17).collect();
    write_file(&path, &values, I64Codec, 300);

    let a = CompressedList::open_path(&path, I64Codec, 0).expect("open a");
    let b = CompressedList::open_path(&path, I64Codec, 0).expect("open b");
    assert_eq!(a.len(), b.len());
    for i in (0..a.len()).rev() {
        assert_eq!(a.get(i).expect("a"), b.get(i).expect("b"));
    }
}

#[test]
fn random_longs_fixed_seed() {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i64> = (0..10_000).map(|_| rng.gen_range(0..512)).collect();

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("random.clist");
    let summary = write_file(&path, &values, I64Codec, 777);

    // Same input, same bytes.
    let mut again = Cursor::new(Vec::new());
    let summary_again = write_list(&mut again, &values, I64Codec, 777).expect("write again");
    assert_eq!(summary, summary_again);
    let mut on_disk = Vec::new();
    File::open(&path)
        .expect("open")
        .read_to_end(&mut on_disk)
        .expect("read");
    assert_eq!(on_disk.len() as u64, summary.end_offset);
    assert_eq!(on_disk, again.into_inner());

    let list = CompressedList::open_path(&path, I64Codec, 0).expect("open");
    assert_eq!(list.toc_bytes(), 1236);
    assert_eq!(list.num_chunks(), 103);
    assert_eq!(list.len(), values.len());

    for _ in 0..1_000 {
        let i = rng.gen_range(0..values.len());
        assert_eq!(list.get(i).expect("random get"), values[i]);
    }
    for (i, expected) in values.iter().enumerate() {
        assert_eq!(list.get(i).expect("scan get"), *expected);
    }
}

#[test]
fn random_longs_stored_exact_length() {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i64> = (0..10_000).map(|_| rng.gen_range(0..512)).collect();
    let config = ListConfig {
        chunk_threshold_bytes: 777,
        compression_level: 0,
        ..ListConfig::default()
    };
    let mut file = Cursor::new(Vec::new());
    let summary = write_list_with_config(&mut file, &values, I64Codec, &config).expect("write");

    // Stored gzip block: raw + 10 header + 5 block header + 8 trailer.
    // 102 chunks of 98 elements (1184 raw), one of 4 (56 raw), toc 1240 raw.
    assert_eq!(summary.num_chunks, 103);
    assert_eq!(summary.toc_offset, 8 + 102 * (1184 + 23) + (56 + 23));
    assert_eq!(summary.end_offset, 124_464);
    assert_eq!(file.get_ref().len(), 124_464);

    let list = CompressedList::open(file, I64Codec, 0).expect("open");
    assert_eq!(list.toc_bytes(), 1236);
    for i in (0..values.len()).step_by(97) {
        assert_eq!(list.get(i).expect("get"), values[i]);
    }
}

#[test]
fn out_of_range_reads_fail_cleanly() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("range.clist");
    write_file(&path, &[10i64, 20, 30], I64Codec, 8);
    let list = CompressedList::open_path(&path, I64Codec, 0).expect("open");

    // usize::MAX is what a caller's -1 becomes.
    for bad in [usize::MAX, list.len()] {
        match list.get(bad) {
            Err(Error::OutOfRange { index, len }) => {
                assert_eq!(index, bad);
                assert_eq!(len, 3);
            }
            other => panic!("expected OutOfRange for {bad}, got {other:?}"),
        }
    }
    assert_eq!(list.get(2).expect("still readable"), 30);
}

#[test]
fn list_embedded_after_other_data() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("embedded.dict");
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .expect("open");
    file.write_all(b"DICTHEADER").expect("prefix");

    let words: Vec<String> = vec!["apple".into(), "banana".into(), "cherry".into()];
    let numbers: Vec<i64> = (0..50).collect();
    let first = write_list(&mut file, &words, StringCodec, 8).expect("words");
    let second = write_list(&mut file, &numbers, I64Codec, 64).expect("numbers");
    assert_eq!(first.start_offset, 10);
    assert_eq!(second.start_offset, first.end_offset);
    drop(file);

    let words_list = CompressedList::open_path(&path, StringCodec, first.start_offset).expect("open");
    let numbers_list =
        CompressedList::open_path(&path, I64Codec, second.start_offset).expect("open");
    assert_eq!(words_list.get(2).expect("get"), "cherry");
    assert_eq!(numbers_list.get(49).expect("get"), 49);
    assert_eq!(words_list.len(), 3);
}

#[derive(Debug, Clone, PartialEq)]
struct IndexEntry {
    token: String,
    row: i64,
}

impl Record for IndexEntry {
    fn encode(&self, sink: &mut dyn Write) -> std::io::Result<()> {
        use compressed_list::Codec;
        StringCodec.write(sink, &self.token)?;
        I64Codec.write(sink, &self.row)
    }

    fn decode(source: &mut dyn Read) -> std::io::Result<Self> {
        use compressed_list::Codec;
        Ok(Self {
            token: StringCodec.read(source)?,
            row: I64Codec.read(source)?,
        })
    }
}

#[test]
fn records_via_incremental_writer() {
    let entries: Vec<IndexEntry> = (0..400)
        .map(|n| IndexEntry {
            token: format!("token-{n:04}"),
            row: n * 3,
        })
        .collect();

    let mut file = Cursor::new(Vec::new());
    let config = ListConfig {
        chunk_threshold_bytes: 512,
        compression_level: 9,
        ..ListConfig::default()
    };
    let mut writer = ListWriter::begin(&mut file, RecordCodec::<IndexEntry>::new(), &config)
        .expect("begin");
    for entry in &entries {
        writer.push(entry).expect("push");
    }
    assert_eq!(writer.len(), 400);
    let summary = writer.finish().expect("finish");
    assert_eq!(summary.num_elements, 400);

    let list = CompressedList::open(file, RecordCodec::<IndexEntry>::new(), 0).expect("open");
    assert_eq!(list.num_chunks(), summary.num_chunks);
    assert_eq!(list.get(123).expect("get"), entries[123]);
    assert_eq!(list.get(399).expect("get"), entries[399]);
}
