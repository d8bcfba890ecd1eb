use proptest::prelude::*;
use quickcheck::quickcheck;
use vc5meta::size::{compute_chunk_size, payload_size};
use vc5meta::types::{padding_for, tuple_total_size};
use vc5meta::{compute_sizes, compute_tuple_size, Chunk, Metadata, Tuple, TypeTable};

#[test]
fn string_leaf_has_no_count() {
    let types = TypeTable::standard();
    let mut layn = Tuple::leaf("LAYN", 'c', 8, "Layer001");
    assert_eq!(compute_tuple_size(&mut layn, &types), 16);
    assert_eq!(layn.size(), Some(8));
    assert_eq!(layn.count(), None);
    assert_eq!(layn.padding(), Some(0));
}

#[test]
fn repeated_bytes_padded_to_segment() {
    let types = TypeTable::standard();
    let mut vend = Tuple::repeated("VEND", 'B', 1, 5, "1 2 3 4 5");
    assert_eq!(compute_tuple_size(&mut vend, &types), 16);
    assert_eq!(vend.count(), Some(5));
    assert_eq!(vend.padding(), Some(3));
}

#[test]
fn odd_payload_rounds_up() {
    assert_eq!(padding_for(13), 3);
    assert_eq!(tuple_total_size(13), 24);
}

#[test]
fn container_sums_children() {
    let types = TypeTable::standard();
    let mut cfhd = Tuple::class(
        "CFHD",
        vec![
            Tuple::leaf("LAYN", 'c', 8, "Layer001"),
            Tuple::repeated("VEND", 'B', 1, 5, "1 2 3 4 5"),
        ],
    );
    assert_eq!(compute_tuple_size(&mut cfhd, &types), 8 + 32);
    assert_eq!(cfhd.size(), Some(32));
    assert_eq!(cfhd.padding(), Some(0));
    assert_eq!(cfhd.type_code(), Some('E'));
}

#[test]
fn chunk_size_counted_in_segments() {
    let types = TypeTable::standard();
    // 8 + 4 and 8 bytes of encoded tuples.
    let mut chunk = Chunk::new(
        "0x4010",
        vec![Tuple::leaf("TICK", 'L', 4, "1000"), Tuple::marker("DEVC")],
    );
    assert_eq!(payload_size(&chunk.tuples, &types), 20);
    assert_eq!(compute_chunk_size(&mut chunk, &types), 24);
    assert_eq!(chunk.size, Some(5));
}

#[test]
fn empty_metadata_is_empty() {
    let mut metadata = Metadata::default();
    assert_eq!(compute_sizes(&mut metadata, &TypeTable::standard()), 0);
}

#[test]
fn empty_chunk_is_header_only() {
    let mut metadata = Metadata::new(vec![Chunk::new("0x61", Vec::new())]);
    assert_eq!(compute_sizes(&mut metadata, &TypeTable::standard()), 4);
    assert_eq!(metadata.chunks[0].size, Some(0));
}

#[test]
fn count_on_string_is_dropped() {
    let types = TypeTable::standard();
    let mut tuple = Tuple::repeated("LAYD", 'c', 10, 3, "Background");
    assert_eq!(compute_tuple_size(&mut tuple, &types), 8 + 12);
    assert_eq!(tuple.count(), None);
    assert_eq!(tuple.padding(), Some(2));
}

quickcheck! {
    fn padding_reaches_segment_boundary(size: u32) -> bool {
        let size = size as usize;
        let padding = padding_for(size);
        padding < 4 && (size + padding) % 4 == 0
    }

    fn total_size_is_aligned(size: u32) -> bool {
        let total = tuple_total_size(size as usize);
        total % 4 == 0 && total >= 8 + size as usize && total < 12 + size as usize
    }
}

fn leaf_strategy() -> impl Strategy<Value = Tuple> {
    let tags = prop::sample::select(vec!["TICK", "LAYN", "VEND", "ACCL", "DVNM"]);
    let codes = prop::sample::select(vec!['c', 'B', 'L', 'f', 'h', 'd', 'x']);
    (tags, codes, prop::option::of(0usize..64), prop::option::of(0usize..8)).prop_map(
        |(tag, code, size, count)| match size {
            None => Tuple::marker(tag),
            Some(size) => match count {
                Some(count) => Tuple::repeated(tag, code, size, count, "v"),
                None => Tuple::leaf(tag, code, size, "v"),
            },
        },
    )
}

fn tuple_strategy() -> impl Strategy<Value = Tuple> {
    leaf_strategy().prop_recursive(3, 32, 4, |inner| {
        (prop::sample::select(vec!["DEVC", "STRM", "LOGA", "LAYR"]), prop::collection::vec(inner, 0..4))
            .prop_map(|(tag, children)| Tuple::nested(tag, children))
    })
}

fn metadata_strategy() -> impl Strategy<Value = Metadata> {
    prop::collection::vec(prop::collection::vec(tuple_strategy(), 0..4), 0..3).prop_map(|chunks| {
        Metadata::new(chunks.into_iter().map(|tuples| Chunk::new("0x4010", tuples)).collect())
    })
}

proptest! {
    #[test]
    fn computing_twice_changes_nothing(mut metadata in metadata_strategy()) {
        let types = TypeTable::standard();
        let first = compute_sizes(&mut metadata, &types);
        let annotated = metadata.clone();
        let second = compute_sizes(&mut metadata, &types);
        prop_assert_eq!(first, second);
        prop_assert_eq!(metadata, annotated);
    }

    #[test]
    fn chunk_length_matches_segments(mut metadata in metadata_strategy()) {
        let types = TypeTable::standard();
        let total = compute_sizes(&mut metadata, &types);
        let from_segments: usize = metadata
            .chunks
            .iter()
            .map(|chunk| 4 * chunk.size.unwrap_or(0) + 4)
            .sum();
        prop_assert_eq!(total, from_segments);
        for chunk in &metadata.chunks {
            prop_assert_eq!(chunk.size, Some(payload_size(&chunk.tuples, &types).div_ceil(4)));
        }
    }

    #[test]
    fn count_kept_only_for_repeat_types(mut tuple in tuple_strategy()) {
        let types = TypeTable::standard();
        compute_tuple_size(&mut tuple, &types);
        let mut ok = true;
        tuple.walk(&mut |t, _| {
            if let Tuple::Leaf(leaf) = t {
                let code = leaf.type_code.unwrap_or('0');
                ok &= leaf.count.is_some() == types.has_repeat_count(code);
                ok &= leaf.count != Some(0);
            }
        });
        prop_assert!(ok);
    }
}
