use std::collections::VecDeque;

use proptest::prelude::*;
use vc5meta::nesting::{group_parameters, ParameterGroups};
use vc5meta::{flatten_nesting, nest_tuples, reconstruct_nesting, ContainerTags, NestingError, Tuple};

fn markers(tags: &[&str]) -> Vec<Tuple> {
    tags.iter().map(|tag| Tuple::marker(tag)).collect()
}

fn child_tags(tuple: &Tuple) -> Vec<&str> {
    tuple.children().iter().map(Tuple::tag).collect()
}

#[test]
fn devices_and_streams_rebuilt() {
    let flat = markers(&["DEVC", "STRM", "ACCL", "STRM", "GYRO", "DEVC", "STRM", "ACCL"]);
    let devices = nest_tuples(flat, &ContainerTags::streaming()).unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(child_tags(&devices[0]), ["STRM", "STRM"]);
    assert_eq!(child_tags(&devices[0].children()[0]), ["ACCL"]);
    assert_eq!(child_tags(&devices[0].children()[1]), ["GYRO"]);
    assert_eq!(child_tags(&devices[1]), ["STRM"]);
    assert_eq!(child_tags(&devices[1].children()[0]), ["ACCL"]);
}

#[test]
fn reconstruct_returns_unconsumed_sibling() {
    let sequence: VecDeque<Tuple> = markers(&["STRM", "ACCL", "DEVC", "STRM"]).into();
    let (children, rest) =
        reconstruct_nesting(sequence, "DEVC", Vec::new(), &ContainerTags::streaming()).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(child_tags(&children[0]), ["ACCL"]);
    let rest: Vec<&str> = rest.iter().map(Tuple::tag).collect();
    assert_eq!(rest, ["DEVC", "STRM"]);
}

#[test]
fn empty_stream_kept() {
    let devices =
        nest_tuples(markers(&["DEVC", "STRM", "STRM", "GYRO"]), &ContainerTags::streaming()).unwrap();
    assert_eq!(devices[0].children().len(), 2);
    assert!(devices[0].children()[0].children().is_empty());
}

#[test]
fn three_levels_of_containers() {
    let tags = ContainerTags::new(["DEVC", "STRM", "SUBS"]);
    let flat = markers(&["DEVC", "STRM", "SUBS", "ACCL", "SUBS", "GYRO", "STRM", "MAGN"]);
    let devices = nest_tuples(flat, &tags).unwrap();
    assert_eq!(devices.len(), 1);
    let streams = devices[0].children();
    assert_eq!(streams.len(), 2);
    assert_eq!(child_tags(&streams[0]), ["SUBS", "SUBS"]);
    assert_eq!(child_tags(&streams[1]), ["MAGN"]);
}

#[test]
fn orphan_names_tag() {
    let err = nest_tuples(markers(&["STRM", "ACCL"]), &ContainerTags::streaming()).unwrap_err();
    assert_eq!(err.to_string(), "found tuple STRM before any DEVC tuple");
}

#[test]
fn curve_parameters_nest_under_curve() {
    let tuples = vec![
        Tuple::marker("LOGC"),
        Tuple::leaf("LOGt", 'f', 4, "0.01"),
        Tuple::leaf("LOGa", 'f', 4, "5.5"),
        Tuple::marker("PQEC"),
    ];
    let curves = group_parameters(tuples, &ParameterGroups::encoding_curves()).unwrap();
    assert_eq!(curves.len(), 2);
    assert_eq!(child_tags(&curves[0]), ["LOGt", "LOGa"]);
    assert!(curves[1].children().is_empty());
}

#[test]
fn layer_parameter_without_layer() {
    let err = group_parameters(vec![Tuple::string("LAYN", "Layer001")], &ParameterGroups::layers())
        .unwrap_err();
    assert!(matches!(err, NestingError::OrphanTuple { ref tag, .. } if tag == "LAYN"));
}

fn leaf() -> impl Strategy<Value = Tuple> {
    prop::sample::select(vec!["ACCL", "GYRO", "MAGN", "TICK", "DVNM"])
        .prop_map(|tag| Tuple::leaf(tag, 'L', 4, "1"))
}

fn stream() -> impl Strategy<Value = Tuple> {
    prop::collection::vec(leaf(), 0..5).prop_map(|data| Tuple::nested("STRM", data))
}

fn device() -> impl Strategy<Value = Tuple> {
    (prop::collection::vec(leaf(), 0..3), prop::collection::vec(stream(), 0..4)).prop_map(
        |(parameters, streams)| {
            Tuple::nested("DEVC", parameters.into_iter().chain(streams).collect())
        },
    )
}

proptest! {
    #[test]
    fn flatten_then_nest_is_identity(devices in prop::collection::vec(device(), 0..4)) {
        let tags = ContainerTags::streaming();
        let flat = flatten_nesting(&devices, &tags);
        let nested = nest_tuples(flat, &tags).unwrap();
        prop_assert_eq!(nested, devices);
    }
}
