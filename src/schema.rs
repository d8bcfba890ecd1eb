//! Containment rules for nested tuples.
//!
//! The schema lists, for every tag whose value is a list of nested tuples, the
//! tags that may appear in that list and whether each one is required.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rule for one child of a nested tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChildRule {
    #[serde(default)]
    pub required: bool,
}

/// Legal children of one nested tuple, keyed by child tag.
pub type ChildTable = BTreeMap<String, ChildRule>;

/// Mapping from container tag to its legal children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaTable {
    containers: BTreeMap<String, ChildTable>,
}

/// Tags of the encoding curve tuples (their default type is `P`).
pub const ENCODING_CURVE_TAGS: [&str; 7] = ["LOGA", "GAMA", "LINR", "FSLG", "LOGC", "PQEC", "HLGE"];

const INTRINSIC_CHILDREN: [&str; 33] = [
    "ROWI", "COLI", "NCOL", "NROW", "PFMT", "ALPH", "ALPM", "CFAP", "CLSY", "CMIN", "CMAX",
    "AMIN", "AMAX", "BLKR", "WHTR", "COLR", "CDCS", "RATE", "SCAL", "FRMN", "TIMB", "TIMD",
    "TIMS", "FRMZ", "LAYR", "ICCP", "LOGA", "GAMA", "LINR", "FSLG", "LOGC", "PQEC", "HLGE",
];

const STREAM_CHILDREN: [&str; 37] = [
    "STID", "STNM", "SCAL", "SIUN", "UNIT", "TIMO", "TYPE", "ACCL", "GYRO", "MTRX", "ORIN",
    "ORIO", "STMP", "TMPC", "TSMP", "GPS5", "GPSF", "GPSP", "GPSU", "ISOG", "MAGN", "SHUT",
    "EMPT", "FCNM", "FWVS", "ISOE", "WBAL", "WRGB", "MFGI", "UNIF", "YAVG", "acc1", "CORI",
    "VPTS", "SROT", "IORI", "GRAV",
];

const FILE_INFO_CHILDREN: [(&str, bool); 3] = [("PATH", false), ("FCDT", false), ("FMDT", false)];

fn children<'a>(entries: impl IntoIterator<Item = (&'a str, bool)>) -> ChildTable {
    entries
        .into_iter()
        .map(|(tag, required)| (tag.to_string(), ChildRule { required }))
        .collect()
}

fn optional(tags: &[&str]) -> ChildTable {
    children(tags.iter().map(|tag| (*tag, false)))
}

fn extrinsic(data_tag: &str) -> ChildTable {
    children(std::iter::once((data_tag, true)).chain(FILE_INFO_CHILDREN))
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the containment rules of the metadata standard.
    pub fn standard() -> Self {
        let mut table = Self::new();

        // Intrinsic metadata
        table.insert("CFHD", optional(&INTRINSIC_CHILDREN));

        // Encoding curves
        table.insert("LOGA", children([("LOGb", true)]));
        table.insert("GAMA", children([("GAMp", true)]));
        table.insert("FSLG", children([("FSCL", true)]));
        table.insert(
            "LOGC",
            children(["LOGt", "LOGa", "LOGb", "LOGc", "LOGd", "LOGe", "LOGf"].map(|t| (t, true))),
        );

        // Layers
        table.insert("LAYR", children([("LAYN", true), ("LAYD", true)]));

        // Streaming data
        table.insert("GPMF", children([("DEVC", true)]));
        table.insert(
            "DEVC",
            children([("DVID", false), ("DVNM", false), ("TICK", false), ("STRM", true)]),
        );
        table.insert("STRM", optional(&STREAM_CHILDREN));

        // Dark metadata
        table.insert("DARK", children([("VENI", false), ("VENS", false), ("VEND", true)]));

        // Extrinsic metadata
        table.insert("XMPD", extrinsic("XMPd"));
        table.insert("DPXF", extrinsic("DPXh"));
        table.insert("MXFD", children([("MXFd", true)]));
        table.insert("ACES", extrinsic("ACEh"));
        table.insert("ALEM", extrinsic("ALEd"));
        table.insert("DMCT", children([("CVTS", true), ("CVTD", true)]));

        table
    }

    /// Add or replace the rules for one container tag.
    pub fn insert(&mut self, tag: impl Into<String>, children: ChildTable) {
        self.containers.insert(tag.into(), children);
    }

    /// Legal children of a container tag.
    pub fn children(&self, tag: &str) -> Option<&ChildTable> {
        self.containers.get(tag)
    }

    pub fn is_container(&self, tag: &str) -> bool {
        self.containers.contains_key(tag)
    }

    /// Required children of a container tag in tag order.
    pub fn required_children(&self, tag: &str) -> impl Iterator<Item = &str> {
        self.children(tag)
            .into_iter()
            .flat_map(|table| table.iter())
            .filter(|(_, rule)| rule.required)
            .map(|(tag, _)| tag.as_str())
    }

    /// Merge another table into this one; entries in `other` win.
    pub fn extend(&mut self, other: SchemaTable) {
        self.containers.extend(other.containers);
    }
}

/// Return true if the tag names an encoding curve tuple.
pub fn is_encoding_curve(tag: &str) -> bool {
    ENCODING_CURVE_TAGS.contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_children_of_log_curve() {
        let schema = SchemaTable::standard();
        let required: Vec<&str> = schema.required_children("LOGC").collect();
        assert_eq!(required.len(), 7);
        assert!(required.contains(&"LOGt"));
    }

    #[test]
    fn device_requires_stream() {
        let schema = SchemaTable::standard();
        let device = schema.children("DEVC").unwrap();
        assert!(device["STRM"].required);
        assert!(!device["TICK"].required);
        assert!(schema.children("ACCL").is_none());
    }
}
