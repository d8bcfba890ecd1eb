//! XML form of metadata test cases.
//!
//! ```text
//! <metadata xmlns="https://www.vc5codec.org/xml/metadata">
//!   <chunk tag="0x4010" size="7">
//!     <tuple tag="CFHD" type="E" size="20" padding="0">
//!       <tuple tag="LAYN" type="c" size="8" padding="0" value="Layer001"/>
//!     </tuple>
//!   </chunk>
//! </metadata>
//! ```
//!
//! Values are written as a `value` attribute except for XMP packets (CDATA)
//! and MXF/ACES headers (element text). The reader accepts any of the three
//! forms and ignores namespace prefixes.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::tuple::{parse_number, parse_type_code, Chunk, Container, Leaf, Metadata, Tuple};
use crate::MetaError;

/// Namespace of the metadata test case elements.
pub const NAMESPACE: &str = "https://www.vc5codec.org/xml/metadata";

const CDATA_TAGS: [&str; 1] = ["XMPd"];
const TEXT_TAGS: [&str; 2] = ["MXFd", "ACEh"];

// ---------------------------------------------------------------------------
// Writing

/// Write a test case as indented XML with a declaration.
pub fn write_xml<W: Write>(output: W, metadata: &Metadata) -> Result<(), MetaError> {
    let mut writer = Writer::new_with_indent(output, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(MetaError::xml)?;

    let mut root = BytesStart::new("metadata");
    root.push_attribute(("xmlns", NAMESPACE));
    if metadata.chunks.is_empty() {
        writer.write_event(Event::Empty(root)).map_err(MetaError::xml)?;
    } else {
        writer.write_event(Event::Start(root)).map_err(MetaError::xml)?;
        for chunk in &metadata.chunks {
            write_chunk(&mut writer, chunk)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("metadata")))
            .map_err(MetaError::xml)?;
    }

    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn write_chunk<W: Write>(writer: &mut Writer<W>, chunk: &Chunk) -> Result<(), MetaError> {
    let mut element = BytesStart::new("chunk");
    element.push_attribute(("tag", chunk.tag.as_str()));
    if let Some(size) = chunk.size {
        element.push_attribute(("size", size.to_string().as_str()));
    }

    if chunk.tuples.is_empty() {
        writer.write_event(Event::Empty(element)).map_err(MetaError::xml)?;
        return Ok(());
    }

    writer.write_event(Event::Start(element)).map_err(MetaError::xml)?;
    for tuple in &chunk.tuples {
        write_tuple(writer, tuple)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("chunk")))
        .map_err(MetaError::xml)?;
    Ok(())
}

fn tuple_element(
    tag: &str,
    type_code: Option<char>,
    size: Option<usize>,
    count: Option<usize>,
    padding: Option<usize>,
) -> BytesStart<'static> {
    let mut element = BytesStart::new("tuple");
    element.push_attribute(("tag", tag));
    if let Some(code) = type_code {
        element.push_attribute(("type", code.to_string().as_str()));
    }
    for (name, number) in [("size", size), ("count", count), ("padding", padding)] {
        if let Some(number) = number {
            element.push_attribute((name, number.to_string().as_str()));
        }
    }
    element
}

fn write_tuple<W: Write>(writer: &mut Writer<W>, tuple: &Tuple) -> Result<(), MetaError> {
    match tuple {
        Tuple::Container(container) => {
            let element = tuple_element(
                &container.tag,
                container.type_code,
                container.size,
                None,
                container.padding,
            );
            if container.children.is_empty() {
                writer.write_event(Event::Empty(element)).map_err(MetaError::xml)?;
                return Ok(());
            }
            writer.write_event(Event::Start(element)).map_err(MetaError::xml)?;
            for child in &container.children {
                write_tuple(writer, child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("tuple")))
                .map_err(MetaError::xml)?;
        }
        Tuple::Leaf(leaf) => {
            let mut element =
                tuple_element(&leaf.tag, leaf.type_code, leaf.size, leaf.count, leaf.padding);
            let tag = leaf.tag.as_str();
            let body = match leaf.value.as_deref() {
                Some(value) if CDATA_TAGS.contains(&tag) => {
                    Some(Event::CData(BytesCData::new(value)))
                }
                Some(value) if TEXT_TAGS.contains(&tag) => Some(Event::Text(BytesText::new(value))),
                Some(value) => {
                    element.push_attribute(("value", value));
                    None
                }
                None => None,
            };

            match body {
                None => writer.write_event(Event::Empty(element)).map_err(MetaError::xml)?,
                Some(body) => {
                    writer.write_event(Event::Start(element)).map_err(MetaError::xml)?;
                    writer.write_event(body).map_err(MetaError::xml)?;
                    writer
                        .write_event(Event::End(BytesEnd::new("tuple")))
                        .map_err(MetaError::xml)?;
                }
            }
        }
    }
    Ok(())
}

/// Write XML to a file, or to stdout when no path is given.
pub fn write_xml_to(path: Option<&Path>, metadata: &Metadata) -> Result<(), MetaError> {
    match path {
        Some(path) => write_xml(BufWriter::new(File::create(path)?), metadata),
        None => write_xml(io::stdout().lock(), metadata),
    }
}

/// Render a test case as an XML string.
pub fn to_xml_string(metadata: &Metadata) -> Result<String, MetaError> {
    let mut buffer = Vec::new();
    write_xml(&mut buffer, metadata)?;
    String::from_utf8(buffer).map_err(MetaError::xml)
}

// ---------------------------------------------------------------------------
// Reading

/// A tuple element whose end tag has not been read yet.
struct OpenTuple {
    leaf: Leaf,
    text: String,
    children: Vec<Tuple>,
}

impl OpenTuple {
    fn finish(self) -> Tuple {
        let OpenTuple { mut leaf, text, children } = self;
        if children.is_empty() {
            if leaf.value.is_none() && !text.is_empty() {
                leaf.value = Some(text);
            }
            Tuple::Leaf(leaf)
        } else {
            Tuple::Container(Container {
                tag: leaf.tag,
                type_code: leaf.type_code,
                size: leaf.size,
                padding: leaf.padding,
                children,
            })
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    root_seen: bool,
    chunks: Vec<Chunk>,
    chunk: Option<Chunk>,
    open: Vec<OpenTuple>,
}

impl TreeBuilder {
    fn start(&mut self, element: &BytesStart<'_>) -> Result<(), MetaError> {
        match element.local_name().as_ref() {
            b"metadata" if !self.root_seen => {
                self.root_seen = true;
            }
            b"chunk" if self.root_seen && self.chunk.is_none() => {
                let attrs = attributes(element)?;
                let mut chunk = Chunk { tag: tag_attribute(&attrs), ..Chunk::default() };
                for (name, value) in attrs {
                    if name == "size" {
                        chunk.size = parse_number(&chunk.tag, "size", &value)?;
                    }
                }
                self.chunk = Some(chunk);
            }
            b"tuple" if self.chunk.is_some() => {
                let attrs = attributes(element)?;
                let mut leaf = Leaf { tag: tag_attribute(&attrs), ..Leaf::default() };
                for (name, value) in attrs {
                    match name.as_str() {
                        "type" => leaf.type_code = parse_type_code(&leaf.tag, &value)?,
                        "size" => leaf.size = parse_number(&leaf.tag, "size", &value)?,
                        "count" => leaf.count = parse_number(&leaf.tag, "count", &value)?,
                        "padding" => leaf.padding = parse_number(&leaf.tag, "padding", &value)?,
                        "value" => leaf.value = Some(value),
                        _ => {}
                    }
                }
                self.open.push(OpenTuple { leaf, text: String::new(), children: Vec::new() });
            }
            other => {
                return Err(MetaError::Xml(format!(
                    "unexpected element <{}>",
                    String::from_utf8_lossy(other)
                )))
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(tuple) = self.open.last_mut() {
            tuple.text.push_str(text);
        }
    }

    fn end(&mut self, name: &[u8]) -> Result<(), MetaError> {
        match name {
            b"tuple" => {
                let tuple = self
                    .open
                    .pop()
                    .ok_or_else(|| MetaError::Xml("unbalanced </tuple>".into()))?
                    .finish();
                match (self.open.last_mut(), self.chunk.as_mut()) {
                    (Some(parent), _) => parent.children.push(tuple),
                    (None, Some(chunk)) => chunk.tuples.push(tuple),
                    (None, None) => return Err(MetaError::Xml("tuple outside of a chunk".into())),
                }
            }
            b"chunk" => {
                let chunk = self
                    .chunk
                    .take()
                    .ok_or_else(|| MetaError::Xml("unbalanced </chunk>".into()))?;
                self.chunks.push(chunk);
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Metadata, MetaError> {
        if !self.root_seen {
            return Err(MetaError::Xml("missing <metadata> element".into()));
        }
        if self.chunk.is_some() || !self.open.is_empty() {
            return Err(MetaError::Xml("unexpected end of document".into()));
        }
        Ok(Metadata::new(self.chunks))
    }
}

fn attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>, MetaError> {
    element
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(MetaError::xml)?;
            let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(MetaError::xml)?.into_owned();
            Ok((name, value))
        })
        .collect()
}

/// The `tag` attribute, looked up first so that errors in the other
/// attributes can name the tuple whatever the attribute order.
fn tag_attribute(attrs: &[(String, String)]) -> String {
    attrs
        .iter()
        .find(|(name, _)| name == "tag")
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

/// Parse an XML test case.
pub fn read_xml(text: &str) -> Result<Metadata, MetaError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut builder = TreeBuilder::default();
    loop {
        let event = reader
            .read_event()
            .map_err(|e| MetaError::Xml(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(element) => builder.start(&element)?,
            Event::Empty(element) => {
                builder.start(&element)?;
                builder.end(element.local_name().as_ref())?;
            }
            Event::End(element) => builder.end(element.local_name().as_ref())?,
            Event::Text(text) => builder.text(&text.unescape().map_err(MetaError::xml)?),
            Event::CData(data) => {
                let data = String::from_utf8(data.into_inner().into_owned()).map_err(MetaError::xml)?;
                builder.text(&data);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    builder.finish()
}

/// Read an XML test case from a file.
pub fn read_xml_file(path: &Path) -> Result<Metadata, MetaError> {
    read_xml(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_namespaced_elements() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
            <md:metadata xmlns:md="https://www.vc5codec.org/xml/metadata">
              <md:chunk tag="0x4010" size="6">
                <md:tuple tag="CFHD" type="E" size="16" padding="0">
                  <md:tuple tag="LAYN" type="c" size="8" padding="0" value="Layer001"/>
                </md:tuple>
              </md:chunk>
            </md:metadata>"#;
        let metadata = read_xml(text).unwrap();
        assert_eq!(metadata.chunks.len(), 1);
        assert_eq!(metadata.chunks[0].size, Some(6));
        let class = &metadata.chunks[0].tuples[0];
        assert_eq!(class.type_code(), Some('E'));
        assert_eq!(class.children()[0], {
            let mut layn = Tuple::leaf("LAYN", 'c', 8, "Layer001");
            if let Tuple::Leaf(leaf) = &mut layn {
                leaf.padding = Some(0);
            }
            layn
        });
    }

    #[test]
    fn xmp_packet_written_as_cdata() {
        let xmp = Tuple::leaf("XMPd", 'x', 11, "<x:xmpmeta/>");
        let metadata = Metadata::new(vec![Chunk::with_class("0x4010", "XMPD", vec![xmp.clone()])]);
        let text = to_xml_string(&metadata).unwrap();
        assert!(text.contains("<![CDATA[<x:xmpmeta/>]]>"));
        let back = read_xml(&text).unwrap();
        assert_eq!(back.chunks[0].tuples[0].children()[0], xmp);
    }

    #[test]
    fn parse_error_names_tag_after_other_attributes() {
        let text = r#"<metadata><chunk tag="0x61"><tuple size="four" tag="ACCL"/></chunk></metadata>"#;
        let err = read_xml(text).unwrap_err();
        assert_eq!(err.to_string(), "parse error: tuple ACCL: invalid size 'four'");
    }

    #[test]
    fn stray_tuple_rejected() {
        let text = r#"<metadata><tuple tag="LAYN"/></metadata>"#;
        assert!(read_xml(text).is_err());
    }
}
