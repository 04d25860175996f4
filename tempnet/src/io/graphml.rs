/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::arith::parse_weight;
use crate::graph::{ConstraintType, Edge, GraphError, LowerCaseValue, Node, TNGraph};
use crate::labels::{ALetter, Label, Proposition};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;

/// An error raised reading a network document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("element <{0}> is missing the attribute {1:?}")]
    MissingAttribute(&'static str, &'static str),
    #[error("edge {0:?} references the undefined node {1:?}")]
    UndefinedNode(String, String),
    #[error("node {0:?}: invalid value for key {1:?}: {2}")]
    InvalidNodeData(String, String, String),
    #[error("edge {0:?}: invalid value for key {1:?}: {2}")]
    InvalidEdgeData(String, String, String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Default)]
struct RawElement {
    id: String,
    source: String,
    target: String,
    data: HashMap<String, String>,
}

/// Parses a lower-case value rendered as `{(c, 2, ⊡) }`.
fn parse_lower_case(s: &str) -> Result<Option<LowerCaseValue>, String> {
    let inner = s
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| format!("missing braces in {s:?}"))?
        .trim();
    if inner.is_empty() {
        return Ok(None);
    }
    let body = inner
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("malformed triple {inner:?}"))?;
    let mut parts = body.splitn(3, ',');
    let mut next = || parts.next().map(str::trim).ok_or_else(|| format!("malformed triple {inner:?}"));
    let letter = next()?;
    let letter = letter
        .chars()
        .next()
        .filter(|_| letter.chars().count() == 1)
        .ok_or_else(|| format!("invalid contingent name {letter:?}"))?;
    let letter = ALetter::from_char(letter).map_err(|e| e.to_string())?;
    let value = parse_weight(next()?).map_err(|e| e.to_string())?;
    let label = next()?.parse::<Label>().map_err(|e| e.to_string())?;
    Ok(Some(LowerCaseValue {
        letter,
        label,
        value,
    }))
}

fn node_from_raw(raw: &RawElement) -> Result<Node, ParseError> {
    let invalid = |key: &str, err: String| {
        ParseError::InvalidNodeData(raw.id.clone(), key.into(), err)
    };
    let mut node = Node::new(raw.id.clone());
    for (key, value) in &raw.data {
        match key.as_str() {
            "x" => node.x = value.parse().map_err(|_| invalid(key, value.clone()))?,
            "y" => node.y = value.parse().map_err(|_| invalid(key, value.clone()))?,
            "Label" => node.set_label(
                value
                    .parse()
                    .map_err(|e: crate::labels::ParseLabelError| invalid(key, e.to_string()))?,
            ),
            "Obs" => {
                let c = value
                    .chars()
                    .next()
                    .filter(|_| value.chars().count() == 1)
                    .ok_or_else(|| invalid(key, value.clone()))?;
                node.set_observed(Some(
                    Proposition::from_char(c).map_err(|e| invalid(key, e.to_string()))?,
                ));
            }
            "ALabel" => {
                let c = value
                    .chars()
                    .next()
                    .filter(|_| value.chars().count() == 1)
                    .ok_or_else(|| invalid(key, value.clone()))?;
                node.set_contingent_letter(Some(
                    ALetter::from_char(c).map_err(|e| invalid(key, e.to_string()))?,
                ));
            }
            "Potential" => {
                let map = value
                    .parse::<crate::maps::LabeledIntMap>()
                    .map_err(|e| invalid(key, e.to_string()))?;
                *node.potential_mut() = map;
            }
            "Distribution" => node.set_distribution(Some(value.clone())),
            _ => log::warn!("node {:?}: ignoring unknown data key {key:?}", raw.id),
        }
    }
    Ok(node)
}

/// Reads a network from a GraphML-ish document.
pub fn read_graphml(xml: &str) -> Result<TNGraph, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut nodes: Vec<RawElement> = Vec::new();
    let mut edges: Vec<RawElement> = Vec::new();
    let mut current: Option<(bool, RawElement)> = None;
    let mut current_key: Option<String> = None;
    let mut buf = Vec::new();

    fn raw_from_start(
        e: &quick_xml::events::BytesStart<'_>,
    ) -> Result<(bool, RawElement), ParseError> {
        let is_node = e.name().as_ref() == b"node";
        let mut raw = RawElement::default();
        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).into_owned();
            match attr.key.as_ref() {
                b"id" => raw.id = value,
                b"source" => raw.source = value,
                b"target" => raw.target = value,
                _ => {}
            }
        }
        if is_node && raw.id.is_empty() {
            return Err(ParseError::MissingAttribute("node", "id"));
        }
        if !is_node && (raw.source.is_empty() || raw.target.is_empty()) {
            return Err(ParseError::MissingAttribute("edge", "source/target"));
        }
        Ok((is_node, raw))
    }

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => match e.name().as_ref() {
                b"node" | b"edge" => current = Some(raw_from_start(&e)?),
                b"data" => {
                    current_key = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"key")
                        .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                // A self-closing node or edge carries no data children.
                b"node" | b"edge" => {
                    let (is_node, raw) = raw_from_start(&e)?;
                    if is_node {
                        nodes.push(raw);
                    } else {
                        edges.push(raw);
                    }
                }
                _ => {}
            },
            Event::Text(e) => {
                if let (Some((_, raw)), Some(key)) = (current.as_mut(), current_key.as_ref()) {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    raw.data
                        .entry(key.clone())
                        .and_modify(|v| v.push_str(&text))
                        .or_insert(text);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"node" | b"edge" => {
                    if let Some((is_node, raw)) = current.take() {
                        if is_node {
                            nodes.push(raw);
                        } else {
                            edges.push(raw);
                        }
                    }
                }
                b"data" => current_key = None,
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    let mut graph = TNGraph::new();
    for raw in &nodes {
        graph.add_node(node_from_raw(raw)?)?;
    }
    for raw in &edges {
        let source = graph
            .node_by_name(&raw.source)
            .ok_or_else(|| ParseError::UndefinedNode(raw.id.clone(), raw.source.clone()))?;
        let target = graph
            .node_by_name(&raw.target)
            .ok_or_else(|| ParseError::UndefinedNode(raw.id.clone(), raw.target.clone()))?;
        let name = if raw.id.is_empty() {
            format!("e{}-{}", raw.source, raw.target)
        } else {
            raw.id.clone()
        };
        let invalid =
            |key: &str, err: String| ParseError::InvalidEdgeData(name.clone(), key.into(), err);
        let mut edge = Edge::new(name.clone(), source, target);
        for (key, value) in &raw.data {
            match key.as_str() {
                "Type" => {
                    let t = ConstraintType::from_str_loose(value)
                        .ok_or_else(|| invalid(key, value.clone()))?;
                    edge.set_constraint_type(t);
                }
                "LabeledValues" => edge
                    .values_mut()
                    .merge_labeled_values_from_str(value)
                    .map_err(|e| invalid(key, e.to_string()))?,
                "UpperCaseLabeledValues" => edge
                    .values_mut()
                    .merge_upper_case_from_str(value)
                    .map_err(|e| invalid(key, e.to_string()))?,
                "LowerCaseLabeledValues" => {
                    edge.set_lower_case(parse_lower_case(value).map_err(|e| invalid(key, e))?)
                }
                _ => log::warn!("edge {name:?}: ignoring unknown data key {key:?}"),
            }
        }
        graph.add_edge(edge)?;
    }
    Ok(graph)
}

const NODE_KEYS: &[(&str, &str)] = &[
    ("x", "double"),
    ("y", "double"),
    ("Label", "string"),
    ("Obs", "string"),
    ("ALabel", "string"),
    ("Potential", "string"),
    ("Distribution", "string"),
];

const EDGE_KEYS: &[(&str, &str)] = &[
    ("Type", "string"),
    ("LabeledValues", "string"),
    ("LowerCaseLabeledValues", "string"),
    ("UpperCaseLabeledValues", "string"),
];

/// Writes a network as a GraphML-ish document.
pub fn write_graphml<W: Write>(graph: &TNGraph, mut writer: W) -> Result<(), ParseError> {
    writeln!(writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(
        writer,
        "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">"
    )?;
    for &(key, ty) in NODE_KEYS {
        writeln!(
            writer,
            "  <key id=\"{key}\" for=\"node\" attr.name=\"{key}\" attr.type=\"{ty}\"/>"
        )?;
    }
    for &(key, ty) in EDGE_KEYS {
        writeln!(
            writer,
            "  <key id=\"{key}\" for=\"edge\" attr.name=\"{key}\" attr.type=\"{ty}\"/>"
        )?;
    }
    writeln!(writer, "  <graph id=\"g\" edgedefault=\"directed\">")?;
    for id in graph.node_ids() {
        write_node(&mut writer, graph.node(id))?;
    }
    for id in graph.edge_ids() {
        write_edge(&mut writer, graph, id)?;
    }
    writeln!(writer, "  </graph>")?;
    writeln!(writer, "</graphml>")?;
    Ok(())
}

fn write_data<W: Write>(writer: &mut W, key: &str, value: &str) -> std::io::Result<()> {
    writeln!(
        writer,
        "      <data key=\"{key}\">{}</data>",
        escape(value)
    )
}

fn write_node<W: Write>(writer: &mut W, node: &Node) -> std::io::Result<()> {
    writeln!(writer, "    <node id=\"{}\">", escape(node.name()))?;
    write_data(writer, "x", &node.x.to_string())?;
    write_data(writer, "y", &node.y.to_string())?;
    if !node.label().is_empty() {
        write_data(writer, "Label", &node.label().to_string())?;
    }
    if let Some(p) = node.observed() {
        write_data(writer, "Obs", &p.to_string())?;
    }
    if let Some(c) = node.contingent_letter() {
        write_data(writer, "ALabel", &c.to_string())?;
    }
    if !node.potential().is_empty() {
        write_data(writer, "Potential", &node.potential().to_string())?;
    }
    if let Some(d) = node.distribution() {
        write_data(writer, "Distribution", d)?;
    }
    writeln!(writer, "    </node>")
}

fn write_edge<W: Write>(
    writer: &mut W,
    graph: &TNGraph,
    id: crate::graph::EdgeId,
) -> std::io::Result<()> {
    let edge = graph.edge(id);
    writeln!(
        writer,
        "    <edge id=\"{}\" source=\"{}\" target=\"{}\">",
        escape(edge.name()),
        escape(graph.node(edge.source()).name()),
        escape(graph.node(edge.target()).name())
    )?;
    write_data(writer, "Type", edge.constraint_type().as_str())?;
    let labeled = edge.labeled_value_map();
    if !labeled.is_empty() {
        write_data(writer, "LabeledValues", &labeled.to_string())?;
    }
    if edge.has_upper_case_values() {
        write_data(
            writer,
            "UpperCaseLabeledValues",
            &edge.values().upper_case_to_string(),
        )?;
    }
    if let Some(lc) = edge.lower_case() {
        write_data(writer, "LowerCaseLabeledValues", &lc.to_string())?;
    }
    writeln!(writer, "    </edge>")
}
