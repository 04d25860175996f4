/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use tempnet_cli::cli_main;

const CONSISTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <graph id="g" edgedefault="directed">
    <node id="Z"/>
    <node id="X"/>
    <edge id="eZ-X" source="Z" target="X">
      <data key="LabeledValues">{(5, ⊡) }</data>
    </edge>
    <edge id="eX-Z" source="X" target="Z">
      <data key="LabeledValues">{(-3, ⊡) }</data>
    </edge>
  </graph>
</graphml>"#;

const NOT_CONSISTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <graph id="g" edgedefault="directed">
    <node id="Z"/>
    <node id="X"/>
    <edge id="eZ-X" source="Z" target="X">
      <data key="LabeledValues">{(5, ⊡) }</data>
    </edge>
    <edge id="eX-Z" source="X" target="Z">
      <data key="LabeledValues">{(-7, ⊡) }</data>
    </edge>
  </graph>
</graphml>"#;

fn run(input: &str, extra: &[&str]) -> anyhow::Result<String> {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("network.graphml");
    let output_path = dir.path().join("outcome.txt");
    std::fs::write(&input_path, input).unwrap();
    let mut args = vec![
        "tempnet".to_owned(),
        "cstn".to_owned(),
        input_path.display().to_string(),
        "-o".to_owned(),
        output_path.display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    cli_main(args)?;
    Ok(std::fs::read_to_string(output_path).unwrap())
}

#[test]
fn test_cstn_command_reports_verdict() {
    let report = run(CONSISTENT, &[]).unwrap();
    assert!(report.contains("verdict: consistent"), "{report}");
    let report = run(NOT_CONSISTENT, &[]).unwrap();
    assert!(report.contains("NOT consistent"), "{report}");
}

#[test]
fn test_cstn_command_cleaned_output_parses_back() {
    let report = run(CONSISTENT, &["--cleaned"]).unwrap();
    let xml_start = report.find("<?xml").expect("no graph in the output");
    let graph = tempnet::io::read_graphml(&report[xml_start..]).unwrap();
    assert!(graph.node_by_name("Z").is_some());
    assert!(graph.node_by_name("X").is_some());
}

#[test]
fn test_malformed_input_is_an_error() {
    assert!(run("<graphml><graph><node/></graph></graphml>", &[]).is_err());
}

#[test]
fn test_potential_solver_flag() {
    let report = run(CONSISTENT, &["--potential"]).unwrap();
    assert!(report.contains("verdict: consistent"), "{report}");
}
