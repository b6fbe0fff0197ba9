// Copyright 2023 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! This file is the runner of the path cases in `path_cases.txt`.
//!
//! Cases are separated by blank lines. Each case has the lines:
//!
//! ```text
//! json: <document>
//! path: <path>
//! strict: true          (optional, error when no match)
//! result: <json array>  (or `error: <message>`)
//! ```

use json_token_path::{select_tokens, Document};
use libtest_mimic::{Arguments, Failed, Trial};

fn main() {
    let args = Arguments::from_args();

    let tests = parse_script(include_str!("path_cases.txt"));

    // Run all tests and exit the application appropriatly.
    libtest_mimic::run(&args, tests).exit();
}

struct Case {
    json: String,
    path: String,
    strict: bool,
    expected: Result<serde_json::Value, String>,
}

fn parse_script(script: &'static str) -> Vec<Trial> {
    let mut tests = vec![];
    let mut lines = script
        .lines()
        .enumerate()
        // skip comments
        .filter(|(_, line)| !line.trim_start().starts_with('#'))
        .peekable();
    while let Some((line_no, line)) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = vec![line];
        while let Some((_, line)) = lines.next_if(|(_, line)| !line.trim().is_empty()) {
            fields.push(line);
        }
        let name = format!("path_cases.txt:{}", line_no + 1);
        let trial = match parse_case(&fields) {
            Ok(case) => Trial::test(name, move || run(case)),
            Err(msg) => Trial::test(name, move || Err(msg.into())),
        };
        tests.push(trial);
    }
    tests
}

fn parse_case(fields: &[&str]) -> Result<Case, String> {
    let mut json = None;
    let mut path = None;
    let mut strict = false;
    let mut expected = None;
    for field in fields {
        let (key, value) = field
            .split_once(':')
            .ok_or_else(|| format!("malformed line: {field}"))?;
        let value = value.trim();
        match key.trim() {
            "json" => json = Some(value.to_string()),
            "path" => path = Some(value.to_string()),
            "strict" => strict = value == "true",
            "result" => {
                let value = serde_json::from_str(value).map_err(|e| e.to_string())?;
                expected = Some(Ok(value));
            }
            "error" => expected = Some(Err(value.to_string())),
            key => return Err(format!("unknown key: {key}")),
        }
    }
    Ok(Case {
        json: json.ok_or("missing json")?,
        path: path.ok_or("missing path")?,
        strict,
        expected: expected.ok_or("missing result or error")?,
    })
}

fn run(case: Case) -> Result<(), Failed> {
    let doc = Document::from_json_str(&case.json).map_err(|e| e.to_string())?;
    let actual = select_tokens(doc.root(), &case.path, case.strict)
        .map(|nodes| serde_json::Value::Array(nodes.into_iter().map(|n| n.to_json()).collect()))
        .map_err(|e| e.to_string());
    if actual != case.expected {
        return Err(format!("expected: {:?}, got: {actual:?}", case.expected).into());
    }
    Ok(())
}
