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

use std::io::{BufRead, Write};

use clap::Parser;
use json_token_path::{Document, JsonPath};

/// Reads a JSON document and a path from stdin, prints the selected nodes.
#[derive(Parser)]
#[command(name = "json-token-path", version)]
struct Cli {
    /// Fail when a property, index or slice matches nothing
    #[arg(long)]
    error_when_no_match: bool,

    /// Expect at most one node
    #[arg(long)]
    single: bool,
}

fn main() -> std::io::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut lines = std::io::stdin().lock().lines();
    loop {
        print!("json: ");
        std::io::stdout().flush()?;
        let Some(json) = lines.next().transpose()? else {
            return Ok(());
        };

        print!("path: ");
        std::io::stdout().flush()?;
        let Some(path) = lines.next().transpose()? else {
            return Ok(());
        };

        let doc = match Document::from_json_str(&json) {
            Ok(doc) => doc,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        let path = match JsonPath::new(path.trim()) {
            Ok(path) => path,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        let result = if cli.single {
            path.select_one(doc.root(), cli.error_when_no_match)
                .map(|node| node.into_iter().collect())
        } else {
            path.select(doc.root(), cli.error_when_no_match)
        };
        match result {
            Ok(nodes) => {
                for node in nodes {
                    println!("{}", node.to_json());
                }
            }
            Err(err) => {
                println!("{err}");
            }
        }
    }
}
