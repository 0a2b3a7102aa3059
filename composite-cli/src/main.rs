// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use composite_core::host::DefaultHost;
use composite_core::registry::TypeRegistry;
use composite_core::{layout, ops, parser, serializer};
use log::LevelFilter;
use std::sync::Arc;

/// Register the demonstration schema every subcommand operates against:
/// a `point`, a `node` built from a fixed array of `point`s, and a
/// `cluster` built from a dynamic array of `node`s.
fn demo_registry() -> Result<Arc<TypeRegistry>> {
    let mut registry = TypeRegistry::new();
    registry
        .define_type("point", "int x; int y")
        .map_err(|e| anyhow!(e))?;
    registry
        .define_type("node", "int id; string label; real weight; point[3] neighbors")
        .map_err(|e| anyhow!(e))?;
    registry
        .define_type("cluster", "string name; node[] members")
        .map_err(|e| anyhow!(e))?;
    Ok(Arc::new(registry))
}

trait CliCommand {
    fn run(&self, registry: &Arc<TypeRegistry>) -> Result<()>;
}

#[derive(Parser)]
struct Parse {
    /// Name of a registered type (point, node, cluster).
    type_name: String,
    /// Textual composite value to parse.
    text: String,
}

impl CliCommand for Parse {
    fn run(&self, registry: &Arc<TypeRegistry>) -> Result<()> {
        let type_expr = layout::parse_type_expr(&self.type_name)?;
        let value = parser::parse_composite(&self.text, &type_expr, registry, &DefaultHost, None)?;
        let text = serializer::serialize(&value, serializer::Mode::Display, &DefaultHost)?;
        println!("{text}");
        Ok(())
    }
}

#[derive(Parser)]
struct Serialize {
    type_name: String,
    text: String,
}

impl CliCommand for Serialize {
    fn run(&self, registry: &Arc<TypeRegistry>) -> Result<()> {
        let type_expr = layout::parse_type_expr(&self.type_name)?;
        let value = parser::parse_composite(&self.text, &type_expr, registry, &DefaultHost, None)?;
        let text = serializer::serialize(&value, serializer::Mode::Serialize, &DefaultHost)?;
        println!("{text}");
        println!("estimated length: {}", serializer::serialized_length(&value));
        Ok(())
    }
}

#[derive(Parser)]
struct Compare {
    type_name: String,
    a: String,
    b: String,
}

impl CliCommand for Compare {
    fn run(&self, registry: &Arc<TypeRegistry>) -> Result<()> {
        let type_expr = layout::parse_type_expr(&self.type_name)?;
        let value_a = parser::parse_composite(&self.a, &type_expr, registry, &DefaultHost, None)?;
        let value_b = parser::parse_composite(&self.b, &type_expr, registry, &DefaultHost, None)?;
        println!("{:?}", ops::compare(&value_a, &value_b)?);
        Ok(())
    }
}

#[derive(Parser)]
struct Patch {
    type_name: String,
    text: String,
    /// Assignment-list patch, e.g. `label='renamed';` or `members[0]->id=42;`
    patch: String,
}

impl CliCommand for Patch {
    fn run(&self, registry: &Arc<TypeRegistry>) -> Result<()> {
        let type_expr = layout::parse_type_expr(&self.type_name)?;
        let value = parser::parse_composite(&self.text, &type_expr, registry, &DefaultHost, None)?;

        if !parser::is_assignment_list(&self.patch) {
            return Err(anyhow!("patch must be a `;`-terminated assignment list"));
        }

        let patched = parser::parse_composite(
            &self.patch,
            &type_expr,
            registry,
            &DefaultHost,
            Some(&value),
        )?;

        let text = serializer::serialize(&patched, serializer::Mode::Display, &DefaultHost)?;
        println!("{text}");
        Ok(())
    }
}

#[derive(Subcommand)]
enum Subcommands {
    /// Parse a textual value and print it back in display form.
    Parse(Parse),
    /// Parse a textual value and print its unambiguous serialized form.
    Serialize(Serialize),
    /// Parse two values of the same type and print their ordering.
    Compare(Compare),
    /// Parse a value, apply an assignment-list patch, and print the result.
    Patch(Patch),
}

impl Subcommands {
    fn as_cli_command(&self) -> &dyn CliCommand {
        match self {
            Self::Parse(c) => c,
            Self::Serialize(c) => c,
            Self::Compare(c) => c,
            Self::Patch(c) => c,
        }
    }
}

#[derive(Parser)]
struct Cli {
    /// Increase logging verbosity. Can be specified multiple times.
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Subcommands,
}

impl Cli {
    fn run() -> Result<()> {
        let cli = Self::parse();

        let log_level = match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(log_level.as_str()),
        )
        .init();

        let registry = demo_registry()?;
        cli.command.as_cli_command().run(&registry)
    }
}

fn main() {
    let exit_code = match Cli::run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    };

    std::process::exit(exit_code)
}
