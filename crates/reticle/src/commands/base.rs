//! Top-level commands.

use std::io::Write;

use reticle_core::{
    ArgSpec, BuildContext, CommandError, CommandSpec, GroupModule, HandlerResult, Invocation,
    Result,
};

pub struct Base;

impl GroupModule for Base {
    fn doc(&self) -> &str {
        "Reticle demo: nested subcommands assembled from command groups"
    }

    fn register(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        ctx.add(
            CommandSpec::new("hello", hello)
                .about("Print a greeting")
                .arg(
                    ArgSpec::option("name")
                        .short('n')
                        .value_name("NAME")
                        .default_value("world")
                        .help("Who to greet"),
                ),
        )?;
        ctx.add(CommandSpec::new("version", version).about("Print the version"))?;
        ctx.add(CommandSpec::new("quit", quit).about("Leave the interactive shell"))
    }
}

fn hello(inv: &mut Invocation<'_>) -> HandlerResult {
    let name = inv.args().get("name").unwrap_or("world").to_string();
    writeln!(inv.out(), "Hello, {name}!")?;
    Ok(())
}

fn version(inv: &mut Invocation<'_>) -> HandlerResult {
    writeln!(inv.out(), "reticle {}", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

fn quit(_: &mut Invocation<'_>) -> HandlerResult {
    Err(CommandError::Exit(0))
}
