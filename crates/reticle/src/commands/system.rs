//! System commands
//!
//! `flush` needs super user rights; the others run for anyone.

use std::io::Write;

use reticle_core::{
    require_privilege, ArgSpec, BuildContext, CommandSpec, GroupModule, HandlerResult, Invocation,
    Result,
};

pub struct System;

impl GroupModule for System {
    fn doc(&self) -> &str {
        "System commands"
    }

    fn register(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        ctx.add(CommandSpec::new("info", info).about("Show process information"))?;
        ctx.add(
            CommandSpec::new("flush", require_privilege(flush))
                .about("Flush caches (super user only)")
                .arg(ArgSpec::flag("dry_run").help("Report what would be flushed")),
        )
    }
}

fn info(inv: &mut Invocation<'_>) -> HandlerResult {
    let elevated = inv.is_elevated();
    let out = inv.out();
    writeln!(out, "pid: {}", std::process::id())?;
    writeln!(out, "os: {}", std::env::consts::OS)?;
    writeln!(out, "super user: {}", if elevated { "yes" } else { "no" })?;
    Ok(())
}

fn flush(inv: &mut Invocation<'_>) -> HandlerResult {
    if inv.args().flag("dry_run") {
        writeln!(inv.out(), "would flush caches")?;
    } else {
        tracing::info!("Flushing caches");
        writeln!(inv.out(), "caches flushed")?;
    }
    Ok(())
}
