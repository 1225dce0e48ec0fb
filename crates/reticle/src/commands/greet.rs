//! Greeting commands

use std::io::Write;

use reticle_core::{
    ArgSpec, BuildContext, CommandError, GroupModule, HandlerResult, Invocation, Result,
};

pub struct Greet;

/// Upper bound for `bye --times`
const MAX_TIMES: u32 = 10;

impl GroupModule for Greet {
    fn doc(&self) -> &str {
        "Greeting commands"
    }

    fn register(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        ctx.register_argument(
            "hi",
            hi,
            ArgSpec::positional("who")
                .required(false)
                .multiple(true)
                .help("People to greet"),
        )?;
        ctx.register_argument(
            "bye",
            bye,
            ArgSpec::option("times")
                .short('t')
                .value_name("N")
                .default_value("1")
                .help("How many times to say it"),
        )?;
        ctx.register_argument("bye", bye, ArgSpec::flag("loud").help("Shout"))?;

        ctx.describe("hi", "Greet everyone named, or the room")?;
        ctx.describe("bye", "Say goodbye, possibly several times")
    }
}

fn hi(inv: &mut Invocation<'_>) -> HandlerResult {
    let who = inv.args().values("who").join(" and ");
    if who.is_empty() {
        writeln!(inv.out(), "Hi!")?;
    } else {
        writeln!(inv.out(), "Hi, {who}!")?;
    }
    Ok(())
}

fn bye(inv: &mut Invocation<'_>) -> HandlerResult {
    let raw = inv.args().get("times").unwrap_or("1");
    let times: u32 = raw
        .parse()
        .map_err(|_| CommandError::recoverable(format!("--times expects a number, got '{raw}'")))?;
    if times == 0 || times > MAX_TIMES {
        return Err(CommandError::recoverable(format!(
            "--times must be between 1 and {MAX_TIMES}"
        )));
    }

    let word = if inv.args().flag("loud") { "BYE" } else { "bye" };
    let line = vec![word; times as usize].join(" ");
    writeln!(inv.out(), "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use reticle_core::{CommandGroup, ModuleCatalog};

    use super::*;

    #[test]
    fn test_commands_carry_help_text() {
        let catalog = ModuleCatalog::new().with("commands.greet", Greet);
        let mut group = CommandGroup::new("commands.greet".into());
        group.load(&catalog, None).expect("load");

        let parser = group.parser().expect("parser");
        for name in ["hi", "bye"] {
            let about = parser
                .find_subcommand(name)
                .and_then(|cmd| cmd.get_about())
                .map(ToString::to_string);
            assert!(about.is_some_and(|text| !text.is_empty()), "{name} has no help");
        }
    }
}
