//! Fish completion generator.

use std::fmt::Write;

use super::{completion_hint, split_at_group, CompletionHint, Generator};
use crate::error::Result;
use crate::model::{ActionKind, CliOption, Invocation, Positional};

pub struct FishGenerator;

impl Generator for FishGenerator {
    fn generate(&self, invocation: &Invocation) -> Result<String> {
        let name = &invocation.name;
        let (positionals, group) = split_at_group(&invocation.arguments);
        // Top-level entries only apply before a subcommand is typed.
        let top = group.map(|_| "__fish_use_subcommand");

        let mut out = String::new();
        let _ = writeln!(out, "# fish completion for {name}");

        if let Some(group) = group {
            for command in &group.choices {
                let mut line = format!(
                    "complete -c {name} -n '__fish_use_subcommand' -f -a '{}'",
                    escape(&command.name)
                );
                if let Some(help) = &command.help {
                    let _ = write!(line, " -d '{}'", escape(help));
                }
                let _ = writeln!(out, "{line}");
            }
        }

        for option in &invocation.options {
            write_option(&mut out, name, top, option);
        }
        write_argument_choices(&mut out, name, top, positionals);

        if let Some(group) = group {
            for command in &group.choices {
                let condition = format!("__fish_seen_subcommand_from {}", command.name);
                for option in &command.options {
                    write_option(&mut out, name, Some(condition.as_str()), option);
                }
                write_argument_choices(
                    &mut out,
                    name,
                    Some(condition.as_str()),
                    &command.arguments,
                );
            }
        }
        Ok(out)
    }
}

fn write_option(out: &mut String, name: &str, condition: Option<&str>, option: &CliOption) {
    let mut line = format!("complete -c {name}");
    if let Some(condition) = condition {
        let _ = write!(line, " -n '{condition}'");
    }
    if let Some(short) = &option.short_name {
        let short = short.trim_start_matches('-');
        // `-name` spellings longer than one letter are old-style options
        let flag = if short.chars().count() == 1 { "-s" } else { "-o" };
        let _ = write!(line, " {flag} {short}");
    }
    if let Some(long) = &option.long_name {
        let _ = write!(line, " -l {}", long.trim_start_matches('-'));
    }
    if option.action_kind() == ActionKind::TakesValue {
        line.push_str(&value_arguments(option));
    }
    if let Some(help) = &option.help {
        let _ = write!(line, " -d '{}'", escape(help));
    }
    let _ = writeln!(out, "{line}");
}

fn value_arguments(option: &CliOption) -> String {
    if !option.choices.is_empty() {
        return format!(" -x -a '{}'", escape(&option.choices.join(" ")));
    }
    match completion_hint(option.metavar.as_deref()) {
        CompletionHint::File => " -r -F".to_string(),
        CompletionHint::Directory => " -x -a '(__fish_complete_directories)'".to_string(),
        CompletionHint::NetworkInterface => " -x -a '(__fish_print_interfaces)'".to_string(),
        CompletionHint::Url | CompletionHint::Value => " -r".to_string(),
    }
}

/// Positionals with fixed choices complete those values.
fn write_argument_choices(
    out: &mut String,
    name: &str,
    condition: Option<&str>,
    arguments: &[Positional],
) {
    for positional in arguments {
        let Positional::Argument(arg) = positional else {
            continue;
        };
        if arg.choices.is_empty() {
            continue;
        }
        let mut line = format!("complete -c {name}");
        if let Some(condition) = condition {
            let _ = write!(line, " -n '{condition}'");
        }
        let _ = write!(line, " -f -a '{}'", escape(&arg.choices.join(" ")));
        if let Some(help) = &arg.help {
            let _ = write!(line, " -d '{}'", escape(help));
        }
        let _ = writeln!(out, "{line}");
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Argument, Command, CommandGroup};

    #[test]
    fn options_without_subcommands() {
        let invocation = Invocation {
            name: "tool".into(),
            options: vec![
                CliOption {
                    short_name: Some("-n".into()),
                    long_name: Some("--dry-run".into()),
                    help: Some("don't commit".into()),
                    action: Some("store_true".into()),
                    ..Default::default()
                },
                CliOption {
                    long_name: Some("--output".into()),
                    metavar: Some("FILE".into()),
                    ..Default::default()
                },
            ],
            arguments: Vec::new(),
        };
        let text = FishGenerator.generate(&invocation).unwrap();
        assert_eq!(
            text,
            "# fish completion for tool\n\
             complete -c tool -s n -l dry-run -d 'don\\'t commit'\n\
             complete -c tool -l output -r -F\n"
        );
    }

    #[test]
    fn subcommands_are_guarded() {
        let invocation = Invocation {
            name: "dev".into(),
            options: Vec::new(),
            arguments: vec![Positional::CommandGroup(CommandGroup {
                name: Some("command".into()),
                help: None,
                choices: vec![Command {
                    name: "customize".into(),
                    help: Some("customize the device".into()),
                    options: vec![CliOption {
                        long_name: Some("--dir".into()),
                        metavar: Some("DIR".into()),
                        ..Default::default()
                    }],
                    arguments: vec![Positional::Argument(Argument {
                        name: "parameter".into(),
                        choices: vec!["mac".into(), "serial".into()],
                        ..Default::default()
                    })],
                }],
            })],
        };
        let text = FishGenerator.generate(&invocation).unwrap();
        assert!(text.contains(
            "complete -c dev -n '__fish_use_subcommand' -f -a 'customize' \
             -d 'customize the device'\n"
        ));
        assert!(text.contains(
            "complete -c dev -n '__fish_seen_subcommand_from customize' -l dir -x \
             -a '(__fish_complete_directories)'\n"
        ));
        assert!(text.contains(
            "complete -c dev -n '__fish_seen_subcommand_from customize' -f -a 'mac serial'\n"
        ));
    }
}
