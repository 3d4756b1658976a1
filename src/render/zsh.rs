//! Zsh completion generator built on `_arguments -C -s`.
//!
//! Each subcommand gets its own `_<prog>_<cmd>` function; the caller's
//! `'*::arg:->…'` spec hands it the remaining words.

use std::fmt::Write;

use super::{completion_hint, identifier, split_at_group, CompletionHint, Generator};
use crate::error::Result;
use crate::model::{ActionKind, CliOption, CommandGroup, Invocation, Positional};

pub struct ZshGenerator;

impl Generator for ZshGenerator {
    fn generate(&self, invocation: &Invocation) -> Result<String> {
        let mut out = String::new();
        let function = format!("_{}", identifier(&invocation.name));

        let _ = writeln!(out, "#compdef {}", invocation.name);
        let _ = writeln!(out);
        write_command_functions(&mut out, &function, &invocation.arguments);
        write_body(
            &mut out,
            &function,
            &invocation.options,
            &invocation.arguments,
            "",
        );
        Ok(out)
    }
}

/// One function per subcommand, nested groups included.
fn write_command_functions(out: &mut String, parent: &str, arguments: &[Positional]) {
    let (_, Some(group)) = split_at_group(arguments) else {
        return;
    };
    for command in &group.choices {
        let function = format!("{parent}_{}", identifier(&command.name));
        let _ = writeln!(out, "{function}() {{");
        write_body(out, &function, &command.options, &command.arguments, "    ");
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
        write_command_functions(out, &function, &command.arguments);
    }
}

fn write_body(
    out: &mut String,
    function: &str,
    options: &[CliOption],
    arguments: &[Positional],
    indent: &str,
) {
    let (positionals, group) = split_at_group(arguments);

    let _ = writeln!(out, "{indent}local curcontext=\"$curcontext\" line state expl ret=1");
    let _ = writeln!(out);
    let _ = write!(out, "{indent}_arguments -C -s");
    for spec in options.iter().filter_map(option_spec) {
        let _ = write!(out, " \\\n{indent}    {spec}");
    }
    for (index, positional) in positionals.iter().enumerate() {
        if let Positional::Argument(arg) = positional {
            let action = if arg.choices.is_empty() {
                format!("->{}", identifier(&arg.name))
            } else {
                format!("({})", choice_list(&arg.choices))
            };
            let _ = write!(
                out,
                " \\\n{indent}    '{}:{}:{action}'",
                index + 1,
                message(&arg.name)
            );
        }
    }
    if let Some(group) = group {
        let _ = write!(
            out,
            " \\\n{indent}    '{}:{}:->{state}' \\\n{indent}    '*::arg:->{state}_args'",
            positionals.len() + 1,
            message(group.name.as_deref().unwrap_or("command")),
            state = group_state(group),
        );
    }
    let _ = writeln!(out, " \\\n{indent}    && ret=0");
    let _ = writeln!(out);

    let has_states = group.is_some()
        || positionals
            .iter()
            .any(|p| matches!(p, Positional::Argument(arg) if arg.choices.is_empty()));
    if has_states {
        let _ = writeln!(out, "{indent}case \"$state\" in");
        for positional in positionals {
            if let Positional::Argument(arg) = positional {
                if !arg.choices.is_empty() {
                    continue;
                }
                let action = match zsh_action(completion_hint(arg.metavar.as_deref())) {
                    Some(action) => action.to_string(),
                    None => format!(
                        "_message '{}'",
                        quote(arg.help.as_deref().unwrap_or(&arg.name))
                    ),
                };
                let _ = writeln!(out, "{indent}    ({})", identifier(&arg.name));
                let _ = writeln!(out, "{indent}        {action} && ret=0");
                let _ = writeln!(out, "{indent}        ;;");
            }
        }
        if let Some(group) = group {
            write_group_states(out, function, group, positionals.len() + 1, indent);
        }
        let _ = writeln!(out, "{indent}esac");
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "{indent}return ret");
}

fn write_group_states(
    out: &mut String,
    function: &str,
    group: &CommandGroup,
    position: usize,
    indent: &str,
) {
    let state = group_state(group);
    let description = group
        .help
        .as_deref()
        .or(group.name.as_deref())
        .unwrap_or("command");

    let _ = writeln!(out, "{indent}    ({state})");
    let _ = writeln!(out, "{indent}        local -a commands");
    let _ = writeln!(out, "{indent}        commands=(");
    for command in &group.choices {
        let _ = writeln!(
            out,
            "{indent}            '{}:{}'",
            quote(&command.name.replace(':', "\\:")),
            quote(command.help.as_deref().unwrap_or_default())
        );
    }
    let _ = writeln!(out, "{indent}        )");
    let _ = writeln!(
        out,
        "{indent}        _describe -t commands '{}' commands && ret=0",
        quote(description)
    );
    let _ = writeln!(out, "{indent}        ;;");

    let _ = writeln!(out, "{indent}    ({state}_args)");
    let _ = writeln!(
        out,
        "{indent}        curcontext=\"${{curcontext%:*:*}}:{}-$line[{position}]:\"",
        function.trim_start_matches('_')
    );
    let _ = writeln!(out, "{indent}        case $line[{position}] in");
    for command in &group.choices {
        let _ = writeln!(out, "{indent}            ({})", command.name);
        let _ = writeln!(
            out,
            "{indent}                {function}_{} && ret=0",
            identifier(&command.name)
        );
        let _ = writeln!(out, "{indent}                ;;");
    }
    let _ = writeln!(out, "{indent}        esac");
    let _ = writeln!(out, "{indent}        ;;");
}

/// Group states carry a `_cmd` suffix so they never collide with the
/// state of a positional of the same name.
fn group_state(group: &CommandGroup) -> String {
    format!("{}_cmd", identifier(group.name.as_deref().unwrap_or("command")))
}

/// `_arguments` spec for one option, `None` if it has no name at all.
fn option_spec(option: &CliOption) -> Option<String> {
    let help = option
        .help
        .as_deref()
        .map(|help| format!("[{}]", bracket(help)))
        .unwrap_or_default();
    let hint = option_hint(option);
    let spec = match (&option.short_name, &option.long_name) {
        (Some(short), Some(long)) => {
            format!("'({short} {long})'{{{short},{long}}}'{help}{hint}'")
        }
        (Some(name), None) | (None, Some(name)) => format!("'{name}{help}{hint}'"),
        (None, None) => return None,
    };
    Some(spec)
}

/// `:message:action` for value-taking options; flags get nothing.
fn option_hint(option: &CliOption) -> String {
    if option.action_kind() == ActionKind::Flag {
        return String::new();
    }
    let message = message(
        &option
            .metavar
            .as_deref()
            .map_or_else(|| "value".to_string(), str::to_lowercase),
    );
    if !option.choices.is_empty() {
        return format!(":{message}:({})", choice_list(&option.choices));
    }
    match zsh_action(completion_hint(option.metavar.as_deref())) {
        Some(action) => format!(":{message}:{action}"),
        None => format!(":{message}:"),
    }
}

fn zsh_action(hint: CompletionHint) -> Option<&'static str> {
    match hint {
        CompletionHint::File => Some("_files"),
        CompletionHint::Directory => Some("_directories"),
        CompletionHint::NetworkInterface => Some("_net_interfaces"),
        CompletionHint::Url => Some("_urls"),
        CompletionHint::Value => None,
    }
}

fn choice_list(choices: &[String]) -> String {
    choices
        .iter()
        .map(|choice| quote(choice).replace(' ', "\\ "))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape for use inside single quotes.
fn quote(text: &str) -> String {
    text.replace('\'', "'\\''")
}

/// Escape an option description inside `[...]`.
fn bracket(text: &str) -> String {
    quote(text).replace('[', "\\[").replace(']', "\\]")
}

/// Escape a spec message field.
fn message(text: &str) -> String {
    quote(text).replace(':', "\\:")
}
