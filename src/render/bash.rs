//! Bash completion generator (`complete -F`).
//!
//! Handles the first subcommand group of the top-level parser: the active
//! subcommand is found by scanning the words typed so far.

use std::fmt::Write;

use super::{completion_hint, identifier, split_at_group, CompletionHint, Generator};
use crate::error::Result;
use crate::model::{ActionKind, CliOption, Command, Invocation};

pub struct BashGenerator;

impl Generator for BashGenerator {
    fn generate(&self, invocation: &Invocation) -> Result<String> {
        let (_, group) = split_at_group(&invocation.arguments);
        let commands: &[Command] = group.map(|g| g.choices.as_slice()).unwrap_or_default();
        let func_name = format!("_{}", identifier(&invocation.name));

        let mut out = String::new();
        let _ = writeln!(out, "# bash completion for {}", invocation.name);
        let _ = writeln!(out, "{func_name}() {{");
        let _ = writeln!(out, "    local cur=\"${{COMP_WORDS[COMP_CWORD]}}\"");
        let _ = writeln!(out, "    local prev=\"${{COMP_WORDS[COMP_CWORD-1]}}\"");

        if !commands.is_empty() {
            let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
            let _ = writeln!(out, "    local cmd=\"\" word");
            let _ = writeln!(out, "    for word in \"${{COMP_WORDS[@]:1:COMP_CWORD-1}}\"; do");
            let _ = writeln!(out, "        case \"${{word}}\" in");
            let _ = writeln!(out, "            {})", patterns(&names));
            let _ = writeln!(out, "                cmd=\"${{word}}\"");
            let _ = writeln!(out, "                break");
            let _ = writeln!(out, "                ;;");
            let _ = writeln!(out, "        esac");
            let _ = writeln!(out, "    done");
        }
        let _ = writeln!(out);

        let value_options: Vec<&CliOption> = invocation
            .options
            .iter()
            .chain(commands.iter().flat_map(|c| c.options.iter()))
            .filter(|o| o.action_kind() == ActionKind::TakesValue)
            .collect();
        if !value_options.is_empty() {
            let _ = writeln!(out, "    case \"${{prev}}\" in");
            for option in value_options {
                let _ = writeln!(out, "        {})", patterns(&option.names()));
                let _ = writeln!(out, "            {}", value_reply(option));
                let _ = writeln!(out, "            return");
                let _ = writeln!(out, "            ;;");
            }
            let _ = writeln!(out, "    esac");
            let _ = writeln!(out);
        }

        if commands.is_empty() {
            let _ = writeln!(out, "    local opts=\"{}\"", option_words(&invocation.options));
        } else {
            let _ = writeln!(out, "    local opts");
            let _ = writeln!(out, "    case \"${{cmd}}\" in");
            for command in commands {
                let _ = writeln!(out, "        {})", shell_word(&command.name));
                let _ = writeln!(out, "            opts=\"{}\"", option_words(&command.options));
                let _ = writeln!(out, "            ;;");
            }
            let _ = writeln!(out, "        *)");
            let _ = writeln!(out, "            opts=\"{}\"", option_words(&invocation.options));
            let _ = writeln!(out, "            ;;");
            let _ = writeln!(out, "    esac");
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "    if [[ \"${{cur}}\" == -* ]]; then");
        let _ = writeln!(out, "        COMPREPLY=($(compgen -W \"${{opts}}\" -- \"${{cur}}\"))");
        if !commands.is_empty() {
            let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
            let _ = writeln!(out, "    elif [[ -z \"${{cmd}}\" ]]; then");
            let _ = writeln!(
                out,
                "        COMPREPLY=($(compgen -W \"{}\" -- \"${{cur}}\"))",
                word_list(names)
            );
        }
        let _ = writeln!(out, "    fi");
        let _ = writeln!(out, "}}");
        let _ = writeln!(out, "complete -o default -F {func_name} {}", invocation.name);
        Ok(out)
    }
}

fn option_words(options: &[CliOption]) -> String {
    word_list(
        options
            .iter()
            .flat_map(|o| o.long_name.iter().chain(o.short_name.iter()))
            .map(String::as_str),
    )
}

/// `a|b` alternatives of a `case` arm, each matched literally.
fn patterns(words: &[&str]) -> String {
    words
        .iter()
        .map(|word| shell_word(word))
        .collect::<Vec<_>>()
        .join("|")
}

/// Contents of a double-quoted `compgen -W` list. compgen splits and
/// expands the words again, so each one is quoted for that pass too.
fn word_list<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    words
        .into_iter()
        .map(|word| {
            shell_word(word)
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('$', "\\$")
                .replace('`', "\\`")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single-quote a word unless it is made of inert characters only.
fn shell_word(word: &str) -> String {
    let inert = |c: char| c.is_ascii_alphanumeric() || "-_.,:/=+@%".contains(c);
    if !word.is_empty() && word.chars().all(inert) {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// COMPREPLY assignment for the value following an option.
fn value_reply(option: &CliOption) -> String {
    if !option.choices.is_empty() {
        return format!(
            "COMPREPLY=($(compgen -W \"{}\" -- \"${{cur}}\"))",
            word_list(option.choices.iter().map(String::as_str))
        );
    }
    match completion_hint(option.metavar.as_deref()) {
        CompletionHint::File => "COMPREPLY=($(compgen -f -- \"${cur}\"))".to_string(),
        CompletionHint::Directory => "COMPREPLY=($(compgen -d -- \"${cur}\"))".to_string(),
        CompletionHint::NetworkInterface
        | CompletionHint::Url
        | CompletionHint::Value => "COMPREPLY=()".to_string(),
    }
}
