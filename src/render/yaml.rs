//! YAML dump of the invocation model.
//!
//! Every field is written; unset optional fields become empty strings so
//! the dump keeps one shape regardless of what the source declared.

use serde_yaml::Value;

use super::Generator;
use crate::error::{Error, Result};
use crate::model::Invocation;

pub struct YamlGenerator;

impl Generator for YamlGenerator {
    fn generate(&self, invocation: &Invocation) -> Result<String> {
        let mut value = serde_yaml::to_value(invocation).map_err(serialize_error)?;
        blank_nulls(&mut value);
        serde_yaml::to_string(&value).map_err(serialize_error)
    }
}

fn serialize_error(err: serde_yaml::Error) -> Error {
    Error::Serialize(err.to_string())
}

fn blank_nulls(value: &mut Value) {
    match value {
        Value::Null => *value = Value::String(String::new()),
        Value::Sequence(items) => items.iter_mut().for_each(blank_nulls),
        Value::Mapping(map) => {
            for (_, field) in map.iter_mut() {
                blank_nulls(field);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Argument, CliOption, Command, CommandGroup, Positional};

    fn dump(invocation: &Invocation) -> Value {
        let text = YamlGenerator.generate(invocation).unwrap();
        serde_yaml::from_str(&text).unwrap()
    }

    #[test]
    fn strings_survive_reading_back() {
        let choices = ["0x10", "0o17", ".inf", "yes", "~", "1e3", "- x", "a: b", ""];
        let invocation = Invocation {
            name: "tool".into(),
            options: Vec::new(),
            arguments: vec![Positional::Argument(Argument {
                name: "value".into(),
                choices: choices.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            })],
        };
        let value = dump(&invocation);
        let read: Vec<&str> = value["arguments"][0]["choices"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|c| c.as_str().unwrap())
            .collect();
        assert_eq!(read, choices);
    }

    #[test]
    fn every_field_present() {
        let invocation = Invocation {
            name: "dev".into(),
            options: vec![CliOption {
                short_name: Some("-n".into()),
                long_name: Some("--dry-run".into()),
                action: Some("store_true".into()),
                ..Default::default()
            }],
            arguments: vec![Positional::CommandGroup(CommandGroup {
                name: Some("command".into()),
                help: None,
                choices: vec![Command {
                    name: "customize".into(),
                    help: Some("customize the device".into()),
                    options: Vec::new(),
                    arguments: vec![Positional::Argument(Argument {
                        name: "parameter".into(),
                        choices: vec!["mac".into(), "serial".into()],
                        ..Default::default()
                    })],
                }],
            })],
        };
        let value = dump(&invocation);
        assert_eq!(value["name"].as_str(), Some("dev"));

        let option = &value["options"][0];
        assert_eq!(option["short_name"].as_str(), Some("-n"));
        assert_eq!(option["long_name"].as_str(), Some("--dry-run"));
        assert_eq!(option["help"].as_str(), Some(""));
        assert_eq!(option["metavar"].as_str(), Some(""));
        assert_eq!(option["action"].as_str(), Some("store_true"));
        assert!(option["choices"].as_sequence().unwrap().is_empty());

        let group = &value["arguments"][0];
        assert_eq!(group["kind"].as_str(), Some("command_group"));
        assert_eq!(group["name"].as_str(), Some("command"));
        assert_eq!(group["help"].as_str(), Some(""));
        let command = &group["choices"][0];
        assert_eq!(command["name"].as_str(), Some("customize"));
        assert!(command["options"].as_sequence().unwrap().is_empty());
        let argument = &command["arguments"][0];
        assert_eq!(argument["kind"].as_str(), Some("argument"));
        assert_eq!(argument["metavar"].as_str(), Some(""));
        assert_eq!(argument["choices"][1].as_str(), Some("serial"));
    }

    #[test]
    fn keys_keep_declaration_order() {
        let invocation = Invocation {
            name: "tool".into(),
            ..Default::default()
        };
        let text = YamlGenerator.generate(&invocation).unwrap();
        assert_eq!(text, "name: tool\noptions: []\narguments: []\n");
    }
}
