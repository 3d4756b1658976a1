//! JSON dump of the invocation model.

use super::Generator;
use crate::error::{Error, Result};
use crate::model::Invocation;

pub struct JsonGenerator;

impl Generator for JsonGenerator {
    fn generate(&self, invocation: &Invocation) -> Result<String> {
        let mut text = serde_json::to_string_pretty(invocation)
            .map_err(|e| Error::Serialize(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Argument, CliOption, CommandGroup, Positional};

    #[test]
    fn positionals_are_tagged() {
        let invocation = Invocation {
            name: "dev".into(),
            options: vec![CliOption {
                long_name: Some("--dry-run".into()),
                action: Some("store_true".into()),
                ..Default::default()
            }],
            arguments: vec![
                Positional::Argument(Argument {
                    name: "user".into(),
                    ..Default::default()
                }),
                Positional::CommandGroup(CommandGroup::default()),
            ],
        };
        let text = JsonGenerator.generate(&invocation).unwrap();
        assert!(text.ends_with("}\n"));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["name"], "dev");
        assert_eq!(value["options"][0]["long_name"], "--dry-run");
        assert_eq!(value["options"][0]["short_name"], serde_json::Value::Null);
        assert_eq!(value["arguments"][0]["kind"], "argument");
        assert_eq!(value["arguments"][0]["name"], "user");
        assert_eq!(value["arguments"][1]["kind"], "command_group");
        assert!(value["arguments"][1]["choices"].as_array().unwrap().is_empty());
    }
}
