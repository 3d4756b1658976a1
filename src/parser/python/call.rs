//! One visited invocation: receiver, method and literal arguments.

use std::fmt;

/// A captured argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArgument {
    /// Identifier or dotted path, kept by name.
    Reference(String),
    /// Numeric literal as written in the source.
    Number(String),
    String(String),
}

impl CallArgument {
    /// The string literal value, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CallArgument::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for CallArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArgument::Reference(name) => f.write_str(name),
            CallArgument::Number(value) => f.write_str(value),
            CallArgument::String(value) => write!(f, "'{value}'"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    /// Left-most identifier of the callee.
    pub receiver: Option<String>,
    /// Outermost attribute of the callee, i.e. the method name.
    pub attribute: Option<String>,
    pub args: Vec<CallArgument>,
    pub keywords: Vec<(String, CallArgument)>,
}

impl Call {
    /// Values of every keyword named `name`, in visit order.
    pub fn keyword_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CallArgument> {
        self.keywords
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.receiver, &self.attribute) {
            (Some(receiver), Some(attribute)) => write!(f, "{receiver}.{attribute}")?,
            (Some(name), None) | (None, Some(name)) => f.write_str(name)?,
            (None, None) => {}
        }
        f.write_str("(")?;
        let positional = self.args.iter().map(ToString::to_string);
        let keywords = self
            .keywords
            .iter()
            .map(|(name, value)| format!("{name}={value}"));
        let rendered: Vec<String> = positional.chain(keywords).collect();
        f.write_str(&rendered.join(", "))?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_invocation() {
        let call = Call {
            receiver: Some("parser".into()),
            attribute: Some("add_argument".into()),
            args: vec![
                CallArgument::String("--level".into()),
                CallArgument::Number("3".into()),
            ],
            keywords: vec![
                ("help".into(), CallArgument::String("verbosity".into())),
                ("default".into(), CallArgument::Reference("argparse.SUPPRESS".into())),
            ],
        };
        assert_eq!(
            call.to_string(),
            "parser.add_argument('--level', 3, help='verbosity', default=argparse.SUPPRESS)"
        );
    }

    #[test]
    fn display_without_receiver_or_args() {
        let call = Call {
            attribute: Some("ArgumentParser".into()),
            ..Default::default()
        };
        assert_eq!(call.to_string(), "ArgumentParser()");

        let call = Call {
            keywords: vec![("dest".into(), CallArgument::String("cmd".into()))],
            ..Default::default()
        };
        assert_eq!(call.to_string(), "(dest='cmd')");
    }

    #[test]
    fn keyword_values_keep_duplicates() {
        let call = Call {
            keywords: vec![
                ("choices".into(), CallArgument::String("a".into())),
                ("help".into(), CallArgument::String("h".into())),
                ("choices".into(), CallArgument::String("b".into())),
            ],
            ..Default::default()
        };
        let values: Vec<_> = call
            .keyword_values("choices")
            .filter_map(CallArgument::as_str)
            .collect();
        assert_eq!(values, ["a", "b"]);
    }
}
