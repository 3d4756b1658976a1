//! Declaration tree accumulated while visiting a file.

use super::call::Call;
use super::declare::{
    classify, create_argument, create_command, create_command_group, CallKind, Declaration,
};
use super::visitor::CallSink;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, ReceiverKind, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationNode {
    /// Variable the declared object is bound to, if any.
    pub name: Option<String>,
    /// `None` only for the root parser.
    pub declaration: Option<Declaration>,
    pub children: Vec<DeclarationNode>,
}

impl DeclarationNode {
    pub fn new(name: Option<&str>, declaration: Option<Declaration>) -> Self {
        Self {
            name: name.map(String::from),
            declaration,
            children: Vec::new(),
        }
    }

    /// Look a node up by name: this node, else the most recently added
    /// direct child of that name, else depth-first through the children.
    pub fn find(&self, name: &str) -> Option<&DeclarationNode> {
        let path = self.path_to(name)?;
        let mut node = self;
        for index in path {
            node = &node.children[index];
        }
        Some(node)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut DeclarationNode> {
        let path = self.path_to(name)?;
        let mut node = self;
        for index in path {
            node = &mut node.children[index];
        }
        Some(node)
    }

    fn path_to(&self, name: &str) -> Option<Vec<usize>> {
        if self.name.as_deref() == Some(name) {
            return Some(Vec::new());
        }
        if let Some(index) = self
            .children
            .iter()
            .rposition(|child| child.name.as_deref() == Some(name))
        {
            return Some(vec![index]);
        }
        self.children.iter().enumerate().find_map(|(index, child)| {
            let mut path = child.path_to(name)?;
            path.insert(0, index);
            Some(path)
        })
    }

    /// Whether declarations expecting `kind` may attach here.
    fn accepts(&self, kind: ReceiverKind) -> bool {
        match kind {
            ReceiverKind::Parser => matches!(
                self.declaration,
                None | Some(Declaration::Command(_))
            ),
            ReceiverKind::CommandGroup => {
                matches!(self.declaration, Some(Declaration::CommandGroup(_)))
            }
        }
    }
}

/// Builds the tree from the calls reported by the visitor.
#[derive(Debug, Default)]
pub struct DeclarationTree {
    root: Option<DeclarationNode>,
}

impl DeclarationTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&DeclarationNode> {
        self.root.as_ref()
    }

    pub fn into_root(self) -> Option<DeclarationNode> {
        self.root
    }

    fn attach(
        &mut self,
        call: &Call,
        expected: ReceiverKind,
        node: DeclarationNode,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let receiver = call.receiver.as_deref();
        let unresolved = || Error::UnresolvedReference {
            name: receiver.map_or_else(|| call.to_string(), String::from),
            expected,
        };
        let root = self.root.as_mut().ok_or_else(unresolved)?;
        let parent = receiver
            .and_then(|name| root.find_mut(name))
            .filter(|parent| parent.accepts(expected))
            .ok_or_else(unresolved)?;
        diagnostics.debug(format!(
            "attaching {} to `{}`",
            node.declaration
                .as_ref()
                .map_or_else(|| "node".to_string(), Declaration::describe),
            receiver.unwrap_or_default()
        ));
        parent.children.push(node);
        Ok(())
    }
}

impl CallSink for DeclarationTree {
    fn on_call(
        &mut self,
        call: Call,
        binding: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        diagnostics.debug(format!("processing call {call}"));
        match classify(&call) {
            CallKind::CreateParser => {
                if self.root.is_some() {
                    diagnostics.warn(format!("ignoring additional parser construction {call}"));
                } else {
                    diagnostics.debug(format!(
                        "adding parser `{}`",
                        binding.unwrap_or_default()
                    ));
                    self.root = Some(DeclarationNode::new(binding, None));
                }
                Ok(())
            }
            CallKind::AddSubparsers => {
                let group = create_command_group(&call, diagnostics);
                let node = DeclarationNode::new(binding, Some(Declaration::CommandGroup(group)));
                self.attach(&call, ReceiverKind::Parser, node, diagnostics)
            }
            CallKind::AddArgument => {
                let declaration = create_argument(&call, diagnostics)?;
                let node = DeclarationNode::new(None, Some(declaration));
                self.attach(&call, ReceiverKind::Parser, node, diagnostics)
            }
            CallKind::AddParser => {
                let command = create_command(&call, diagnostics)?;
                let node = DeclarationNode::new(binding, Some(Declaration::Command(command)));
                self.attach(&call, ReceiverKind::CommandGroup, node, diagnostics)
            }
            CallKind::Other => {
                diagnostics.debug(format!("skipped call {call}"));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::call::CallArgument;
    use super::*;
    use crate::diagnostics::Severity;
    use crate::model::{Command, CommandGroup};

    fn named(name: &str, declaration: Option<Declaration>) -> DeclarationNode {
        DeclarationNode::new(Some(name), declaration)
    }

    fn command(name: &str) -> Option<Declaration> {
        Some(Declaration::Command(Command {
            name: name.into(),
            ..Default::default()
        }))
    }

    fn call(receiver: &str, attribute: &str, args: &[&str]) -> Call {
        Call {
            receiver: Some(receiver.into()),
            attribute: Some(attribute.into()),
            args: args.iter().map(|a| CallArgument::String(a.to_string())).collect(),
            keywords: Vec::new(),
        }
    }

    #[test]
    fn find_prefers_self_then_last_direct_child() {
        let mut root = named("parser", None);
        let mut first = named("p", command("first"));
        first.children.push(named("deep", command("deep")));
        root.children.push(first);
        root.children.push(named("p", command("second")));

        assert_eq!(root.find("parser").unwrap().name.as_deref(), Some("parser"));
        let found = root.find("p").unwrap();
        assert_eq!(found.declaration, command("second"));
        assert_eq!(root.find("deep").unwrap().declaration, command("deep"));
        assert!(root.find("missing").is_none());
    }

    #[test]
    fn find_mut_reaches_nested_node() {
        let mut root = named("parser", None);
        let mut group = named("subs", Some(Declaration::CommandGroup(CommandGroup::default())));
        group.children.push(named("go", command("go")));
        root.children.push(group);

        root.find_mut("go").unwrap().children.push(named("leaf", None));
        assert_eq!(root.children[0].children[0].children.len(), 1);
    }

    #[test]
    fn builds_parser_group_and_commands() {
        let mut tree = DeclarationTree::new();
        let mut diag = Diagnostics::new();
        tree.on_call(call("argparse", "ArgumentParser", &[]), Some("parser"), &mut diag)
            .unwrap();
        tree.on_call(call("parser", "add_argument", &["-v"]), None, &mut diag)
            .unwrap();
        tree.on_call(call("parser", "add_subparsers", &[]), Some("subs"), &mut diag)
            .unwrap();
        tree.on_call(call("subs", "add_parser", &["go"]), Some("go"), &mut diag)
            .unwrap();
        tree.on_call(call("go", "add_argument", &["target"]), None, &mut diag)
            .unwrap();

        let root = tree.root().unwrap();
        assert_eq!(root.children.len(), 2);
        let group = &root.children[1];
        assert_eq!(group.children[0].children.len(), 1);
    }

    #[test]
    fn second_parser_ignored_with_warning() {
        let mut tree = DeclarationTree::new();
        let mut diag = Diagnostics::new();
        tree.on_call(call("argparse", "ArgumentParser", &[]), Some("a"), &mut diag)
            .unwrap();
        tree.on_call(call("argparse", "ArgumentParser", &[]), Some("b"), &mut diag)
            .unwrap();
        assert_eq!(tree.root().unwrap().name.as_deref(), Some("a"));
        assert!(diag.contains(Severity::Warning, "ignoring additional parser"));
    }

    #[test]
    fn unbound_receiver_is_unresolved() {
        let mut tree = DeclarationTree::new();
        let mut diag = Diagnostics::new();
        tree.on_call(call("argparse", "ArgumentParser", &[]), Some("parser"), &mut diag)
            .unwrap();
        let err = tree
            .on_call(call("subs", "add_parser", &["go"]), None, &mut diag)
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedReference {
                name: "subs".into(),
                expected: ReceiverKind::CommandGroup
            }
        );
    }

    #[test]
    fn receiver_of_wrong_kind_is_unresolved() {
        let mut tree = DeclarationTree::new();
        let mut diag = Diagnostics::new();
        tree.on_call(call("argparse", "ArgumentParser", &[]), Some("parser"), &mut diag)
            .unwrap();
        // add_parser on the parser itself rather than on a group
        let err = tree
            .on_call(call("parser", "add_parser", &["go"]), None, &mut diag)
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
    }

    #[test]
    fn declaration_before_parser_is_unresolved() {
        let mut tree = DeclarationTree::new();
        let mut diag = Diagnostics::new();
        let err = tree
            .on_call(call("parser", "add_argument", &["x"]), None, &mut diag)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot resolve `parser` to a parser");
    }

    #[test]
    fn other_calls_skipped() {
        let mut tree = DeclarationTree::new();
        let mut diag = Diagnostics::new();
        tree.on_call(call("parser", "parse_args", &[]), Some("args"), &mut diag)
            .unwrap();
        assert!(tree.root().is_none());
        assert!(diag.contains(Severity::Debug, "skipped call parser.parse_args()"));
    }
}
