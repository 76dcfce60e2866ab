// src/core/graph_display.rs

use std::fmt::Write;

use super::command::Command;
use super::tree::{CommandTree, NodeId, ROOT};

/// Muestra un árbol ASCII con los nodos de un comando.
pub fn display_command_tree<S: 'static>(command: &Command<S>) {
    print!("{}", render_command_tree(command));
}

/// Construye el árbol ASCII. Los nodos donde termina algún uso llevan `(*)`;
/// si el comando tiene uso por defecto, la raíz también.
pub fn render_command_tree<S: 'static>(command: &Command<S>) -> String {
    let tree = command.tree();
    let mut out = String::new();
    let root_marker = if command.default_entry().is_some() { " (*)" } else { "" };
    let _ = writeln!(out, "{}{}", tree.node(ROOT).label(), root_marker);

    let children = tree.node(ROOT).children();
    if children.is_empty() {
        let _ = writeln!(out, "└─ (sin usos registrados)");
        return out;
    }
    for (i, &child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;
        render_node(tree, child, "", is_last, &mut out);
    }
    out
}

/// Función recursiva que escribe un nodo y sus descendientes.
fn render_node<S: 'static>(tree: &CommandTree<S>, id: NodeId, prefix: &str, is_last: bool, out: &mut String) {
    let node = tree.node(id);
    let connector = if is_last { "└─" } else { "├─" };
    let terminal_marker = if node.terminal_usages().is_empty() { "" } else { " (*)" };
    let permission = node
        .parameter()
        .and_then(|p| p.permission_name())
        .map(|p| format!(" [{}]", p))
        .unwrap_or_default();

    let _ = writeln!(out, "{}{} {}{}{}", prefix, connector, node.label(), permission, terminal_marker);

    let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
    let children = node.children();
    for (i, &child) in children.iter().enumerate() {
        render_node(tree, child, &child_prefix, i == children.len() - 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameter::Parameter;
    use crate::core::source::NamedSource;
    use crate::core::usage::Usage;

    type P = Parameter<NamedSource>;

    #[test]
    fn renders_shared_prefixes_once() {
        let command = Command::new("group")
            .with_usage(Usage::builder().param(P::literal("list")).build())
            .unwrap()
            .with_usage(
                Usage::builder()
                    .param(P::literal("user").permission("group.user"))
                    .param(P::string("name"))
                    .param(P::integer("page").optional())
                    .build(),
            )
            .unwrap();

        let expected = "\
group
├─ list (*)
└─ user [group.user]
   └─ <name:text> (*)
      └─ [page:integer] (*)
";
        assert_eq!(render_command_tree(&command), expected);
    }

    #[test]
    fn empty_commands_say_so() {
        let command = Command::<NamedSource>::new("noop").default_usage(Usage::builder().build());
        assert_eq!(render_command_tree(&command), "noop (*)\n└─ (sin usos registrados)\n");
    }
}
