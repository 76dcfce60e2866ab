// src/core/tree.rs

use std::fmt;
use std::sync::Arc;

use super::errors::{RegistrationError, RegistrationResult};
use super::flags::flag_body;
use super::parameter::{Parameter, ParameterKind};
use super::resolvers::ResolverRegistry;
use super::source::PermissionChecker;
use super::usage::Usage;
use super::verifier::UsageVerifier;

/// Índice de un nodo dentro del árbol.
pub type NodeId = usize;
/// Índice de un uso dentro de su comando (orden de registro).
pub type UsageId = usize;

pub const ROOT: NodeId = 0;

pub enum NodeKind<S> {
    /// El propio comando.
    Root {
        name: String,
        aliases: Vec<String>,
        permission: Option<String>,
    },
    /// Un literal (sub-comando) o un parámetro tipado.
    Parameter(Parameter<S>),
}

/// Un nodo del árbol. Los hijos conservan el orden de registro, que sirve de
/// desempate determinista durante el recorrido.
pub struct CommandNode<S> {
    kind: NodeKind<S>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
    /// Usos cuyo camino pasa por este nodo.
    passing: Vec<UsageId>,
    /// Usos que pueden terminar aquí (el resto de sus parámetros es opcional).
    terminal: Vec<UsageId>,
}

impl<S> CommandNode<S> {
    pub fn kind(&self) -> &NodeKind<S> {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn usages(&self) -> &[UsageId] {
        &self.passing
    }

    pub fn terminal_usages(&self) -> &[UsageId] {
        &self.terminal
    }

    pub fn parameter(&self) -> Option<&Parameter<S>> {
        match &self.kind {
            NodeKind::Parameter(param) => Some(param),
            NodeKind::Root { .. } => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.parameter().is_some_and(Parameter::is_literal)
    }

    /// Permiso propio: el del comando en la raíz, el del parámetro en el resto.
    pub fn permission_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Root { permission, .. } => permission.as_deref(),
            NodeKind::Parameter(param) => param.permission_name(),
        }
    }

    fn ignores_ancestors(&self) -> bool {
        self.parameter()
            .is_some_and(Parameter::ignores_ancestor_permissions)
    }

    /// Texto con el que se muestra el nodo.
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Root { name, aliases, .. } if aliases.is_empty() => name.clone(),
            NodeKind::Root { name, aliases, .. } => format!("{} ({})", name, aliases.join(", ")),
            NodeKind::Parameter(param) => match param.kind() {
                ParameterKind::Literal { aliases } if !aliases.is_empty() => {
                    format!("{} ({})", param.name(), aliases.join(", "))
                }
                ParameterKind::Typed(kind) => {
                    let dots = if param.is_greedy() { "..." } else { "" };
                    if param.is_optional() {
                        format!("[{}{}:{}]", param.name(), dots, kind)
                    } else {
                        format!("<{}{}:{}>", param.name(), dots, kind)
                    }
                }
                _ => param.name().to_string(),
            },
        }
    }
}

/// Resultado del recorrido del árbol para una secuencia de tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeMatch {
    /// Los tokens se agotaron en un nodo donde termina `usage`.
    Complete { usage: UsageId, node: NodeId },
    /// Se agotaron los tokens antes de llegar a un nodo terminal.
    Incomplete {
        usage: UsageId,
        node: NodeId,
        missing: Vec<String>,
    },
    Unknown,
}

impl TreeMatch {
    fn rank(&self) -> u8 {
        match self {
            TreeMatch::Complete { .. } => 2,
            TreeMatch::Incomplete { .. } => 1,
            TreeMatch::Unknown => 0,
        }
    }
}

/// Lo que comparte todo un recorrido.
struct Walk<'a, S> {
    tokens: &'a [String],
    usages: &'a [Arc<Usage<S>>],
    resolvers: &'a ResolverRegistry<S>,
}

/// Árbol de prefijos de los usos de un comando, guardado en un arena.
pub struct CommandTree<S> {
    nodes: Vec<CommandNode<S>>,
}

impl<S: 'static> CommandTree<S> {
    pub fn new(name: impl Into<String>, aliases: Vec<String>, permission: Option<String>) -> Self {
        let root = CommandNode {
            kind: NodeKind::Root {
                name: name.into(),
                aliases,
                permission,
            },
            parent: None,
            children: Vec::new(),
            depth: 0,
            passing: Vec::new(),
            terminal: Vec::new(),
        };
        Self { nodes: vec![root] }
    }

    pub fn name(&self) -> &str {
        match &self.nodes[ROOT].kind {
            NodeKind::Root { name, .. } => name,
            NodeKind::Parameter(param) => param.name(),
        }
    }

    pub fn node(&self, id: NodeId) -> &CommandNode<S> {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    pub(crate) fn set_root(&mut self, aliases: Vec<String>, permission: Option<String>) {
        let name = self.name().to_string();
        self.nodes[ROOT].kind = NodeKind::Root {
            name,
            aliases,
            permission,
        };
    }

    // --- INSERCIÓN ---

    /// Añade el camino de un uso. Antes de tocar el árbol verifica su forma y
    /// lo compara con cada uso ya registrado; si algo falla no se modifica nada.
    pub fn insert(
        &mut self,
        id: UsageId,
        usage: &Usage<S>,
        registered: &[Arc<Usage<S>>],
        verifier: &UsageVerifier,
    ) -> RegistrationResult<()> {
        let command = self.name().to_string();
        verifier
            .check_shape(usage)
            .map_err(|violation| RegistrationError::InvalidUsageShape {
                command: command.clone(),
                usage: usage.signature(),
                violation,
            })?;

        if let Some(existing) = registered
            .iter()
            .find(|existing| verifier.are_ambiguous(&***existing, usage))
        {
            return Err(RegistrationError::AmbiguousUsage {
                command,
                first: existing.signature(),
                second: usage.signature(),
            });
        }

        let positional: Vec<&Parameter<S>> = usage.positional().collect();
        let mut node = ROOT;
        self.nodes[ROOT].passing.push(id);
        for (index, param) in positional.iter().enumerate() {
            node = match self.find_child(node, param) {
                Some(existing) => existing,
                None => self.add_child(node, (*param).clone()),
            };
            self.nodes[node].passing.push(id);
            if positional[index + 1..].iter().all(|p| p.is_optional()) {
                self.nodes[node].terminal.push(id);
            }
        }
        log::debug!(
            "Uso '{}' insertado en el árbol de '{}' ({} nodos)",
            usage.signature(),
            command,
            self.nodes.len()
        );
        Ok(())
    }

    fn find_child(&self, parent: NodeId, param: &Parameter<S>) -> Option<NodeId> {
        self.nodes[parent].children.iter().copied().find(|&child| {
            self.nodes[child]
                .parameter()
                .is_some_and(|existing| existing.shares_node_with(param))
        })
    }

    fn add_child(&mut self, parent: NodeId, param: Parameter<S>) -> NodeId {
        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(CommandNode {
            kind: NodeKind::Parameter(param),
            parent: Some(parent),
            children: Vec::new(),
            depth,
            passing: Vec::new(),
            terminal: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    // --- DESPACHO ---

    /// Recorrido en profundidad de los tokens (sin la etiqueta del comando).
    ///
    /// En cada nodo se prueban primero los hijos literales; solo si ninguno
    /// acepta el token se prueban los tipados, en orden de registro. Los
    /// tokens con forma de flag se consumen fuera de banda y reducen los usos
    /// candidatos a los que declaran esos flags.
    pub fn dispatch(
        &self,
        tokens: &[String],
        usages: &[Arc<Usage<S>>],
        resolvers: &ResolverRegistry<S>,
    ) -> TreeMatch {
        let walk = Walk {
            tokens,
            usages,
            resolvers,
        };
        let result = self.visit(&walk, ROOT, 0, self.nodes[ROOT].passing.clone());
        log::debug!("Recorrido de '{}' con {:?}: {:?}", self.name(), tokens, result);
        result
    }

    fn visit(&self, walk: &Walk<'_, S>, node: NodeId, pos: usize, candidates: Vec<UsageId>) -> TreeMatch {
        let (pos, candidates) = self.skip_flags(walk, pos, candidates);
        let Some(token) = walk.tokens.get(pos) else {
            return self.exhausted(walk, node, &candidates);
        };

        let mut best = TreeMatch::Unknown;
        for (child, next) in self.accepting_children(walk, node, token, &candidates) {
            let next_pos = if self.nodes[child].parameter().is_some_and(Parameter::is_greedy) {
                walk.tokens.len()
            } else {
                pos + 1
            };
            let result = self.visit(walk, child, next_pos, next);
            if result.rank() > best.rank() {
                best = result;
            }
            if best.rank() == 2 {
                break;
            }
        }
        best
    }

    /// Hijos que aceptan el token: los literales tienen prioridad y, si alguno
    /// coincide, las ramas tipadas ni se prueban.
    fn accepting_children(
        &self,
        walk: &Walk<'_, S>,
        node: NodeId,
        token: &str,
        candidates: &[UsageId],
    ) -> Vec<(NodeId, Vec<UsageId>)> {
        let reachable = |child: NodeId| {
            let next = narrow(candidates, &self.nodes[child].passing);
            (!next.is_empty()).then_some((child, next))
        };

        let literals: Vec<_> = self.nodes[node]
            .children
            .iter()
            .copied()
            .filter(|&child| {
                self.nodes[child]
                    .parameter()
                    .is_some_and(|p| p.matches_literal(token))
            })
            .filter_map(reachable)
            .collect();
        if !literals.is_empty() {
            return literals;
        }

        self.nodes[node]
            .children
            .iter()
            .copied()
            .filter(|&child| {
                self.nodes[child].parameter().is_some_and(|p| match p.kind() {
                    ParameterKind::Typed(kind) => walk.resolvers.matches(kind, token),
                    _ => false,
                })
            })
            .filter_map(reachable)
            .collect()
    }

    /// Consume los tokens de flag en la posición actual. Un flag que ningún
    /// candidato reconoce se deja pasar: el cursor informará del error.
    fn skip_flags(
        &self,
        walk: &Walk<'_, S>,
        mut pos: usize,
        mut candidates: Vec<UsageId>,
    ) -> (usize, Vec<UsageId>) {
        while let Some(body) = walk
            .tokens
            .get(pos)
            .and_then(|token| flag_candidate(token, &candidates, walk.usages))
        {
            let accepted: Vec<(UsageId, usize)> = candidates
                .iter()
                .filter_map(|&id| {
                    walk.usages[id]
                        .flag_extractor()
                        .extract(body)
                        .ok()
                        .map(|flags| (id, flags.iter().filter(|f| !f.is_switch()).count()))
                })
                .collect();

            match accepted.first() {
                None => pos += 1,
                Some(&(_, values)) => {
                    candidates = accepted
                        .iter()
                        .filter(|(_, v)| *v == values)
                        .map(|(id, _)| *id)
                        .collect();
                    pos = (pos + 1 + values).min(walk.tokens.len());
                }
            }
        }
        (pos, candidates)
    }

    fn exhausted(&self, walk: &Walk<'_, S>, node: NodeId, candidates: &[UsageId]) -> TreeMatch {
        let current = &self.nodes[node];

        // Gana el uso que termina exactamente aquí; después, el orden de registro.
        let terminal = narrow(candidates, &current.terminal);
        if let Some(&usage) = terminal
            .iter()
            .min_by_key(|&&id| (walk.usages[id].positional_count() != current.depth, id))
        {
            return TreeMatch::Complete { usage, node };
        }

        let missing_after = |id: UsageId| -> Vec<String> {
            walk.usages[id]
                .positional()
                .skip(current.depth)
                .filter(|p| !p.is_optional())
                .map(|p| p.name().to_string())
                .collect()
        };
        narrow(candidates, &current.passing)
            .into_iter()
            .min_by_key(|&id| (missing_after(id).len(), id))
            .map(|usage| TreeMatch::Incomplete {
                usage,
                node,
                missing: missing_after(usage),
            })
            .unwrap_or(TreeMatch::Unknown)
    }

    // --- PERMISOS ---

    /// Cada nodo del camino, desde `node` hasta la raíz, debe cumplir su
    /// permiso, salvo que un nodo de la cadena ignore a sus antecesores.
    pub fn permitted(&self, node: NodeId, source: &S, checker: &dyn PermissionChecker<S>) -> bool {
        self.denied_at(node, source, checker).is_none()
    }

    /// Primer nodo del camino cuyo permiso no se cumple.
    pub fn denied_at(&self, node: NodeId, source: &S, checker: &dyn PermissionChecker<S>) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id];
            if !checker.has_permission(source, n.permission_name()) {
                return Some(id);
            }
            if n.ignores_ancestors() {
                break;
            }
            current = n.parent;
        }
        None
    }

    // --- SUGERENCIAS ---

    /// Nodos alcanzables tras consumir `tokens` en modo permisivo, junto con
    /// los usos que siguen siendo candidatos en cada uno.
    pub fn frontier(
        &self,
        tokens: &[String],
        usages: &[Arc<Usage<S>>],
        resolvers: &ResolverRegistry<S>,
    ) -> Vec<(NodeId, Vec<UsageId>)> {
        let walk = Walk {
            tokens,
            usages,
            resolvers,
        };
        let mut out = Vec::new();
        self.collect(&walk, ROOT, 0, self.nodes[ROOT].passing.clone(), &mut out);
        out
    }

    fn collect(
        &self,
        walk: &Walk<'_, S>,
        node: NodeId,
        pos: usize,
        candidates: Vec<UsageId>,
        out: &mut Vec<(NodeId, Vec<UsageId>)>,
    ) {
        let (pos, candidates) = self.skip_flags(walk, pos, candidates);
        let Some(token) = walk.tokens.get(pos) else {
            out.push((node, candidates));
            return;
        };
        for (child, next) in self.accepting_children(walk, node, token, &candidates) {
            let next_pos = if self.nodes[child].parameter().is_some_and(Parameter::is_greedy) {
                walk.tokens.len()
            } else {
                pos + 1
            };
            self.collect(walk, child, next_pos, next, out);
        }
    }
}

impl<S: 'static> fmt::Debug for CommandTree<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("name", &self.name())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// Intersección que conserva el orden de `candidates`.
fn narrow(candidates: &[UsageId], allowed: &[UsageId]) -> Vec<UsageId> {
    candidates
        .iter()
        .copied()
        .filter(|id| allowed.contains(id))
        .collect()
}

/// Un token cuenta como flag solo si tiene la forma y algún candidato declara flags.
fn flag_candidate<'t, S>(token: &'t str, candidates: &[UsageId], usages: &[Arc<Usage<S>>]) -> Option<&'t str> {
    let body = flag_body(token)?;
    candidates
        .iter()
        .any(|&id| usages[id].has_flags())
        .then_some(body)
}
