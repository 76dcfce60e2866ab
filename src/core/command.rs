// src/core/command.rs

use std::fmt;
use std::sync::Arc;

use super::errors::RegistrationResult;
use super::parameter::Parameter;
use super::tree::{CommandTree, UsageId};
use super::usage::Usage;
use super::verifier::{UsageVerifier, VerifierMode};

/// Índice reservado para el uso por defecto en su `UsageKey`.
pub const DEFAULT_USAGE_INDEX: usize = usize::MAX;

/// Un comando: nombre, alias, permiso y los usos que lo componen. Es dueño
/// del árbol construido a partir de esos usos.
pub struct Command<S> {
    name: String,
    aliases: Vec<String>,
    permission: Option<String>,
    ignore_ancestor_permissions: bool,
    description: Option<String>,
    default_usage: Option<Arc<Usage<S>>>,
    usages: Vec<Arc<Usage<S>>>,
    tree: CommandTree<S>,
    verifier: UsageVerifier,
}

impl<S: 'static> Command<S> {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            tree: CommandTree::new(name.clone(), Vec::new(), None),
            name,
            aliases: Vec::new(),
            permission: None,
            ignore_ancestor_permissions: false,
            description: None,
            default_usage: None,
            usages: Vec::new(),
            verifier: UsageVerifier::default(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self.sync_root();
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self.sync_root();
        self
    }

    /// Como sub-comando, no hereda los permisos de sus antecesores.
    pub fn ignore_ancestor_permissions(mut self) -> Self {
        self.ignore_ancestor_permissions = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Solo afecta a los usos que se registren después.
    pub fn verifier_mode(mut self, mode: VerifierMode) -> Self {
        self.verifier = UsageVerifier::new(mode);
        self
    }

    /// Uso sin parámetros que se ejecuta cuando la etiqueta llega sola. No
    /// pasa por el verificador.
    pub fn default_usage(mut self, mut usage: Usage<S>) -> Self {
        usage.assign_key(&self.name, DEFAULT_USAGE_INDEX);
        self.default_usage = Some(Arc::new(usage));
        self
    }

    fn sync_root(&mut self) {
        self.tree.set_root(self.aliases.clone(), self.permission.clone());
    }

    // --- REGISTRO ---

    /// Verifica el uso contra los ya registrados y lo inserta en el árbol. Si
    /// falla, el comando queda exactamente como estaba.
    pub fn add_usage(&mut self, mut usage: Usage<S>) -> RegistrationResult<UsageId> {
        let id = self.usages.len();
        usage.assign_key(&self.name, id);
        self.tree.insert(id, &usage, &self.usages, &self.verifier)?;
        log::info!("Uso registrado: {}", usage.signature());
        self.usages.push(Arc::new(usage));
        Ok(id)
    }

    pub fn with_usage(mut self, usage: Usage<S>) -> RegistrationResult<Self> {
        self.add_usage(usage)?;
        Ok(self)
    }

    /// Aplana un sub-comando en este: cada uso del hijo se registra precedido
    /// de un literal con el nombre, alias y permiso del hijo. El uso por
    /// defecto del hijo pasa a ser el uso `<padre> <hijo>`.
    pub fn add_subcommand(&mut self, child: Command<S>) -> RegistrationResult<()> {
        let literal = child.as_literal();
        if let Some(default) = &child.default_usage {
            self.add_usage(default.prefixed(literal.clone()))?;
        }
        for usage in &child.usages {
            self.add_usage(usage.prefixed(literal.clone()))?;
        }
        log::info!("Sub-comando '{}' añadido a '{}'", child.name, self.name);
        Ok(())
    }

    pub fn with_subcommand(mut self, child: Command<S>) -> RegistrationResult<Self> {
        self.add_subcommand(child)?;
        Ok(self)
    }

    fn as_literal(&self) -> Parameter<S> {
        let mut literal = Parameter::literal_with_aliases(self.name.clone(), self.aliases.clone());
        if let Some(permission) = &self.permission {
            literal = literal.permission(permission.clone());
        }
        if self.ignore_ancestor_permissions {
            literal = literal.ignore_ancestor_permissions();
        }
        if let Some(description) = &self.description {
            literal = literal.description(description.clone());
        }
        literal
    }
}

impl<S> Command<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Nombre y alias, en ese orden.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn matches_label(&self, label: &str) -> bool {
        self.labels().any(|l| l.eq_ignore_ascii_case(label))
    }

    pub fn permission_name(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn usages(&self) -> &[Arc<Usage<S>>] {
        &self.usages
    }

    pub fn usage(&self, id: UsageId) -> Option<&Arc<Usage<S>>> {
        self.usages.get(id)
    }

    pub fn default_entry(&self) -> Option<&Arc<Usage<S>>> {
        self.default_usage.as_ref()
    }

    pub fn tree(&self) -> &CommandTree<S> {
        &self.tree
    }

    pub fn verifier(&self) -> &UsageVerifier {
        &self.verifier
    }
}

impl<S> fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .field("usages", &self.usages)
            .field("has_default", &self.default_usage.is_some())
            .finish()
    }
}
