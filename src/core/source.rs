// src/core/source.rs

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Identidad de quien ejecuta un comando (jugador, consola, cliente remoto...).
///
/// La igualdad entre fuentes la define la plataforma anfitriona, no el motor.
/// Los cooldowns usan la fuente como clave, por eso se exige `Eq + Hash`.
pub trait CommandSource: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    fn name(&self) -> &str;
}

/// Punto de extensión para los permisos: `(fuente, permiso-o-nada) -> bool`.
/// Un permiso `None` significa que no hay nada que comprobar.
pub trait PermissionChecker<S>: Send + Sync {
    fn has_permission(&self, source: &S, permission: Option<&str>) -> bool;
}

impl<S, F> PermissionChecker<S> for F
where
    F: Fn(&S, Option<&str>) -> bool + Send + Sync,
{
    fn has_permission(&self, source: &S, permission: Option<&str>) -> bool {
        self(source, permission)
    }
}

/// Una fuente sencilla con nombre y conjunto de permisos concedidos.
/// La usan el binario de demostración y las pruebas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedSource {
    pub name: String,
    pub permissions: BTreeSet<String>,
}

impl NamedSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// `"*"` concede cualquier permiso.
    pub fn has(&self, permission: Option<&str>) -> bool {
        match permission {
            None => true,
            Some(p) => self.permissions.contains("*") || self.permissions.contains(p),
        }
    }
}

impl CommandSource for NamedSource {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Comprobador que delega en los permisos declarados por `NamedSource`.
pub fn named_source_permissions(source: &NamedSource, permission: Option<&str>) -> bool {
    source.has(permission)
}
