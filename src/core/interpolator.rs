// src/core/interpolator.rs

use super::context::{ResolvedContext, ResolvedFlag};

/// Rellena las plantillas de respuesta de los comandos declarativos.
///
/// Tokens reservados: `{source}`, `{label}` y `{path}` (la ruta de
/// sub-comandos). Cualquier otro `{nombre}` se sustituye por el argumento o
/// flag de ese nombre; los que no existen se dejan tal cual.
pub struct Interpolator<'a, S> {
    source_name: &'a str,
    context: &'a ResolvedContext<S>,
}

impl<'a, S> Interpolator<'a, S> {
    pub fn new(source_name: &'a str, context: &'a ResolvedContext<S>) -> Self {
        Self { source_name, context }
    }

    pub fn interpolate(&self, input: &str) -> String {
        let pass1 = self.interpolate_reserved(input);
        let pass2 = self.interpolate_flags(&pass1);
        self.interpolate_arguments(&pass2)
    }

    fn interpolate_reserved(&self, input: &str) -> String {
        input
            .replace("{source}", self.source_name)
            .replace("{label}", self.context.label())
            .replace("{path}", &self.context.command_path().join(" "))
    }

    fn interpolate_arguments(&self, input: &str) -> String {
        let mut result = input.to_string();
        for argument in self.context.arguments() {
            let token = format!("{{{}}}", argument.parameter.name());
            let value = argument
                .value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            result = result.replace(&token, &value);
        }
        result
    }

    fn interpolate_flags(&self, input: &str) -> String {
        let mut result = input.to_string();
        for (name, flag) in self.context.flags() {
            let token = format!("{{{}}}", name);
            let value = match flag {
                ResolvedFlag::Switch(present) => present.to_string(),
                ResolvedFlag::Valued { value, .. } => value.to_string(),
            };
            result = result.replace(&token, &value);
        }
        result
    }
}
