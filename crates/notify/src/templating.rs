//! Minijinja template rendering for notification messages.
//!
//! Titles, bodies and webhook payloads are arbitrary template strings (not
//! pre-registered), so a fresh [`minijinja::Environment`] is created per
//! render call.

use serde::Serialize;

use crate::traits::NotifyError;

/// Context data available to alert templates.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub team1: String,
    pub team2: String,
    /// `team1 vs team2`.
    pub fixture: String,
    /// Milestone name, e.g. `pre-start-far`.
    pub milestone: String,
    /// Match start in RFC 3339.
    pub start: String,
    /// Match end in RFC 3339.
    pub end: String,
    /// Whole minutes until start (negative once started).
    pub minutes_to_start: i64,
    /// Render time in RFC 3339.
    pub now: String,
}

/// Renders notification templates using minijinja.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a configured minijinja environment with custom filters and globals.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();

        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env.add_filter("plural", plural_filter);

        env.add_function("env", env_function);

        env
    }

    /// Render a template string with any serializable context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render<S: Serialize>(&self, template_str: &str, ctx: &S) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Validate that a template string parses without errors.
    ///
    /// This does not evaluate the template; it only checks syntax.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// `{{ n | plural("minute") }}` renders `1 minute` / `5 minutes`.
fn plural_filter(value: i64, unit: String) -> String {
    if value.abs() == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

/// Global function: read an environment variable by name.
///
/// Returns an empty string (with a warning) when the variable is missing.
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}
