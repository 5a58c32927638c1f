//! Handlebars template engine with the built-in marketplace templates.

use handlebars::Handlebars;

use crate::error::{EmailError, EmailResult};

/// A rendered, sendable email body.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

struct BuiltinTemplate {
    name: &'static str,
    subject: &'static str,
    html: &'static str,
    text: Option<&'static str>,
}

const BUILTIN_TEMPLATES: &[BuiltinTemplate] = &[
    BuiltinTemplate {
        name: "welcome",
        subject: "Welcome to {{storeName}}!",
        html: "<h1>Hello {{name}}!</h1>\
               <p>Your {{storeName}} account is ready. Browse the catalog and place your first order any time.</p>",
        text: Some("Hello {{name}}! Your {{storeName}} account is ready."),
    },
    BuiltinTemplate {
        name: "order_confirmation",
        subject: "Order {{orderId}} confirmed",
        html: "<h1>Thanks for your order, {{name}}!</h1>\
               <p>Order <strong>{{orderId}}</strong> was confirmed and totals {{total}}.</p>\
               <p>We will let you know when it ships.</p>",
        text: Some("Order {{orderId}} confirmed, total {{total}}."),
    },
    BuiltinTemplate {
        name: "password_reset",
        subject: "Password reset request",
        html: "<p>Hello {{name}},</p>\
               <p><a href=\"{{resetLink}}\">Reset your password</a>. The link expires in {{expiryHours}} hours.</p>\
               <p>If you did not request this, ignore this email.</p>",
        text: Some("Reset your password: {{resetLink}} (expires in {{expiryHours}} hours)"),
    },
];

/// Template registry shared by the email consumer.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl TemplateEngine {
    /// Create an engine with the built-in templates registered.
    pub fn new() -> EmailResult<Self> {
        let mut registry = Handlebars::new();

        for template in BUILTIN_TEMPLATES {
            registry
                .register_template_string(&format!("{}__subject", template.name), template.subject)
                .map_err(|e| EmailError::Template(e.to_string()))?;
            registry
                .register_template_string(&format!("{}__html", template.name), template.html)
                .map_err(|e| EmailError::Template(e.to_string()))?;
            if let Some(text) = template.text {
                registry
                    .register_template_string(&format!("{}__text", template.name), text)
                    .map_err(|e| EmailError::Template(e.to_string()))?;
            }
        }

        Ok(Self { registry })
    }

    /// Whether `name` identifies a known template.
    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_template(&format!("{name}__subject"))
    }

    /// Render subject, HTML and (if present) text bodies for `name`.
    pub fn render(&self, name: &str, data: &serde_json::Value) -> EmailResult<RenderedEmail> {
        if !self.contains(name) {
            return Err(EmailError::TemplateNotFound(name.to_string()));
        }

        let subject = self
            .registry
            .render(&format!("{name}__subject"), data)
            .map_err(|e| EmailError::Template(e.to_string()))?;

        let html = self
            .registry
            .render(&format!("{name}__html"), data)
            .map_err(|e| EmailError::Template(e.to_string()))?;

        let text = if self.registry.has_template(&format!("{name}__text")) {
            Some(
                self.registry
                    .render(&format!("{name}__text"), data)
                    .map_err(|e| EmailError::Template(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(RenderedEmail {
            subject,
            html,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_templates_registered() {
        let engine = TemplateEngine::new().unwrap();

        assert!(engine.contains("welcome"));
        assert!(engine.contains("order_confirmation"));
        assert!(engine.contains("password_reset"));
        assert!(!engine.contains("nonexistent"));
    }

    #[test]
    fn test_render_welcome() {
        let engine = TemplateEngine::new().unwrap();

        let rendered = engine
            .render("welcome", &json!({"name": "Ana", "storeName": "Mercado"}))
            .unwrap();

        assert_eq!(rendered.subject, "Welcome to Mercado!");
        assert!(rendered.html.contains("Hello Ana!"));
        assert!(rendered.text.unwrap().contains("Ana"));
    }

    #[test]
    fn test_render_order_confirmation() {
        let engine = TemplateEngine::new().unwrap();

        let rendered = engine
            .render(
                "order_confirmation",
                &json!({"name": "Ana", "orderId": "o42", "total": "R$ 120,00"}),
            )
            .unwrap();

        assert_eq!(rendered.subject, "Order o42 confirmed");
        assert!(rendered.html.contains("R$ 120,00"));
    }

    #[test]
    fn test_unknown_template_errors() {
        let engine = TemplateEngine::new().unwrap();
        let result = engine.render("no_such_template", &json!({}));

        assert!(matches!(result, Err(EmailError::TemplateNotFound(_))));
    }

    #[test]
    fn test_missing_vars_render_empty() {
        // Handlebars renders absent fields as empty strings rather than
        // failing; template data gaps are not delivery errors
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine.render("welcome", &json!({})).unwrap();

        assert_eq!(rendered.subject, "Welcome to !");
    }
}
