use tera::{Context, Tera};

use crate::errors::ApplicationError;
use crate::notifications::digest::Digest;
use crate::notifications::ports::OutboundEmail;

const HTML_TEMPLATE: &str = "digest.html";
const TEXT_TEMPLATE: &str = "digest.txt";

/// Renders a [`Digest`] into the HTML and plain-text bodies of one email.
///
/// Templates are compiled into the binary. The HTML template is registered
/// under a `.html` name so Tera escapes vehicle names and labels.
#[derive(Clone, Debug)]
pub struct DigestRenderer {
    tera: Tera,
    app_base_url: String,
}

impl DigestRenderer {
    pub fn new(app_base_url: impl Into<String>) -> Result<Self, ApplicationError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (HTML_TEMPLATE, include_str!("../../../../templates/digest/digest.html.tera")),
            (TEXT_TEMPLATE, include_str!("../../../../templates/digest/digest.txt.tera")),
        ])
        .map_err(|error| {
            ApplicationError::Configuration(format!("digest templates failed to load: {error}"))
        })?;

        let app_base_url = app_base_url.into().trim_end_matches('/').to_string();
        Ok(Self { tera, app_base_url })
    }

    pub fn render(&self, digest: &Digest) -> Result<OutboundEmail, ApplicationError> {
        let subject = digest.subject();

        let mut context = Context::new();
        context.insert("subject", &subject);
        context.insert("greeting_name", digest.greeting_name());
        context.insert("overdue_count", &digest.overdue_count());
        context.insert("warning_count", &digest.warning_count());
        context.insert("vehicles", &digest.vehicles());
        context.insert("show_upsell", &digest.shows_upsell());
        context.insert("app_url", &format!("{}/dashboard", self.app_base_url));
        context.insert("upgrade_url", &format!("{}/pricing", self.app_base_url));
        context.insert("settings_url", &format!("{}/settings/notifications", self.app_base_url));

        let html = self.render_template(HTML_TEMPLATE, &context)?;
        let text = self.render_template(TEXT_TEMPLATE, &context)?;

        Ok(OutboundEmail { to: digest.email.clone(), subject, html, text })
    }

    fn render_template(&self, name: &str, context: &Context) -> Result<String, ApplicationError> {
        self.tera.render(name, context).map_err(|error| {
            ApplicationError::Integration(format!("digest template `{name}` failed: {error}"))
        })
    }
}
