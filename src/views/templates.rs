use handlebars::Handlebars;
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

const TEMPLATES: &[(&str, &str)] = &[
    ("layouts/base", include_str!("../../templates/layouts/base.hbs")),
    ("pages/login", include_str!("../../templates/pages/login.hbs")),
    ("pages/not_found", include_str!("../../templates/pages/not_found.hbs")),
    ("pages/watch", include_str!("../../templates/pages/watch.hbs")),
    ("partials/watch_list", include_str!("../../templates/partials/watch_list.hbs")),
    ("partials/watch_dialog", include_str!("../../templates/partials/watch_dialog.hbs")),
    ("partials/confirm_delete", include_str!("../../templates/partials/confirm_delete.hbs")),
    ("partials/alert_message", include_str!("../../templates/partials/alert_message.hbs")),
];

pub fn build_handlebars() -> Hbs {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(false);

    for (name, source) in TEMPLATES {
        hb.register_template_string(name, *source)
            .unwrap_or_else(|e| panic!("template {name}: {e}"));
    }

    Arc::new(hb)
}
