use crate::config::TemplateNames;
use serde::Serialize;
use std::path::Path;
use tera::{Context, Tera};
use tracing::info;

const BUILTIN_TEMPLATES: [(&str, &str); 5] = [
    (
        "directory_index/index.html",
        include_str!("../templates/directory_index/index.html"),
    ),
    (
        "directory_index/header.html",
        include_str!("../templates/directory_index/header.html"),
    ),
    (
        "directory_index/parent.html",
        include_str!("../templates/directory_index/parent.html"),
    ),
    (
        "directory_index/directory.html",
        include_str!("../templates/directory_index/directory.html"),
    ),
    (
        "directory_index/file.html",
        include_str!("../templates/directory_index/file.html"),
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Tera(#[from] tera::Error),
    #[error("{role} template {name:?} is not loaded")]
    MissingTemplate { role: &'static str, name: String },
}

/// One row of a listing as the templates see it.
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub name: String,
    pub path: String,
    pub href: String,
}

/// Everything a listing page is rendered from.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub directories: Vec<EntryView>,
    pub files: Vec<EntryView>,
    pub base: String,
    pub parent_dir: Option<String>,
}

#[derive(Serialize)]
struct PageContext<'a> {
    templates: &'a TemplateNames,
    directories: &'a [EntryView],
    files: &'a [EntryView],
    base: &'a str,
    parent_dir: Option<&'a str>,
}

#[derive(Serialize, Default)]
struct Fragments {
    header: String,
    parent: String,
    directories: Vec<String>,
    files: Vec<String>,
}

pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Built-in templates, overridden by any `.html` file under `templates_dir`.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, RenderError> {
        let mut tera = match templates_dir {
            Some(dir) => {
                let glob = format!("{}/**/*.html", dir.display());
                info!("Loading templates from {}", glob);
                Tera::new(&glob)?
            }
            None => Tera::default(),
        };

        let mut builtins = Tera::default();
        builtins.add_raw_templates(BUILTIN_TEMPLATES)?;
        // Only adds names not already loaded from disk.
        tera.extend(&builtins)?;

        Ok(Self { tera })
    }

    pub fn validate(&self, templates: &TemplateNames) -> Result<(), RenderError> {
        let roles = [
            ("parent", &templates.parent),
            ("index", &templates.index),
            ("header", &templates.header),
            ("directory", &templates.directory),
            ("file", &templates.file),
        ];
        for (role, name) in roles {
            if !self.tera.get_template_names().any(|n| n == name) {
                return Err(RenderError::MissingTemplate {
                    role,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Role templates are rendered one by one against the page context and
    /// handed to the index template as `fragments`, since Tera cannot
    /// include a template whose name is only known at runtime.
    pub fn render_listing(
        &self,
        templates: &TemplateNames,
        page: &Page,
    ) -> Result<String, RenderError> {
        let mut context = Context::from_serialize(PageContext {
            templates,
            directories: &page.directories,
            files: &page.files,
            base: &page.base,
            parent_dir: page.parent_dir.as_deref(),
        })?;

        let mut fragments = Fragments {
            header: self.tera.render(&templates.header, &context)?,
            ..Default::default()
        };
        if page.parent_dir.is_some() {
            fragments.parent = self.tera.render(&templates.parent, &context)?;
        }
        fragments.directories =
            self.render_rows(&templates.directory, &context, &page.directories)?;
        fragments.files = self.render_rows(&templates.file, &context, &page.files)?;

        context.insert("fragments", &fragments);
        Ok(self.tera.render(&templates.index, &context)?)
    }

    fn render_rows(
        &self,
        template: &str,
        context: &Context,
        entries: &[EntryView],
    ) -> Result<Vec<String>, RenderError> {
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut row_context = context.clone();
            row_context.insert("entry", entry);
            rows.push(self.tera.render(template, &row_context)?);
        }
        Ok(rows)
    }
}
